//! Client-side notebook document.
//!
//! Holds cell code and the last rendered output of each cell. Outputs are
//! opaque JSON; [`None`] is the placeholder shown before a cell has run or
//! after the kernel restarted.

use nb_protocol::{CellId, CellSnapshot, NotebookSnapshot, SessionId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Cell payload sent to the kernel host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum CellRequest {
	/// New cell source (including form values bound to the cell).
	Edit { code: String },
	/// Execute the cell with the given source.
	Run { code: String },
}

/// Cell payload received from the kernel host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellOutput {
	#[serde(default)]
	pub output: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notebook {
	cells: Vec<CellSnapshot>,
	interactive: bool,
}

impl Default for Notebook {
	fn default() -> Self {
		Self {
			cells: Vec::new(),
			interactive: true,
		}
	}
}

impl Notebook {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn cells(&self) -> &[CellSnapshot] {
		&self.cells
	}

	pub fn cell(&self, id: &CellId) -> Option<&CellSnapshot> {
		self.cells.iter().find(|c| &c.id == id)
	}

	/// False while no kernel backs the notebook; outputs stay visible but inert.
	pub fn is_interactive(&self) -> bool {
		self.interactive
	}

	pub fn set_interactive(&mut self, interactive: bool) {
		self.interactive = interactive;
	}

	/// Replaces the source of `id`, appending the cell if it is new.
	pub fn edit(&mut self, id: &CellId, code: impl Into<String>) {
		let code = code.into();
		match self.cells.iter_mut().find(|c| &c.id == id) {
			Some(cell) => cell.code = code,
			None => self.cells.push(CellSnapshot {
				id: id.clone(),
				code,
				output: None,
			}),
		}
	}

	/// Sets the rendered output of an existing cell. Unknown cells are ignored.
	pub fn set_output(&mut self, id: &CellId, output: Option<Value>) -> bool {
		match self.cells.iter_mut().find(|c| &c.id == id) {
			Some(cell) => {
				cell.output = output;
				true
			}
			None => false,
		}
	}

	/// Applies a server cell payload. Returns false if it was not an output update.
	pub fn apply_cell_message(&mut self, id: &CellId, payload: &Value) -> bool {
		match serde_json::from_value::<CellOutput>(payload.clone()) {
			Ok(CellOutput { output }) if payload.get("output").is_some() => self.set_output(id, output),
			_ => false,
		}
	}

	/// Drops every execution-derived output back to the placeholder.
	pub fn reset_execution_state(&mut self) {
		for cell in &mut self.cells {
			cell.output = None;
		}
	}

	pub fn restore(&mut self, snapshot: &NotebookSnapshot) {
		self.cells = snapshot.cells.clone();
	}

	pub fn snapshot(&self, session_id: Option<SessionId>, dirty: bool) -> NotebookSnapshot {
		NotebookSnapshot {
			session_id,
			cells: self.cells.clone(),
			dirty,
		}
	}
}

/// Text shown for a cell output. The placeholder renders as `None`.
pub fn render_output(output: Option<&Value>) -> String {
	match output {
		None | Some(Value::Null) => "None".to_string(),
		Some(Value::String(s)) => s.clone(),
		Some(Value::Array(items)) => items.iter().map(|v| render_output(Some(v))).collect::<Vec<_>>().join(" "),
		Some(other) => other.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn edit_appends_then_updates() {
		let mut notebook = Notebook::new();
		let id = CellId::new("a");
		notebook.edit(&id, "x = 1");
		notebook.edit(&id, "x = 2");
		assert_eq!(notebook.cells().len(), 1);
		assert_eq!(notebook.cell(&id).unwrap().code, "x = 2");
	}

	#[test]
	fn output_messages_update_cells() {
		let mut notebook = Notebook::new();
		let id = CellId::new("a");
		notebook.edit(&id, "12345");

		assert!(notebook.apply_cell_message(&id, &json!({"output": ["12345", "54321"]})));
		assert_eq!(render_output(notebook.cell(&id).unwrap().output.as_ref()), "12345 54321");
		assert!(!notebook.apply_cell_message(&id, &json!({"progress": 0.5})));
		assert!(!notebook.apply_cell_message(&CellId::new("missing"), &json!({"output": 1})));
	}

	#[test]
	fn reset_keeps_code_and_clears_outputs() {
		let mut notebook = Notebook::new();
		let id = CellId::new("a");
		notebook.edit(&id, "12345");
		notebook.set_output(&id, Some(json!("12345")));

		notebook.reset_execution_state();
		let cell = notebook.cell(&id).unwrap();
		assert_eq!(cell.code, "12345");
		assert_eq!(render_output(cell.output.as_ref()), "None");
	}

	#[test]
	fn request_payload_shape() {
		let payload = serde_json::to_value(CellRequest::Run { code: "1".into() }).unwrap();
		assert_eq!(payload, json!({"op": "run", "code": "1"}));
	}
}
