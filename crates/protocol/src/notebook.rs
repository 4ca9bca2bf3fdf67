//! Serializable notebook snapshots.
//!
//! A snapshot is the unit the kernel replays on resume, the payload of a save
//! request, and what gets written out when the user downloads unsaved work.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::session::{CellId, SessionId};

/// One cell as it appears in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellSnapshot {
	pub id: CellId,
	pub code: String,
	/// Last rendered output, [`None`] when the cell has not produced one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub output: Option<Value>,
}

/// Full notebook state at a point in time.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NotebookSnapshot {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub session_id: Option<SessionId>,
	#[serde(default)]
	pub cells: Vec<CellSnapshot>,
	/// Whether the snapshot holds edits not yet persisted to disk.
	#[serde(default)]
	pub dirty: bool,
}

impl NotebookSnapshot {
	pub fn cell(&self, id: &CellId) -> Option<&CellSnapshot> {
		self.cells.iter().find(|c| &c.id == id)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_snapshot_parses_from_empty_object() {
		let snapshot: NotebookSnapshot = serde_json::from_str("{}").unwrap();
		assert_eq!(snapshot, NotebookSnapshot::default());
	}

	#[test]
	fn cell_lookup_by_id() {
		let snapshot = NotebookSnapshot {
			session_id: None,
			cells: vec![CellSnapshot {
				id: CellId::new("a"),
				code: "x = 1".into(),
				output: Some(serde_json::json!("1")),
			}],
			dirty: false,
		};
		assert_eq!(snapshot.cell(&CellId::new("a")).unwrap().code, "x = 1");
		assert!(snapshot.cell(&CellId::new("b")).is_none());
	}
}
