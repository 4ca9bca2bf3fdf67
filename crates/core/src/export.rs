//! Export of notebook snapshots ("Download unsaved changes").

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use nb_protocol::NotebookSnapshot;
use serde::{Deserialize, Serialize};

use crate::document::render_output;
use crate::error::Result;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
	/// The snapshot itself, re-importable.
	#[default]
	Json,
	/// Cell sources separated by `# %%` markers.
	Script,
	/// Sources in fenced blocks followed by their last output.
	Markdown,
}

impl ExportFormat {
	pub fn extension(self) -> &'static str {
		match self {
			ExportFormat::Json => "json",
			ExportFormat::Script => "py",
			ExportFormat::Markdown => "md",
		}
	}

	pub fn render(self, snapshot: &NotebookSnapshot) -> Result<String> {
		Ok(match self {
			ExportFormat::Json => serde_json::to_string_pretty(snapshot)?,
			ExportFormat::Script => {
				let mut out = String::new();
				for cell in &snapshot.cells {
					out.push_str(&format!("# %% {}\n{}\n\n", cell.id, cell.code.trim_end()));
				}
				out
			}
			ExportFormat::Markdown => {
				let mut out = String::from("# Notebook\n\n");
				if let Some(id) = &snapshot.session_id {
					out.push_str(&format!("Session `{id}`\n\n"));
				}
				for cell in &snapshot.cells {
					out.push_str(&format!("## {}\n\n```\n{}\n```\n\n", cell.id, cell.code.trim_end()));
					if cell.output.is_some() {
						out.push_str(&format!("Output: `{}`\n\n", render_output(cell.output.as_ref())));
					}
				}
				out
			}
		})
	}
}

impl fmt::Display for ExportFormat {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			ExportFormat::Json => "json",
			ExportFormat::Script => "script",
			ExportFormat::Markdown => "markdown",
		})
	}
}

impl FromStr for ExportFormat {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"json" => Ok(ExportFormat::Json),
			"script" | "py" => Ok(ExportFormat::Script),
			"markdown" | "md" => Ok(ExportFormat::Markdown),
			other => Err(format!("unknown export format '{other}' (expected json, script or markdown)")),
		}
	}
}

/// Writes `snapshot` into `dir` and returns the new file's path.
///
/// File names carry the session id and a millisecond timestamp, so repeated
/// downloads never overwrite each other.
pub fn write_export(dir: &Path, snapshot: &NotebookSnapshot, format: ExportFormat) -> Result<PathBuf> {
	fs::create_dir_all(dir)?;
	let stem = snapshot.session_id.as_ref().map(|id| sanitize(id.as_str())).unwrap_or_else(|| "unsaved".to_string());
	let millis = std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.map(|d| d.as_millis())
		.unwrap_or_default();

	let mut path = dir.join(format!("nb-{stem}-{millis}.{}", format.extension()));
	let mut suffix = 1;
	while path.exists() {
		path = dir.join(format!("nb-{stem}-{millis}-{suffix}.{}", format.extension()));
		suffix += 1;
	}

	fs::write(&path, format.render(snapshot)?)?;
	tracing::info!(target = "nb.session", path = %path.display(), %format, "exported notebook");
	Ok(path)
}

fn sanitize(name: &str) -> String {
	name.chars().map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' }).collect()
}

#[cfg(test)]
mod tests {
	use nb_protocol::{CellId, CellSnapshot, SessionId};
	use serde_json::json;
	use tempfile::TempDir;

	use super::*;

	fn snapshot() -> NotebookSnapshot {
		NotebookSnapshot {
			session_id: Some(SessionId::new("s/1")),
			cells: vec![CellSnapshot {
				id: CellId::new("form"),
				code: "12345".into(),
				output: Some(json!(["12345", "54321"])),
			}],
			dirty: true,
		}
	}

	#[test]
	fn json_export_round_trips() {
		let tmp = TempDir::new().unwrap();
		let path = write_export(tmp.path(), &snapshot(), ExportFormat::Json).unwrap();

		assert!(path.file_name().unwrap().to_string_lossy().starts_with("nb-s_1-"));
		let parsed: NotebookSnapshot = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
		assert_eq!(parsed, snapshot());
	}

	#[test]
	fn repeated_exports_do_not_overwrite() {
		let tmp = TempDir::new().unwrap();
		let a = write_export(tmp.path(), &snapshot(), ExportFormat::Script).unwrap();
		let b = write_export(tmp.path(), &snapshot(), ExportFormat::Script).unwrap();
		assert_ne!(a, b);
	}

	#[test]
	fn markdown_includes_outputs() {
		let text = ExportFormat::Markdown.render(&snapshot()).unwrap();
		assert!(text.contains("```\n12345\n```"));
		assert!(text.contains("Output: `12345 54321`"));
	}

	#[test]
	fn parses_format_names() {
		assert_eq!("md".parse::<ExportFormat>().unwrap(), ExportFormat::Markdown);
		assert!("pdf".parse::<ExportFormat>().is_err());
	}
}
