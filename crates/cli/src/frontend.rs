//! Terminal presentation of a notebook session.

use std::io::{self, Write};

use colored::Colorize;
use nb::{Confirmation, ConfirmationId, Frontend, Notebook, Notice, NoticeLevel, SessionStatus, render_output};
use tokio::sync::watch;

/// Writes session output to `out` (stdout in the binary).
///
/// The open question is published on a watch channel so the input reader can
/// turn `yes`/`no` into an answer for the right prompt.
pub struct TerminalFrontend<W> {
	out: W,
	pending: watch::Sender<Option<ConfirmationId>>,
}

impl TerminalFrontend<io::Stdout> {
	pub fn stdout() -> (Self, watch::Receiver<Option<ConfirmationId>>) {
		Self::new(io::stdout())
	}
}

impl<W: Write> TerminalFrontend<W> {
	pub fn new(out: W) -> (Self, watch::Receiver<Option<ConfirmationId>>) {
		let (pending, rx) = watch::channel(None);
		(Self { out, pending }, rx)
	}

	pub fn into_inner(self) -> W {
		self.out
	}

	fn emit(&mut self, text: std::fmt::Arguments<'_>) {
		if let Err(e) = writeln!(self.out, "{text}").and_then(|()| self.out.flush()) {
			tracing::debug!(target = "nb.cli", error = %e, "terminal write failed");
		}
	}
}

fn status_label(status: SessionStatus) -> colored::ColoredString {
	let text = format!("[{status}]");
	match status {
		SessionStatus::Open => text.green(),
		SessionStatus::Connecting | SessionStatus::Resuming => text.yellow(),
		SessionStatus::KernelNotFound | SessionStatus::Closed => text.red(),
	}
}

impl<W: Write + Send + 'static> Frontend for TerminalFrontend<W> {
	fn render(&mut self, notebook: &Notebook, status: SessionStatus) {
		let mode = if notebook.is_interactive() { "" } else { " read-only" };
		self.emit(format_args!("{}{} {} cell(s)", status_label(status), mode.dimmed(), notebook.cells().len()));
		let lines: Vec<String> = notebook
			.cells()
			.iter()
			.map(|cell| format!("  {} {}  {} {}", cell.id.as_str().cyan(), cell.code, "=>".dimmed(), render_output(cell.output.as_ref())))
			.collect();
		for line in lines {
			self.emit(format_args!("{line}"));
		}
	}

	fn prompt(&mut self, confirmation: &Confirmation) {
		self.pending.send_replace(Some(confirmation.id));
		self.emit(format_args!("{} {} {}", "?".yellow().bold(), confirmation.message(), "[yes/no]".dimmed()));
	}

	fn dismiss(&mut self, id: ConfirmationId) {
		let was_open = self.pending.send_if_modified(|current| {
			if *current == Some(id) {
				*current = None;
				true
			} else {
				false
			}
		});
		if was_open {
			self.emit(format_args!("{}", "(question withdrawn)".dimmed()));
		}
	}

	fn notice(&mut self, notice: &Notice) {
		let tag = match notice.level {
			NoticeLevel::Info => "info:".blue().bold(),
			NoticeLevel::Warning => "warning:".yellow().bold(),
			NoticeLevel::Error => "error:".red().bold(),
		};
		self.emit(format_args!("{tag} {}", notice.message));
		if notice.actionable {
			self.emit(format_args!("{}", "type 'new' for a new session or 'quit' to exit".dimmed()));
		}
	}

	fn navigate(&mut self, url: &str) {
		self.emit(format_args!("leaving notebook for {url}"));
	}
}

#[cfg(test)]
mod tests {
	use nb::{ConfirmationKind, Transition};
	use nb_protocol::CellId;
	use serde_json::json;

	use super::*;

	fn text(frontend: TerminalFrontend<Vec<u8>>) -> String {
		String::from_utf8(frontend.into_inner()).unwrap()
	}

	#[test]
	fn renders_cells_with_outputs() {
		let (mut frontend, _) = TerminalFrontend::new(Vec::new());
		let mut notebook = Notebook::new();
		notebook.edit(&CellId::new("form"), "12345");
		notebook.set_output(&CellId::new("form"), Some(json!(["12345", "54321"])));

		frontend.render(&notebook, SessionStatus::Open);

		let out = text(frontend);
		assert!(out.contains("1 cell(s)"));
		assert!(out.contains("12345 54321"));
	}

	#[test]
	fn prompt_publishes_and_dismiss_withdraws() {
		let (mut frontend, pending) = TerminalFrontend::new(Vec::new());
		let confirmation = Confirmation {
			id: ConfirmationId::new(4),
			kind: ConfirmationKind::DownloadUnsaved { then: Transition::Save },
		};

		frontend.prompt(&confirmation);
		assert_eq!(*pending.borrow(), Some(ConfirmationId::new(4)));

		frontend.dismiss(ConfirmationId::new(9));
		assert_eq!(*pending.borrow(), Some(ConfirmationId::new(4)));

		frontend.dismiss(ConfirmationId::new(4));
		assert_eq!(*pending.borrow(), None);

		let out = text(frontend);
		assert!(out.contains("Download unsaved changes?"));
		assert_eq!(out.matches("question withdrawn").count(), 1);
	}

	#[test]
	fn blocking_notice_offers_a_way_out() {
		let (mut frontend, _) = TerminalFrontend::new(Vec::new());
		frontend.notice(&Notice::blocking("The kernel is not available; outputs are read-only."));

		let out = text(frontend);
		assert!(out.contains("outputs are read-only"));
		assert!(out.contains("'new'"));
	}
}
