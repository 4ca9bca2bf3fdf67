//! Unsaved-changes guard.
//!
//! Dirtiness is a pair of revision counters: every edit bumps the edit
//! revision, and a save only advances the saved revision once the kernel host
//! confirms it persisted exactly that revision. Sending a save never clears
//! anything, and nothing here ever discards edits.

use std::collections::BTreeSet;

use nb_protocol::CellId;

use crate::error::{Result, SessionError};

/// A destructive transition the guard is consulted about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
	/// Stop the kernel.
	Shutdown,
	/// Leave the notebook.
	Navigate(String),
	/// Drop the current session and start a fresh one.
	NewSession,
	/// Save while the kernel is gone; the only way out is a download.
	Save,
}

/// An in-flight save request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveTicket {
	pub request_id: u64,
	/// Edit revision the save covers.
	pub revision: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnsavedChangesGuard {
	edit_revision: u64,
	saved_revision: u64,
	next_request_id: u64,
	in_flight: Option<SaveTicket>,
	pending_edits: BTreeSet<CellId>,
}

impl UnsavedChangesGuard {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn is_dirty(&self) -> bool {
		self.edit_revision != self.saved_revision
	}

	/// Cells edited since the last confirmed save.
	pub fn pending_edits(&self) -> &BTreeSet<CellId> {
		&self.pending_edits
	}

	pub fn revision(&self) -> u64 {
		self.edit_revision
	}

	pub fn record_edit(&mut self, cell: &CellId) {
		self.edit_revision += 1;
		self.pending_edits.insert(cell.clone());
	}

	/// Starts a save of the current revision. A previous in-flight save is superseded.
	pub fn begin_save(&mut self) -> SaveTicket {
		self.next_request_id += 1;
		let ticket = SaveTicket {
			request_id: self.next_request_id,
			revision: self.edit_revision,
		};
		self.in_flight = Some(ticket);
		ticket
	}

	/// The kernel host persisted the save `request_id`.
	///
	/// Returns false for unknown or superseded requests. Edits made after the
	/// save began keep the notebook dirty.
	pub fn confirm_save(&mut self, request_id: u64) -> bool {
		let Some(ticket) = self.in_flight.filter(|t| t.request_id == request_id) else {
			return false;
		};
		self.in_flight = None;
		self.saved_revision = ticket.revision;
		if !self.is_dirty() {
			self.pending_edits.clear();
		}
		true
	}

	pub fn fail_save(&mut self, request_id: u64) -> bool {
		if self.in_flight.is_some_and(|t| t.request_id == request_id) {
			self.in_flight = None;
			true
		} else {
			false
		}
	}

	/// Synchronous check before a destructive transition.
	pub fn check(&self, transition: &Transition) -> Result<()> {
		if self.is_dirty() {
			tracing::debug!(target = "nb.session", ?transition, edits = self.pending_edits.len(), "transition blocked by unsaved changes");
			Err(SessionError::SaveConflict)
		} else {
			Ok(())
		}
	}

	/// The user downloaded the unsaved work; nothing is at risk anymore.
	pub fn confirm_export(&mut self) {
		self.saved_revision = self.edit_revision;
		self.in_flight = None;
		self.pending_edits.clear();
	}

	/// Restores dirtiness reported by the kernel host for a resumed session.
	pub fn restore(&mut self, dirty: bool, cells: impl IntoIterator<Item = CellId>) {
		self.in_flight = None;
		self.pending_edits.clear();
		if dirty {
			self.edit_revision = self.saved_revision + 1;
			self.pending_edits.extend(cells);
		} else {
			self.saved_revision = self.edit_revision;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn cell(id: &str) -> CellId {
		CellId::new(id)
	}

	#[test]
	fn edit_makes_dirty_immediately() {
		let mut guard = UnsavedChangesGuard::new();
		assert!(!guard.is_dirty());
		guard.record_edit(&cell("a"));
		assert!(guard.is_dirty());
		assert!(guard.pending_edits().contains(&cell("a")));
	}

	#[test]
	fn sending_a_save_does_not_clear() {
		let mut guard = UnsavedChangesGuard::new();
		guard.record_edit(&cell("a"));
		guard.begin_save();
		assert!(guard.is_dirty());
	}

	#[test]
	fn confirmed_save_clears() {
		let mut guard = UnsavedChangesGuard::new();
		guard.record_edit(&cell("a"));
		let ticket = guard.begin_save();
		assert!(guard.confirm_save(ticket.request_id));
		assert!(!guard.is_dirty());
		assert!(guard.pending_edits().is_empty());
	}

	#[test]
	fn edit_during_save_stays_dirty() {
		let mut guard = UnsavedChangesGuard::new();
		guard.record_edit(&cell("a"));
		let ticket = guard.begin_save();
		guard.record_edit(&cell("b"));
		assert!(guard.confirm_save(ticket.request_id));
		assert!(guard.is_dirty());
	}

	#[test]
	fn failed_or_stale_saves_keep_dirty() {
		let mut guard = UnsavedChangesGuard::new();
		guard.record_edit(&cell("a"));
		let first = guard.begin_save();
		let second = guard.begin_save();
		assert!(!guard.confirm_save(first.request_id));
		assert!(guard.fail_save(second.request_id));
		assert!(!guard.confirm_save(second.request_id));
		assert!(guard.is_dirty());
	}

	#[test]
	fn check_blocks_only_when_dirty() {
		let mut guard = UnsavedChangesGuard::new();
		assert!(guard.check(&Transition::Navigate("/".into())).is_ok());
		guard.record_edit(&cell("a"));
		assert!(matches!(guard.check(&Transition::Shutdown), Err(SessionError::SaveConflict)));
		assert!(guard.is_dirty());
	}

	#[test]
	fn export_clears() {
		let mut guard = UnsavedChangesGuard::new();
		guard.record_edit(&cell("a"));
		guard.confirm_export();
		assert!(!guard.is_dirty());
	}

	#[test]
	fn restore_reapplies_dirtiness() {
		let mut guard = UnsavedChangesGuard::new();
		guard.restore(true, [cell("a")]);
		assert!(guard.is_dirty());
		guard.restore(false, []);
		assert!(!guard.is_dirty());
	}
}
