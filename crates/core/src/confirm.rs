//! Two-step confirmations.
//!
//! A destructive user request first becomes a pending [`Confirmation`]; it
//! only takes effect once the front end answers with the matching id. At most
//! one confirmation is pending, and answers for ids that are no longer
//! pending are ignored.

use std::fmt;

use crate::guard::Transition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConfirmationId(u64);

impl ConfirmationId {
	pub fn new(id: u64) -> Self {
		Self(id)
	}

	pub fn get(self) -> u64 {
		self.0
	}
}

impl fmt::Display for ConfirmationId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationKind {
	RestartKernel,
	/// `unsaved` is set when the notebook had unsaved edits at request time.
	ShutdownKernel { unsaved: bool },
	/// Offer to download unsaved work before `then` happens.
	DownloadUnsaved { then: Transition },
}

impl ConfirmationKind {
	/// Returns true for prompts that need a live kernel to act on.
	pub fn targets_kernel(&self) -> bool {
		matches!(self, ConfirmationKind::RestartKernel | ConfirmationKind::ShutdownKernel { .. })
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
	pub id: ConfirmationId,
	pub kind: ConfirmationKind,
}

impl Confirmation {
	/// Question shown to the user.
	pub fn message(&self) -> String {
		match &self.kind {
			ConfirmationKind::RestartKernel => "Restart the kernel? All outputs and variables will be cleared.".to_string(),
			ConfirmationKind::ShutdownKernel { unsaved: false } => "Shut down the kernel?".to_string(),
			ConfirmationKind::ShutdownKernel { unsaved: true } => "Shut down the kernel? The notebook has unsaved changes.".to_string(),
			ConfirmationKind::DownloadUnsaved { .. } => "Download unsaved changes?".to_string(),
		}
	}
}

/// Result of [`Confirmations::request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requested {
	/// A new prompt must be shown; `replaced` must be dismissed first.
	New {
		confirmation: Confirmation,
		replaced: Option<ConfirmationId>,
	},
	/// The same question is already on screen.
	AlreadyPending(ConfirmationId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
	Confirmed(ConfirmationKind),
	Cancelled(ConfirmationKind),
}

#[derive(Debug, Clone, Default)]
pub struct Confirmations {
	next_id: u64,
	pending: Option<Confirmation>,
}

impl Confirmations {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn pending(&self) -> Option<&Confirmation> {
		self.pending.as_ref()
	}

	pub fn request(&mut self, kind: ConfirmationKind) -> Requested {
		if let Some(existing) = &self.pending {
			if existing.kind == kind {
				return Requested::AlreadyPending(existing.id);
			}
		}
		self.next_id += 1;
		let confirmation = Confirmation {
			id: ConfirmationId(self.next_id),
			kind,
		};
		let replaced = self.pending.replace(confirmation.clone()).map(|c| c.id);
		Requested::New { confirmation, replaced }
	}

	/// Answers the pending confirmation. Stale ids yield `None`.
	pub fn resolve(&mut self, id: ConfirmationId, accepted: bool) -> Option<Resolution> {
		if self.pending.as_ref().map(|c| c.id) != Some(id) {
			tracing::debug!(target = "nb.session", %id, "ignoring answer to stale confirmation");
			return None;
		}
		let confirmation = self.pending.take()?;
		Some(if accepted {
			Resolution::Confirmed(confirmation.kind)
		} else {
			Resolution::Cancelled(confirmation.kind)
		})
	}

	/// Withdraws the pending confirmation, if any.
	pub fn dismiss(&mut self) -> Option<Confirmation> {
		self.pending.take()
	}
}
