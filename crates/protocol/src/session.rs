//! Session identity, handshake outcomes and kernel lifecycle events.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::notebook::NotebookSnapshot;

/// Opaque identifier of a kernel session.
///
/// Assigned by the kernel host when a session is created and echoed back by
/// the client on every reconnect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for SessionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for SessionId {
	fn from(value: &str) -> Self {
		Self(value.to_string())
	}
}

impl From<String> for SessionId {
	fn from(value: String) -> Self {
		Self(value)
	}
}

/// Identifier of a notebook cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellId(String);

impl CellId {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for CellId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for CellId {
	fn from(value: &str) -> Self {
		Self(value.to_string())
	}
}

/// Result of a handshake, as reported by the kernel host.
///
/// The three variants are deliberately distinct: a fresh session, a resumed
/// live session, and a known identifier whose kernel process is gone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HandshakeOutcome {
	/// A new session was created (no identifier was sent, or it was unknown).
	Created { session_id: SessionId },
	/// The identifier matched a session whose kernel is still alive.
	Resumed {
		session_id: SessionId,
		/// Server-side replay of the notebook as the kernel last saw it.
		#[serde(default, skip_serializing_if = "Option::is_none")]
		snapshot: Option<NotebookSnapshot>,
	},
	/// The identifier is known but its kernel process no longer exists.
	KernelNotFound { session_id: SessionId },
}

impl HandshakeOutcome {
	pub fn session_id(&self) -> &SessionId {
		match self {
			HandshakeOutcome::Created { session_id }
			| HandshakeOutcome::Resumed { session_id, .. }
			| HandshakeOutcome::KernelNotFound { session_id } => session_id,
		}
	}
}

/// Discrete lifecycle signal from the kernel-hosting side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelLifecycleEvent {
	/// The session reconnected to a still-live kernel.
	Resumed,
	/// The kernel was restarted; execution state is gone, the session is not.
	Restarted,
	/// The kernel process was intentionally stopped.
	Shutdown,
	/// The kernel process backing the session no longer exists.
	NotFound,
}

impl KernelLifecycleEvent {
	/// Returns true if the event leaves the session without a kernel.
	pub fn is_terminal(self) -> bool {
		matches!(self, KernelLifecycleEvent::Shutdown | KernelLifecycleEvent::NotFound)
	}
}

/// User-initiated control command for the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlCommand {
	Restart,
	Shutdown,
}

impl fmt::Display for ControlCommand {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ControlCommand::Restart => f.write_str("restart"),
			ControlCommand::Shutdown => f.write_str("shutdown"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn session_id_serializes_as_plain_string() {
		let id = SessionId::new("s-42");
		assert_eq!(serde_json::to_string(&id).unwrap(), r#""s-42""#);
	}

	#[test]
	fn handshake_outcome_uses_kind_tag() {
		let outcome = HandshakeOutcome::KernelNotFound {
			session_id: SessionId::new("s-1"),
		};
		let json = serde_json::to_value(&outcome).unwrap();
		assert_eq!(json["kind"], "kernel_not_found");
		assert_eq!(json["session_id"], "s-1");
	}

	#[test]
	fn resumed_without_snapshot_parses() {
		let outcome: HandshakeOutcome = serde_json::from_str(r#"{"kind":"resumed","session_id":"abc"}"#).unwrap();
		assert_eq!(
			outcome,
			HandshakeOutcome::Resumed {
				session_id: SessionId::new("abc"),
				snapshot: None,
			}
		);
		assert_eq!(outcome.session_id().as_str(), "abc");
	}

	#[test]
	fn only_shutdown_and_not_found_are_terminal() {
		assert!(KernelLifecycleEvent::Shutdown.is_terminal());
		assert!(KernelLifecycleEvent::NotFound.is_terminal());
		assert!(!KernelLifecycleEvent::Resumed.is_terminal());
		assert!(!KernelLifecycleEvent::Restarted.is_terminal());
	}
}
