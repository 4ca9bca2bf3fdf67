//! Client and server message envelopes.
//!
//! The exchange on every connection attempt is:
//!
//! 1. Client sends [`ClientMessage::Hello`] with the session id it believes is active (if any)
//! 2. Server responds with [`ServerMessage::Welcome`] carrying a [`HandshakeOutcome`]
//! 3. Both sides exchange cell traffic, control commands, saves and lifecycle events
//!
//! # Main Types
//!
//! - [`ClientMessage`] - Messages from the notebook client to the kernel host
//! - [`ServerMessage`] - Messages from the kernel host to the notebook client

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::notebook::NotebookSnapshot;
use crate::session::{CellId, ControlCommand, HandshakeOutcome, KernelLifecycleEvent, SessionId};

/// Protocol revision sent in the handshake.
pub const PROTOCOL_VERSION: u32 = 1;

/// Message sent from the notebook client to the kernel host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
	/// Opens a session. Absent `session_id` requests a new session.
	Hello {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		session_id: Option<SessionId>,
		protocol: u32,
	},
	/// Kernel control command, only sent after explicit user confirmation.
	Control { request_id: u64, command: ControlCommand },
	/// Persist the notebook at the given edit revision.
	Save {
		request_id: u64,
		revision: u64,
		notebook: NotebookSnapshot,
	},
	/// Opaque cell traffic (edits, run requests, form values).
	Cell { cell_id: CellId, payload: Value },
}

impl ClientMessage {
	pub fn hello(session_id: Option<SessionId>) -> Self {
		ClientMessage::Hello {
			session_id,
			protocol: PROTOCOL_VERSION,
		}
	}
}

/// Message sent from the kernel host to the notebook client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
	/// Handshake response.
	Welcome { outcome: HandshakeOutcome },
	/// Kernel lifecycle change.
	Lifecycle { event: KernelLifecycleEvent },
	/// Acknowledgement of a [`ClientMessage::Save`].
	SaveResult {
		request_id: u64,
		ok: bool,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		message: Option<String>,
	},
	/// Opaque cell traffic (rendered outputs).
	Cell { cell_id: CellId, payload: Value },
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn hello_serializes_with_type_tag() {
		let msg = ClientMessage::hello(Some(SessionId::new("abc")));
		let json = serde_json::to_string(&msg).unwrap();
		assert!(json.contains(r#""type":"hello""#));
		assert!(json.contains(r#""session_id":"abc""#));
		assert!(json.contains(r#""protocol":1"#));
	}

	#[test]
	fn hello_without_session_omits_field() {
		let json = serde_json::to_value(ClientMessage::hello(None)).unwrap();
		assert!(json.get("session_id").is_none());
	}

	#[test]
	fn welcome_parses_nested_outcome() {
		let json = r#"{"type":"welcome","outcome":{"kind":"created","session_id":"s1"}}"#;
		let msg: ServerMessage = serde_json::from_str(json).unwrap();
		assert_eq!(
			msg,
			ServerMessage::Welcome {
				outcome: HandshakeOutcome::Created {
					session_id: SessionId::new("s1"),
				},
			}
		);
	}

	#[test]
	fn lifecycle_parses_snake_case_event() {
		let msg: ServerMessage = serde_json::from_str(r#"{"type":"lifecycle","event":"not_found"}"#).unwrap();
		assert_eq!(
			msg,
			ServerMessage::Lifecycle {
				event: KernelLifecycleEvent::NotFound,
			}
		);
	}

	#[test]
	fn control_carries_command() {
		let msg = ClientMessage::Control {
			request_id: 7,
			command: ControlCommand::Restart,
		};
		let json = serde_json::to_value(&msg).unwrap();
		assert_eq!(json["type"], "control");
		assert_eq!(json["command"], "restart");
		assert_eq!(json["request_id"], 7);
	}
}
