//! Error types for the kernel runtime.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur below the session layer.
#[derive(Debug, Error)]
pub enum Error {
	/// Failed to open a connection to the kernel host.
	#[error("Failed to connect to kernel host: {0}")]
	ConnectionFailed(String),

	/// Transport-level error (framing, socket I/O).
	#[error("Transport error: {0}")]
	TransportError(String),

	/// Protocol-level error (unexpected or malformed message).
	#[error("Protocol error: {0}")]
	ProtocolError(String),

	/// No handshake response arrived in time.
	#[error("Handshake timed out after {}ms", .0.as_millis())]
	HandshakeTimeout(Duration),

	/// Channel closed unexpectedly.
	#[error("Channel closed unexpectedly")]
	ChannelClosed,

	/// A state machine input arrived in a state that cannot accept it.
	#[error("Invalid connection state: {0}")]
	InvalidState(String),

	/// Invalid argument provided to a constructor.
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),

	/// I/O error.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

/// Classification of a failed connection attempt, as fed to the backoff policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
	/// Network-level failure; retried with backoff.
	Transient,
	/// Handshake did not complete in time; retried like a transient failure.
	HandshakeTimeout,
}

impl Error {
	/// Classifies this error for reconnect purposes.
	///
	/// Every runtime error is retryable; only the handshake timeout is
	/// reported separately so it can be surfaced with its own wording.
	pub fn failure_kind(&self) -> FailureKind {
		match self {
			Error::HandshakeTimeout(_) => FailureKind::HandshakeTimeout,
			_ => FailureKind::Transient,
		}
	}
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
	fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
		use tokio_tungstenite::tungstenite::Error as WsError;
		match err {
			WsError::ConnectionClosed | WsError::AlreadyClosed => Error::ChannelClosed,
			WsError::Io(io) => Error::Io(io),
			other => Error::TransportError(other.to_string()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn handshake_timeout_is_classified_separately() {
		let err = Error::HandshakeTimeout(Duration::from_millis(1500));
		assert_eq!(err.failure_kind(), FailureKind::HandshakeTimeout);
		assert_eq!(err.to_string(), "Handshake timed out after 1500ms");
	}

	#[test]
	fn other_errors_are_transient() {
		assert_eq!(Error::ChannelClosed.failure_kind(), FailureKind::Transient);
		assert_eq!(Error::ConnectionFailed("refused".into()).failure_kind(), FailureKind::Transient);
	}
}
