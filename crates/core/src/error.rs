//! Session-level errors.
//!
//! Runtime failures are translated into these variants before they reach the
//! controller or a front end.

use nb_protocol::SessionId;
use nb_runtime::FailureKind;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(Debug, Error)]
pub enum SessionError {
	/// Retryable network problem.
	#[error("Network error: {0}")]
	TransientNetwork(String),

	/// The session id is known but its kernel process is gone.
	#[error("Kernel for session {0} no longer exists")]
	KernelNotFound(SessionId),

	#[error("Kernel did not answer the handshake in time")]
	HandshakeTimeout,

	#[error("Cancelled by user")]
	UserCancelled,

	/// A destructive transition was attempted with unsaved edits.
	#[error("Notebook has unsaved changes")]
	SaveConflict,

	#[error("Connection task stopped")]
	Disconnected,

	#[error("Export failed: {0}")]
	Export(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl SessionError {
	/// Builds the error reported for a failed connection attempt.
	pub fn from_failure(kind: FailureKind, message: impl Into<String>) -> Self {
		match kind {
			FailureKind::Transient => SessionError::TransientNetwork(message.into()),
			FailureKind::HandshakeTimeout => SessionError::HandshakeTimeout,
		}
	}

	pub fn is_retryable(&self) -> bool {
		matches!(self, SessionError::TransientNetwork(_) | SessionError::HandshakeTimeout)
	}

	/// Wording for the user. Carries no transport detail; log the error itself for that.
	pub fn summary(&self) -> &'static str {
		match self {
			SessionError::TransientNetwork(_) => "Cannot reach the kernel host",
			SessionError::KernelNotFound(_) => "The kernel for this session no longer exists",
			SessionError::HandshakeTimeout => "The kernel host did not answer in time",
			SessionError::UserCancelled => "Cancelled",
			SessionError::SaveConflict => "The notebook has unsaved changes",
			SessionError::Disconnected => "Lost the connection to the kernel host",
			SessionError::Export(_) => "Could not write the download",
			SessionError::Json(_) => "The kernel host sent an unreadable message",
		}
	}
}

impl From<nb_runtime::Error> for SessionError {
	fn from(err: nb_runtime::Error) -> Self {
		match err {
			nb_runtime::Error::ChannelClosed => SessionError::Disconnected,
			nb_runtime::Error::Json(e) => SessionError::Json(e),
			other => SessionError::from_failure(other.failure_kind(), other.to_string()),
		}
	}
}
