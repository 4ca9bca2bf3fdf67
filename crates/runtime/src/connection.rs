//! Connection state machine.
//!
//! This module owns the reconnect policy and the connectivity status reported
//! to the session layer. The transition logic lives in the synchronous
//! [`ConnectionMachine`]; [`Connection`] drives it from real transports.
//!
//! # States
//!
//! ```text
//! Idle ──connect──▶ Connecting ──welcome──▶ Open ──lost──▶ Reconnecting
//!                     │   ▲                   │                 │
//!                     │   └───── retry ───────┼─────────────────┘
//!                     │                       │
//!                     ├─ kernel_not_found ────┴─ shutdown ──▶ KernelNotFound
//!                     └─ exhausted ──▶ Closed
//! ```
//!
//! `KernelNotFound` is never retried automatically; only an explicit connect
//! or new-session request leaves it.

use std::fmt;
use std::time::{Duration, Instant};

use nb_protocol::HandshakeOutcome;

use crate::backoff::BackoffPolicy;
use crate::error::{Error, FailureKind, Result};

mod driver;

pub use driver::{Connection, ConnectionCommand, ConnectionCommands, ConnectionEvent, ConnectionHandle, ConnectionOptions};

/// Why the connection ended up in [`ConnectionState::Closed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
	/// Explicit close (user shutdown of the client, navigation).
	User,
	/// An in-flight attempt was cancelled.
	Cancelled,
	/// The backoff policy ran out of attempts.
	Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
	Idle,
	Connecting { attempt: u32 },
	Open,
	Reconnecting { attempt: u32, delay: Duration },
	KernelNotFound,
	Closed { reason: CloseReason },
}

impl ConnectionState {
	/// Returns true if no further transition happens without an explicit request.
	pub fn is_terminal(&self) -> bool {
		matches!(self, ConnectionState::KernelNotFound | ConnectionState::Closed { .. })
	}
}

impl fmt::Display for ConnectionState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ConnectionState::Idle => f.write_str("idle"),
			ConnectionState::Connecting { attempt } => write!(f, "connecting (attempt {attempt})"),
			ConnectionState::Open => f.write_str("open"),
			ConnectionState::Reconnecting { attempt, delay } => {
				write!(f, "reconnecting (attempt {attempt} in {}ms)", delay.as_millis())
			}
			ConnectionState::KernelNotFound => f.write_str("kernel not found"),
			ConnectionState::Closed { reason } => write!(f, "closed ({reason:?})"),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
	Pending,
	Success,
	Failure(FailureKind),
}

/// Bookkeeping for the attempt currently in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionAttempt {
	pub attempt_number: u32,
	pub started_at: Instant,
	pub outcome: AttemptOutcome,
}

/// Pure connection state machine.
///
/// Every input is applied atomically; inputs that make no sense in the
/// current state are rejected with [`Error::InvalidState`] and leave the
/// machine untouched.
#[derive(Debug, Clone)]
pub struct ConnectionMachine {
	state: ConnectionState,
	policy: BackoffPolicy,
	attempt: Option<ConnectionAttempt>,
}

impl ConnectionMachine {
	pub fn new(policy: BackoffPolicy) -> Self {
		Self {
			state: ConnectionState::Idle,
			policy,
			attempt: None,
		}
	}

	pub fn state(&self) -> &ConnectionState {
		&self.state
	}

	pub fn policy(&self) -> &BackoffPolicy {
		&self.policy
	}

	/// The attempt in flight, if any.
	pub fn attempt(&self) -> Option<&ConnectionAttempt> {
		self.attempt.as_ref().filter(|a| a.outcome == AttemptOutcome::Pending)
	}

	/// Explicit connect request.
	///
	/// Always starts over at attempt 1 with a fresh backoff sequence. A
	/// pending attempt or scheduled retry is superseded; the return value
	/// says whether that happened.
	pub fn request_connect(&mut self) -> bool {
		let superseded = matches!(self.state, ConnectionState::Connecting { .. } | ConnectionState::Reconnecting { .. });
		self.start_attempt(1);
		superseded
	}

	/// The retry delay elapsed; begin the scheduled attempt.
	pub fn on_retry_elapsed(&mut self) -> Result<u32> {
		match self.state {
			ConnectionState::Reconnecting { attempt, .. } => {
				self.start_attempt(attempt);
				Ok(attempt)
			}
			ref other => Err(Error::InvalidState(format!("retry elapsed while {other}"))),
		}
	}

	/// The kernel host answered the handshake.
	pub fn on_handshake(&mut self, outcome: &HandshakeOutcome) -> Result<()> {
		if !matches!(self.state, ConnectionState::Connecting { .. }) {
			return Err(Error::InvalidState(format!("handshake completed while {}", self.state)));
		}
		self.finish_attempt(AttemptOutcome::Success);
		self.state = match outcome {
			HandshakeOutcome::Created { .. } | HandshakeOutcome::Resumed { .. } => ConnectionState::Open,
			HandshakeOutcome::KernelNotFound { .. } => ConnectionState::KernelNotFound,
		};
		Ok(())
	}

	/// The attempt in flight failed; schedule a retry or give up.
	pub fn on_attempt_failed(&mut self, kind: FailureKind) -> Result<&ConnectionState> {
		let ConnectionState::Connecting { attempt } = self.state else {
			return Err(Error::InvalidState(format!("attempt failed while {}", self.state)));
		};
		self.finish_attempt(AttemptOutcome::Failure(kind));
		self.state = self.retry_state(attempt + 1);
		Ok(&self.state)
	}

	/// The open channel errored or closed unexpectedly.
	pub fn on_channel_lost(&mut self) -> Result<&ConnectionState> {
		if self.state != ConnectionState::Open {
			return Err(Error::InvalidState(format!("channel lost while {}", self.state)));
		}
		self.state = self.retry_state(1);
		Ok(&self.state)
	}

	/// The kernel process is gone (shutdown or not-found event).
	pub fn on_kernel_gone(&mut self) {
		self.attempt = None;
		self.state = ConnectionState::KernelNotFound;
	}

	/// Abandons any in-flight attempt or scheduled retry.
	///
	/// Returns false when there was nothing to cancel.
	pub fn cancel(&mut self) -> bool {
		if !matches!(self.state, ConnectionState::Connecting { .. } | ConnectionState::Reconnecting { .. }) {
			return false;
		}
		self.attempt = None;
		self.state = ConnectionState::Closed {
			reason: CloseReason::Cancelled,
		};
		true
	}

	pub fn close(&mut self) {
		self.attempt = None;
		self.state = ConnectionState::Closed { reason: CloseReason::User };
	}

	fn start_attempt(&mut self, attempt_number: u32) {
		self.attempt = Some(ConnectionAttempt {
			attempt_number,
			started_at: Instant::now(),
			outcome: AttemptOutcome::Pending,
		});
		self.state = ConnectionState::Connecting { attempt: attempt_number };
	}

	fn finish_attempt(&mut self, outcome: AttemptOutcome) {
		if let Some(attempt) = self.attempt.as_mut() {
			if attempt.outcome == AttemptOutcome::Pending {
				attempt.outcome = outcome;
			}
		}
	}

	fn retry_state(&self, next_attempt: u32) -> ConnectionState {
		match self.policy.delay_for(next_attempt) {
			Some(delay) => ConnectionState::Reconnecting {
				attempt: next_attempt,
				delay,
			},
			None => ConnectionState::Closed {
				reason: CloseReason::Exhausted,
			},
		}
	}
}
