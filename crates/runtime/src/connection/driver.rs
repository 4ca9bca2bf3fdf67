//! Async driver for [`ConnectionMachine`].
//!
//! A single task owns the machine, the current [`Channel`] and the identity
//! store. It reacts to one input at a time (a command, an inbound message,
//! an attempt result or a retry timer), so no two transitions ever overlap.

use std::sync::Arc;
use std::time::Duration;

use nb_protocol::{ClientMessage, HandshakeOutcome, ServerMessage, SessionId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{ConnectionMachine, ConnectionState};
use crate::backoff::BackoffPolicy;
use crate::channel::Channel;
use crate::connector::Connector;
use crate::error::{Error, FailureKind, Result};
use crate::identity::SessionIdentityStore;

/// Tuning for a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionOptions {
	pub policy: BackoffPolicy,
	/// Upper bound for opening the transport and receiving `welcome`.
	pub handshake_timeout: Duration,
}

impl Default for ConnectionOptions {
	fn default() -> Self {
		Self {
			policy: BackoffPolicy::default(),
			handshake_timeout: Duration::from_secs(10),
		}
	}
}

/// Requests from the session layer.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionCommand {
	/// Forward a message on the open channel. Dropped (with a warning) when not open.
	Send(ClientMessage),
	/// Explicit connect; supersedes any pending attempt and resets backoff.
	Connect,
	/// Forget the stored session id and connect for a brand new session.
	NewSession,
	/// Abort an in-flight attempt or scheduled retry.
	Cancel,
	/// Close the connection and stop the driver.
	Close,
}

/// Notifications for the session layer, in the order they happened.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
	State(ConnectionState),
	/// Handshake finished. `Resumed` is only reported when the id matches the one requested.
	Established(HandshakeOutcome),
	/// Any server message received while open.
	Message(ServerMessage),
	/// A connection attempt failed and fed the backoff policy.
	Failure { kind: FailureKind, attempt: u32, message: String },
}

/// Cloneable command sender for a running [`Connection`].
#[derive(Debug, Clone)]
pub struct ConnectionCommands {
	tx: mpsc::UnboundedSender<ConnectionCommand>,
}

impl ConnectionCommands {
	pub fn send(&self, command: ConnectionCommand) -> Result<()> {
		self.tx.send(command).map_err(|_| Error::ChannelClosed)
	}

	pub fn send_message(&self, message: ClientMessage) -> Result<()> {
		self.send(ConnectionCommand::Send(message))
	}

	pub fn connect(&self) -> Result<()> {
		self.send(ConnectionCommand::Connect)
	}

	pub fn new_session(&self) -> Result<()> {
		self.send(ConnectionCommand::NewSession)
	}

	pub fn cancel(&self) -> Result<()> {
		self.send(ConnectionCommand::Cancel)
	}

	pub fn close(&self) -> Result<()> {
		self.send(ConnectionCommand::Close)
	}
}

/// Handle to a spawned [`Connection`].
pub struct ConnectionHandle {
	pub commands: ConnectionCommands,
	pub events: mpsc::UnboundedReceiver<ConnectionEvent>,
	pub task: JoinHandle<()>,
}

/// Connection driver. See the module docs.
pub struct Connection {
	machine: ConnectionMachine,
	connector: Arc<dyn Connector>,
	store: Arc<dyn SessionIdentityStore>,
	options: ConnectionOptions,
	channel: Option<Channel>,
	commands_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
	events_tx: mpsc::UnboundedSender<ConnectionEvent>,
}

enum Inbound {
	Message(Option<ServerMessage>),
	Command(Option<ConnectionCommand>),
}

type AttemptResult = Result<(Channel, HandshakeOutcome)>;

impl Connection {
	/// Spawns the driver in the [`ConnectionState::Idle`] state.
	///
	/// Nothing happens until [`ConnectionCommand::Connect`] is sent.
	pub fn spawn(connector: Arc<dyn Connector>, store: Arc<dyn SessionIdentityStore>, options: ConnectionOptions) -> ConnectionHandle {
		let (commands_tx, commands_rx) = mpsc::unbounded_channel();
		let (events_tx, events) = mpsc::unbounded_channel();

		let connection = Self {
			machine: ConnectionMachine::new(options.policy),
			connector,
			store,
			options,
			channel: None,
			commands_rx,
			events_tx,
		};
		let task = tokio::spawn(connection.run());

		ConnectionHandle {
			commands: ConnectionCommands { tx: commands_tx },
			events,
			task,
		}
	}

	async fn run(mut self) {
		tracing::debug!(target = "nb.connection", endpoint = self.connector.endpoint(), "connection driver started");
		loop {
			let keep_running = match self.machine.state().clone() {
				ConnectionState::Open => self.pump().await,
				ConnectionState::Connecting { attempt } => self.attempt(attempt).await,
				ConnectionState::Reconnecting { delay, .. } => self.wait_retry(delay).await,
				ConnectionState::Idle | ConnectionState::KernelNotFound | ConnectionState::Closed { .. } => self.wait_for_command().await,
			};
			if !keep_running {
				break;
			}
		}
		self.channel = None;
		tracing::debug!(target = "nb.connection", "connection driver stopped");
	}

	fn emit(&self, event: ConnectionEvent) {
		let _ = self.events_tx.send(event);
	}

	fn emit_state(&self) {
		tracing::debug!(target = "nb.connection", state = %self.machine.state(), "connection state changed");
		self.emit(ConnectionEvent::State(self.machine.state().clone()));
	}

	/// Handles commands that behave the same in every non-open state.
	///
	/// Returns `None` when the command was not one of those.
	fn handle_common_command(&mut self, command: Option<ConnectionCommand>) -> Option<bool> {
		match command {
			None => Some(false),
			Some(ConnectionCommand::Connect) => {
				if self.machine.request_connect() {
					tracing::debug!(target = "nb.connection", "explicit connect superseded pending attempt");
				}
				self.emit_state();
				Some(true)
			}
			Some(ConnectionCommand::NewSession) => {
				self.channel = None;
				if let Err(e) = self.store.clear() {
					tracing::warn!(target = "nb.connection", error = %e, "failed to clear stored session id");
				}
				self.machine.request_connect();
				self.emit_state();
				Some(true)
			}
			Some(ConnectionCommand::Close) => {
				self.channel = None;
				self.machine.close();
				self.emit_state();
				Some(false)
			}
			Some(ConnectionCommand::Send(message)) => {
				tracing::warn!(target = "nb.connection", state = %self.machine.state(), ?message, "dropping message while not connected");
				Some(true)
			}
			Some(ConnectionCommand::Cancel) => None,
		}
	}

	async fn wait_for_command(&mut self) -> bool {
		let command = self.commands_rx.recv().await;
		self.handle_common_command(command).unwrap_or(true)
	}

	async fn wait_retry(&mut self, delay: Duration) -> bool {
		tokio::select! {
			_ = tokio::time::sleep(delay) => {
				if let Err(e) = self.machine.on_retry_elapsed() {
					tracing::warn!(target = "nb.connection", error = %e, "retry timer fired in unexpected state");
				}
				self.emit_state();
				true
			}
			command = self.commands_rx.recv() => {
				match self.handle_common_command(command) {
					Some(keep_running) => keep_running,
					None => {
						self.machine.cancel();
						self.emit_state();
						true
					}
				}
			}
		}
	}

	async fn attempt(&mut self, attempt: u32) -> bool {
		let requested = self.store.get();
		tracing::debug!(target = "nb.connection", attempt, session = ?requested, "connection attempt");

		let connector = Arc::clone(&self.connector);
		let timeout = self.options.handshake_timeout;
		let session_id = requested.clone();
		let pending = async move {
			let handshake = async {
				let parts = connector.connect(session_id.as_ref()).await?;
				let mut channel = Channel::open(parts, session_id.clone());
				let outcome = channel.handshake().await?;
				Ok::<_, Error>((channel, outcome))
			};
			match tokio::time::timeout(timeout, handshake).await {
				Ok(result) => result,
				Err(_) => Err(Error::HandshakeTimeout(timeout)),
			}
		};
		tokio::pin!(pending);

		loop {
			tokio::select! {
				result = &mut pending => {
					self.finish_attempt(attempt, requested.as_ref(), result);
					return true;
				}
				command = self.commands_rx.recv() => {
					match self.handle_common_command(command) {
						Some(keep_running) => return keep_running,
						None => {
							self.machine.cancel();
							self.emit_state();
							return true;
						}
					}
				}
			}
		}
	}

	fn finish_attempt(&mut self, attempt: u32, requested: Option<&SessionId>, result: AttemptResult) {
		match result {
			Ok((channel, outcome)) => {
				let outcome = normalize_outcome(requested, outcome);
				if let Err(e) = self.machine.on_handshake(&outcome) {
					tracing::warn!(target = "nb.connection", error = %e, "handshake in unexpected state");
					return;
				}
				match &outcome {
					HandshakeOutcome::Created { session_id } | HandshakeOutcome::Resumed { session_id, .. } => {
						if let Err(e) = self.store.set(session_id) {
							tracing::warn!(target = "nb.connection", error = %e, "failed to persist session id");
						}
						self.channel = Some(channel);
					}
					HandshakeOutcome::KernelNotFound { session_id } => {
						tracing::info!(target = "nb.connection", session = %session_id, "kernel for session no longer exists");
					}
				}
				tracing::info!(target = "nb.connection", attempt, session = %outcome.session_id(), "handshake complete");
				self.emit(ConnectionEvent::Established(outcome));
				self.emit_state();
			}
			Err(e) => {
				let kind = e.failure_kind();
				tracing::debug!(target = "nb.connection", attempt, error = %e, "connection attempt failed");
				if let Err(err) = self.machine.on_attempt_failed(kind) {
					tracing::warn!(target = "nb.connection", error = %err, "attempt failure in unexpected state");
					return;
				}
				self.emit(ConnectionEvent::Failure {
					kind,
					attempt,
					message: e.to_string(),
				});
				self.emit_state();
			}
		}
	}

	async fn pump(&mut self) -> bool {
		let Some(channel) = self.channel.as_mut() else {
			tracing::warn!(target = "nb.connection", "open state without a channel");
			let _ = self.machine.on_channel_lost();
			self.emit_state();
			return true;
		};

		let inbound = tokio::select! {
			message = channel.recv() => Inbound::Message(message),
			command = self.commands_rx.recv() => Inbound::Command(command),
		};

		match inbound {
			Inbound::Message(Some(message)) => {
				let terminal = matches!(&message, ServerMessage::Lifecycle { event } if event.is_terminal());
				self.emit(ConnectionEvent::Message(message));
				if terminal {
					self.channel = None;
					self.machine.on_kernel_gone();
					self.emit_state();
				}
				true
			}
			Inbound::Message(None) => {
				let session = self.channel.take().and_then(|c| c.session_id().cloned());
				tracing::info!(target = "nb.connection", session = ?session, "channel closed unexpectedly");
				let _ = self.machine.on_channel_lost();
				self.emit_state();
				true
			}
			Inbound::Command(Some(ConnectionCommand::Send(message))) => {
				if let Some(channel) = self.channel.as_ref() {
					if let Err(e) = channel.send(&message) {
						tracing::debug!(target = "nb.connection", error = %e, "send on closing channel");
					}
				}
				true
			}
			Inbound::Command(Some(ConnectionCommand::Cancel)) => true,
			Inbound::Command(Some(ConnectionCommand::Connect)) => {
				tracing::debug!(target = "nb.connection", "connect requested while already open");
				true
			}
			Inbound::Command(command) => self.handle_common_command(command).unwrap_or(true),
		}
	}
}

/// A `resumed` answer only counts when it resumes the id we asked for.
fn normalize_outcome(requested: Option<&SessionId>, outcome: HandshakeOutcome) -> HandshakeOutcome {
	match outcome {
		HandshakeOutcome::Resumed { session_id, snapshot } => {
			if requested == Some(&session_id) {
				HandshakeOutcome::Resumed { session_id, snapshot }
			} else {
				tracing::debug!(target = "nb.connection", requested = ?requested, got = %session_id, "resume for a different id treated as new session");
				HandshakeOutcome::Created { session_id }
			}
		}
		other => other,
	}
}
