//! Async notebook client.
//!
//! [`NotebookClient::start`] spawns a connection driver and a client task.
//! The client task owns the [`SessionController`] and feeds it connection
//! events and user actions strictly one at a time, then carries out the
//! resulting effects against the connection and the [`Frontend`].

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use nb_protocol::CellId;
use nb_runtime::{Connection, ConnectionCommands, ConnectionEvent, ConnectionHandle, ConnectionOptions, Connector, SessionIdentityStore};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::confirm::{Confirmation, ConfirmationId};
use crate::controller::{ControllerOptions, Effect, Notice, SessionController, SessionStatus};
use crate::document::Notebook;
use crate::error::{Result, SessionError};
use crate::export::{ExportFormat, write_export};

#[cfg(test)]
mod tests;

/// Presentation boundary.
///
/// Calls happen on the client task; implementations must not block on user
/// input. Answers to prompts come back as [`UserAction::Confirm`].
pub trait Frontend: Send + 'static {
	fn render(&mut self, notebook: &Notebook, status: SessionStatus);
	fn prompt(&mut self, confirmation: &Confirmation);
	fn dismiss(&mut self, id: ConfirmationId);
	fn notice(&mut self, notice: &Notice);
	fn navigate(&mut self, url: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
	Edit { cell: CellId, code: String },
	Run(CellId),
	Save,
	Restart,
	Shutdown,
	Confirm { id: ConfirmationId, accepted: bool },
	Connect,
	NewSession,
	Cancel,
	Navigate(String),
	Quit,
}

#[derive(Debug, Clone)]
pub struct ClientOptions {
	pub connection: ConnectionOptions,
	pub controller: ControllerOptions,
	/// Where "Download unsaved changes" writes files.
	pub export_dir: PathBuf,
	pub export_format: ExportFormat,
}

impl Default for ClientOptions {
	fn default() -> Self {
		Self {
			connection: ConnectionOptions::default(),
			controller: ControllerOptions::default(),
			export_dir: std::env::temp_dir().join("nb-exports"),
			export_format: ExportFormat::default(),
		}
	}
}

/// Cloneable sender for [`UserAction`]s.
#[derive(Debug, Clone)]
pub struct UserActions {
	tx: mpsc::UnboundedSender<UserAction>,
}

impl UserActions {
	pub fn send(&self, action: UserAction) -> Result<()> {
		self.tx.send(action).map_err(|_| SessionError::Disconnected)
	}
}

pub struct NotebookClient {
	actions: UserActions,
	status: watch::Receiver<SessionStatus>,
	dirty: watch::Receiver<bool>,
	task: JoinHandle<()>,
}

impl NotebookClient {
	/// Spawns the connection driver and the client task, and connects.
	pub fn start<F: Frontend>(connector: Arc<dyn Connector>, store: Arc<dyn SessionIdentityStore>, options: ClientOptions, frontend: F) -> Self {
		let connection = Connection::spawn(connector, store, options.connection);
		let (actions_tx, actions_rx) = mpsc::unbounded_channel();
		let (status_tx, status) = watch::channel(SessionStatus::Connecting);
		let (dirty_tx, dirty) = watch::channel(false);

		let client = ClientLoop {
			controller: SessionController::new(ControllerOptions {
				reconnect: options.connection.policy,
				..options.controller
			}),
			connection,
			actions_rx,
			frontend,
			status_tx,
			dirty_tx,
			export_dir: options.export_dir,
			export_format: options.export_format,
		};
		let task = tokio::spawn(client.run());

		Self {
			actions: UserActions { tx: actions_tx },
			status,
			dirty,
			task,
		}
	}

	pub fn actions(&self) -> UserActions {
		self.actions.clone()
	}

	pub fn send(&self, action: UserAction) -> Result<()> {
		self.actions.send(action)
	}

	/// Status as last shown to the user.
	pub fn status(&self) -> watch::Receiver<SessionStatus> {
		self.status.clone()
	}

	pub fn dirty(&self) -> watch::Receiver<bool> {
		self.dirty.clone()
	}

	/// Waits until the visible status equals `want`.
	pub async fn wait_for_status(&self, want: SessionStatus) -> Result<()> {
		let mut status = self.status.clone();
		status.wait_for(|s| *s == want).await.map(|_| ()).map_err(|_| SessionError::Disconnected)
	}

	/// Waits for the client task to finish (after [`UserAction::Quit`] or navigation).
	pub async fn join(self) -> Result<()> {
		self.task.await.map_err(|_| SessionError::Disconnected)
	}
}

struct ClientLoop<F> {
	controller: SessionController,
	connection: ConnectionHandle,
	actions_rx: mpsc::UnboundedReceiver<UserAction>,
	frontend: F,
	status_tx: watch::Sender<SessionStatus>,
	dirty_tx: watch::Sender<bool>,
	export_dir: PathBuf,
	export_format: ExportFormat,
}

enum Input {
	Event(Option<ConnectionEvent>),
	Action(Option<UserAction>),
}

impl<F: Frontend> ClientLoop<F> {
	async fn run(mut self) {
		let effects = self.controller.start();
		let mut running = self.apply(effects);

		while running {
			let input = tokio::select! {
				event = self.connection.events.recv() => Input::Event(event),
				action = self.actions_rx.recv() => Input::Action(action),
			};
			let effects = match input {
				Input::Event(Some(event)) => self.controller.on_connection_event(event),
				Input::Event(None) => {
					tracing::warn!(target = "nb.session", "connection driver stopped");
					break;
				}
				Input::Action(None) | Input::Action(Some(UserAction::Quit)) => break,
				Input::Action(Some(action)) => self.dispatch(action),
			};
			running = self.apply(effects);
		}

		let _ = self.commands().close();
		if let Err(e) = self.connection.task.await {
			tracing::debug!(target = "nb.session", error = %e, "connection driver ended abnormally");
		}
		tracing::debug!(target = "nb.session", "client stopped");
	}

	fn commands(&self) -> &ConnectionCommands {
		&self.connection.commands
	}

	fn dispatch(&mut self, action: UserAction) -> Vec<Effect> {
		tracing::debug!(target = "nb.session", ?action, "user action");
		match action {
			UserAction::Edit { cell, code } => self.controller.edit(cell, code),
			UserAction::Run(cell) => self.controller.run(cell),
			UserAction::Save => self.controller.request_save(),
			UserAction::Restart => self.controller.request_restart(),
			UserAction::Shutdown => self.controller.request_shutdown(),
			UserAction::Confirm { id, accepted } => self.controller.resolve(id, accepted),
			UserAction::Connect => self.controller.request_connect(),
			UserAction::NewSession => self.controller.request_new_session(),
			UserAction::Cancel => self.controller.cancel_connection(),
			UserAction::Navigate(url) => self.controller.request_navigation(url),
			UserAction::Quit => Vec::new(),
		}
	}

	/// Carries out `effects` in order. Returns false once the user navigated away.
	fn apply(&mut self, effects: Vec<Effect>) -> bool {
		let mut running = true;
		let mut queue: VecDeque<Effect> = effects.into();

		while let Some(effect) = queue.pop_front() {
			match effect {
				Effect::Send(message) => {
					if let Err(e) = self.commands().send_message(message) {
						tracing::warn!(target = "nb.session", error = %e, "failed to queue message");
					}
				}
				Effect::Connection(command) => {
					if let Err(e) = self.commands().send(command) {
						tracing::warn!(target = "nb.session", error = %e, "failed to queue connection command");
					}
				}
				Effect::Prompt(confirmation) => self.frontend.prompt(&confirmation),
				Effect::Dismiss(id) => self.frontend.dismiss(id),
				Effect::Notice(notice) => self.frontend.notice(&notice),
				Effect::Status(status) => {
					tracing::info!(target = "nb.session", %status, "session status changed");
					self.status_tx.send_replace(status);
				}
				Effect::Render => {
					let status = *self.status_tx.borrow();
					self.frontend.render(self.controller.notebook(), status);
				}
				Effect::Export(snapshot) => {
					let result = write_export(&self.export_dir, &snapshot, self.export_format);
					queue.extend(self.controller.on_export_finished(result));
				}
				Effect::Navigate(url) => {
					self.frontend.navigate(&url);
					running = false;
				}
			}
		}

		let dirty = self.controller.is_dirty();
		self.dirty_tx.send_if_modified(|current| {
			let changed = *current != dirty;
			*current = dirty;
			changed
		});
		running
	}
}
