//! Session lifecycle controller.
//!
//! [`SessionController`] is a synchronous state machine. It consumes
//! connection events and user requests one at a time and answers each with a
//! list of [`Effect`]s for the client loop to carry out. It never performs
//! I/O itself, which keeps every transition atomic and testable.
//!
//! Kernel lifecycle events are dispatched by a single exhaustive match in
//! [`SessionController::on_lifecycle`].

use std::fmt;
use std::path::PathBuf;

use nb_protocol::{CellId, ClientMessage, ControlCommand, HandshakeOutcome, KernelLifecycleEvent, NotebookSnapshot, ServerMessage, SessionId};
use nb_runtime::{BackoffPolicy, CloseReason, ConnectionCommand, ConnectionEvent, ConnectionState, FailureKind};
use serde::{Deserialize, Serialize};

use crate::confirm::{Confirmation, ConfirmationId, ConfirmationKind, Confirmations, Requested, Resolution};
use crate::document::{CellRequest, Notebook};
use crate::error::{Result, SessionError};
use crate::guard::{Transition, UnsavedChangesGuard};


/// Status shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
	Connecting,
	Open,
	/// Reconnecting to a session that was open before.
	Resuming,
	KernelNotFound,
	Closed,
}

impl fmt::Display for SessionStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SessionStatus::Connecting => f.write_str("connecting"),
			SessionStatus::Open => f.write_str("open"),
			SessionStatus::Resuming => f.write_str("reconnecting"),
			SessionStatus::KernelNotFound => f.write_str("kernel not found"),
			SessionStatus::Closed => f.write_str("closed"),
		}
	}
}

/// What happens to a pending restart/shutdown prompt when the kernel goes away.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TieBreak {
	/// The server-reported terminal state wins and the stale prompt is dismissed.
	#[default]
	ServerWins,
	/// The prompt stays; confirming a restart then starts a new session.
	DeferToUser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerOptions {
	pub tie_break: TieBreak,
	/// Decides when reconnect attempts become visible. The client copies the
	/// connection's policy here so both sides agree.
	pub reconnect: BackoffPolicy,
}

impl Default for ControllerOptions {
	fn default() -> Self {
		Self {
			tie_break: TieBreak::default(),
			reconnect: BackoffPolicy::default(),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
	Info,
	Warning,
	Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
	pub level: NoticeLevel,
	pub message: String,
	/// Modal notice that waits for the user to act (new session or reload).
	pub actionable: bool,
}

impl Notice {
	pub fn info(message: impl Into<String>) -> Self {
		Self {
			level: NoticeLevel::Info,
			message: message.into(),
			actionable: false,
		}
	}

	pub fn warning(message: impl Into<String>) -> Self {
		Self {
			level: NoticeLevel::Warning,
			message: message.into(),
			actionable: false,
		}
	}

	pub fn blocking(message: impl Into<String>) -> Self {
		Self {
			level: NoticeLevel::Error,
			message: message.into(),
			actionable: true,
		}
	}
}

/// Work requested by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
	/// Send a message on the open channel.
	Send(ClientMessage),
	Connection(ConnectionCommand),
	Prompt(Confirmation),
	Dismiss(ConfirmationId),
	Notice(Notice),
	Status(SessionStatus),
	/// The notebook changed and should be redrawn.
	Render,
	/// Write the snapshot out; report back through [`SessionController::on_export_finished`].
	Export(NotebookSnapshot),
	Navigate(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
	pub session_id: Option<SessionId>,
	pub status: SessionStatus,
	/// Unix epoch milliseconds of the last handshake or server message.
	pub last_known_good_at: Option<u64>,
}

/// Everything the user can observe about a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
	pub session: Session,
	pub pending_edits: Vec<CellId>,
	pub dirty: bool,
	pub interactive: bool,
	pub notebook: NotebookSnapshot,
}

impl SessionState {
	/// Canonical serialized form, used to compare states exactly.
	pub fn to_bytes(&self) -> Vec<u8> {
		serde_json::to_vec(self).unwrap_or_default()
	}
}

const RECONNECTING_RETRY: &str = "Reconnecting to the kernel; try again shortly.";

#[derive(Debug)]
pub struct SessionController {
	session: Session,
	published: SessionStatus,
	notebook: Notebook,
	guard: UnsavedChangesGuard,
	confirmations: Confirmations,
	options: ControllerOptions,
	/// Session that was open earlier in this process. Resuming it keeps local state.
	live_session: Option<SessionId>,
	after_export: Option<Transition>,
	next_control_id: u64,
}

impl SessionController {
	pub fn new(options: ControllerOptions) -> Self {
		Self {
			session: Session {
				session_id: None,
				status: SessionStatus::Connecting,
				last_known_good_at: None,
			},
			published: SessionStatus::Connecting,
			notebook: Notebook::new(),
			guard: UnsavedChangesGuard::new(),
			confirmations: Confirmations::new(),
			options,
			live_session: None,
			after_export: None,
			next_control_id: 0,
		}
	}

	pub fn status(&self) -> SessionStatus {
		self.session.status
	}

	pub fn session(&self) -> &Session {
		&self.session
	}

	pub fn notebook(&self) -> &Notebook {
		&self.notebook
	}

	pub fn is_dirty(&self) -> bool {
		self.guard.is_dirty()
	}

	pub fn options(&self) -> &ControllerOptions {
		&self.options
	}

	pub fn pending_confirmation(&self) -> Option<&Confirmation> {
		self.confirmations.pending()
	}

	pub fn snapshot(&self) -> NotebookSnapshot {
		self.notebook.snapshot(self.session.session_id.clone(), self.guard.is_dirty())
	}

	pub fn session_state(&self) -> SessionState {
		SessionState {
			session: self.session.clone(),
			pending_edits: self.guard.pending_edits().iter().cloned().collect(),
			dirty: self.guard.is_dirty(),
			interactive: self.notebook.is_interactive(),
			notebook: self.snapshot(),
		}
	}

	/// First connect on mount.
	pub fn start(&mut self) -> Vec<Effect> {
		vec![Effect::Connection(ConnectionCommand::Connect)]
	}

	/// Explicit reconnect; supersedes any pending attempt.
	pub fn request_connect(&mut self) -> Vec<Effect> {
		vec![Effect::Connection(ConnectionCommand::Connect)]
	}

	/// Aborts an in-flight or scheduled attempt. Never touches unsaved state.
	pub fn cancel_connection(&mut self) -> Vec<Effect> {
		vec![Effect::Connection(ConnectionCommand::Cancel)]
	}

	pub fn on_connection_event(&mut self, event: ConnectionEvent) -> Vec<Effect> {
		match event {
			ConnectionEvent::State(state) => self.on_connection_state(state),
			ConnectionEvent::Established(outcome) => self.on_established(outcome),
			ConnectionEvent::Message(message) => self.on_server_message(message),
			ConnectionEvent::Failure { kind, attempt, message } => self.on_attempt_failed(kind, attempt, message),
		}
	}

	/// Dispatches a kernel lifecycle event.
	pub fn on_lifecycle(&mut self, event: KernelLifecycleEvent, snapshot: Option<NotebookSnapshot>) -> Vec<Effect> {
		tracing::info!(target = "nb.session", ?event, session = ?self.session.session_id, "kernel lifecycle event");
		match event {
			KernelLifecycleEvent::Resumed => self.on_resumed(snapshot),
			KernelLifecycleEvent::Restarted => self.on_restarted(),
			KernelLifecycleEvent::Shutdown => self.on_kernel_gone("The kernel was shut down."),
			KernelLifecycleEvent::NotFound => self.on_kernel_gone("The kernel for this session no longer exists."),
		}
	}

	pub fn edit(&mut self, cell: CellId, code: String) -> Vec<Effect> {
		self.notebook.edit(&cell, code.clone());
		self.guard.record_edit(&cell);
		let mut effects = vec![Effect::Render];
		if self.session.status == SessionStatus::Open {
			effects.push(cell_message(cell, CellRequest::Edit { code }));
		}
		effects
	}

	pub fn run(&mut self, cell: CellId) -> Vec<Effect> {
		let Some(code) = self.notebook.cell(&cell).map(|c| c.code.clone()) else {
			return vec![Effect::Notice(Notice::warning(format!("No cell named {cell}.")))];
		};
		if self.is_reconnecting() {
			return self.refuse_while_reconnecting(RECONNECTING_RETRY);
		}
		if self.session.status != SessionStatus::Open || !self.notebook.is_interactive() {
			return vec![Effect::Notice(Notice::warning("The kernel is not available; outputs are read-only."))];
		}
		vec![cell_message(cell, CellRequest::Run { code })]
	}

	pub fn request_restart(&mut self) -> Vec<Effect> {
		if self.is_reconnecting() {
			return self.refuse_while_reconnecting(RECONNECTING_RETRY);
		}
		if self.session.status != SessionStatus::Open {
			return vec![Effect::Notice(Notice::warning("There is no running kernel to restart."))];
		}
		self.prompt(ConfirmationKind::RestartKernel)
	}

	pub fn request_shutdown(&mut self) -> Vec<Effect> {
		if self.is_reconnecting() {
			return self.refuse_while_reconnecting(RECONNECTING_RETRY);
		}
		if self.session.status != SessionStatus::Open {
			return vec![Effect::Notice(Notice::warning("There is no running kernel to shut down."))];
		}
		let unsaved = self.guard.check(&Transition::Shutdown).is_err();
		self.prompt(ConfirmationKind::ShutdownKernel { unsaved })
	}

	pub fn request_save(&mut self) -> Vec<Effect> {
		if !self.guard.is_dirty() {
			tracing::debug!(target = "nb.session", "save requested with nothing to save");
			return Vec::new();
		}
		match self.session.status {
			SessionStatus::Open => {
				let ticket = self.guard.begin_save();
				tracing::debug!(target = "nb.session", request_id = ticket.request_id, revision = ticket.revision, "saving notebook");
				vec![Effect::Send(ClientMessage::Save {
					request_id: ticket.request_id,
					revision: ticket.revision,
					notebook: self.snapshot(),
				})]
			}
			SessionStatus::KernelNotFound | SessionStatus::Closed => match self.guard.check(&Transition::Save) {
				Ok(()) => Vec::new(),
				Err(_) => self.prompt(ConfirmationKind::DownloadUnsaved { then: Transition::Save }),
			},
			SessionStatus::Connecting | SessionStatus::Resuming => self.refuse_while_reconnecting("Reconnecting to the kernel; changes are kept and can be saved once reconnected."),
		}
	}

	pub fn request_navigation(&mut self, url: String) -> Vec<Effect> {
		self.guarded(Transition::Navigate(url))
	}

	pub fn request_new_session(&mut self) -> Vec<Effect> {
		self.guarded(Transition::NewSession)
	}

	/// Answer from the front end to a prompt. Stale answers are ignored.
	pub fn resolve(&mut self, id: ConfirmationId, accepted: bool) -> Vec<Effect> {
		let Some(resolution) = self.confirmations.resolve(id, accepted) else {
			return Vec::new();
		};
		match resolution {
			Resolution::Confirmed(ConfirmationKind::RestartKernel) => self.confirm_restart(),
			Resolution::Confirmed(ConfirmationKind::ShutdownKernel { .. }) => self.confirm_shutdown(),
			Resolution::Confirmed(ConfirmationKind::DownloadUnsaved { then }) => {
				self.after_export = Some(then);
				vec![Effect::Export(self.snapshot())]
			}
			Resolution::Cancelled(ConfirmationKind::DownloadUnsaved { then }) => match then {
				Transition::Save => vec![Effect::Notice(Notice::warning("Unsaved changes were not downloaded; they stay in this window."))],
				other => self.proceed(other),
			},
			Resolution::Cancelled(kind) => {
				tracing::debug!(target = "nb.session", ?kind, "confirmation cancelled");
				Vec::new()
			}
		}
	}

	/// Outcome of an [`Effect::Export`].
	pub fn on_export_finished(&mut self, result: Result<PathBuf>) -> Vec<Effect> {
		let then = self.after_export.take();
		match result {
			Ok(path) => {
				self.guard.confirm_export();
				let mut effects = vec![Effect::Notice(Notice::info(format!("Unsaved changes downloaded to {}", path.display())))];
				if let Some(transition) = then {
					effects.extend(self.proceed(transition));
				}
				effects
			}
			Err(e) => {
				tracing::warn!(target = "nb.session", error = %e, "export of unsaved changes failed");
				vec![Effect::Notice(Notice {
					level: NoticeLevel::Error,
					message: format!("Download failed ({e}); changes are still unsaved."),
					actionable: false,
				})]
			}
		}
	}

	fn on_connection_state(&mut self, state: ConnectionState) -> Vec<Effect> {
		let mut effects = Vec::new();
		match state {
			ConnectionState::Idle | ConnectionState::Open | ConnectionState::KernelNotFound => {}
			ConnectionState::Connecting { .. } => {
				if self.session.status != SessionStatus::Resuming {
					self.session.status = SessionStatus::Connecting;
					self.publish(&mut effects);
				}
			}
			ConnectionState::Reconnecting { attempt, delay } => {
				self.session.status = if self.live_session.is_some() {
					SessionStatus::Resuming
				} else {
					SessionStatus::Connecting
				};
				if self.options.reconnect.should_surface(attempt) {
					tracing::debug!(target = "nb.session", attempt, delay_ms = delay.as_millis() as u64, "surfacing reconnect");
					self.publish(&mut effects);
				}
			}
			ConnectionState::Closed { reason } => {
				self.session.status = SessionStatus::Closed;
				self.publish(&mut effects);
				if reason == CloseReason::Exhausted {
					self.notebook.set_interactive(false);
					effects.push(Effect::Render);
					effects.push(Effect::Notice(Notice::blocking("Could not reach the kernel host. Reconnect or start a new session.")));
				}
			}
		}
		effects
	}

	fn on_established(&mut self, outcome: HandshakeOutcome) -> Vec<Effect> {
		self.touch();
		match outcome {
			HandshakeOutcome::Created { session_id } => self.on_created(session_id),
			HandshakeOutcome::Resumed { session_id, snapshot } => {
				self.session.session_id = Some(session_id);
				self.on_lifecycle(KernelLifecycleEvent::Resumed, snapshot)
			}
			HandshakeOutcome::KernelNotFound { session_id } => {
				self.session.session_id = Some(session_id);
				self.on_lifecycle(KernelLifecycleEvent::NotFound, None)
			}
		}
	}

	fn on_created(&mut self, session_id: SessionId) -> Vec<Effect> {
		let mut effects = Vec::new();
		let previous = self.session.session_id.replace(session_id.clone());
		if previous.is_some_and(|old| old != session_id) {
			self.notebook.reset_execution_state();
		}
		self.live_session = Some(session_id.clone());
		self.session.status = SessionStatus::Open;
		self.notebook.set_interactive(true);
		self.publish(&mut effects);
		effects.push(Effect::Render);
		effects.push(Effect::Notice(Notice::info(format!("Started new session {session_id}."))));
		effects.extend(self.resync_edits());
		effects
	}

	fn on_resumed(&mut self, snapshot: Option<NotebookSnapshot>) -> Vec<Effect> {
		let mut effects = Vec::new();
		let same_process = self.session.session_id.is_some() && self.live_session == self.session.session_id;
		if same_process {
			effects.extend(self.resync_edits());
		} else if let Some(snapshot) = snapshot {
			self.notebook.restore(&snapshot);
			self.guard.restore(snapshot.dirty, snapshot.cells.iter().map(|c| c.id.clone()));
		}
		self.live_session = self.session.session_id.clone();
		self.session.status = SessionStatus::Open;
		self.notebook.set_interactive(true);

		let mut leading = Vec::new();
		self.publish(&mut leading);
		leading.push(Effect::Render);
		leading.push(Effect::Notice(Notice::info("Reconnected to an existing session.")));
		leading.extend(effects);
		leading
	}

	fn on_restarted(&mut self) -> Vec<Effect> {
		let mut effects = Vec::new();
		self.notebook.reset_execution_state();
		self.notebook.set_interactive(true);
		self.session.status = SessionStatus::Open;
		self.publish(&mut effects);
		effects.push(Effect::Render);
		effects.push(Effect::Notice(Notice::info("Kernel restarted.")));
		effects
	}

	fn on_kernel_gone(&mut self, reason: &str) -> Vec<Effect> {
		let mut effects = Vec::new();
		if self.options.tie_break == TieBreak::ServerWins && self.confirmations.pending().is_some_and(|c| c.kind.targets_kernel()) {
			if let Some(stale) = self.confirmations.dismiss() {
				tracing::debug!(target = "nb.session", id = %stale.id, "dismissing stale prompt");
				effects.push(Effect::Dismiss(stale.id));
			}
		}
		self.live_session = None;
		self.session.status = SessionStatus::KernelNotFound;
		self.notebook.set_interactive(false);
		self.publish(&mut effects);
		effects.push(Effect::Render);

		let message = if self.guard.is_dirty() {
			format!("{reason} Unsaved changes are kept; save to download them. Start a new session or reload.")
		} else {
			format!("{reason} Start a new session or reload.")
		};
		effects.push(Effect::Notice(Notice::blocking(message)));
		effects
	}

	fn on_server_message(&mut self, message: ServerMessage) -> Vec<Effect> {
		match message {
			ServerMessage::Welcome { .. } => {
				tracing::debug!(target = "nb.session", "ignoring welcome outside handshake");
				Vec::new()
			}
			ServerMessage::Lifecycle { event } => {
				self.touch();
				self.on_lifecycle(event, None)
			}
			ServerMessage::SaveResult { request_id, ok, message } => {
				self.touch();
				if ok {
					if !self.guard.confirm_save(request_id) {
						return Vec::new();
					}
					let notice = if self.guard.is_dirty() {
						Notice::info("Saved; newer edits are not saved yet.")
					} else {
						Notice::info("Notebook saved.")
					};
					vec![Effect::Notice(notice)]
				} else {
					self.guard.fail_save(request_id);
					let reason = message.unwrap_or_else(|| "unknown error".to_string());
					vec![Effect::Notice(Notice::warning(format!("Save failed: {reason}")))]
				}
			}
			ServerMessage::Cell { cell_id, payload } => {
				self.touch();
				if self.notebook.apply_cell_message(&cell_id, &payload) {
					vec![Effect::Render]
				} else {
					Vec::new()
				}
			}
		}
	}

	fn on_attempt_failed(&mut self, kind: FailureKind, attempt: u32, message: String) -> Vec<Effect> {
		let err = SessionError::from_failure(kind, message);
		if !self.options.reconnect.should_surface(attempt) {
			tracing::debug!(target = "nb.session", attempt, error = %err, "connection attempt failed");
			return Vec::new();
		}
		tracing::warn!(target = "nb.session", attempt, error = %err, "connection attempt failed");
		vec![Effect::Notice(Notice::warning(format!("{}; retrying (attempt {attempt}).", err.summary())))]
	}

	fn confirm_restart(&mut self) -> Vec<Effect> {
		match self.session.status {
			SessionStatus::Open => {
				let request_id = self.next_control_id();
				self.notebook.reset_execution_state();
				vec![
					Effect::Send(ClientMessage::Control {
						request_id,
						command: ControlCommand::Restart,
					}),
					Effect::Render,
					Effect::Notice(Notice::info("Restarting kernel...")),
				]
			}
			SessionStatus::KernelNotFound if self.options.tie_break == TieBreak::DeferToUser => self.start_new_session(),
			SessionStatus::Connecting | SessionStatus::Resuming => self.refuse_while_reconnecting("Reconnecting to the kernel; restart was not sent."),
			_ => vec![Effect::Notice(Notice::warning("The kernel is not available; restart was not sent."))],
		}
	}

	fn confirm_shutdown(&mut self) -> Vec<Effect> {
		match self.session.status {
			SessionStatus::Open => {
				let request_id = self.next_control_id();
				vec![
					Effect::Send(ClientMessage::Control {
						request_id,
						command: ControlCommand::Shutdown,
					}),
					Effect::Notice(Notice::info("Shutting down kernel...")),
				]
			}
			SessionStatus::KernelNotFound => {
				tracing::debug!(target = "nb.session", "kernel already gone; shutdown is a no-op");
				Vec::new()
			}
			SessionStatus::Connecting | SessionStatus::Resuming => self.refuse_while_reconnecting("Reconnecting to the kernel; shutdown was not sent."),
			_ => vec![Effect::Notice(Notice::warning("The kernel is not available; shutdown was not sent."))],
		}
	}

	fn guarded(&mut self, transition: Transition) -> Vec<Effect> {
		match self.guard.check(&transition) {
			Ok(()) => self.proceed(transition),
			Err(_) => self.prompt(ConfirmationKind::DownloadUnsaved { then: transition }),
		}
	}

	fn proceed(&mut self, transition: Transition) -> Vec<Effect> {
		match transition {
			// Shutdown has its own prompt carrying the unsaved flag, so it never
			// waits behind a download.
			Transition::Save | Transition::Shutdown => Vec::new(),
			Transition::NewSession => self.start_new_session(),
			Transition::Navigate(url) => {
				let mut effects = vec![Effect::Connection(ConnectionCommand::Close)];
				self.session.status = SessionStatus::Closed;
				self.publish(&mut effects);
				effects.push(Effect::Navigate(url));
				effects
			}
		}
	}

	fn start_new_session(&mut self) -> Vec<Effect> {
		tracing::info!(target = "nb.session", previous = ?self.session.session_id, "starting new session");
		self.live_session = None;
		self.notebook.reset_execution_state();
		self.session.status = SessionStatus::Connecting;
		let mut effects = vec![Effect::Connection(ConnectionCommand::NewSession)];
		self.publish(&mut effects);
		effects.push(Effect::Render);
		effects
	}

	fn prompt(&mut self, kind: ConfirmationKind) -> Vec<Effect> {
		match self.confirmations.request(kind) {
			Requested::New { confirmation, replaced } => {
				let mut effects = Vec::new();
				if let Some(id) = replaced {
					effects.push(Effect::Dismiss(id));
				}
				effects.push(Effect::Prompt(confirmation));
				effects
			}
			Requested::AlreadyPending(id) => {
				tracing::debug!(target = "nb.session", %id, "prompt already pending");
				Vec::new()
			}
		}
	}

	/// Re-sends local edits the kernel host may not have seen.
	fn resync_edits(&self) -> Vec<Effect> {
		self.guard
			.pending_edits()
			.iter()
			.filter_map(|id| self.notebook.cell(id))
			.map(|cell| cell_message(cell.id.clone(), CellRequest::Edit { code: cell.code.clone() }))
			.collect()
	}

	fn is_reconnecting(&self) -> bool {
		matches!(self.session.status, SessionStatus::Connecting | SessionStatus::Resuming)
	}

	/// Declines a kernel request while a reconnect is under way. The reconnect
	/// is surfaced first, so the refusal never contradicts the shown status.
	fn refuse_while_reconnecting(&mut self, message: &str) -> Vec<Effect> {
		let mut effects = Vec::new();
		self.publish(&mut effects);
		effects.push(Effect::Notice(Notice::warning(message)));
		effects
	}

	fn publish(&mut self, effects: &mut Vec<Effect>) {
		if self.session.status != self.published {
			self.published = self.session.status;
			effects.push(Effect::Status(self.session.status));
		}
	}

	fn touch(&mut self) {
		self.session.last_known_good_at = Some(now_ms());
	}

	fn next_control_id(&mut self) -> u64 {
		self.next_control_id += 1;
		self.next_control_id
	}
}

fn cell_message(cell_id: CellId, request: CellRequest) -> Effect {
	Effect::Send(ClientMessage::Cell {
		cell_id,
		payload: serde_json::to_value(&request).unwrap_or_default(),
	})
}

fn now_ms() -> u64 {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.map(|d| d.as_millis() as u64)
		.unwrap_or_default()
}
