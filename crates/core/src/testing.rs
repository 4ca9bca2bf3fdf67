//! Test doubles: an in-process kernel host and a recording front end.
//!
//! [`FakeKernel`] speaks the real wire protocol over in-memory pipes. It keeps
//! sessions alive across connections, so a second client with the same
//! identity store behaves like a page reload. Running a cell echoes its source
//! and the reversed source (`12345` gives `12345 54321`).

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use nb_protocol::{CellId, CellSnapshot, ClientMessage, ControlCommand, HandshakeOutcome, KernelLifecycleEvent, NotebookSnapshot, ServerMessage, SessionId};
use nb_runtime::{Connector, PipeTransport, PipeTransportSender, TransportParts, TransportReceiver};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::io::{DuplexStream, duplex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::client::Frontend;
use crate::confirm::{Confirmation, ConfirmationId};
use crate::controller::{Notice, SessionStatus};
use crate::document::{CellRequest, Notebook};

#[derive(Debug, Default)]
struct KernelState {
	sessions: BTreeMap<SessionId, NotebookSnapshot>,
	next_id: u64,
}

impl KernelState {
	fn handle(&mut self, current: &mut Option<SessionId>, message: ClientMessage) -> Vec<ServerMessage> {
		match message {
			ClientMessage::Hello { session_id, .. } => {
				let outcome = match session_id {
					None => {
						self.next_id += 1;
						let id = SessionId::new(format!("session-{}", self.next_id));
						self.sessions.insert(
							id.clone(),
							NotebookSnapshot {
								session_id: Some(id.clone()),
								..Default::default()
							},
						);
						HandshakeOutcome::Created { session_id: id }
					}
					Some(id) => match self.sessions.get(&id) {
						Some(snapshot) => HandshakeOutcome::Resumed {
							session_id: id,
							snapshot: Some(snapshot.clone()),
						},
						None => HandshakeOutcome::KernelNotFound { session_id: id },
					},
				};
				*current = match &outcome {
					HandshakeOutcome::KernelNotFound { .. } => None,
					other => Some(other.session_id().clone()),
				};
				vec![ServerMessage::Welcome { outcome }]
			}
			ClientMessage::Cell { cell_id, payload } => {
				let Some(session) = current.as_ref().and_then(|id| self.sessions.get_mut(id)) else {
					return Vec::new();
				};
				match serde_json::from_value::<CellRequest>(payload) {
					Ok(CellRequest::Edit { code }) => {
						upsert(session, &cell_id, code, None);
						session.dirty = true;
						Vec::new()
					}
					Ok(CellRequest::Run { code }) => {
						let output = evaluate(&code);
						upsert(session, &cell_id, code, Some(output.clone()));
						vec![ServerMessage::Cell {
							cell_id,
							payload: json!({ "output": output }),
						}]
					}
					Err(_) => Vec::new(),
				}
			}
			ClientMessage::Control { command, .. } => {
				let Some(id) = current.clone() else {
					return Vec::new();
				};
				match command {
					ControlCommand::Restart => {
						if let Some(session) = self.sessions.get_mut(&id) {
							for cell in &mut session.cells {
								cell.output = None;
							}
						}
						vec![ServerMessage::Lifecycle {
							event: KernelLifecycleEvent::Restarted,
						}]
					}
					ControlCommand::Shutdown => {
						self.sessions.remove(&id);
						*current = None;
						vec![ServerMessage::Lifecycle {
							event: KernelLifecycleEvent::Shutdown,
						}]
					}
				}
			}
			ClientMessage::Save { request_id, notebook, .. } => {
				let Some(session) = current.as_ref().and_then(|id| self.sessions.get_mut(id)) else {
					return vec![ServerMessage::SaveResult {
						request_id,
						ok: false,
						message: Some("no session".into()),
					}];
				};
				session.cells = notebook.cells;
				session.dirty = false;
				vec![ServerMessage::SaveResult {
					request_id,
					ok: true,
					message: None,
				}]
			}
		}
	}
}

fn upsert(session: &mut NotebookSnapshot, id: &CellId, code: String, output: Option<Value>) {
	match session.cells.iter_mut().find(|c| &c.id == id) {
		Some(cell) => {
			cell.code = code;
			if output.is_some() {
				cell.output = output;
			}
		}
		None => session.cells.push(CellSnapshot { id: id.clone(), code, output }),
	}
}

fn evaluate(code: &str) -> Value {
	let value = code.trim();
	json!([value, value.chars().rev().collect::<String>()])
}

/// In-process kernel host.
#[derive(Debug, Default)]
pub struct FakeKernel {
	state: Arc<Mutex<KernelState>>,
	tasks: Mutex<Vec<JoinHandle<()>>>,
	connects: AtomicUsize,
}

impl FakeKernel {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn session(&self, id: &SessionId) -> Option<NotebookSnapshot> {
		self.state.lock().sessions.get(id).cloned()
	}

	pub fn session_ids(&self) -> Vec<SessionId> {
		self.state.lock().sessions.keys().cloned().collect()
	}

	/// Number of transports opened so far.
	pub fn connect_count(&self) -> usize {
		self.connects.load(Ordering::SeqCst)
	}

	/// Simulates the kernel process dying: the session is forgotten and
	/// every connection drops.
	pub fn kill(&self, id: &SessionId) -> bool {
		let removed = self.state.lock().sessions.remove(id).is_some();
		self.drop_connections();
		removed
	}

	/// Simulates a network blip: every connection drops, sessions survive.
	pub fn drop_connections(&self) {
		for task in self.tasks.lock().drain(..) {
			task.abort();
		}
	}
}

impl Connector for FakeKernel {
	fn connect<'a>(&'a self, _session_id: Option<&'a SessionId>) -> Pin<Box<dyn Future<Output = nb_runtime::Result<TransportParts>> + Send + 'a>> {
		Box::pin(async move {
			self.connects.fetch_add(1, Ordering::SeqCst);

			let (client_write, kernel_read) = duplex(64 * 1024);
			let (kernel_write, client_read) = duplex(64 * 1024);
			let (client, client_rx) = PipeTransport::new(client_write, client_read);
			let (kernel, kernel_rx) = PipeTransport::new(kernel_write, kernel_read);
			let (sender, receiver) = kernel.into_parts();

			let reader = tokio::spawn(async move {
				let _ = Box::new(receiver).run().await;
			});
			let server = tokio::spawn(serve(Arc::clone(&self.state), sender, kernel_rx));
			self.tasks.lock().extend([reader, server]);

			Ok(client.into_transport_parts(client_rx))
		})
	}

	fn endpoint(&self) -> &str {
		"fake://kernel"
	}
}

async fn serve(state: Arc<Mutex<KernelState>>, mut sender: PipeTransportSender<DuplexStream>, mut rx: mpsc::UnboundedReceiver<Value>) {
	let mut current = None;
	while let Some(value) = rx.recv().await {
		let Ok(message) = serde_json::from_value::<ClientMessage>(value) else {
			continue;
		};
		let replies = state.lock().handle(&mut current, message);
		for reply in replies {
			let shutdown = matches!(
				reply,
				ServerMessage::Lifecycle {
					event: KernelLifecycleEvent::Shutdown
				}
			);
			let Ok(value) = serde_json::to_value(&reply) else {
				continue;
			};
			if sender.send(value).await.is_err() || shutdown {
				return;
			}
		}
	}
}

/// Everything a [`RecordingFrontend`] was asked to show.
#[derive(Debug, Clone, PartialEq)]
pub enum FrontendEvent {
	Render {
		status: SessionStatus,
		interactive: bool,
		cells: Vec<CellSnapshot>,
	},
	Prompt(Confirmation),
	Dismiss(ConfirmationId),
	Notice(Notice),
	Navigate(String),
}

/// Front end that forwards every call to a channel.
#[derive(Debug)]
pub struct RecordingFrontend {
	tx: mpsc::UnboundedSender<FrontendEvent>,
}

impl RecordingFrontend {
	pub fn new() -> (Self, mpsc::UnboundedReceiver<FrontendEvent>) {
		let (tx, rx) = mpsc::unbounded_channel();
		(Self { tx }, rx)
	}
}

impl Frontend for RecordingFrontend {
	fn render(&mut self, notebook: &Notebook, status: SessionStatus) {
		let _ = self.tx.send(FrontendEvent::Render {
			status,
			interactive: notebook.is_interactive(),
			cells: notebook.cells().to_vec(),
		});
	}

	fn prompt(&mut self, confirmation: &Confirmation) {
		let _ = self.tx.send(FrontendEvent::Prompt(confirmation.clone()));
	}

	fn dismiss(&mut self, id: ConfirmationId) {
		let _ = self.tx.send(FrontendEvent::Dismiss(id));
	}

	fn notice(&mut self, notice: &Notice) {
		let _ = self.tx.send(FrontendEvent::Notice(notice.clone()));
	}

	fn navigate(&mut self, url: &str) {
		let _ = self.tx.send(FrontendEvent::Navigate(url.to_string()));
	}
}

/// Receives front end events until one matches, returning it with everything skipped.
///
/// Panics after five seconds without a match.
pub async fn wait_for_event(rx: &mut mpsc::UnboundedReceiver<FrontendEvent>, mut pred: impl FnMut(&FrontendEvent) -> bool) -> (FrontendEvent, Vec<FrontendEvent>) {
	let mut skipped = Vec::new();
	let found = tokio::time::timeout(Duration::from_secs(5), async {
		while let Some(event) = rx.recv().await {
			if pred(&event) {
				return Some(event);
			}
			skipped.push(event);
		}
		None
	})
	.await;
	match found {
		Ok(Some(event)) => (event, skipped),
		Ok(None) => panic!("front end channel closed; saw {skipped:?}"),
		Err(_) => panic!("timed out waiting for front end event; saw {skipped:?}"),
	}
}
