use std::time::Duration;

use nb_protocol::SessionId;
use nb_runtime::{BackoffPolicy, MemoryIdentityStore};
use serde_json::json;
use tempfile::TempDir;

use super::*;
use crate::confirm::ConfirmationKind;
use crate::document::render_output;
use crate::guard::Transition;
use crate::testing::{FakeKernel, FrontendEvent, RecordingFrontend, wait_for_event};

fn options(export_dir: &std::path::Path) -> ClientOptions {
	ClientOptions {
		connection: ConnectionOptions {
			policy: BackoffPolicy {
				initial_delay: Duration::from_millis(10),
				multiplier: 2,
				max_delay: Duration::from_millis(50),
				max_attempts: 5,
				surface_after: 2,
			},
			handshake_timeout: Duration::from_secs(1),
		},
		controller: ControllerOptions::default(),
		export_dir: export_dir.to_path_buf(),
		export_format: ExportFormat::Json,
	}
}

struct Harness {
	client: NotebookClient,
	events: mpsc::UnboundedReceiver<FrontendEvent>,
}

impl Harness {
	fn start(kernel: &Arc<FakeKernel>, store: &Arc<MemoryIdentityStore>, export_dir: &std::path::Path) -> Self {
		let (frontend, events) = RecordingFrontend::new();
		let client = NotebookClient::start(kernel.clone(), store.clone(), options(export_dir), frontend);
		Self { client, events }
	}

	async fn status(&self, want: SessionStatus) {
		tokio::time::timeout(Duration::from_secs(5), self.client.wait_for_status(want))
			.await
			.expect("timed out waiting for status")
			.unwrap();
	}

	async fn dirty(&self, want: bool) {
		let mut dirty = self.client.dirty();
		tokio::time::timeout(Duration::from_secs(5), dirty.wait_for(|d| *d == want))
			.await
			.expect("timed out waiting for dirty flag")
			.unwrap();
	}

	fn send(&self, action: UserAction) {
		self.client.send(action).unwrap();
	}

	async fn next(&mut self, pred: impl FnMut(&FrontendEvent) -> bool) -> (FrontendEvent, Vec<FrontendEvent>) {
		wait_for_event(&mut self.events, pred).await
	}

	async fn prompt(&mut self) -> Confirmation {
		match self.next(|e| matches!(e, FrontendEvent::Prompt(_))).await.0 {
			FrontendEvent::Prompt(confirmation) => confirmation,
			_ => unreachable!(),
		}
	}

	async fn quit(self) {
		self.client.send(UserAction::Quit).unwrap();
		tokio::time::timeout(Duration::from_secs(5), self.client.join()).await.unwrap().unwrap();
	}
}

fn form() -> CellId {
	CellId::new("form")
}

fn form_output(event: &FrontendEvent) -> Option<String> {
	match event {
		FrontendEvent::Render { cells, .. } => cells.iter().find(|c| c.id == form()).map(|c| render_output(c.output.as_ref())),
		_ => None,
	}
}

fn is_notice(event: &FrontendEvent, text: &str) -> bool {
	matches!(event, FrontendEvent::Notice(n) if n.message.contains(text))
}

/// Fills the form with `12345`, runs it and waits for `12345 54321`.
async fn run_form(harness: &mut Harness) {
	harness.send(UserAction::Edit {
		cell: form(),
		code: "12345".into(),
	});
	harness.send(UserAction::Run(form()));
	harness.next(|e| form_output(e).as_deref() == Some("12345 54321")).await;
}

#[tokio::test]
async fn reload_reconnects_to_same_session_without_reset() {
	let tmp = TempDir::new().unwrap();
	let kernel = FakeKernel::new();
	let store = Arc::new(MemoryIdentityStore::new());

	let mut first = Harness::start(&kernel, &store, tmp.path());
	first.status(SessionStatus::Open).await;
	run_form(&mut first).await;
	let session_id = store.get().expect("session id stored");
	first.quit().await;

	let mut reloaded = Harness::start(&kernel, &store, tmp.path());
	let (_, before) = reloaded.next(|e| is_notice(e, "Reconnected to an existing session")).await;
	let rendered = before.iter().rev().find_map(form_output);

	assert_eq!(rendered.as_deref(), Some("12345 54321"));
	assert!(!before.iter().any(|e| matches!(e, FrontendEvent::Notice(n) if n.actionable)));
	assert_eq!(store.get(), Some(session_id));
	assert_eq!(kernel.session_ids().len(), 1);
	reloaded.dirty(true).await;
	reloaded.quit().await;
}

#[tokio::test]
async fn reload_after_kernel_died_restores_nothing() {
	let tmp = TempDir::new().unwrap();
	let kernel = FakeKernel::new();
	let store = Arc::new(MemoryIdentityStore::new());

	let mut first = Harness::start(&kernel, &store, tmp.path());
	first.status(SessionStatus::Open).await;
	run_form(&mut first).await;
	first.quit().await;
	kernel.kill(&store.get().unwrap());

	let mut reloaded = Harness::start(&kernel, &store, tmp.path());
	reloaded.status(SessionStatus::KernelNotFound).await;
	let (render, _) = reloaded.next(|e| matches!(e, FrontendEvent::Render { .. })).await;

	assert!(matches!(render, FrontendEvent::Render { ref cells, interactive: false, .. } if cells.is_empty()));
	assert!(!*reloaded.client.dirty().borrow());
	reloaded.quit().await;
}

#[tokio::test]
async fn confirmed_restart_clears_outputs_and_keeps_session() {
	let tmp = TempDir::new().unwrap();
	let kernel = FakeKernel::new();
	let store = Arc::new(MemoryIdentityStore::new());

	let mut harness = Harness::start(&kernel, &store, tmp.path());
	harness.status(SessionStatus::Open).await;
	run_form(&mut harness).await;
	let session_id = store.get().unwrap();

	harness.send(UserAction::Restart);
	let confirmation = harness.prompt().await;
	assert_eq!(confirmation.kind, ConfirmationKind::RestartKernel);
	harness.send(UserAction::Confirm {
		id: confirmation.id,
		accepted: true,
	});

	harness.next(|e| is_notice(e, "Kernel restarted")).await;
	harness.send(UserAction::Save);
	harness.next(|e| is_notice(e, "Notebook saved")).await;

	assert_eq!(store.get(), Some(session_id.clone()));
	let snapshot = kernel.session(&session_id).unwrap();
	assert_eq!(render_output(snapshot.cell(&form()).unwrap().output.as_ref()), "None");
	assert_eq!(snapshot.cell(&form()).unwrap().code, "12345");
	harness.quit().await;
}

#[tokio::test]
async fn restart_cancelled_sends_nothing() {
	let tmp = TempDir::new().unwrap();
	let kernel = FakeKernel::new();
	let store = Arc::new(MemoryIdentityStore::new());

	let mut harness = Harness::start(&kernel, &store, tmp.path());
	harness.status(SessionStatus::Open).await;
	run_form(&mut harness).await;

	harness.send(UserAction::Restart);
	let confirmation = harness.prompt().await;
	harness.send(UserAction::Confirm {
		id: confirmation.id,
		accepted: false,
	});
	harness.send(UserAction::Save);
	let (_, between) = harness.next(|e| is_notice(e, "Notebook saved")).await;

	assert!(!between.iter().any(|e| is_notice(e, "Restarting") || is_notice(e, "restarted")));
	let snapshot = kernel.session(&store.get().unwrap()).unwrap();
	assert_eq!(snapshot.cell(&form()).unwrap().output, Some(json!(["12345", "54321"])));
	harness.quit().await;
}

#[tokio::test]
async fn save_after_shutdown_offers_download_once() {
	let tmp = TempDir::new().unwrap();
	let kernel = FakeKernel::new();
	let store = Arc::new(MemoryIdentityStore::new());

	let mut harness = Harness::start(&kernel, &store, tmp.path());
	harness.status(SessionStatus::Open).await;
	harness.send(UserAction::Edit {
		cell: form(),
		code: "draft".into(),
	});

	harness.send(UserAction::Shutdown);
	let confirmation = harness.prompt().await;
	assert_eq!(confirmation.kind, ConfirmationKind::ShutdownKernel { unsaved: true });
	harness.send(UserAction::Confirm {
		id: confirmation.id,
		accepted: true,
	});
	harness.status(SessionStatus::KernelNotFound).await;

	harness.send(UserAction::Save);
	harness.send(UserAction::Save);
	harness.send(UserAction::Run(form()));
	let (_, seen) = harness.next(|e| is_notice(e, "outputs are read-only")).await;
	let prompts: Vec<_> = seen
		.iter()
		.filter_map(|e| match e {
			FrontendEvent::Prompt(c) => Some(c.clone()),
			_ => None,
		})
		.collect();
	assert_eq!(prompts.len(), 1);
	assert_eq!(prompts[0].kind, ConfirmationKind::DownloadUnsaved { then: Transition::Save });
	harness.dirty(true).await;

	harness.send(UserAction::Confirm {
		id: prompts[0].id,
		accepted: true,
	});
	harness.next(|e| is_notice(e, "downloaded")).await;
	harness.dirty(false).await;

	let exported: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().collect();
	assert_eq!(exported.len(), 1);
	let content = std::fs::read_to_string(exported[0].as_ref().unwrap().path()).unwrap();
	assert!(content.contains("draft"));
	harness.quit().await;
}

#[tokio::test]
async fn network_blip_resumes_without_reset() {
	let tmp = TempDir::new().unwrap();
	let kernel = FakeKernel::new();
	let store = Arc::new(MemoryIdentityStore::new());

	let mut harness = Harness::start(&kernel, &store, tmp.path());
	harness.status(SessionStatus::Open).await;
	run_form(&mut harness).await;
	let connects = kernel.connect_count();

	kernel.drop_connections();
	let (_, seen) = harness.next(|e| is_notice(e, "Reconnected to an existing session")).await;

	assert!(kernel.connect_count() > connects);
	assert!(!seen.iter().any(|e| form_output(e).as_deref() == Some("None")));
	assert_eq!(*harness.client.status().borrow(), SessionStatus::Open);
	harness.quit().await;
}

#[tokio::test]
async fn new_session_replaces_stored_id() {
	let tmp = TempDir::new().unwrap();
	let kernel = FakeKernel::new();
	let store = Arc::new(MemoryIdentityStore::with_session(SessionId::new("stale")));

	let mut harness = Harness::start(&kernel, &store, tmp.path());
	harness.status(SessionStatus::KernelNotFound).await;
	harness.next(|e| matches!(e, FrontendEvent::Notice(n) if n.actionable)).await;

	harness.send(UserAction::NewSession);
	harness.status(SessionStatus::Open).await;

	let id = store.get().unwrap();
	assert_ne!(id, SessionId::new("stale"));
	assert!(kernel.session(&id).is_some());
	harness.quit().await;
}
