//! `nb connect`: an interactive session against a kernel host.

use std::path::Path;
use std::sync::Arc;

use nb::{ConfirmationId, NotebookClient, UserAction};
use nb_runtime::{FileIdentityStore, SessionIdentityStore, WebSocketConnector};
use tokio::sync::{mpsc, watch};

use crate::cli::ConnectArgs;
use crate::config::CliConfig;
use crate::error::Result;
use crate::frontend::TerminalFrontend;
use crate::repl::{read_actions, stdin_lines};

pub async fn execute(mut config: CliConfig, config_path: &Path, args: ConnectArgs) -> Result<()> {
	config.merge_args(&args);
	let url = config.kernel_url(config_path)?;

	let connector = Arc::new(WebSocketConnector::new(url.clone())?);
	let store = Arc::new(FileIdentityStore::new(config.identity_path(), url.clone()));
	if args.new_session {
		store.clear()?;
	}
	tracing::info!(
		target = "nb.cli",
		%url,
		identity = %store.path().display(),
		resume = store.get().is_some(),
		"connecting"
	);

	let (frontend, pending) = TerminalFrontend::stdout();
	let client = NotebookClient::start(connector, store, config.client_options(), frontend);
	run_client(client, stdin_lines(), pending).await
}

/// Drives `client` from typed lines until it stops. Ctrl-C quits.
pub async fn run_client(client: NotebookClient, lines: mpsc::UnboundedReceiver<String>, pending: watch::Receiver<Option<ConfirmationId>>) -> Result<()> {
	let actions = client.actions();
	let typed = actions.clone();
	let reader = tokio::spawn(async move {
		read_actions(lines, pending, |action| typed.send(action).is_ok(), |text| println!("{text}")).await;
	});
	let interrupt = tokio::spawn(async move {
		if tokio::signal::ctrl_c().await.is_ok() {
			tracing::debug!(target = "nb.cli", "interrupted");
			let _ = actions.send(UserAction::Quit);
		}
	});

	let result = client.join().await;
	reader.abort();
	interrupt.abort();
	Ok(result?)
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use nb::testing::FakeKernel;
	use nb::{ClientOptions, SessionStatus};
	use nb_protocol::CellId;
	use nb_runtime::MemoryIdentityStore;
	use serde_json::json;
	use tempfile::TempDir;

	use super::*;

	#[tokio::test]
	async fn typed_lines_drive_the_session() {
		let tmp = TempDir::new().unwrap();
		let kernel = FakeKernel::new();
		let store = Arc::new(MemoryIdentityStore::new());
		let (frontend, pending) = TerminalFrontend::new(Vec::new());
		let options = ClientOptions {
			export_dir: tmp.path().to_path_buf(),
			..Default::default()
		};

		let client = NotebookClient::start(kernel.clone(), store.clone(), options, frontend);
		let mut status = client.status();
		let (tx, lines) = mpsc::unbounded_channel();
		let running = tokio::spawn(run_client(client, lines, pending));

		tokio::time::timeout(Duration::from_secs(5), status.wait_for(|s| *s == SessionStatus::Open))
			.await
			.unwrap()
			.unwrap();
		tx.send("edit form 12345".to_string()).unwrap();
		tx.send("run form".to_string()).unwrap();

		let id = store.get().unwrap();
		let output = tokio::time::timeout(Duration::from_secs(5), async {
			loop {
				if let Some(output) = kernel.session(&id).and_then(|s| s.cell(&CellId::new("form")).and_then(|c| c.output.clone())) {
					return output;
				}
				tokio::time::sleep(Duration::from_millis(10)).await;
			}
		})
		.await
		.unwrap();
		assert_eq!(output, json!(["12345", "54321"]));

		tx.send("quit".to_string()).unwrap();
		tokio::time::timeout(Duration::from_secs(5), running).await.unwrap().unwrap().unwrap();
	}
}
