//! `nb session show|clear`: the remembered session for one kernel host.

use std::path::Path;

use nb_runtime::{FileIdentityStore, SessionIdentityStore};

use crate::cli::SessionArgs;
use crate::config::{CliConfig, validate_kernel_url};
use crate::error::Result;

fn open_store(config: &CliConfig, config_path: &Path, args: &SessionArgs) -> Result<FileIdentityStore> {
	let url = match &args.url {
		Some(url) => validate_kernel_url(url)?,
		None => config.kernel_url(config_path)?,
	};
	let path = args.identity_file.clone().unwrap_or_else(|| config.identity_path());
	Ok(FileIdentityStore::new(path, url))
}

pub fn show(config: &CliConfig, config_path: &Path, args: &SessionArgs) -> Result<String> {
	let store = open_store(config, config_path, args)?;
	Ok(match store.get() {
		Some(id) => id.to_string(),
		None => format!("no remembered session for {}", store.key()),
	})
}

pub fn clear(config: &CliConfig, config_path: &Path, args: &SessionArgs) -> Result<String> {
	let store = open_store(config, config_path, args)?;
	let previous = store.get();
	store.clear()?;
	tracing::info!(target = "nb.cli", key = %store.key(), "cleared remembered session");
	Ok(match previous {
		Some(id) => format!("forgot session {id} for {}", store.key()),
		None => format!("no remembered session for {}", store.key()),
	})
}

#[cfg(test)]
mod tests {
	use nb_protocol::SessionId;
	use tempfile::TempDir;

	use super::*;

	fn args(tmp: &TempDir, url: Option<&str>) -> SessionArgs {
		SessionArgs {
			url: url.map(str::to_string),
			identity_file: Some(tmp.path().join("sessions.json")),
		}
	}

	#[test]
	fn show_then_clear() {
		let tmp = TempDir::new().unwrap();
		let url = "ws://localhost:2718/ws";
		FileIdentityStore::new(tmp.path().join("sessions.json"), url).set(&SessionId::new("abc")).unwrap();

		let config = CliConfig::default();
		let config_path = tmp.path().join("config.json");
		assert_eq!(show(&config, &config_path, &args(&tmp, Some(url))).unwrap(), "abc");

		let cleared = clear(&config, &config_path, &args(&tmp, Some(url))).unwrap();
		assert!(cleared.contains("forgot session abc"));
		assert!(show(&config, &config_path, &args(&tmp, Some(url))).unwrap().starts_with("no remembered session"));
	}

	#[test]
	fn falls_back_to_configured_url() {
		let tmp = TempDir::new().unwrap();
		let config = CliConfig {
			kernel_url: Some("ws://from-config/ws".into()),
			..Default::default()
		};
		let out = show(&config, &tmp.path().join("config.json"), &args(&tmp, None)).unwrap();
		assert_eq!(out, "no remembered session for ws://from-config/ws");
	}

	#[test]
	fn other_hosts_are_untouched() {
		let tmp = TempDir::new().unwrap();
		let path = tmp.path().join("sessions.json");
		FileIdentityStore::new(&path, "ws://a/ws").set(&SessionId::new("a1")).unwrap();
		FileIdentityStore::new(&path, "ws://b/ws").set(&SessionId::new("b1")).unwrap();

		clear(&CliConfig::default(), &tmp.path().join("config.json"), &args(&tmp, Some("ws://a/ws"))).unwrap();

		assert_eq!(FileIdentityStore::new(&path, "ws://b/ws").get(), Some(SessionId::new("b1")));
	}
}
