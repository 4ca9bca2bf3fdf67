//! CLI configuration file.
//!
//! A single JSON document at `$XDG_CONFIG_HOME/nb/config.json`. Every field
//! is optional; command-line flags win over file values, and file values win
//! over built-in defaults. A missing file is the same as an empty one.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use nb::{ClientOptions, ControllerOptions, ExportFormat, TieBreak};
use nb_runtime::{BackoffPolicy, ConnectionOptions, default_identity_path};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cli::ConnectArgs;
use crate::error::{CliError, Result};

/// Schema version written by `nb`.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReconnectConfig {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub initial_delay_ms: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub multiplier: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub max_delay_ms: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub max_attempts: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub surface_after: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CliConfig {
	#[serde(default)]
	pub schema: u32,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub kernel_url: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub handshake_timeout_ms: Option<u64>,
	#[serde(default)]
	pub reconnect: ReconnectConfig,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub export_dir: Option<PathBuf>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub export_format: Option<ExportFormat>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tie_break: Option<TieBreak>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub identity_file: Option<PathBuf>,
}

impl CliConfig {
	/// Reads `path`, or returns defaults when it does not exist.
	pub fn load(path: &Path) -> Result<Self> {
		let content = match fs::read_to_string(path) {
			Ok(content) => content,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				tracing::debug!(target = "nb.cli", path = %path.display(), "no config file, using defaults");
				return Ok(Self::default());
			}
			Err(e) => return Err(anyhow::Error::new(e).context(format!("reading config {}", path.display())).into()),
		};
		let config: Self = serde_json::from_str(&content).map_err(|source| CliError::Config {
			path: path.to_path_buf(),
			source,
		})?;
		if config.schema > SCHEMA_VERSION {
			tracing::warn!(target = "nb.cli", path = %path.display(), schema = config.schema, "config written by a newer nb; unknown fields are ignored");
		}
		Ok(config)
	}

	pub fn backoff_policy(&self) -> BackoffPolicy {
		let defaults = BackoffPolicy::default();
		let r = &self.reconnect;
		BackoffPolicy {
			initial_delay: r.initial_delay_ms.map(Duration::from_millis).unwrap_or(defaults.initial_delay),
			multiplier: r.multiplier.unwrap_or(defaults.multiplier),
			max_delay: r.max_delay_ms.map(Duration::from_millis).unwrap_or(defaults.max_delay),
			max_attempts: r.max_attempts.unwrap_or(defaults.max_attempts),
			surface_after: r.surface_after.unwrap_or(defaults.surface_after),
		}
	}

	/// Applies `connect` flags on top of the file values.
	pub fn merge_args(&mut self, args: &ConnectArgs) {
		if let Some(url) = &args.url {
			self.kernel_url = Some(url.clone());
		}
		if let Some(ms) = args.handshake_timeout_ms {
			self.handshake_timeout_ms = Some(ms);
		}
		if let Some(n) = args.max_attempts {
			self.reconnect.max_attempts = Some(n);
		}
		if let Some(dir) = &args.export_dir {
			self.export_dir = Some(dir.clone());
		}
		if let Some(format) = args.export_format {
			self.export_format = Some(format.into());
		}
		if let Some(policy) = args.tie_break {
			self.tie_break = Some(policy.into());
		}
		if let Some(path) = &args.identity_file {
			self.identity_file = Some(path.clone());
		}
	}

	pub fn client_options(&self) -> ClientOptions {
		let policy = self.backoff_policy();
		let defaults = ConnectionOptions::default();
		ClientOptions {
			connection: ConnectionOptions {
				policy,
				handshake_timeout: self.handshake_timeout_ms.map(Duration::from_millis).unwrap_or(defaults.handshake_timeout),
			},
			controller: ControllerOptions {
				tie_break: self.tie_break.unwrap_or_default(),
				reconnect: policy,
			},
			export_dir: self.export_dir.clone().unwrap_or_else(default_export_dir),
			export_format: self.export_format.unwrap_or_default(),
		}
	}

	pub fn identity_path(&self) -> PathBuf {
		self.identity_file.clone().unwrap_or_else(default_identity_path)
	}

	/// Validated kernel URL, or [`CliError::MissingUrl`] naming `config_path`.
	pub fn kernel_url(&self, config_path: &Path) -> Result<String> {
		match &self.kernel_url {
			Some(url) => validate_kernel_url(url),
			None => Err(CliError::MissingUrl {
				config: config_path.to_path_buf(),
			}),
		}
	}
}

/// Accepts `ws://` and `wss://` URLs with a host.
pub fn validate_kernel_url(raw: &str) -> Result<String> {
	let invalid = |reason: &str| CliError::InvalidUrl {
		url: raw.to_string(),
		reason: reason.to_string(),
	};
	let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
	if !matches!(url.scheme(), "ws" | "wss") {
		return Err(invalid("scheme must be ws or wss"));
	}
	if url.host_str().is_none_or(str::is_empty) {
		return Err(invalid("missing host"));
	}
	Ok(url.to_string())
}

/// `$XDG_CONFIG_HOME/nb/config.json`, falling back to the platform config dir.
pub fn default_config_path() -> PathBuf {
	let config_home = std::env::var_os("XDG_CONFIG_HOME")
		.map(PathBuf::from)
		.or_else(dirs::config_dir)
		.unwrap_or_else(|| PathBuf::from("."));
	config_home.join("nb").join("config.json")
}

fn default_export_dir() -> PathBuf {
	dirs::download_dir().unwrap_or_else(|| std::env::temp_dir().join("nb-exports"))
}
