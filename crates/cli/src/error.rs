use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
	#[error("invalid kernel URL '{url}': {reason}")]
	InvalidUrl { url: String, reason: String },

	#[error("no kernel URL; pass one on the command line or set kernelUrl in {}", .config.display())]
	MissingUrl { config: PathBuf },

	#[error("failed to read config {}", .path.display())]
	Config {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},

	#[error(transparent)]
	Session(#[from] nb::SessionError),

	#[error(transparent)]
	Runtime(#[from] nb_runtime::Error),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),

	#[error(transparent)]
	Anyhow(#[from] anyhow::Error),
}
