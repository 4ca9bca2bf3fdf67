
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use nb::{ExportFormat, TieBreak};

use crate::styles::help_styles;

#[derive(Parser, Debug)]
#[command(name = "nb")]
#[command(about = "Notebook kernel sessions from the terminal")]
#[command(version)]
#[command(styles = help_styles())]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Config file (defaults to $XDG_CONFIG_HOME/nb/config.json)
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Connect to a kernel host and edit the notebook interactively.
	Connect(ConnectArgs),
	/// Inspect or forget the remembered session for a kernel host.
	Session {
		#[command(subcommand)]
		action: SessionAction,
	},
	/// Show the effective configuration.
	Config {
		#[command(subcommand)]
		action: ConfigAction,
	},
}

#[derive(Args, Debug, Clone, Default)]
pub struct ConnectArgs {
	/// Kernel WebSocket URL (ws:// or wss://)
	#[arg(value_name = "URL")]
	pub url: Option<String>,

	/// Forget the remembered session and start a fresh one
	#[arg(long)]
	pub new_session: bool,

	/// Identity file (defaults to $XDG_CACHE_HOME/nb/sessions.json)
	#[arg(long, value_name = "FILE")]
	pub identity_file: Option<PathBuf>,

	/// Upper bound for the connect handshake
	#[arg(long, value_name = "MS")]
	pub handshake_timeout_ms: Option<u64>,

	/// Reconnect attempts before giving up
	#[arg(long, value_name = "N")]
	pub max_attempts: Option<u32>,

	/// Where "download unsaved changes" writes files
	#[arg(long, value_name = "DIR")]
	pub export_dir: Option<PathBuf>,

	/// Format of downloaded notebooks
	#[arg(long, value_enum, value_name = "FORMAT")]
	pub export_format: Option<CliExportFormat>,

	/// What happens to a pending restart/shutdown prompt when the kernel goes away
	#[arg(long, value_enum, value_name = "POLICY")]
	pub tie_break: Option<CliTieBreak>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SessionAction {
	/// Print the remembered session id
	Show(SessionArgs),
	/// Forget the remembered session id
	Clear(SessionArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct SessionArgs {
	/// Kernel WebSocket URL; defaults to kernelUrl from the config
	#[arg(value_name = "URL")]
	pub url: Option<String>,

	/// Identity file (defaults to $XDG_CACHE_HOME/nb/sessions.json)
	#[arg(long, value_name = "FILE")]
	pub identity_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigAction {
	/// Print the merged configuration as JSON
	Show,
	/// Print the config file path
	Path,
}

/// Export format (CLI wrapper for [`ExportFormat`])
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum CliExportFormat {
	/// Re-importable notebook snapshot
	Json,
	/// Cell sources separated by `# %%` markers
	Script,
	/// Sources and last outputs as markdown
	Markdown,
}

impl From<CliExportFormat> for ExportFormat {
	fn from(format: CliExportFormat) -> Self {
		match format {
			CliExportFormat::Json => ExportFormat::Json,
			CliExportFormat::Script => ExportFormat::Script,
			CliExportFormat::Markdown => ExportFormat::Markdown,
		}
	}
}

/// Tie-break policy (CLI wrapper for [`TieBreak`])
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum CliTieBreak {
	/// Dismiss the prompt and show the server's state
	ServerWins,
	/// Keep the prompt; confirming a restart starts a new session
	DeferToUser,
}

impl From<CliTieBreak> for TieBreak {
	fn from(policy: CliTieBreak) -> Self {
		match policy {
			CliTieBreak::ServerWins => TieBreak::ServerWins,
			CliTieBreak::DeferToUser => TieBreak::DeferToUser,
		}
	}
}
