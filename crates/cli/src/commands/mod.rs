mod config;
mod connect;
mod session;

use std::path::PathBuf;

use crate::cli::{Cli, Commands, SessionAction};
use crate::config::{CliConfig, default_config_path};
use crate::error::Result;

pub use connect::run_client;

pub async fn dispatch(cli: Cli) -> Result<()> {
	let config_path: PathBuf = cli.config.unwrap_or_else(default_config_path);
	let config = CliConfig::load(&config_path)?;
	tracing::debug!(target = "nb.cli", path = %config_path.display(), "loaded config");

	match cli.command {
		Commands::Connect(args) => connect::execute(config, &config_path, args).await,
		Commands::Session { action } => {
			let message = match action {
				SessionAction::Show(args) => session::show(&config, &config_path, &args)?,
				SessionAction::Clear(args) => session::clear(&config, &config_path, &args)?,
			};
			println!("{message}");
			Ok(())
		}
		Commands::Config { action } => {
			println!("{}", config::execute(&config, &config_path, action)?);
			Ok(())
		}
	}
}
