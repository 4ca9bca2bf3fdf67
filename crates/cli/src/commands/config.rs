use std::path::Path;

use crate::cli::ConfigAction;
use crate::config::{CliConfig, SCHEMA_VERSION};
use crate::error::Result;

pub fn execute(config: &CliConfig, path: &Path, action: ConfigAction) -> Result<String> {
	match action {
		ConfigAction::Path => Ok(path.display().to_string()),
		ConfigAction::Show => {
			let mut effective = config.clone();
			if effective.schema == 0 {
				effective.schema = SCHEMA_VERSION;
			}
			Ok(serde_json::to_string_pretty(&effective)?)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn show_prints_camel_case_json() {
		let config = CliConfig {
			kernel_url: Some("ws://localhost:2718/ws".into()),
			..Default::default()
		};
		let out = execute(&config, Path::new("/tmp/config.json"), ConfigAction::Show).unwrap();
		assert!(out.contains("\"kernelUrl\": \"ws://localhost:2718/ws\""));
		assert!(out.contains(&format!("\"schema\": {SCHEMA_VERSION}")));
	}

	#[test]
	fn path_prints_the_file() {
		let out = execute(&CliConfig::default(), Path::new("/tmp/config.json"), ConfigAction::Path).unwrap();
		assert_eq!(out, "/tmp/config.json");
	}
}
