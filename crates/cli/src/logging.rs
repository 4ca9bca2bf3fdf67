use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Installs the stderr subscriber. `RUST_LOG` wins over `verbosity`.
pub fn init_logging(verbosity: u8) {
	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));

	let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

	// try_init: a second call (tests, embedding) keeps the first subscriber.
	let _ = tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(stderr)
		.with_target(true)
		.with_level(true)
		.compact()
		.try_init();
}

/// Filter directives for `-v` counts.
///
/// Events use `nb.*` targets, so the directives name targets rather than
/// crate paths. Quiet mode still lets warnings through because the terminal
/// front end shows everything else itself.
pub fn default_filter(verbosity: u8) -> &'static str {
	match verbosity {
		0 => "warn,tungstenite=off,tokio_tungstenite=off",
		1 => "warn,nb.cli=info,nb.session=info,nb.connection=info",
		2 => "info,nb.cli=debug,nb.session=debug,nb.connection=debug,nb.channel=debug,nb.identity=debug",
		_ => "trace",
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn filters_parse() {
		for verbosity in 0..4 {
			assert!(EnvFilter::try_new(default_filter(verbosity)).is_ok(), "verbosity {verbosity}");
		}
	}

	#[test]
	fn more_verbose_is_never_quieter() {
		assert!(default_filter(0).starts_with("warn"));
		assert!(default_filter(2).contains("nb.connection=debug"));
		assert_eq!(default_filter(9), "trace");
	}
}
