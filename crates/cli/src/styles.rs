//! Colors for `nb --help`, kept in step with the session output palette.

use clap::builder::Styles;
use clap::builder::styling::AnsiColor;

/// Help text palette.
///
/// Section headers share the green of an open session, literals and
/// placeholders the cyan used for cell ids, and usage errors the bold red
/// of an `error:` notice.
pub fn help_styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Green.on_default().bold())
		.usage(AnsiColor::Green.on_default().bold())
		.literal(AnsiColor::Cyan.on_default())
		.placeholder(AnsiColor::Cyan.on_default())
		.valid(AnsiColor::Cyan.on_default())
		.error(AnsiColor::Red.on_default().bold())
}
