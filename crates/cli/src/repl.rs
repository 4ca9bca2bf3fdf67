//! Line commands typed at the `nb connect` prompt.

use std::io::BufRead;

use nb::{ConfirmationId, UserAction};
use nb_protocol::CellId;
use thiserror::Error;
use tokio::sync::{mpsc, watch};

pub const HELP: &str = "\
commands:
  edit <cell> <code>   replace a cell's source
  run <cell>           execute a cell
  save                 save the notebook
  restart              restart the kernel (asks first)
  shutdown             shut the kernel down (asks first)
  yes | no             answer the open question
  connect              reconnect now
  cancel               stop reconnecting
  new                  start a new session
  open <url>           leave this notebook
  quit                 exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
	Action(UserAction),
	Help,
	Blank,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
	#[error("unknown command '{0}' (try 'help')")]
	Unknown(String),
	#[error("usage: {0}")]
	Usage(&'static str),
	#[error("nothing to answer")]
	NoQuestion,
}

/// Parses one input line. `pending` is the open question, if any.
pub fn parse_line(line: &str, pending: Option<ConfirmationId>) -> Result<Line, ParseError> {
	let line = line.trim();
	let (word, rest) = match line.split_once(char::is_whitespace) {
		Some((word, rest)) => (word, rest.trim()),
		None => (line, ""),
	};

	let action = match word.to_ascii_lowercase().as_str() {
		"" => return Ok(Line::Blank),
		"help" | "?" => return Ok(Line::Help),
		"edit" => {
			let (cell, code) = rest.split_once(char::is_whitespace).ok_or(ParseError::Usage("edit <cell> <code>"))?;
			UserAction::Edit {
				cell: CellId::new(cell),
				code: code.trim_start().to_string(),
			}
		}
		"run" if !rest.is_empty() => UserAction::Run(CellId::new(rest)),
		"run" => return Err(ParseError::Usage("run <cell>")),
		"save" => UserAction::Save,
		"restart" => UserAction::Restart,
		"shutdown" => UserAction::Shutdown,
		"yes" | "y" | "no" | "n" => UserAction::Confirm {
			id: pending.ok_or(ParseError::NoQuestion)?,
			accepted: word.starts_with(['y', 'Y']),
		},
		"connect" | "reconnect" => UserAction::Connect,
		"cancel" => UserAction::Cancel,
		"new" => UserAction::NewSession,
		"open" if !rest.is_empty() => UserAction::Navigate(rest.to_string()),
		"open" => return Err(ParseError::Usage("open <url>")),
		"quit" | "exit" | "q" => UserAction::Quit,
		other => return Err(ParseError::Unknown(other.to_string())),
	};
	Ok(Line::Action(action))
}

/// Feeds parsed lines to `send` until the input ends, `quit`, or a closed client.
///
/// Parse errors and help go to `reply`. End of input counts as `quit`.
pub async fn read_actions<S, P>(mut lines: mpsc::UnboundedReceiver<String>, pending: watch::Receiver<Option<ConfirmationId>>, mut send: S, mut reply: P)
where
	S: FnMut(UserAction) -> bool,
	P: FnMut(&str),
{
	while let Some(line) = lines.recv().await {
		let open = *pending.borrow();
		match parse_line(&line, open) {
			Ok(Line::Action(action)) => {
				let quit = action == UserAction::Quit;
				if !send(action) || quit {
					return;
				}
			}
			Ok(Line::Help) => reply(HELP),
			Ok(Line::Blank) => {}
			Err(e) => reply(&e.to_string()),
		}
	}
	send(UserAction::Quit);
}

/// Reads stdin on a plain thread so a pending read never holds up shutdown.
pub fn stdin_lines() -> mpsc::UnboundedReceiver<String> {
	let (tx, rx) = mpsc::unbounded_channel();
	std::thread::spawn(move || {
		for line in std::io::stdin().lock().lines() {
			let Ok(line) = line else { break };
			if tx.send(line).is_err() {
				break;
			}
		}
	});
	rx
}
