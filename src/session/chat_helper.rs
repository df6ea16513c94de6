// Rustyline helper with slash command completion and hints

use colored::*;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::{Hinter, HistoryHinter};
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use std::borrow::Cow;

use crate::session::chat::COMMANDS;

/// Line editor helper: completes slash commands, hints the rest of a
/// partially typed command, and falls back to history hints for plain text.
pub struct CommandHelper {
	commands: Vec<String>,
	hinter: HistoryHinter,
}

impl CommandHelper {
	pub fn new() -> Self {
		Self {
			commands: COMMANDS.iter().map(|s| s.to_string()).collect(),
			hinter: HistoryHinter {},
		}
	}

	fn matching_commands(&self, line: &str) -> Vec<&String> {
		self.commands
			.iter()
			.filter(|cmd| cmd.starts_with(line))
			.collect()
	}
}

impl Default for CommandHelper {
	fn default() -> Self {
		Self::new()
	}
}

impl Completer for CommandHelper {
	type Candidate = Pair;

	fn complete(
		&self,
		line: &str,
		pos: usize,
		_ctx: &Context<'_>,
	) -> rustyline::Result<(usize, Vec<Pair>)> {
		// Only complete at the start of a slash command
		if !line.starts_with('/') || pos < line.len() {
			return Ok((0, Vec::new()));
		}

		let candidates = self
			.matching_commands(line)
			.into_iter()
			.map(|cmd| Pair {
				display: cmd.clone(),
				replacement: cmd.clone(),
			})
			.collect();

		Ok((0, candidates))
	}
}

impl Hinter for CommandHelper {
	type Hint = String;

	fn hint(&self, line: &str, pos: usize, ctx: &Context<'_>) -> Option<String> {
		if line.is_empty() || pos < line.len() {
			return None;
		}

		if line.starts_with('/') {
			// Complete the rest of the first matching command
			return self
				.matching_commands(line)
				.first()
				.map(|cmd| cmd[line.len()..].to_string());
		}

		self.hinter.hint(line, pos, ctx)
	}
}

impl Highlighter for CommandHelper {
	fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
		if line.starts_with('/') && self.commands.iter().any(|cmd| cmd == line) {
			Cow::Owned(line.green().to_string())
		} else {
			Cow::Borrowed(line)
		}
	}

	fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
		Cow::Owned(hint.bright_black().to_string())
	}

	fn highlight_char(&self, _line: &str, _pos: usize) -> bool {
		false
	}
}

impl Validator for CommandHelper {}

impl Helper for CommandHelper {}
