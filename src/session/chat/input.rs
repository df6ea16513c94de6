// User input handling module

use anyhow::Result;
use colored::*;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{CompletionType, Config as RustylineConfig, EditMode, Editor};

use crate::log_error;
use crate::session::chat_helper::CommandHelper;

/// What the line editor produced for one prompt cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
	Line(String),
	Interrupted,
	Eof,
}

/// Build the line editor with command completion and hints.
pub fn build_editor() -> Result<Editor<CommandHelper, DefaultHistory>> {
	let config = RustylineConfig::builder()
		.completion_type(CompletionType::List)
		.edit_mode(EditMode::Emacs)
		.auto_add_history(true) // Automatically add lines to history
		.bell_style(rustyline::config::BellStyle::None) // No bell
		.build();

	let mut editor = Editor::with_config(config)?;
	editor.set_helper(Some(CommandHelper::new()));
	Ok(editor)
}

/// Read one line from the user.
pub fn read_user_input(editor: &mut Editor<CommandHelper, DefaultHistory>) -> Result<InputEvent> {
	let prompt = "You: ".bright_blue().to_string();

	match editor.readline(&prompt) {
		Ok(line) => Ok(InputEvent::Line(line)),
		Err(ReadlineError::Interrupted) => Ok(InputEvent::Interrupted), // Ctrl+C
		Err(ReadlineError::Eof) => Ok(InputEvent::Eof),                 // Ctrl+D
		Err(err) => {
			// Terminal quirks (window resize and the like) should not end
			// the session
			log_error!("Error reading input: {:?}", err);
			Ok(InputEvent::Line(String::new()))
		}
	}
}
