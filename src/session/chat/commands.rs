// Commands module - command constants and input classification

use anyhow::Result;
use colored::*;

use crate::engine::ModelEngine;
use crate::session::{HistoryBuffer, Role};

// Command constants
pub const HELP_COMMAND: &str = "/help";
pub const CLEAR_COMMAND: &str = "/clear";
pub const HISTORY_COMMAND: &str = "/history";
pub const MODEL_COMMAND: &str = "/model";
pub const EXIT_COMMAND: &str = "/exit";
pub const QUIT_COMMAND: &str = "/quit";

// All available commands for completion
pub const COMMANDS: [&str; 6] = [
	HELP_COMMAND,
	CLEAR_COMMAND,
	HISTORY_COMMAND,
	MODEL_COMMAND,
	EXIT_COMMAND,
	QUIT_COMMAND,
];

/// What a line of user input asks the session to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
	/// Whitespace-only input, ignored without output
	Noise,
	/// A bare exit keyword ("exit" or "quit", any case)
	Exit,
	/// A slash command to dispatch
	Command(String),
	/// Regular prompt text for the model
	Prompt(String),
}

/// Classify one line of input. Exit keywords are matched after trimming
/// and ignoring case, so " Quit " ends the session just like "exit".
pub fn classify_input(line: &str) -> InputAction {
	let trimmed = line.trim();

	if trimmed.is_empty() {
		return InputAction::Noise;
	}

	if trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit") {
		return InputAction::Exit;
	}

	if trimmed.starts_with('/') {
		return InputAction::Command(trimmed.to_string());
	}

	InputAction::Prompt(trimmed.to_string())
}

/// Process a slash command. Returns true if the session should exit.
pub fn process_command(
	input: &str,
	history: &mut HistoryBuffer,
	engine: &dyn ModelEngine,
) -> Result<bool> {
	let input_parts: Vec<&str> = input.split_whitespace().collect();
	if input_parts.is_empty() {
		return Ok(false);
	}
	let command = input_parts[0];

	match command {
		EXIT_COMMAND | QUIT_COMMAND => Ok(true),
		HELP_COMMAND => handle_help(),
		CLEAR_COMMAND => handle_clear(history),
		HISTORY_COMMAND => handle_history(history),
		MODEL_COMMAND => handle_model(engine),
		_ => {
			println!(
				"{}",
				format!("Unknown command: {}. Type /help for available commands.", command)
					.yellow()
			);
			Ok(false)
		}
	}
}

fn handle_help() -> Result<bool> {
	println!("{}", "\nAvailable commands:\n".bright_cyan());
	println!("{} - Show this help message", HELP_COMMAND.cyan());
	println!("{} - Clear the conversation history", CLEAR_COMMAND.cyan());
	println!("{} - Show the buffered conversation", HISTORY_COMMAND.cyan());
	println!("{} - Show the loaded model", MODEL_COMMAND.cyan());
	println!(
		"{} - End the session (same as typing 'exit' or 'quit')",
		EXIT_COMMAND.cyan()
	);
	println!();
	Ok(false)
}

fn handle_clear(history: &mut HistoryBuffer) -> Result<bool> {
	history.clear();
	println!("{}", "Conversation history cleared.".bright_green());
	Ok(false)
}

fn handle_history(history: &HistoryBuffer) -> Result<bool> {
	if history.is_empty() {
		println!("{}", "No conversation yet.".yellow());
		return Ok(false);
	}

	println!(
		"{}",
		format!(
			"\nBuffered conversation ({} of {} messages):\n",
			history.len(),
			history.capacity()
		)
		.bright_cyan()
	);
	for (index, message) in history.iter().enumerate() {
		let label = match message.role {
			Role::User => "You".bright_blue(),
			Role::Assistant => "Bot".bright_green(),
			Role::System => "System".cyan(),
		};
		println!("{:>2}. {}: {}", index + 1, label, message.content);
	}
	println!();
	Ok(false)
}

fn handle_model(engine: &dyn ModelEngine) -> Result<bool> {
	println!("{} {}", "Model:".cyan(), engine.describe());
	Ok(false)
}
