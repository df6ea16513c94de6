// Interactive session runner

use anyhow::Result;
use colored::*;
use std::io::IsTerminal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::animation::show_loading_animation;
use super::commands::{classify_input, process_command, InputAction};
use super::input::{build_editor, read_user_input, InputEvent};
use crate::config::Config;
use crate::engine::{CompletionRequest, ModelEngine};
use crate::session::{HistoryBuffer, Message};
use crate::{log_debug, log_info};

/// What the loop should do after one line of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopControl {
	Continue,
	Exit,
}

/// Run the interactive chat loop until the user exits or interrupts.
pub async fn run_interactive_session(engine: Arc<dyn ModelEngine>, config: &Config) -> Result<()> {
	let mut history = HistoryBuffer::new(config.history_size);

	// Set up Ctrl+C handling: the handler only records the signal, the
	// loop and the engine poll the flag and shut down in order
	let ctrl_c_pressed = Arc::new(AtomicBool::new(false));
	let ctrl_c_clone = ctrl_c_pressed.clone();
	ctrlc::set_handler(move || {
		ctrl_c_clone.store(true, Ordering::SeqCst);
	})
	.expect("Error setting Ctrl+C handler");

	log_info!("Engine: {}", engine.name());
	log_info!("Model: {}", engine.describe());

	println!(
		"{}",
		"Chatbot ready! Type 'exit' or 'quit' to stop.".bright_green()
	);
	println!("Type /help for available commands.");

	let mut editor = build_editor()?;

	loop {
		if ctrl_c_pressed.load(Ordering::SeqCst) {
			print_interrupt_farewell();
			break;
		}

		match read_user_input(&mut editor)? {
			InputEvent::Interrupted => {
				print_interrupt_farewell();
				break;
			}
			InputEvent::Eof => {
				print_farewell();
				break;
			}
			InputEvent::Line(line) => {
				let control =
					handle_line(&line, &engine, &mut history, config, &ctrl_c_pressed).await?;
				if control == LoopControl::Exit {
					break;
				}
			}
		}
	}

	Ok(())
}

/// Handle one line of input: ignore noise, honor exit keywords, dispatch
/// slash commands, and send everything else to the model.
pub(crate) async fn handle_line(
	line: &str,
	engine: &Arc<dyn ModelEngine>,
	history: &mut HistoryBuffer,
	config: &Config,
	interrupted: &Arc<AtomicBool>,
) -> Result<LoopControl> {
	match classify_input(line) {
		InputAction::Noise => Ok(LoopControl::Continue),
		InputAction::Exit => {
			print_farewell();
			Ok(LoopControl::Exit)
		}
		InputAction::Command(command) => {
			if process_command(&command, history, engine.as_ref())? {
				print_farewell();
				Ok(LoopControl::Exit)
			} else {
				Ok(LoopControl::Continue)
			}
		}
		InputAction::Prompt(text) => {
			run_turn(text, engine, history, config, interrupted).await?;
			if interrupted.load(Ordering::SeqCst) {
				print_interrupt_farewell();
				return Ok(LoopControl::Exit);
			}
			Ok(LoopControl::Continue)
		}
	}
}

/// One full turn: append the user message, call the engine with the whole
/// buffered conversation, then print and append the response. A failed
/// generation is reported and the loop keeps going; the user message stays
/// in history either way.
async fn run_turn(
	text: String,
	engine: &Arc<dyn ModelEngine>,
	history: &mut HistoryBuffer,
	config: &Config,
	interrupted: &Arc<AtomicBool>,
) -> Result<()> {
	if history.len() == history.capacity() {
		log_debug!("History at capacity, evicting the oldest message");
	}
	history.push(Message::user(text));

	let request = CompletionRequest {
		messages: history.to_vec(),
		system_prompt: config.system_prompt.clone(),
		options: config.generation.clone(),
	};
	// The render only runs when debug logging is enabled; the macro
	// evaluates its arguments inside the level gate
	log_debug!(
		"Dispatching {} buffered messages ({} rendered prompt chars)",
		request.messages.len(),
		config
			.model
			.template
			.render(config.system_prompt.as_deref(), &request.messages)
			.len()
	);

	// Loading animation while the request is in flight, skipped when
	// output is piped
	let animation_stop = Arc::new(AtomicBool::new(false));
	let animation_task = if std::io::stdout().is_terminal() {
		let animation_cancel = animation_stop.clone();
		Some(tokio::spawn(async move {
			let _ = show_loading_animation(animation_cancel).await;
		}))
	} else {
		None
	};

	let result = engine.complete(request, interrupted.clone()).await;

	// Stop the animation before printing anything
	animation_stop.store(true, Ordering::SeqCst);
	if let Some(task) = animation_task {
		let _ = task.await;
	}

	// An interrupt mid-generation abandons the response: the caller ends
	// the session and nothing is appended
	if interrupted.load(Ordering::SeqCst) {
		return Ok(());
	}

	match result {
		Ok(completion) => {
			println!("{} {}", "Bot:".bright_green(), completion.content);
			log_info!(
				"Generated {} tokens from {} prompt tokens in {} ms",
				completion.usage.output_tokens,
				completion.usage.prompt_tokens,
				completion.usage.generation_time_ms.unwrap_or(0)
			);
			history.push(Message::assistant(completion.content));
		}
		Err(e) => {
			println!("{} {}", "⚠️ Error:".bright_red(), e);
		}
	}

	Ok(())
}

fn print_farewell() {
	println!("{}", "Exiting chatbot. Goodbye!".bright_green());
}

fn print_interrupt_farewell() {
	println!("{}", "\nChatbot interrupted. Exiting...".bright_yellow());
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::engine::{Completion, TokenUsage};
	use crate::session::Role;
	use std::sync::Mutex;

	struct MockEngine {
		fail: bool,
		calls: Mutex<Vec<CompletionRequest>>,
	}

	impl MockEngine {
		fn new() -> Self {
			Self {
				fail: false,
				calls: Mutex::new(Vec::new()),
			}
		}

		fn failing() -> Self {
			Self {
				fail: true,
				calls: Mutex::new(Vec::new()),
			}
		}

		fn call_count(&self) -> usize {
			self.calls.lock().unwrap().len()
		}

		fn last_request(&self) -> CompletionRequest {
			self.calls.lock().unwrap().last().cloned().unwrap()
		}
	}

	#[async_trait::async_trait]
	impl ModelEngine for MockEngine {
		fn name(&self) -> &str {
			"mock"
		}

		fn describe(&self) -> String {
			"mock model".to_string()
		}

		async fn complete(
			&self,
			request: CompletionRequest,
			_cancel: Arc<AtomicBool>,
		) -> Result<Completion> {
			let reply = format!("reply {}", self.call_count() + 1);
			self.calls.lock().unwrap().push(request);
			if self.fail {
				anyhow::bail!("mock generation failure");
			}
			Ok(Completion {
				content: reply,
				usage: TokenUsage::default(),
			})
		}
	}

	fn test_config(history_size: usize) -> Config {
		Config {
			history_size,
			..Default::default()
		}
	}

	#[tokio::test]
	async fn test_turn_appends_user_then_assistant() {
		let engine: Arc<dyn ModelEngine> = Arc::new(MockEngine::new());
		let mut history = HistoryBuffer::new(5);
		let config = test_config(5);
		let interrupted = Arc::new(AtomicBool::new(false));

		let control = handle_line("hello", &engine, &mut history, &config, &interrupted)
			.await
			.unwrap();

		assert_eq!(control, LoopControl::Continue);
		let messages = history.to_vec();
		assert_eq!(messages.len(), 2);
		assert_eq!(messages[0].role, Role::User);
		assert_eq!(messages[0].content, "hello");
		assert_eq!(messages[1].role, Role::Assistant);
		assert_eq!(messages[1].content, "reply 1");
	}

	#[tokio::test]
	async fn test_failed_turn_keeps_user_message_and_continues() {
		let mock = Arc::new(MockEngine::failing());
		let engine: Arc<dyn ModelEngine> = mock.clone();
		let mut history = HistoryBuffer::new(5);
		let config = test_config(5);
		let interrupted = Arc::new(AtomicBool::new(false));

		let control = handle_line("hello", &engine, &mut history, &config, &interrupted)
			.await
			.unwrap();

		assert_eq!(control, LoopControl::Continue);
		assert_eq!(mock.call_count(), 1);
		let messages = history.to_vec();
		assert_eq!(messages.len(), 1);
		assert_eq!(messages[0].role, Role::User);
		assert_eq!(messages[0].content, "hello");
	}

	#[tokio::test]
	async fn test_whitespace_input_never_reaches_the_engine() {
		let mock = Arc::new(MockEngine::new());
		let engine: Arc<dyn ModelEngine> = mock.clone();
		let mut history = HistoryBuffer::new(5);
		let config = test_config(5);
		let interrupted = Arc::new(AtomicBool::new(false));

		let control = handle_line("   ", &engine, &mut history, &config, &interrupted)
			.await
			.unwrap();

		assert_eq!(control, LoopControl::Continue);
		assert_eq!(mock.call_count(), 0);
		assert!(history.is_empty());
	}

	#[tokio::test]
	async fn test_exit_keyword_terminates_without_invocation() {
		for line in ["exit", "EXIT", " Quit "] {
			let mock = Arc::new(MockEngine::new());
			let engine: Arc<dyn ModelEngine> = mock.clone();
			let mut history = HistoryBuffer::new(5);
			let config = test_config(5);
			let interrupted = Arc::new(AtomicBool::new(false));

			let control = handle_line(line, &engine, &mut history, &config, &interrupted)
				.await
				.unwrap();

			assert_eq!(control, LoopControl::Exit);
			assert_eq!(mock.call_count(), 0);
			assert!(history.is_empty());
		}
	}

	#[tokio::test]
	async fn test_engine_sees_the_bounded_conversation() {
		let mock = Arc::new(MockEngine::new());
		let engine: Arc<dyn ModelEngine> = mock.clone();
		let mut history = HistoryBuffer::new(2);
		let config = test_config(2);
		let interrupted = Arc::new(AtomicBool::new(false));

		for prompt in ["one", "two", "three", "four"] {
			handle_line(prompt, &engine, &mut history, &config, &interrupted)
				.await
				.unwrap();
		}

		assert_eq!(mock.call_count(), 4);
		let request = mock.last_request();
		assert!(request.messages.len() <= 2);
		// The newest user message survives eviction
		assert_eq!(request.messages.last().unwrap().content, "four");
	}

	#[tokio::test]
	async fn test_interrupted_turn_discards_the_response_and_exits() {
		let mock = Arc::new(MockEngine::new());
		let engine: Arc<dyn ModelEngine> = mock.clone();
		let mut history = HistoryBuffer::new(5);
		let config = test_config(5);
		let interrupted = Arc::new(AtomicBool::new(true));

		let control = handle_line("hello", &engine, &mut history, &config, &interrupted)
			.await
			.unwrap();

		assert_eq!(control, LoopControl::Exit);
		// The user message is appended but no assistant message follows
		let messages = history.to_vec();
		assert_eq!(messages.len(), 1);
		assert_eq!(messages[0].role, Role::User);
	}

	#[tokio::test]
	async fn test_slash_commands_never_reach_the_engine() {
		let mock = Arc::new(MockEngine::new());
		let engine: Arc<dyn ModelEngine> = mock.clone();
		let mut history = HistoryBuffer::new(5);
		let config = test_config(5);
		let interrupted = Arc::new(AtomicBool::new(false));

		let control = handle_line("/help", &engine, &mut history, &config, &interrupted)
			.await
			.unwrap();

		assert_eq!(control, LoopControl::Continue);
		assert_eq!(mock.call_count(), 0);
	}

	#[tokio::test]
	async fn test_exit_command_terminates_the_loop() {
		let engine: Arc<dyn ModelEngine> = Arc::new(MockEngine::new());
		let mut history = HistoryBuffer::new(5);
		let config = test_config(5);
		let interrupted = Arc::new(AtomicBool::new(false));

		let control = handle_line("/exit", &engine, &mut history, &config, &interrupted)
			.await
			.unwrap();

		assert_eq!(control, LoopControl::Exit);
	}

	#[tokio::test]
	async fn test_turn_logs_with_debug_level_enabled() {
		let engine: Arc<dyn ModelEngine> = Arc::new(MockEngine::new());
		let mut history = HistoryBuffer::new(5);
		let config = Config {
			log_level: crate::config::LogLevel::Debug,
			system_prompt: Some("be brief".to_string()),
			..Default::default()
		};
		// The tokio test runtime is single-threaded, so the thread-local
		// config is visible to the turn and the debug path (including the
		// prompt render for the size line) executes
		crate::config::set_thread_config(&config);
		let interrupted = Arc::new(AtomicBool::new(false));

		let control = handle_line("hello", &engine, &mut history, &config, &interrupted)
			.await
			.unwrap();

		assert_eq!(control, LoopControl::Continue);
		assert_eq!(history.len(), 2);
	}

	#[tokio::test]
	async fn test_system_prompt_travels_with_the_request() {
		let mock = Arc::new(MockEngine::new());
		let engine: Arc<dyn ModelEngine> = mock.clone();
		let mut history = HistoryBuffer::new(5);
		let config = Config {
			system_prompt: Some("You are terse.".to_string()),
			..Default::default()
		};
		let interrupted = Arc::new(AtomicBool::new(false));

		handle_line("hello", &engine, &mut history, &config, &interrupted)
			.await
			.unwrap();

		assert_eq!(
			mock.last_request().system_prompt.as_deref(),
			Some("You are terse.")
		);
	}
}
