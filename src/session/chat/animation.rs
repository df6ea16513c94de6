// Loading animation module

use anyhow::Result;
use colored::*;
use crossterm::{
	cursor,
	terminal::{Clear, ClearType},
	ExecutableCommand,
};
use std::io::{stdout, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const LOADING_FRAMES: [&str; 8] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧"];

/// Spin until the flag is set, then erase the status line.
pub async fn show_loading_animation(cancel_flag: Arc<AtomicBool>) -> Result<()> {
	let mut stdout = stdout();
	let mut frame_index = 0;

	stdout.execute(cursor::SavePosition)?;

	while !cancel_flag.load(Ordering::SeqCst) {
		let frame = LOADING_FRAMES[frame_index % LOADING_FRAMES.len()];

		stdout.execute(cursor::RestorePosition)?;
		print!(" {} {}", frame.cyan(), "Thinking...".bright_blue());
		stdout.flush()?;

		frame_index += 1;
		tokio::time::sleep(Duration::from_millis(100)).await;
	}

	// Clear the animation before the response is printed
	stdout.execute(cursor::RestorePosition)?;
	stdout.execute(Clear(ClearType::UntilNewLine))?;
	stdout.flush()?;

	Ok(())
}
