// Main entry point for the octollama chatbot

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;

use octollama::config::{set_thread_config, Config};
use octollama::engine::LlamaEngine;
use octollama::log_info;
use octollama::session::chat::run_interactive_session;

#[derive(Parser)]
#[command(name = "octollama")]
#[command(version)]
#[command(about = "Offline terminal chatbot for local GGUF models")]
struct OctollamaArgs {
	#[command(subcommand)]
	command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
	/// Create the default configuration file and show where it lives
	Config,
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = OctollamaArgs::parse();

	// Load configuration; the model path comes from the config file or
	// the OCTOLLAMA_MODEL environment override, never from flags
	let config = Config::load()?;
	set_thread_config(&config);

	// Handle the config command separately
	if let Some(Commands::Config) = args.command {
		let config_path = Config::create_default_config()?;
		octollama::directories::print_directory_info()?;
		println!("  Config File: {}", config_path.display());
		println!();
		println!("Effective settings:");
		print!("{}", toml::to_string_pretty(&config)?);
		return Ok(());
	}

	config.validate()?;

	log_info!("Loading model from {}", config.model.path.display());
	let engine = LlamaEngine::load(config.model.clone())?;

	run_interactive_session(Arc::new(engine), &config).await
}
