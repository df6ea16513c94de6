// Chat session module

pub mod animation;
pub mod commands;
pub mod input;
pub mod runner;

pub use commands::COMMANDS;
pub use runner::run_interactive_session;
