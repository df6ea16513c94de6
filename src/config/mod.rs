// Copyright 2025 Muvon Un Limited
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::path::PathBuf;

// Re-export all modules
pub mod loading;
pub mod validation;

use crate::engine::{GenerationOptions, ModelOptions};


#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum LogLevel {
	#[serde(rename = "none")]
	None,
	#[serde(rename = "info")]
	Info,
	#[serde(rename = "debug")]
	Debug,
}

impl Default for LogLevel {
	fn default() -> Self {
		Self::None
	}
}

impl LogLevel {
	/// Check if info logging is enabled
	pub fn is_info_enabled(&self) -> bool {
		matches!(self, LogLevel::Info | LogLevel::Debug)
	}

	/// Check if debug logging is enabled
	pub fn is_debug_enabled(&self) -> bool {
		matches!(self, LogLevel::Debug)
	}
}

// Default functions
fn default_history_size() -> usize {
	5 // Conversation messages kept as generation context
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
	// Root-level log level setting
	#[serde(default)]
	pub log_level: LogLevel,

	// How many conversation messages are kept as generation context
	#[serde(default = "default_history_size")]
	pub history_size: usize,

	// Optional system prompt rendered ahead of the conversation
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub system_prompt: Option<String>,

	// Engine construction options, handed to the native library unchanged
	#[serde(default)]
	pub model: ModelOptions,

	// Per-request sampling parameters
	#[serde(default)]
	pub generation: GenerationOptions,

	// Runtime-only: where this config was loaded from
	#[serde(skip)]
	pub config_path: Option<PathBuf>,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			log_level: LogLevel::default(),
			history_size: default_history_size(),
			system_prompt: None,
			model: ModelOptions::default(),
			generation: GenerationOptions::default(),
			config_path: None,
		}
	}
}

impl Config {
	/// Get the effective log level
	pub fn get_log_level(&self) -> LogLevel {
		self.log_level.clone()
	}
}

// Logging macros for different log levels
// These macros automatically check the current log level and only print if appropriate

thread_local! {
	static CURRENT_CONFIG: RefCell<Option<Config>> = const { RefCell::new(None) };
}

/// Set the current config for the thread (to be used by logging macros)
pub fn set_thread_config(config: &Config) {
	CURRENT_CONFIG.with(|c| {
		*c.borrow_mut() = Some(config.clone());
	});
}

/// Get the current config for the thread
pub fn with_thread_config<F, R>(f: F) -> Option<R>
where
	F: FnOnce(&Config) -> R,
{
	CURRENT_CONFIG.with(|c| (*c.borrow()).as_ref().map(f))
}

/// Info logging macro with automatic cyan coloring
/// Shows info messages when log level is Info OR Debug
#[macro_export]
macro_rules! log_info {
	($fmt:expr) => {
		if let Some(should_log) = $crate::config::with_thread_config(|config| config.get_log_level().is_info_enabled()) {
		if should_log {
		use colored::Colorize;
		println!("{}", $fmt.cyan());
		}
		}
	};
	($fmt:expr, $($arg:expr),*) => {
		if let Some(should_log) = $crate::config::with_thread_config(|config| config.get_log_level().is_info_enabled()) {
		if should_log {
		use colored::Colorize;
	println!("{}", format!($fmt, $($arg),*).cyan());
	}
	}
	};
}

/// Debug logging macro with automatic bright blue coloring
#[macro_export]
macro_rules! log_debug {
	($fmt:expr) => {
		if let Some(should_log) = $crate::config::with_thread_config(|config| config.get_log_level().is_debug_enabled()) {
		if should_log {
		use colored::Colorize;
		println!("{}", $fmt.bright_blue());
		}
		}
	};
	($fmt:expr, $($arg:expr),*) => {
		if let Some(should_log) = $crate::config::with_thread_config(|config| config.get_log_level().is_debug_enabled()) {
		if should_log {
		use colored::Colorize;
	println!("{}", format!($fmt, $($arg),*).bright_blue());
	}
	}
	};
}

/// Error logging macro with automatic bright red coloring
/// Always visible regardless of log level (errors should always be shown)
#[macro_export]
macro_rules! log_error {
	($fmt:expr) => {{
		use colored::Colorize;
		eprintln!("{}", $fmt.bright_red());
		}};
	($fmt:expr, $($arg:expr),*) => {{
		use colored::Colorize;
		eprintln!("{}", format!($fmt, $($arg),*).bright_red());
		}};
}
