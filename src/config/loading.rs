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

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use super::Config;

impl Config {
	/// Load configuration from the system-wide config file
	pub fn load() -> Result<Self> {
		let config_path = crate::directories::get_config_file_path()?;

		if config_path.exists() {
			let config_str = fs::read_to_string(&config_path).context(format!(
				"Failed to read config from {}",
				config_path.display()
			))?;
			let mut config: Config =
				toml::from_str(&config_str).context("Failed to parse TOML configuration")?;

			// Store the config path for future saves
			config.config_path = Some(config_path);

			// Environment variables take precedence over config file values
			config.apply_env_overrides();

			// Validate the loaded configuration
			if let Err(e) = config.validate() {
				eprintln!("Configuration validation warning: {}", e);
				eprintln!("The application will continue, but you may want to fix these issues.");
			}

			Ok(config)
		} else {
			// No config file yet: run on defaults plus environment overrides
			let mut config = Self::default();
			config.config_path = Some(config_path);
			config.apply_env_overrides();

			Ok(config)
		}
	}

	fn apply_env_overrides(&mut self) {
		if let Ok(model_path) = std::env::var("OCTOLLAMA_MODEL") {
			self.model.path = PathBuf::from(model_path);
		}
	}

	/// Save configuration to file
	pub fn save(&self) -> Result<()> {
		// Validate before saving
		self.validate()?;

		// Use the stored config path, or fallback to system-wide default
		let config_path = if let Some(path) = &self.config_path {
			path.clone()
		} else {
			crate::directories::get_config_file_path()?
		};

		// Ensure the parent directory exists
		if let Some(parent) = config_path.parent() {
			fs::create_dir_all(parent).context(format!(
				"Failed to create config directory: {}",
				parent.display()
			))?;
		}

		// Serialize to TOML
		let config_str =
			toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

		// Write to file
		fs::write(&config_path, config_str).context(format!(
			"Failed to write config to {}",
			config_path.display()
		))?;

		println!("Configuration saved to {}", config_path.display());
		Ok(())
	}

	pub fn create_default_config() -> Result<PathBuf> {
		let config_path = crate::directories::get_config_file_path()?;

		if !config_path.exists() {
			let config = Config::default();
			let config_str = toml::to_string_pretty(&config)
				.context("Failed to serialize default configuration to TOML")?;

			fs::write(&config_path, config_str).context(format!(
				"Failed to write default config to {}",
				config_path.display()
			))?;

			println!("Created default configuration at {}", config_path.display());
		}

		Ok(config_path)
	}
}
