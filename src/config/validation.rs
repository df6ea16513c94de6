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

use anyhow::{anyhow, Result};

use super::Config;

impl Config {
	/// Validate the configuration for common issues
	pub fn validate(&self) -> Result<()> {
		self.validate_history()?;
		self.validate_model_options()?;
		self.validate_generation_options()?;
		Ok(())
	}

	fn validate_history(&self) -> Result<()> {
		if self.history_size == 0 {
			return Err(anyhow!(
				"history_size cannot be 0. The session needs at least one message of context (default: 5)"
			));
		}
		if self.history_size > 10_000 {
			return Err(anyhow!(
				"history_size too high: {}. Maximum allowed: 10,000",
				self.history_size
			));
		}
		Ok(())
	}

	fn validate_model_options(&self) -> Result<()> {
		if self.model.path.as_os_str().is_empty() {
			return Err(anyhow!(
				"model.path is empty. Point it at a GGUF model file, e.g. models/mistral-7b-instruct-v0.2.Q4_K_M.gguf"
			));
		}
		if self.model.context_size == 0 {
			return Err(anyhow!(
				"model.context_size cannot be 0. Use a positive window size (default: 4096)"
			));
		}
		if self.model.batch_size == 0 {
			return Err(anyhow!(
				"model.batch_size cannot be 0. Use a positive batch size (default: 512)"
			));
		}
		if let Some(threads) = self.model.threads {
			if threads <= 0 {
				return Err(anyhow!(
					"model.threads must be positive when set, got {}. Remove it to let the native library decide",
					threads
				));
			}
		}
		Ok(())
	}

	fn validate_generation_options(&self) -> Result<()> {
		if self.generation.max_tokens == 0 {
			return Err(anyhow!(
				"generation.max_tokens cannot be 0. The model needs room to answer (default: 512)"
			));
		}
		if !(0.0..=2.0).contains(&self.generation.temperature) {
			return Err(anyhow!(
				"generation.temperature out of range: {}. Use 0.0 (greedy) through 2.0",
				self.generation.temperature
			));
		}
		if !(self.generation.top_p > 0.0 && self.generation.top_p <= 1.0) {
			return Err(anyhow!(
				"generation.top_p out of range: {}. Use a value in (0.0, 1.0]",
				self.generation.top_p
			));
		}
		Ok(())
	}
}
