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

// Engine abstraction over the native inference library

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::session::Message;

pub mod llama;
pub mod template;

pub use llama::LlamaEngine;
pub use template::PromptTemplate;

/// Token accounting for a single completion
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct TokenUsage {
	pub prompt_tokens: u64, // ALL tokens in the rendered prompt (system + history)
	pub output_tokens: u64, // Generated response tokens only
	pub total_tokens: u64,  // prompt_tokens + output_tokens
	// Time tracking
	#[serde(default)]
	pub generation_time_ms: Option<u64>, // Wall time spent inside the engine call
}

/// Per-request sampling and length parameters
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GenerationOptions {
	#[serde(default = "default_max_tokens")]
	pub max_tokens: u32,
	#[serde(default = "default_temperature")]
	pub temperature: f32,
	#[serde(default = "default_top_p")]
	pub top_p: f32,
	#[serde(default)]
	pub stop: Vec<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub seed: Option<u32>,
}

fn default_max_tokens() -> u32 {
	512
}

fn default_temperature() -> f32 {
	0.7
}

fn default_top_p() -> f32 {
	0.95
}

impl Default for GenerationOptions {
	fn default() -> Self {
		Self {
			max_tokens: default_max_tokens(),
			temperature: default_temperature(),
			top_p: default_top_p(),
			stop: Vec::new(),
			seed: None,
		}
	}
}

/// Construction-time engine options, passed through to the native library
/// unchanged
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ModelOptions {
	#[serde(default = "default_model_path")]
	pub path: PathBuf,
	#[serde(default = "default_context_size")]
	pub context_size: u32,
	#[serde(default = "default_batch_size")]
	pub batch_size: u32,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub threads: Option<i32>, // None: let the native library pick
	#[serde(default = "default_gpu_layers")]
	pub gpu_layers: u32,
	#[serde(default)]
	pub template: PromptTemplate,
	#[serde(default)]
	pub verbose: bool, // Pass native library logs through to stderr
}

fn default_model_path() -> PathBuf {
	PathBuf::from("models/mistral-7b-instruct-v0.2.Q4_K_M.gguf")
}

fn default_context_size() -> u32 {
	4096
}

fn default_batch_size() -> u32 {
	512
}

fn default_gpu_layers() -> u32 {
	35
}

impl Default for ModelOptions {
	fn default() -> Self {
		Self {
			path: default_model_path(),
			context_size: default_context_size(),
			batch_size: default_batch_size(),
			threads: None,
			gpu_layers: default_gpu_layers(),
			template: PromptTemplate::default(),
			verbose: false,
		}
	}
}

/// One generation request: the ordered conversation (oldest first) plus
/// sampling parameters. The optional system prompt is rendered ahead of
/// the history by the prompt template.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
	pub messages: Vec<Message>,
	pub system_prompt: Option<String>,
	pub options: GenerationOptions,
}

/// Engine response for a single turn
#[derive(Debug, Clone)]
pub struct Completion {
	pub content: String,
	pub usage: TokenUsage,
}

/// Trait the chat loop depends on; implemented by the llama.cpp engine
/// and by test doubles
#[async_trait::async_trait]
pub trait ModelEngine: Send + Sync {
	/// Get the engine name (e.g. "llama.cpp")
	fn name(&self) -> &str;

	/// One-line description of the loaded model for display
	fn describe(&self) -> String;

	/// Run one completion over the full conversation context.
	///
	/// The engine polls `cancel` between sampling steps and returns early
	/// with whatever was generated so far once the flag is set. The caller
	/// decides what to do with an interrupted result; the session loop
	/// discards it.
	async fn complete(
		&self,
		request: CompletionRequest,
		cancel: Arc<AtomicBool>,
	) -> Result<Completion>;
}

/// Byte offset of the earliest stop-pattern occurrence in `text`, if any.
/// Empty patterns never match.
pub fn find_stop(text: &str, patterns: &[&str]) -> Option<usize> {
	patterns
		.iter()
		.filter(|p| !p.is_empty())
		.filter_map(|p| text.find(p))
		.min()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_find_stop_earliest_match_wins() {
		let text = "hello [INST] world </s>";
		assert_eq!(find_stop(text, &["</s>", "[INST]"]), Some(6));
	}

	#[test]
	fn test_find_stop_no_match() {
		assert_eq!(find_stop("plain answer", &["</s>", "[INST]"]), None);
	}

	#[test]
	fn test_find_stop_ignores_empty_patterns() {
		assert_eq!(find_stop("anything", &[""]), None);
	}

	#[test]
	fn test_generation_options_defaults_from_empty_toml() {
		let options: GenerationOptions = toml::from_str("").unwrap();
		assert_eq!(options.max_tokens, 512);
		assert!((options.temperature - 0.7).abs() < f32::EPSILON);
		assert!((options.top_p - 0.95).abs() < f32::EPSILON);
		assert!(options.stop.is_empty());
		assert!(options.seed.is_none());
	}

	#[test]
	fn test_model_options_defaults_from_empty_toml() {
		let options: ModelOptions = toml::from_str("").unwrap();
		assert_eq!(options.context_size, 4096);
		assert_eq!(options.batch_size, 512);
		assert_eq!(options.gpu_layers, 35);
		assert!(options.threads.is_none());
		assert!(!options.verbose);
		assert_eq!(
			options.path,
			PathBuf::from("models/mistral-7b-instruct-v0.2.Q4_K_M.gguf")
		);
	}
}
