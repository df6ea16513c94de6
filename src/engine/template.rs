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

// Chat prompt formatting for the model flavors we ship defaults for

use serde::{Deserialize, Serialize};

use crate::session::{Message, Role};

/// Prompt flavor used to render the conversation for the native tokenizer.
///
/// Special-token text (`[INST]`, `<|im_start|>`, ...) is emitted literally;
/// the tokenizer parses it back into the corresponding special tokens. The
/// leading BOS token is never emitted here, the engine asks the tokenizer
/// to add it.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PromptTemplate {
	/// Mistral-instruct: `[INST] ... [/INST] ...</s>`
	#[default]
	Mistral,
	/// ChatML: `<|im_start|>user\n...<|im_end|>`
	ChatMl,
	/// Llama-3: `<|start_header_id|>user<|end_header_id|>\n\n...<|eot_id|>`
	Llama3,
	/// Raw `User:` / `Assistant:` text for models without a chat format
	Plain,
}

impl PromptTemplate {
	pub fn as_str(&self) -> &'static str {
		match self {
			PromptTemplate::Mistral => "mistral",
			PromptTemplate::ChatMl => "chatml",
			PromptTemplate::Llama3 => "llama3",
			PromptTemplate::Plain => "plain",
		}
	}

	/// Render the system prompt plus the ordered conversation into one
	/// prompt string ending with an open assistant turn.
	///
	/// System text comes only through `system`; `Role::System` entries in
	/// the message list are skipped (the history never holds them).
	pub fn render(&self, system: Option<&str>, messages: &[Message]) -> String {
		match self {
			PromptTemplate::Mistral => render_mistral(system, messages),
			PromptTemplate::ChatMl => render_chatml(system, messages),
			PromptTemplate::Llama3 => render_llama3(system, messages),
			PromptTemplate::Plain => render_plain(system, messages),
		}
	}

	/// Patterns that indicate the model started a new turn on its own
	/// (i.e. the response is complete).
	pub fn stop_patterns(&self) -> &'static [&'static str] {
		match self {
			PromptTemplate::Mistral => &["[INST]", "</s>"],
			PromptTemplate::ChatMl => &["<|im_end|>", "<|im_start|>"],
			PromptTemplate::Llama3 => &["<|eot_id|>", "<|start_header_id|>"],
			PromptTemplate::Plain => &["\nUser:", "User:"],
		}
	}
}

fn render_mistral(system: Option<&str>, messages: &[Message]) -> String {
	let mut prompt = String::new();
	// Mistral has no system slot; fold it into the first instruction block
	let mut pending_system = system;
	for message in messages {
		match message.role {
			Role::User => {
				prompt.push_str("[INST] ");
				if let Some(sys) = pending_system.take() {
					prompt.push_str(sys);
					prompt.push_str("\n\n");
				}
				prompt.push_str(&message.content);
				prompt.push_str(" [/INST]");
			}
			Role::Assistant => {
				prompt.push(' ');
				prompt.push_str(&message.content);
				prompt.push_str("</s>");
			}
			Role::System => {}
		}
	}
	prompt
}

fn render_chatml(system: Option<&str>, messages: &[Message]) -> String {
	let mut prompt = String::new();
	if let Some(sys) = system {
		prompt.push_str(&format!("<|im_start|>system\n{}<|im_end|>\n", sys));
	}
	for message in messages {
		if message.role == Role::System {
			continue;
		}
		prompt.push_str(&format!(
			"<|im_start|>{}\n{}<|im_end|>\n",
			message.role.as_str(),
			message.content
		));
	}
	prompt.push_str("<|im_start|>assistant\n");
	prompt
}

fn render_llama3(system: Option<&str>, messages: &[Message]) -> String {
	let mut prompt = String::new();
	if let Some(sys) = system {
		prompt.push_str(&format!(
			"<|start_header_id|>system<|end_header_id|>\n\n{}<|eot_id|>",
			sys
		));
	}
	for message in messages {
		if message.role == Role::System {
			continue;
		}
		prompt.push_str(&format!(
			"<|start_header_id|>{}<|end_header_id|>\n\n{}<|eot_id|>",
			message.role.as_str(),
			message.content
		));
	}
	prompt.push_str("<|start_header_id|>assistant<|end_header_id|>\n\n");
	prompt
}

fn render_plain(system: Option<&str>, messages: &[Message]) -> String {
	let mut prompt = String::new();
	if let Some(sys) = system {
		prompt.push_str(&format!("System: {}\n\n", sys));
	}
	for message in messages {
		match message.role {
			Role::User => prompt.push_str(&format!("User: {}\n", message.content)),
			Role::Assistant => prompt.push_str(&format!("Assistant: {}\n", message.content)),
			Role::System => {}
		}
	}
	prompt.push_str("Assistant:");
	prompt
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample_history() -> Vec<Message> {
		vec![
			Message::user("hello"),
			Message::assistant("hi there"),
			Message::user("how are you?"),
		]
	}

	#[test]
	fn test_mistral_render() {
		let prompt = PromptTemplate::Mistral.render(None, &sample_history());
		assert_eq!(
			prompt,
			"[INST] hello [/INST] hi there</s>[INST] how are you? [/INST]"
		);
	}

	#[test]
	fn test_mistral_folds_system_into_first_instruction() {
		let prompt = PromptTemplate::Mistral.render(Some("be brief"), &sample_history());
		assert!(prompt.starts_with("[INST] be brief\n\nhello [/INST]"));
		// Only the first instruction block carries the system text
		assert_eq!(prompt.matches("be brief").count(), 1);
	}

	#[test]
	fn test_chatml_render() {
		let prompt = PromptTemplate::ChatMl.render(Some("be brief"), &sample_history());
		assert_eq!(
			prompt,
			"<|im_start|>system\nbe brief<|im_end|>\n\
			 <|im_start|>user\nhello<|im_end|>\n\
			 <|im_start|>assistant\nhi there<|im_end|>\n\
			 <|im_start|>user\nhow are you?<|im_end|>\n\
			 <|im_start|>assistant\n"
		);
	}

	#[test]
	fn test_llama3_render_ends_with_open_assistant_header() {
		let prompt = PromptTemplate::Llama3.render(None, &sample_history());
		assert!(prompt.starts_with("<|start_header_id|>user<|end_header_id|>\n\nhello<|eot_id|>"));
		assert!(prompt.ends_with("<|start_header_id|>assistant<|end_header_id|>\n\n"));
	}

	#[test]
	fn test_plain_render() {
		let prompt = PromptTemplate::Plain.render(None, &sample_history());
		assert_eq!(
			prompt,
			"User: hello\nAssistant: hi there\nUser: how are you?\nAssistant:"
		);
	}

	#[test]
	fn test_stop_patterns_are_nonempty_for_every_flavor() {
		for template in [
			PromptTemplate::Mistral,
			PromptTemplate::ChatMl,
			PromptTemplate::Llama3,
			PromptTemplate::Plain,
		] {
			assert!(!template.stop_patterns().is_empty());
		}
	}

	#[test]
	fn test_template_names_parse_from_config() {
		#[derive(Deserialize)]
		struct Wrap {
			template: PromptTemplate,
		}
		let parsed: Wrap = toml::from_str("template = \"chatml\"").unwrap();
		assert_eq!(parsed.template, PromptTemplate::ChatMl);
		let parsed: Wrap = toml::from_str("template = \"llama3\"").unwrap();
		assert_eq!(parsed.template, PromptTemplate::Llama3);
		assert_eq!(PromptTemplate::default(), PromptTemplate::Mistral);
	}
}
