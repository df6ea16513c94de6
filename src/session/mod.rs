// Session module for interactive chat sessions

pub mod chat; // Chat session loop
mod chat_helper; // Chat command completion
pub mod history; // Bounded conversation history

pub use history::HistoryBuffer;

use serde::{Deserialize, Serialize};

/// Originator of a conversation message. The history only ever holds
/// `User`/`Assistant` entries; the configured system prompt travels
/// alongside the message list and `System` exists for rendering it.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
	System,
	User,
	Assistant,
}

impl Role {
	pub fn as_str(&self) -> &'static str {
		match self {
			Role::System => "system",
			Role::User => "user",
			Role::Assistant => "assistant",
		}
	}
}

/// One conversation message. Immutable once created: the session only
/// appends messages and evicts them from the history head, never edits.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Message {
	pub role: Role,
	pub content: String,
}

impl Message {
	pub fn user(content: impl Into<String>) -> Self {
		Self {
			role: Role::User,
			content: content.into(),
		}
	}

	pub fn assistant(content: impl Into<String>) -> Self {
		Self {
			role: Role::Assistant,
			content: content.into(),
		}
	}
}
