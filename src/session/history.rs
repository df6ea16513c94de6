// Bounded conversation history

use std::collections::VecDeque;

use super::Message;

/// Ordered conversation history with a fixed capacity.
///
/// Insertion order is conversational order. When a push would leave the
/// buffer over capacity, the oldest entries are evicted from the front, so
/// the buffer always holds at most `capacity` of the most recent messages
/// in their original relative order.
#[derive(Debug)]
pub struct HistoryBuffer {
	messages: VecDeque<Message>,
	capacity: usize,
}

impl HistoryBuffer {
	pub fn new(capacity: usize) -> Self {
		Self {
			messages: VecDeque::with_capacity(capacity.saturating_add(1)),
			capacity,
		}
	}

	/// Append a message at the tail, evicting from the head while the
	/// buffer is over capacity. `len() <= capacity` holds on return.
	pub fn push(&mut self, message: Message) {
		self.messages.push_back(message);
		while self.messages.len() > self.capacity {
			self.messages.pop_front();
		}
	}

	/// Current contents, oldest first, for use as request context.
	pub fn to_vec(&self) -> Vec<Message> {
		self.messages.iter().cloned().collect()
	}

	pub fn iter(&self) -> impl Iterator<Item = &Message> {
		self.messages.iter()
	}

	pub fn clear(&mut self) {
		self.messages.clear();
	}

	pub fn len(&self) -> usize {
		self.messages.len()
	}

	pub fn is_empty(&self) -> bool {
		self.messages.is_empty()
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}
}
