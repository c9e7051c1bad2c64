//! Ordered, append-only message log with write-through mirroring.
//!
//! A message's index is its position, assigned at append time and stable for
//! the life of the store. Contents change only through
//! [`replace_content`](MessageStore::replace_content); messages are never
//! reordered or removed.

use crate::agent::events::{ChatEvent, EventHandler};
use crate::chat::mirror::Mirror;
use crate::{Message, MessageRole};
use std::sync::Arc;

pub struct MessageStore {
    messages: Vec<Message>,
    mirror: Box<dyn Mirror>,
    events: Arc<dyn EventHandler>,
}

impl MessageStore {
    pub fn new(mirror: Box<dyn Mirror>, events: Arc<dyn EventHandler>) -> Self {
        Self {
            messages: Vec::new(),
            mirror,
            events,
        }
    }

    /// Append a message and return its index (the length before the append).
    ///
    /// The message is written through to the mirror. A mirror failure is
    /// reported as a [`ChatEvent::MirrorWriteFailed`] event and does not undo
    /// the append.
    pub fn append(&mut self, role: MessageRole, content: impl Into<String>) -> usize {
        let index = self.messages.len();
        self.messages.push(Message::new(role, content));

        if let Err(error) = self.mirror.append(index, &self.messages[index]) {
            self.events
                .on_event(&ChatEvent::MirrorWriteFailed { index, error: &error });
        }
        self.events
            .on_event(&ChatEvent::MessageAppended { index, role });
        index
    }

    /// The message at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    /// Replace the content at `index` in place and write it through to the
    /// mirror. Returns `false` when `index` is out of range.
    pub fn replace_content(&mut self, index: usize, content: impl Into<String>) -> bool {
        let Some(message) = self.messages.get_mut(index) else {
            return false;
        };
        message.content = content.into();

        if let Err(error) = self.mirror.overwrite(index, &self.messages[index]) {
            self.events
                .on_event(&ChatEvent::MirrorWriteFailed { index, error: &error });
        }
        self.events.on_event(&ChatEvent::MessageReplaced { index });
        true
    }

    /// All messages in conversation order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl std::fmt::Debug for MessageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageStore")
            .field("messages", &self.messages)
            .finish_non_exhaustive()
    }
}
