//! Rendering surface: an ordered list of message entries.

use serde::Serialize;

/// Who an on-screen entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Author {
    User,
    Assistant,
    /// Errors and status lines. Never persisted and never a streaming target.
    Notice,
}

/// Handle to one display slot; the entry's position in the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub author: Author,
    pub text: String,
    /// Whether this entry is already recorded in the history log.
    pub persisted: bool,
}

pub trait Surface {
    /// Append a new entry and return its slot.
    fn push(&mut self, author: Author, text: &str, persisted: bool) -> SlotId;

    /// Replace the displayed content of `slot`. Unknown slots are ignored.
    fn set_text(&mut self, slot: SlotId, text: &str);

    /// Record whether `slot` is stored in the history log.
    fn set_persisted(&mut self, slot: SlotId, persisted: bool);

    /// The most recently rendered assistant-authored entry, if any.
    fn last_assistant(&self) -> Option<SlotId>;

    fn entries(&self) -> &[Entry];

    /// Called once a slot will receive no more updates.
    fn finish(&mut self, _slot: SlotId) {}

    fn notice(&mut self, text: &str) -> SlotId {
        self.push(Author::Notice, text, false)
    }

    fn text_of(&self, slot: SlotId) -> Option<&str> {
        self.entries().get(slot.0).map(|e| e.text.as_str())
    }
}

/// In-memory surface. Also the backing model of the terminal renderer.
#[derive(Debug, Default, Clone)]
pub struct Transcript {
    entries: Vec<Entry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Surface for Transcript {
    fn push(&mut self, author: Author, text: &str, persisted: bool) -> SlotId {
        self.entries.push(Entry {
            author,
            text: text.to_string(),
            persisted,
        });
        SlotId(self.entries.len() - 1)
    }

    fn set_text(&mut self, slot: SlotId, text: &str) {
        if let Some(entry) = self.entries.get_mut(slot.0) {
            entry.text.clear();
            entry.text.push_str(text);
        }
    }

    fn set_persisted(&mut self, slot: SlotId, persisted: bool) {
        if let Some(entry) = self.entries.get_mut(slot.0) {
            entry.persisted = persisted;
        }
    }

    fn last_assistant(&self) -> Option<SlotId> {
        self.entries
            .iter()
            .rposition(|e| e.author == Author::Assistant)
            .map(SlotId)
    }

    fn entries(&self) -> &[Entry] {
        &self.entries
    }
}
