//! Durable, append-only conversation history.
//!
//! The whole log lives under a single key as a JSON array of [`Message`].
//! History is best-effort: a missing or corrupt value reads as an empty log and
//! never stops the chat from working.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{ChatError, Result};
use crate::message::Message;
use crate::store::KvStore;
use crate::surface::{Author, Surface};

/// Key the log is stored under unless configured otherwise.
pub const DEFAULT_HISTORY_KEY: &str = "chatHistory";

/// How many lost compare-and-swap races `append` tolerates before giving up.
const MAX_APPEND_ATTEMPTS: u32 = 64;

#[derive(Clone)]
pub struct HistoryLog {
    store: Arc<dyn KvStore>,
    key: String,
}

impl HistoryLog {
    pub fn new(store: Arc<dyn KvStore>, key: impl Into<String>) -> Self {
        HistoryLog {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the full log. Any failure yields an empty sequence.
    pub fn load(&self) -> Vec<Message> {
        match self.store.get(&self.key) {
            Ok(Some(raw)) => parse_log(&self.key, &raw),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(key = %self.key, error = %e, "history read failed; starting empty");
                Vec::new()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append one message.
    ///
    /// Read-modify-write as a compare-and-swap loop, so concurrent writers
    /// sharing the store never drop each other's entries. A corrupt existing
    /// value is replaced by a log holding just the new message.
    pub fn append(&self, message: &Message) -> Result<()> {
        for attempt in 1..=MAX_APPEND_ATTEMPTS {
            let current = self.store.get(&self.key)?;
            let mut messages = current
                .as_deref()
                .map(|raw| parse_log(&self.key, raw))
                .unwrap_or_default();
            messages.push(message.clone());
            let encoded = serde_json::to_string(&messages)?;

            if self
                .store
                .compare_and_swap(&self.key, current.as_deref(), &encoded)?
            {
                debug!(key = %self.key, len = messages.len(), is_user = message.is_user, "history appended");
                return Ok(());
            }
            debug!(key = %self.key, attempt, "history changed underneath us; retrying");
            std::thread::yield_now();
        }
        Err(ChatError::Contention {
            key: self.key.clone(),
            attempts: MAX_APPEND_ATTEMPTS,
        })
    }

    pub fn clear(&self) -> Result<()> {
        self.store.remove(&self.key)
    }

    /// Replay `messages` onto `surface` in order, marked as already persisted.
    /// Never writes to the log.
    pub fn render<S: Surface + ?Sized>(messages: &[Message], surface: &mut S) {
        for msg in messages {
            let author = if msg.is_user { Author::User } else { Author::Assistant };
            surface.push(author, &msg.text, true);
        }
    }
}

fn parse_log(key: &str, raw: &str) -> Vec<Message> {
    match serde_json::from_str::<Vec<Message>>(raw) {
        Ok(messages) => messages,
        Err(e) => {
            warn!(key = %key, error = %e, "history is not a valid message list; treating as empty");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::surface::Transcript;

    fn log_with(raw: Option<&str>) -> (Arc<MemoryStore>, HistoryLog) {
        let store = Arc::new(MemoryStore::new());
        if let Some(raw) = raw {
            store.set(DEFAULT_HISTORY_KEY, raw).unwrap();
        }
        let log = HistoryLog::new(store.clone(), DEFAULT_HISTORY_KEY);
        (store, log)
    }

    #[test]
    fn test_load_missing_key_is_empty() {
        let (_, log) = log_with(None);
        assert!(log.load().is_empty());
    }

    #[test]
    fn test_load_invalid_json_is_empty() {
        let (_, log) = log_with(Some("{not json"));
        assert!(log.load().is_empty());
    }

    #[test]
    fn test_load_wrong_shape_is_empty() {
        let (_, log) = log_with(Some(r#"{"text":"hi","isUser":true}"#));
        assert!(log.load().is_empty());
    }

    #[test]
    fn test_append_preserves_order() {
        let (_, log) = log_with(None);
        log.append(&Message::user("hi")).unwrap();
        log.append(&Message::assistant("hello")).unwrap();
        assert_eq!(
            log.load(),
            vec![Message::user("hi"), Message::assistant("hello")]
        );
    }

    #[test]
    fn test_append_over_corrupt_value_recovers() {
        let (store, log) = log_with(Some("garbage"));
        log.append(&Message::assistant("ok")).unwrap();
        assert_eq!(log.load(), vec![Message::assistant("ok")]);
        assert_eq!(
            store.get(DEFAULT_HISTORY_KEY).unwrap().as_deref(),
            Some(r#"[{"text":"ok","isUser":false}]"#)
        );
    }

    #[test]
    fn test_render_marks_entries_persisted() {
        let mut t = Transcript::new();
        HistoryLog::render(&[Message::user("hi"), Message::assistant("hello")], &mut t);
        assert_eq!(t.len(), 2);
        assert!(t.entries().iter().all(|e| e.persisted));
        assert_eq!(t.entries()[0].author, Author::User);
        assert_eq!(t.entries()[1].author, Author::Assistant);
    }

    #[test]
    fn test_clear_empties_log() {
        let (_, log) = log_with(None);
        log.append(&Message::user("hi")).unwrap();
        log.clear().unwrap();
        assert!(log.is_empty());
    }
}
