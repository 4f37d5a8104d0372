use serde::{Deserialize, Serialize};

/// A persisted or displayed chat entry.
///
/// Serialized as `{"text": ..., "isUser": ...}`, which is the layout of the
/// history log in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    #[serde(rename = "isUser")]
    pub is_user: bool,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Message {
            text: text.into(),
            is_user: true,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Message {
            text: text.into(),
            is_user: false,
        }
    }
}
