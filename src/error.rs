//! Crate-level error type.

use thiserror::Error;

/// Everything that can go wrong inside the client.
///
/// Most variants are terminal for the action that triggered them but never
/// for the session: callers log them and keep the UI usable.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The remote server replied with a non-2xx HTTP status code.
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// A 2xx reply whose body did not have the expected shape.
    #[error("malformed response from {url}: {detail}")]
    MalformedResponse { url: String, detail: String },

    #[error("transport error: {0}")]
    Transport(String),

    /// `start_turn` was called while another reply is still streaming.
    #[error("a response is still streaming")]
    TurnInProgress,

    #[error("Invalid model selected. Available models: {available}")]
    UnknownModel { model: String, available: String },

    /// Lost the compare-and-swap race too many times in a row.
    #[error("gave up writing '{key}' after {attempts} conflicting writes")]
    Contention { key: String, attempts: u32 },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("unsupported media file: {0}")]
    UnsupportedMedia(String),
}

pub type Result<T> = std::result::Result<T, ChatError>;

impl From<toml::de::Error> for ChatError {
    fn from(e: toml::de::Error) -> Self {
        ChatError::Config(e.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ChatError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        ChatError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_model_message_lists_models() {
        let err = ChatError::UnknownModel {
            model: "gpt-x".to_string(),
            available: "a, b".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid model selected. Available models: a, b"
        );
    }

    #[test]
    fn test_http_error_display() {
        let err = ChatError::Http {
            status: 502,
            url: "http://localhost/stt".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 502 from http://localhost/stt");
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ChatError = io.into();
        assert!(matches!(err, ChatError::Io(_)));
    }

    #[test]
    fn test_contention_display_names_key() {
        let err = ChatError::Contention {
            key: "chatHistory".to_string(),
            attempts: 8,
        };
        assert!(err.to_string().contains("chatHistory"));
    }
}
