//! Socket event envelope.
//!
//! Every frame is a JSON text message `{"event": <name>, "data": <payload>}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::Result;

pub const EVENT_SEND_MESSAGE: &str = "send_message";
pub const EVENT_CHUNK: &str = "stream_response_chunk";
pub const EVENT_END: &str = "stream_response_end";
pub const EVENT_ERROR: &str = "error";

/// Payload of the outbound `send_message` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendMessage {
    pub message: String,
    pub model_name: String,
    /// Always sent empty; the backend keeps no conversation context.
    #[serde(default)]
    pub history: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
}

impl SendMessage {
    pub fn text(message: impl Into<String>, model_name: impl Into<String>) -> Self {
        SendMessage {
            message: message.into(),
            model_name: model_name.into(),
            history: Vec::new(),
            image_base64: None,
        }
    }

    pub fn with_image(mut self, image_base64: impl Into<String>) -> Self {
        self.image_base64 = Some(image_base64.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    SendMessage(SendMessage),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    Chunk { text: String },
    End,
    Error { message: String },
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
struct ChunkPayload {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    message: String,
}

pub fn encode(event: &ClientEvent) -> Result<String> {
    let envelope = match event {
        ClientEvent::SendMessage(payload) => Envelope {
            event: EVENT_SEND_MESSAGE.to_string(),
            data: serde_json::to_value(payload)?,
        },
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Decode one inbound frame. Events this client does not handle yield `None`.
pub fn decode(frame: &str) -> Result<Option<ServerEvent>> {
    let envelope: Envelope = serde_json::from_str(frame)?;
    let event = match envelope.event.as_str() {
        EVENT_CHUNK => {
            let p: ChunkPayload = serde_json::from_value(envelope.data)?;
            ServerEvent::Chunk { text: p.text }
        }
        EVENT_END => ServerEvent::End,
        EVENT_ERROR => {
            let p: ErrorPayload = serde_json::from_value(envelope.data)?;
            ServerEvent::Error { message: p.message }
        }
        other => {
            debug!(event = other, "ignoring unknown server event");
            return Ok(None);
        }
    };
    Ok(Some(event))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_send_message_omits_missing_image() {
        let ev = ClientEvent::SendMessage(SendMessage::text("hi", "gemini-1.5-flash-001"));
        let json: Value = serde_json::from_str(&encode(&ev).unwrap()).unwrap();
        assert_eq!(json["event"], "send_message");
        assert_eq!(json["data"]["message"], "hi");
        assert_eq!(json["data"]["model_name"], "gemini-1.5-flash-001");
        assert_eq!(json["data"]["history"], serde_json::json!([]));
        assert!(json["data"].get("image_base64").is_none());
    }

    #[test]
    fn test_encode_send_message_with_image() {
        let ev = ClientEvent::SendMessage(SendMessage::text("", "m").with_image("QUJD"));
        let json: Value = serde_json::from_str(&encode(&ev).unwrap()).unwrap();
        assert_eq!(json["data"]["image_base64"], "QUJD");
        assert_eq!(json["data"]["message"], "");
    }

    #[test]
    fn test_decode_chunk() {
        let ev = decode(r#"{"event":"stream_response_chunk","data":{"text":"Hel"}}"#).unwrap();
        assert_eq!(ev, Some(ServerEvent::Chunk { text: "Hel".to_string() }));
    }

    #[test]
    fn test_decode_end_with_empty_object() {
        let ev = decode(r#"{"event":"stream_response_end","data":{}}"#).unwrap();
        assert_eq!(ev, Some(ServerEvent::End));
    }

    #[test]
    fn test_decode_end_without_data() {
        let ev = decode(r#"{"event":"stream_response_end"}"#).unwrap();
        assert_eq!(ev, Some(ServerEvent::End));
    }

    #[test]
    fn test_decode_error() {
        let ev = decode(r#"{"event":"error","data":{"message":"bad model"}}"#).unwrap();
        assert_eq!(
            ev,
            Some(ServerEvent::Error { message: "bad model".to_string() })
        );
    }

    #[test]
    fn test_decode_unknown_event_is_none() {
        assert_eq!(decode(r#"{"event":"typing","data":{}}"#).unwrap(), None);
    }

    #[test]
    fn test_decode_chunk_missing_text_is_error() {
        assert!(decode(r#"{"event":"stream_response_chunk","data":{}}"#).is_err());
    }

    #[test]
    fn test_decode_garbage_is_error() {
        assert!(decode("not json").is_err());
    }
}
