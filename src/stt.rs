//! Speech-to-text HTTP client.
//!
//! `POST {base_url}/stt` with `{"audio_base64", "mime_type"}`; a successful
//! reply is `{"transcript": "..."}`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ChatError, Result};
use crate::media::AudioClip;

#[derive(Debug, Serialize)]
pub struct SttRequest<'a> {
    pub audio_base64: String,
    pub mime_type: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct SttResponse {
    pub transcript: String,
}

#[derive(Debug, Clone)]
pub struct SttClient {
    client: reqwest::Client,
    url: String,
}

impl SttClient {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:5000`.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(SttClient {
            client,
            url: format!("{}/stt", base_url.trim_end_matches('/')),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Transcribe one clip.
    ///
    /// # Returns
    /// - `Err(ChatError::Request)` when the request cannot be sent.
    /// - `Err(ChatError::Http)` on a non-2xx status.
    /// - `Err(ChatError::MalformedResponse)` when the body is not `{transcript}`.
    pub async fn transcribe(&self, clip: &AudioClip) -> Result<String> {
        let body = SttRequest {
            audio_base64: clip.to_base64(),
            mime_type: &clip.mime_type,
        };
        debug!(url = %self.url, bytes = clip.bytes.len(), mime = %clip.mime_type, "sending audio for transcription");

        let resp = self.client.post(&self.url).json(&body).send().await?;
        if !resp.status().is_success() {
            return Err(ChatError::Http {
                status: resp.status().as_u16(),
                url: self.url.clone(),
            });
        }

        let bytes = resp.bytes().await?;
        let parsed: SttResponse =
            serde_json::from_slice(&bytes).map_err(|e| ChatError::MalformedResponse {
                url: self.url.clone(),
                detail: e.to_string(),
            })?;
        Ok(parsed.transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve exactly one canned HTTP response and return the base URL.
    async fn one_shot_server(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 16 * 1024];
            let _ = stream.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body,
            );
            let _ = stream.write_all(response.as_bytes()).await;
        });
        format!("http://{addr}")
    }

    fn clip() -> AudioClip {
        AudioClip::new(b"RIFF".to_vec(), "audio/wav")
    }

    #[test]
    fn test_url_joins_stt_path() {
        let c = SttClient::new("http://localhost:5000/").unwrap();
        assert_eq!(c.url(), "http://localhost:5000/stt");
    }

    #[test]
    fn test_request_serializes_fields() {
        let req = SttRequest {
            audio_base64: "UklGRg==".to_string(),
            mime_type: "audio/wav",
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["audio_base64"], "UklGRg==");
        assert_eq!(json["mime_type"], "audio/wav");
    }

    #[tokio::test]
    async fn test_transcribe_success() {
        let base = one_shot_server("200 OK", r#"{"transcript":"hello there"}"#).await;
        let c = SttClient::new(&base).unwrap();
        assert_eq!(c.transcribe(&clip()).await.unwrap(), "hello there");
    }

    #[tokio::test]
    async fn test_transcribe_non_2xx_is_http_error() {
        let base = one_shot_server("500 Internal Server Error", r#"{"error":"boom"}"#).await;
        let c = SttClient::new(&base).unwrap();
        let err = c.transcribe(&clip()).await.unwrap_err();
        assert!(matches!(err, ChatError::Http { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_transcribe_malformed_body() {
        let base = one_shot_server("200 OK", r#"{"text":"wrong field"}"#).await;
        let c = SttClient::new(&base).unwrap();
        let err = c.transcribe(&clip()).await.unwrap_err();
        assert!(matches!(err, ChatError::MalformedResponse { .. }));
    }
}
