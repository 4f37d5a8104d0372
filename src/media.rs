//! Recorded audio and captured images, loaded from disk and base64-encoded for
//! the wire.

use std::path::Path;

use base64::{engine::general_purpose, Engine as _};

use crate::error::{ChatError, Result};

/// A recorded audio clip ready for transcription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl AudioClip {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        AudioClip {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mime_type = audio_mime_for(path)
            .ok_or_else(|| ChatError::UnsupportedMedia(path.display().to_string()))?;
        let bytes = std::fs::read(path)?;
        Ok(AudioClip::new(bytes, mime_type))
    }

    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.bytes)
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

pub fn audio_mime_for(path: &Path) -> Option<&'static str> {
    match extension(path)?.as_str() {
        "wav" => Some("audio/wav"),
        "webm" => Some("audio/webm"),
        "ogg" | "oga" => Some("audio/ogg"),
        "mp3" => Some("audio/mpeg"),
        "m4a" => Some("audio/mp4"),
        "flac" => Some("audio/flac"),
        _ => None,
    }
}

pub fn image_mime_for(path: &Path) -> Option<&'static str> {
    match extension(path)?.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

/// Read an image file and return its contents as standard base64.
pub fn encode_image_file(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    if image_mime_for(path).is_none() {
        return Err(ChatError::UnsupportedMedia(path.display().to_string()));
    }
    let bytes = std::fs::read(path)?;
    Ok(general_purpose::STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    #[rstest]
    #[case("clip.wav", Some("audio/wav"))]
    #[case("clip.WEBM", Some("audio/webm"))]
    #[case("clip.ogg", Some("audio/ogg"))]
    #[case("clip.mp3", Some("audio/mpeg"))]
    #[case("clip.m4a", Some("audio/mp4"))]
    #[case("clip.flac", Some("audio/flac"))]
    #[case("clip.txt", None)]
    #[case("clip", None)]
    fn test_audio_mime_for(#[case] name: &str, #[case] expected: Option<&str>) {
        assert_eq!(audio_mime_for(Path::new(name)), expected);
    }

    #[rstest]
    #[case("shot.jpg", Some("image/jpeg"))]
    #[case("shot.JPEG", Some("image/jpeg"))]
    #[case("shot.png", Some("image/png"))]
    #[case("shot.webp", Some("image/webp"))]
    #[case("shot.bmp", None)]
    fn test_image_mime_for(#[case] name: &str, #[case] expected: Option<&str>) {
        assert_eq!(image_mime_for(Path::new(name)), expected);
    }

    #[test]
    fn test_audio_clip_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.wav");
        std::fs::File::create(&path).unwrap().write_all(b"RIFF").unwrap();
        let clip = AudioClip::from_file(&path).unwrap();
        assert_eq!(clip.mime_type, "audio/wav");
        assert_eq!(clip.to_base64(), "UklGRg==");
    }

    #[test]
    fn test_audio_clip_missing_file_is_io_error() {
        let res = AudioClip::from_file("/definitely/not/here.wav");
        assert!(matches!(res, Err(ChatError::Io(_))));
    }

    #[test]
    fn test_audio_clip_unknown_extension_rejected() {
        let res = AudioClip::from_file("notes.txt");
        assert!(matches!(res, Err(ChatError::UnsupportedMedia(_))));
    }

    #[test]
    fn test_encode_image_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cam.png");
        std::fs::write(&path, b"ABC").unwrap();
        assert_eq!(encode_image_file(&path).unwrap(), "QUJD");
    }
}
