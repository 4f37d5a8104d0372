use crate::error::{ChatError, Result};

/// Models the backend accepts, in selector order.
pub const AVAILABLE_MODELS: &[&str] = &["gemini-1.5-flash-001", "gemini-1.5-pro-preview-0514"];

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash-001";

pub fn validate_model(name: &str) -> Result<&'static str> {
    AVAILABLE_MODELS
        .iter()
        .copied()
        .find(|m| *m == name)
        .ok_or_else(|| ChatError::UnknownModel {
            model: name.to_string(),
            available: AVAILABLE_MODELS.join(", "),
        })
}
