// src/types/domain_types.rs
use super::ValidationError;
use std::fmt;

/// A flickr API key: 32 hexadecimal characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ApiKey(String);

impl ApiKey {
    const LENGTH: usize = 32;

    /// Create a new API key with validation
    pub fn new(key: impl Into<String>) -> Result<Self, ValidationError> {
        let key = key.into().trim().to_string();

        if key.is_empty() {
            return Err(ValidationError::InvalidApiKey {
                reason: "API key cannot be empty".to_string(),
            });
        }

        if key.len() != Self::LENGTH {
            return Err(ValidationError::InvalidApiKey {
                reason: format!("API key must be {} characters long", Self::LENGTH),
            });
        }

        if !key.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ValidationError::InvalidApiKey {
                reason: "API key must be hexadecimal".to_string(),
            });
        }

        Ok(Self(key))
    }

    /// Get the API key as a string reference
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Redact API key in display
        write!(f, "{}...", &self.0[..6])
    }
}
