//! Error types for provider failover.

/// Maximum number of characters of a response body kept in failure reasons.
pub(crate) const BODY_EXCERPT_CHARS: usize = 120;

/// Reason reported when no provider could be attempted at all.
pub(crate) const NO_PROVIDERS_READY: &str = "no providers configured/ready";

/// Errors that can cross the failover client boundary.
#[derive(Debug, thiserror::Error)]
pub enum FailoverError {
    /// The prompt was empty or whitespace-only.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Every provider was skipped or failed.
    #[error("all providers exhausted: {reason}")]
    AllProvidersExhausted {
        /// The most recent per-provider failure reason.
        reason: String,
    },

    /// A provider definition or registry is malformed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error (e.g., reading a registry file or saving an image).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FailoverError {
    /// Returns true if the error stems from caller input or configuration
    /// rather than from the providers.
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::InvalidConfig(_))
    }

    /// Returns the last provider failure reason, if all providers were exhausted.
    pub fn exhaustion_reason(&self) -> Option<&str> {
        match self {
            Self::AllProvidersExhausted { reason } => Some(reason),
            _ => None,
        }
    }
}

/// Result type alias for failover operations.
pub type Result<T> = std::result::Result<T, FailoverError>;

/// Collapses whitespace and truncates a response body to a short excerpt.
///
/// Truncation happens on a character boundary, never inside a UTF-8 sequence.
pub(crate) fn body_excerpt(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(BODY_EXCERPT_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_user_error() {
        assert!(FailoverError::InvalidInput("empty".into()).is_user_error());
        assert!(FailoverError::InvalidConfig("dup".into()).is_user_error());
        assert!(!FailoverError::AllProvidersExhausted {
            reason: "x".into()
        }
        .is_user_error());
    }

    #[test]
    fn test_error_display() {
        let err = FailoverError::AllProvidersExhausted {
            reason: "deepai: 500 boom".into(),
        };
        assert_eq!(err.to_string(), "all providers exhausted: deepai: 500 boom");
        assert_eq!(err.exhaustion_reason(), Some("deepai: 500 boom"));

        let err = FailoverError::InvalidInput("prompt is empty".into());
        assert_eq!(err.to_string(), "invalid input: prompt is empty");
        assert_eq!(err.exhaustion_reason(), None);
    }

    #[test]
    fn test_body_excerpt_truncates() {
        let long = "x".repeat(500);
        assert_eq!(body_excerpt(&long).chars().count(), BODY_EXCERPT_CHARS);
    }

    #[test]
    fn test_body_excerpt_collapses_whitespace() {
        assert_eq!(body_excerpt("  quota\n\n exceeded\t"), "quota exceeded");
    }

    #[test]
    fn test_body_excerpt_respects_char_boundaries() {
        let text = "é".repeat(200);
        let excerpt = body_excerpt(&text);
        assert_eq!(excerpt.chars().count(), BODY_EXCERPT_CHARS);
        assert!(excerpt.chars().all(|c| c == 'é'));
    }
}
