//! Error types for operator input parsing.

use thiserror::Error;

/// Maximum reference length to accept.
/// Longer inputs are rejected before any pattern matching runs.
pub const MAX_REFERENCE_LENGTH: usize = 512;

/// A resource reference that matched none of the accepted shapes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Input is empty after trimming.
    #[error("no chat reference given\n  Suggestion: {suggestion}")]
    Empty {
        /// How to fix the issue
        suggestion: &'static str,
    },

    /// Input does not look like any supported link, username or id.
    #[error("unrecognized chat reference '{input}'\n  Suggestion: {suggestion}")]
    Unrecognized {
        /// The rejected input
        input: String,
        /// How to fix the issue
        suggestion: &'static str,
    },

    /// Input exceeds the maximum accepted length.
    #[error("chat reference too long ({length} chars, max {max}): {preview}...")]
    TooLong {
        /// Truncated input for display
        preview: String,
        /// Actual length
        length: usize,
        /// Maximum allowed
        max: usize,
    },
}

const REFERENCE_SUGGESTION: &str = "Use https://t.me/<name>, https://t.me/+<hash>, \
     https://t.me/joinchat/<hash>, https://web.telegram.org/k/#<id>, @username or a numeric id";

impl ValidationError {
    /// Creates an `Empty` error.
    #[must_use]
    pub fn empty() -> Self {
        Self::Empty {
            suggestion: REFERENCE_SUGGESTION,
        }
    }

    /// Creates an `Unrecognized` error for the given input.
    #[must_use]
    pub fn unrecognized(input: &str) -> Self {
        Self::Unrecognized {
            input: input.to_string(),
            suggestion: REFERENCE_SUGGESTION,
        }
    }

    /// Creates a `TooLong` error.
    #[must_use]
    pub fn too_long(input: &str) -> Self {
        Self::TooLong {
            preview: input.chars().take(50).collect(),
            length: input.chars().count(),
            max: MAX_REFERENCE_LENGTH,
        }
    }
}

/// A selection expression that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// A token is neither an index, a range, nor a control letter.
    #[error("invalid selection token '{token}'\n  Suggestion: use numbers and ranges like 10,15,18-30, 'T' for all or 'Q' to quit")]
    Malformed {
        /// The offending token, as typed
        token: String,
    },
}

impl SelectionError {
    /// Creates a `Malformed` error for the given token.
    #[must_use]
    pub fn malformed(token: &str) -> Self {
        Self::Malformed {
            token: token.to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_unrecognized_message() {
        let err = ValidationError::unrecognized("ftp://t.me/x");
        let msg = err.to_string();
        assert!(msg.contains("ftp://t.me/x"), "should contain input");
        assert!(msg.contains("@username"), "should list accepted shapes");
    }

    #[test]
    fn test_validation_error_too_long_message() {
        let long = "@".to_string() + &"a".repeat(600);
        let err = ValidationError::too_long(&long);
        let msg = err.to_string();
        assert!(msg.contains("too long"));
        assert!(msg.contains("512"));
        assert!(msg.contains("601"));
    }

    #[test]
    fn test_selection_error_malformed_message() {
        let err = SelectionError::malformed("abc");
        let msg = err.to_string();
        assert!(msg.contains("'abc'"));
        assert!(msg.contains("'Q'"));
    }
}
