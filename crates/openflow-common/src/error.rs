//! Error types and error-text shaping shared by the worker crates.

use thiserror::Error;

/// Default cap for user-visible error strings.
pub const ELIDE_USER_MAX: usize = 1024;

/// Cap for error text persisted to 255-char store columns.
pub const ELIDE_DB_MAX: usize = 255;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Failure of a store operation.
#[derive(Debug, Clone, Error)]
#[error("store operation failed: {operation}: {message}")]
pub struct StoreError {
    /// The operation that failed (e.g. "select nets", "insert of_flows").
    pub operation: String,
    pub message: String,
}

impl StoreError {
    pub fn new(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for controller-driver operations.
pub type OfcResult<T> = Result<T, OfcError>;

/// Failure reported by the openflow controller driver.
#[derive(Debug, Clone, Error)]
pub enum OfcError {
    /// The controller could not be reached at all.
    #[error("cannot reach the openflow controller: {0}")]
    Unreachable(String),
    /// The controller answered but refused or failed the request.
    #[error("openflow controller error: {0}")]
    Controller(String),
}

/// Middle-elides `text` so it fits within `max_len` characters.
///
/// Long texts keep their head and tail around a ` ... ` marker so both the
/// failing operation and the root cause survive truncated store columns.
/// Texts already under the cap are returned unchanged.
pub fn elide_error_text(text: &str, max_len: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() < max_len {
        return text.to_string();
    }
    let keep = (max_len / 2).saturating_sub(3);
    if keep == 0 {
        return chars.into_iter().take(max_len).collect();
    }
    let prefix: String = chars[..keep].iter().collect();
    let suffix: String = chars[chars.len() - keep..].iter().collect();
    format!("{prefix} ... {suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_untouched() {
        assert_eq!(elide_error_text("boom", ELIDE_DB_MAX), "boom");
        assert_eq!(elide_error_text("", ELIDE_USER_MAX), "");
    }

    #[test]
    fn test_long_text_is_middle_elided() {
        let text = "x".repeat(400);
        let elided = elide_error_text(&text, ELIDE_DB_MAX);
        assert!(elided.len() <= ELIDE_DB_MAX);
        assert!(elided.contains(" ... "));
        assert!(elided.starts_with('x'));
        assert!(elided.ends_with('x'));
    }

    #[test]
    fn test_head_and_tail_survive() {
        let text = format!("head-{}{}-tail", "m".repeat(2000), "m".repeat(100));
        let elided = elide_error_text(&text, ELIDE_USER_MAX);
        assert!(elided.starts_with("head-"));
        assert!(elided.ends_with("-tail"));
    }

    #[test]
    fn test_error_display() {
        let err = StoreError::new("select nets", "connection refused");
        assert_eq!(
            err.to_string(),
            "store operation failed: select nets: connection refused"
        );
        let err = OfcError::Controller("404 on PUT".to_string());
        assert_eq!(err.to_string(), "openflow controller error: 404 on PUT");
    }
}
