//! Error kinds for thinkchain operations

use std::fmt;

/// The kind of error that occurred.
///
/// Callers match on this to decide how to react; the user-facing rendering
/// of a failed model call does not depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // =========================================================================
    // General errors
    // =========================================================================
    /// Catch-all for unhandled cases
    Unexpected,

    /// Invalid configuration (config file, provider settings)
    ConfigInvalid,

    /// A parameter is outside its declared range
    InvalidArgument,

    // =========================================================================
    // Gateway errors
    // =========================================================================
    /// Could not reach the chat-completion service
    NetworkFailed,

    /// The service rejected the API key
    AuthenticationFailed,

    /// The service throttled the request
    RateLimited,

    /// The service answered with a non-success status
    ApiFailed,

    /// The response body could not be decoded
    ParseFailed,

    /// The response had no choice or no message content
    EmptyResponse,

    // =========================================================================
    // IO errors
    // =========================================================================
    /// File not found
    FileNotFound,

    /// IO operation failed
    IoFailed,
}

impl ErrorKind {
    /// Returns the error kind as a static string
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Unexpected => "Unexpected",
            ErrorKind::ConfigInvalid => "ConfigInvalid",
            ErrorKind::InvalidArgument => "InvalidArgument",

            ErrorKind::NetworkFailed => "NetworkFailed",
            ErrorKind::AuthenticationFailed => "AuthenticationFailed",
            ErrorKind::RateLimited => "RateLimited",
            ErrorKind::ApiFailed => "ApiFailed",
            ErrorKind::ParseFailed => "ParseFailed",
            ErrorKind::EmptyResponse => "EmptyResponse",

            ErrorKind::FileNotFound => "FileNotFound",
            ErrorKind::IoFailed => "IoFailed",
        }
    }

    /// Check if this error kind is retryable by default
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::NetworkFailed | ErrorKind::RateLimited)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::NetworkFailed.to_string(), "NetworkFailed");
        assert_eq!(ErrorKind::EmptyResponse.to_string(), "EmptyResponse");
    }

    #[test]
    fn test_is_retryable() {
        assert!(ErrorKind::NetworkFailed.is_retryable());
        assert!(ErrorKind::RateLimited.is_retryable());
        assert!(!ErrorKind::AuthenticationFailed.is_retryable());
        assert!(!ErrorKind::InvalidArgument.is_retryable());
    }
}
