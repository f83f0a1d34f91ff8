//! # Error Types Module
//!
//! This module defines the error types of the crate. The extraction engine itself
//! never fails: errors only exist for configuration (vocabulary, tunables) and for
//! the OCR collaborator that turns an image into text.

/// Configuration errors raised while building a parser
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Keyword vocabulary is unusable (empty lists, control characters, bad JSON)
    Vocabulary(String),
    /// A tunable parameter is out of range
    Parameter(String),
    /// A keyword pattern failed to compile
    Pattern(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Vocabulary(msg) => write!(f, "Vocabulary error: {msg}"),
            ConfigError::Parameter(msg) => write!(f, "Parameter error: {msg}"),
            ConfigError::Pattern(msg) => write!(f, "Pattern error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<regex::Error> for ConfigError {
    fn from(err: regex::Error) -> Self {
        ConfigError::Pattern(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Vocabulary(err.to_string())
    }
}

/// Errors of the OCR collaborator
#[derive(Debug, Clone)]
pub enum OcrError {
    /// Input validation errors (data URL, image file)
    Validation(String),
    /// Missing or invalid provider configuration
    Configuration(String),
    /// Transport-level failures talking to the provider
    Request(String),
    /// Provider answered with an error (HTTP status, detail)
    Provider(u16, String),
    /// Provider answered with a body we cannot read
    Response(String),
    /// Timeout errors
    Timeout(String),
}

impl OcrError {
    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            OcrError::Request(_) | OcrError::Timeout(_) => true,
            OcrError::Provider(status, _) => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl std::fmt::Display for OcrError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OcrError::Validation(msg) => write!(f, "Validation error: {msg}"),
            OcrError::Configuration(msg) => write!(f, "Configuration error: {msg}"),
            OcrError::Request(msg) => write!(f, "Request error: {msg}"),
            OcrError::Provider(status, msg) => write!(f, "Vision HTTP {status}: {msg}"),
            OcrError::Response(msg) => write!(f, "Response error: {msg}"),
            OcrError::Timeout(msg) => write!(f, "Timeout error: {msg}"),
        }
    }
}

impl std::error::Error for OcrError {}

impl From<reqwest::Error> for OcrError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            OcrError::Timeout(err.to_string())
        } else if err.is_decode() {
            OcrError::Response(err.to_string())
        } else {
            OcrError::Request(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(OcrError::Timeout("slow".to_string()).is_retryable());
        assert!(OcrError::Request("reset".to_string()).is_retryable());
        assert!(OcrError::Provider(503, String::new()).is_retryable());
        assert!(OcrError::Provider(429, String::new()).is_retryable());
        assert!(!OcrError::Provider(400, String::new()).is_retryable());
        assert!(!OcrError::Validation("bad".to_string()).is_retryable());
    }

    #[test]
    fn test_regex_error_conversion() {
        let err: ConfigError = regex::Regex::new("(").unwrap_err().into();
        assert!(matches!(err, ConfigError::Pattern(_)));
    }
}
