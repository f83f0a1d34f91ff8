//! # OCR Configuration Module
//!
//! This module defines configuration structures for the Vision text-detection
//! collaborator, including recovery settings and request parameters.

use crate::errors::OcrError;
use std::env;

// Constants for OCR configuration
pub const VISION_API_KEY_VAR: &str = "GOOGLE_VISION_API_KEY";
pub const DEFAULT_VISION_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";
pub const FORMAT_DETECTION_BUFFER_SIZE: usize = 32;
pub const MIN_FORMAT_BYTES: usize = 8;
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10MB, the Vision inline image limit
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
/// Provider error bodies are cut to this many characters
pub const MAX_ERROR_DETAIL_CHARS: usize = 500;

/// Recovery configuration for error handling
#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Base delay between retries in milliseconds
    pub base_retry_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    pub max_retry_delay_ms: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_retry_delay_ms: 1000, // 1 second
            max_retry_delay_ms: 10000, // 10 seconds
        }
    }
}

/// Vision feature requested for an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetectionMode {
    /// Sparse text in natural images
    #[default]
    TextDetection,
    /// Dense text; better on tightly packed tables
    DocumentTextDetection,
}

impl DetectionMode {
    /// Feature type name on the wire
    pub fn as_feature(&self) -> &'static str {
        match self {
            DetectionMode::TextDetection => "TEXT_DETECTION",
            DetectionMode::DocumentTextDetection => "DOCUMENT_TEXT_DETECTION",
        }
    }
}

/// Configuration structure for the Vision collaborator
#[derive(Debug, Clone)]
pub struct VisionConfig {
    /// API key sent as the `key` query parameter
    pub api_key: String,
    /// Annotate endpoint
    pub endpoint: String,
    pub detection_mode: DetectionMode,
    /// Maximum accepted image size in bytes
    pub max_file_size: u64,
    pub request_timeout_secs: u64,
    /// Recovery and error handling configuration
    pub recovery: RecoveryConfig,
}

impl VisionConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: DEFAULT_VISION_ENDPOINT.to_string(),
            detection_mode: DetectionMode::default(),
            max_file_size: MAX_FILE_SIZE,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            recovery: RecoveryConfig::default(),
        }
    }

    /// Build the configuration from `GOOGLE_VISION_API_KEY`
    pub fn from_env() -> Result<Self, OcrError> {
        match env::var(VISION_API_KEY_VAR) {
            Ok(key) if !key.trim().is_empty() => Ok(Self::new(key.trim())),
            _ => Err(OcrError::Configuration(format!(
                "{VISION_API_KEY_VAR} is not set"
            ))),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), OcrError> {
        if self.api_key.trim().is_empty() {
            return Err(OcrError::Configuration("API key cannot be empty".to_string()));
        }
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(OcrError::Configuration(format!(
                "Endpoint must be an http(s) URL, got '{}'",
                self.endpoint
            )));
        }
        if self.max_file_size == 0 {
            return Err(OcrError::Configuration(
                "max_file_size must be greater than 0".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(OcrError::Configuration(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.recovery.base_retry_delay_ms > self.recovery.max_retry_delay_ms {
            return Err(OcrError::Configuration(
                "base_retry_delay_ms cannot exceed max_retry_delay_ms".to_string(),
            ));
        }
        Ok(())
    }
}
