//! # OCR Module
//!
//! Turns an image into a transcription with Google Vision text detection. The
//! label parser never calls this module; it only consumes the text it returns.
//!
//! Inputs come either as a `data:image/...;base64,` URL or as an image file that
//! is sniffed with `image::guess_format` and base64-encoded.

use crate::errors::OcrError;
use crate::ocr_config::{RecoveryConfig, VisionConfig, MAX_ERROR_DETAIL_CHARS};
use base64::{engine::general_purpose::STANDARD, Engine};
use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::{Duration, Instant};

lazy_static! {
    static ref DATA_URL_REGEX: Regex =
        Regex::new(r"^data:(?P<mime>image/[a-zA-Z0-9.+-]+);base64,(?P<payload>.+)$")
            .expect("Failed to compile data URL regex");
}

/// Base64 image content ready to be sent to the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub mime_type: String,
    pub base64: String,
}

/// Split a `data:image/<subtype>;base64,<payload>` URL
///
/// # Examples
///
/// ```rust
/// use nutrilabel::ocr::parse_data_url;
///
/// let payload = parse_data_url("data:image/png;base64,iVBORw0KGgo=")?;
/// assert_eq!(payload.mime_type, "image/png");
/// assert_eq!(payload.base64, "iVBORw0KGgo=");
/// # Ok::<(), nutrilabel::errors::OcrError>(())
/// ```
pub fn parse_data_url(data_url: &str) -> Result<ImagePayload, OcrError> {
    let caps = DATA_URL_REGEX
        .captures(data_url.trim())
        .ok_or_else(|| OcrError::Validation("Invalid image data URL".to_string()))?;
    match (caps.name("mime"), caps.name("payload")) {
        (Some(mime), Some(payload)) => Ok(ImagePayload {
            mime_type: mime.as_str().to_string(),
            base64: payload.as_str().to_string(),
        }),
        _ => Err(OcrError::Validation("Invalid image data URL".to_string())),
    }
}

/// MIME type of the formats accepted by the provider
pub fn mime_type_for(format: image::ImageFormat) -> Option<&'static str> {
    match format {
        image::ImageFormat::Png => Some("image/png"),
        image::ImageFormat::Jpeg => Some("image/jpeg"),
        image::ImageFormat::Bmp => Some("image/bmp"),
        image::ImageFormat::Tiff => Some("image/tiff"),
        image::ImageFormat::WebP => Some("image/webp"),
        image::ImageFormat::Gif => Some("image/gif"),
        _ => None,
    }
}

/// Validate an image file before reading it completely
///
/// Checks that the file exists, is not empty and fits in `max_file_size`.
pub fn validate_image_file(file_path: &Path, config: &VisionConfig) -> Result<u64, OcrError> {
    let metadata = fs::metadata(file_path).map_err(|e| {
        OcrError::Validation(format!(
            "Image file does not exist or is not accessible: {} ({e})",
            file_path.display()
        ))
    })?;

    if !metadata.is_file() {
        return Err(OcrError::Validation(format!(
            "Not a regular file: {}",
            file_path.display()
        )));
    }

    let size = metadata.len();
    if size == 0 {
        return Err(OcrError::Validation(format!(
            "Image file is empty: {}",
            file_path.display()
        )));
    }
    if size > config.max_file_size {
        return Err(OcrError::Validation(format!(
            "Image file too large: {} bytes (max {} bytes)",
            size, config.max_file_size
        )));
    }

    Ok(size)
}

/// Detect the image format from the file header
pub fn detect_image_format(file_path: &Path) -> Result<image::ImageFormat, OcrError> {
    let file = File::open(file_path).map_err(|e| {
        OcrError::Validation(format!("Could not open {}: {e}", file_path.display()))
    })?;
    let mut reader = BufReader::new(file);
    let mut buffer = vec![0; crate::ocr_config::FORMAT_DETECTION_BUFFER_SIZE];
    let bytes_read = reader.read(&mut buffer).map_err(|e| {
        OcrError::Validation(format!("Could not read {}: {e}", file_path.display()))
    })?;

    if bytes_read < crate::ocr_config::MIN_FORMAT_BYTES {
        return Err(OcrError::Validation(format!(
            "Could not read enough bytes to determine image format for {} (read {}, need at least {})",
            file_path.display(),
            bytes_read,
            crate::ocr_config::MIN_FORMAT_BYTES
        )));
    }
    buffer.truncate(bytes_read);
    debug!(
        "Read {} bytes from {} for format detection",
        bytes_read,
        file_path.display()
    );

    image::guess_format(&buffer).map_err(|e| {
        OcrError::Validation(format!(
            "Could not determine image format for {}: {e}",
            file_path.display()
        ))
    })
}

/// Whether the file passes validation and has a format the provider accepts
pub fn is_supported_image_format(file_path: &Path, config: &VisionConfig) -> bool {
    if let Err(e) = validate_image_file(file_path, config) {
        info!("{e}");
        return false;
    }
    match detect_image_format(file_path) {
        Ok(format) => {
            let supported = mime_type_for(format).is_some();
            if supported {
                info!(
                    "Detected supported image format: {format:?} for file: {}",
                    file_path.display()
                );
            } else {
                info!(
                    "Detected unsupported image format: {format:?} for file: {}",
                    file_path.display()
                );
            }
            supported
        }
        Err(e) => {
            info!("{e}");
            false
        }
    }
}

/// Validate, sniff and base64-encode an image file
pub fn encode_image_file(
    file_path: impl AsRef<Path>,
    config: &VisionConfig,
) -> Result<ImagePayload, OcrError> {
    let file_path = file_path.as_ref();
    let size = validate_image_file(file_path, config)?;
    let format = detect_image_format(file_path)?;
    let mime_type = mime_type_for(format).ok_or_else(|| {
        OcrError::Validation(format!("Unsupported image format: {format:?}"))
    })?;

    let bytes = fs::read(file_path).map_err(|e| {
        OcrError::Validation(format!("Could not read {}: {e}", file_path.display()))
    })?;
    info!(
        "Encoded {} ({:?}, {} bytes) for text detection",
        file_path.display(),
        format,
        size
    );

    Ok(ImagePayload {
        mime_type: mime_type.to_string(),
        base64: STANDARD.encode(bytes),
    })
}

#[derive(Debug, Serialize)]
pub struct AnnotateRequest {
    pub requests: Vec<AnnotateImageRequest>,
}

#[derive(Debug, Serialize)]
pub struct AnnotateImageRequest {
    pub image: ImageContent,
    pub features: Vec<Feature>,
}

#[derive(Debug, Serialize)]
pub struct ImageContent {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: String,
}

/// Request body for one image
pub fn build_annotate_request(payload: &ImagePayload, config: &VisionConfig) -> AnnotateRequest {
    AnnotateRequest {
        requests: vec![AnnotateImageRequest {
            image: ImageContent {
                content: payload.base64.clone(),
            },
            features: vec![Feature {
                kind: config.detection_mode.as_feature().to_string(),
            }],
        }],
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VisionResponse {
    #[serde(default)]
    pub responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotateImageResponse {
    #[serde(default)]
    pub full_text_annotation: Option<FullTextAnnotation>,
    #[serde(default)]
    pub text_annotations: Vec<EntityAnnotation>,
    #[serde(default)]
    pub error: Option<ProviderStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FullTextAnnotation {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntityAnnotation {
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderStatus {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

/// Transcription carried by a provider response
///
/// The full-text annotation wins, then the first text annotation; an image
/// without text yields an empty string. A per-image error becomes
/// [`OcrError::Provider`] with the HTTP status the response arrived with.
pub fn extract_full_text(response: &VisionResponse, http_status: u16) -> Result<String, OcrError> {
    let Some(first) = response.responses.first() else {
        return Ok(String::new());
    };

    if let Some(status) = &first.error {
        return Err(OcrError::Provider(
            http_status,
            truncate_chars(
                &format!("{} (code {})", status.message, status.code),
                MAX_ERROR_DETAIL_CHARS,
            ),
        ));
    }

    let text = first
        .full_text_annotation
        .as_ref()
        .map(|annotation| annotation.text.as_str())
        .filter(|text| !text.is_empty())
        .or_else(|| {
            first
                .text_annotations
                .first()
                .map(|annotation| annotation.description.as_str())
        })
        .unwrap_or_default();
    Ok(text.to_string())
}

/// First `max_chars` characters of `text`
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Delay before retry `attempt` (1-based), in milliseconds
///
/// `min(base * 2^(attempt-1), max)` plus up to 25% random jitter.
pub fn calculate_retry_delay(attempt: u32, recovery: &RecoveryConfig) -> u64 {
    let exponent = attempt.saturating_sub(1).min(32);
    let delay = recovery
        .base_retry_delay_ms
        .saturating_mul(1u64 << exponent)
        .min(recovery.max_retry_delay_ms);

    let jitter_range = delay / 4;
    let jitter = if jitter_range == 0 {
        0
    } else {
        rand::random::<u64>() % jitter_range
    };
    delay + jitter
}

/// Client for the Vision annotate endpoint
#[derive(Debug, Clone)]
pub struct VisionClient {
    config: VisionConfig,
    http: reqwest::Client,
}

impl VisionClient {
    pub fn new(config: VisionConfig) -> Result<Self, OcrError> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &VisionConfig {
        &self.config
    }

    /// Transcribe an image file
    pub async fn detect_text_in_file(&self, file_path: impl AsRef<Path>) -> Result<String, OcrError> {
        let payload = encode_image_file(file_path, &self.config)?;
        self.detect_text(&payload).await
    }

    /// Transcribe a `data:` URL
    pub async fn detect_text_in_data_url(&self, data_url: &str) -> Result<String, OcrError> {
        let payload = parse_data_url(data_url)?;
        self.detect_text(&payload).await
    }

    /// Transcribe an encoded image, retrying transient failures
    pub async fn detect_text(&self, payload: &ImagePayload) -> Result<String, OcrError> {
        let start_time = Instant::now();
        let max_attempts = self.config.recovery.max_retries + 1; // +1 for initial attempt
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.annotate_once(payload).await {
                Ok(text) => {
                    info!(
                        "Text detection completed on attempt {} in {}ms. Extracted {} characters",
                        attempt,
                        start_time.elapsed().as_millis(),
                        text.chars().count()
                    );
                    return Ok(text);
                }
                Err(err) => {
                    if attempt >= max_attempts || !err.is_retryable() {
                        warn!("Text detection failed after {attempt} attempt(s): {err}");
                        return Err(err);
                    }

                    let delay_ms = calculate_retry_delay(attempt, &self.config.recovery);
                    warn!("Text detection attempt {attempt} failed: {err}. Retrying in {delay_ms}ms");
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
            }
        }
    }

    async fn annotate_once(&self, payload: &ImagePayload) -> Result<String, OcrError> {
        let body = build_annotate_request(payload, &self.config);
        debug!(
            "POST {} ({}, {} base64 bytes)",
            self.config.endpoint,
            self.config.detection_mode.as_feature(),
            payload.base64.len()
        );

        let response = self
            .http
            .post(&self.config.endpoint)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(OcrError::Provider(
                status.as_u16(),
                truncate_chars(&detail, MAX_ERROR_DETAIL_CHARS),
            ));
        }

        let parsed: VisionResponse = response.json().await?;
        extract_full_text(&parsed, status.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_url_rejects_non_images() {
        assert!(parse_data_url("data:text/plain;base64,aGVsbG8=").is_err());
        assert!(parse_data_url("data:image/png,raw").is_err());
        assert!(parse_data_url("").is_err());
    }

    #[test]
    fn test_full_text_preferred_over_annotations() {
        let response: VisionResponse = serde_json::from_str(
            r#"{"responses":[{"fullTextAnnotation":{"text":"Per 100 g"},
                "textAnnotations":[{"description":"other"}]}]}"#,
        )
        .unwrap();
        assert_eq!(extract_full_text(&response, 200).unwrap(), "Per 100 g");
    }

    #[test]
    fn test_retry_delay_without_jitter_room() {
        let recovery = RecoveryConfig {
            max_retries: 1,
            base_retry_delay_ms: 2,
            max_retry_delay_ms: 3,
        };
        assert_eq!(calculate_retry_delay(1, &recovery), 2);
        assert_eq!(calculate_retry_delay(5, &recovery), 3);
    }
}
