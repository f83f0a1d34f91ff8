#[cfg(test)]
mod tests {
    use nutrilabel::errors::OcrError;
    use nutrilabel::ocr::{
        build_annotate_request, calculate_retry_delay, encode_image_file, extract_full_text,
        is_supported_image_format, parse_data_url, truncate_chars, VisionResponse,
    };
    use nutrilabel::ocr_config::{DetectionMode, RecoveryConfig, VisionConfig};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const PNG_HEADER: [u8; 16] = [
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52,
    ];

    fn temp_file_with(bytes: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    fn config() -> VisionConfig {
        VisionConfig::new("test-key")
    }

    #[test]
    fn test_parse_data_url() {
        let payload = parse_data_url("data:image/jpeg;base64,/9j/4AAQSkZJRg==\n").unwrap();
        assert_eq!(payload.mime_type, "image/jpeg");
        assert_eq!(payload.base64, "/9j/4AAQSkZJRg==");

        let payload = parse_data_url("data:image/svg+xml;base64,PHN2Zz4=").unwrap();
        assert_eq!(payload.mime_type, "image/svg+xml");
    }

    #[test]
    fn test_invalid_data_url_is_validation_error() {
        let err = parse_data_url("https://example.com/label.png").unwrap_err();
        assert!(matches!(err, OcrError::Validation(_)));
        assert_eq!(err.to_string(), "Validation error: Invalid image data URL");
    }

    #[test]
    fn test_encode_png_file() {
        let file = temp_file_with(&PNG_HEADER);
        let payload = encode_image_file(file.path(), &config()).unwrap();
        assert_eq!(payload.mime_type, "image/png");
        assert_eq!(payload.base64, "iVBORw0KGgoAAAANSUhEUg==");
        assert!(is_supported_image_format(file.path(), &config()));
    }

    #[test]
    fn test_encode_rejects_text_file() {
        let file = temp_file_with(b"Carboidrati 30 g, definitely not an image");
        let err = encode_image_file(file.path(), &config()).unwrap_err();
        assert!(matches!(err, OcrError::Validation(_)));
        assert!(!is_supported_image_format(file.path(), &config()));
    }

    #[test]
    fn test_encode_rejects_oversized_and_missing_files() {
        let file = temp_file_with(&PNG_HEADER);
        let mut small = config();
        small.max_file_size = 8;
        let err = encode_image_file(file.path(), &small).unwrap_err();
        assert!(err.to_string().contains("too large"));

        let err = encode_image_file("/no/such/label.png", &config()).unwrap_err();
        assert!(matches!(err, OcrError::Validation(_)));

        let empty = temp_file_with(&[]);
        assert!(encode_image_file(empty.path(), &config()).is_err());
    }

    #[test]
    fn test_annotate_request_shape() {
        let payload = parse_data_url("data:image/png;base64,AAAA").unwrap();
        let mut config = config();
        config.detection_mode = DetectionMode::DocumentTextDetection;

        let body = serde_json::to_value(build_annotate_request(&payload, &config)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "requests": [{
                    "image": {"content": "AAAA"},
                    "features": [{"type": "DOCUMENT_TEXT_DETECTION"}]
                }]
            })
        );
    }

    #[test]
    fn test_text_annotation_fallback() {
        let response: VisionResponse = serde_json::from_str(
            r#"{"responses":[{"textAnnotations":[{"description":"Grassi 10 g"},{"description":"Grassi"}]}]}"#,
        )
        .unwrap();
        assert_eq!(extract_full_text(&response, 200).unwrap(), "Grassi 10 g");
    }

    #[test]
    fn test_image_without_text_is_empty() {
        let response: VisionResponse = serde_json::from_str(r#"{"responses":[{}]}"#).unwrap();
        assert_eq!(extract_full_text(&response, 200).unwrap(), "");

        let response: VisionResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(extract_full_text(&response, 200).unwrap(), "");
    }

    #[test]
    fn test_per_image_error_is_provider_error() {
        let response: VisionResponse = serde_json::from_str(
            r#"{"responses":[{"error":{"code":3,"message":"Bad image data."}}]}"#,
        )
        .unwrap();
        let err = extract_full_text(&response, 200).unwrap_err();
        assert_eq!(err.to_string(), "Vision HTTP 200: Bad image data. (code 3)");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_error_detail_truncation() {
        let detail = "é".repeat(600);
        assert_eq!(truncate_chars(&detail, 500).chars().count(), 500);
        assert_eq!(truncate_chars("short", 500), "short");
    }

    #[test]
    fn test_retry_delay_growth_and_cap() {
        let recovery = RecoveryConfig::default();
        let first = calculate_retry_delay(1, &recovery);
        let second = calculate_retry_delay(2, &recovery);
        let capped = calculate_retry_delay(10, &recovery);

        assert!((1000..1250).contains(&first));
        assert!((2000..2500).contains(&second));
        assert!((10000..12500).contains(&capped));
    }
}
