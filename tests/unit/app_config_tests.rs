/*!
 * Tests for configuration defaults, validation and prompt rendering
 */

use resubai::app_config::TranslatorConfig;

use crate::common::test_config;

#[test]
fn test_config_defaults_shouldValidate() {
    assert!(TranslatorConfig::default().validate().is_ok());
    assert!(test_config().validate().is_ok());
}

#[test]
fn test_config_deserialization_withPartialJson_shouldFillDefaults() {
    let json = r#"{
        "endpoint": "http://localhost:8080/v1",
        "api_key": "secret",
        "target_language": "fr"
    }"#;
    let config: TranslatorConfig = serde_json::from_str(json).unwrap();
    assert_eq!(config.endpoint, "http://localhost:8080/v1");
    assert_eq!(config.target_language, "fr");
    assert_eq!(config.max_word_count, 14);
    assert_eq!(config.retry_backoff_ms, vec![1000, 2000]);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_roundTripsThroughSerde() {
    let config = test_config();
    let json = serde_json::to_string(&config).unwrap();
    let back: TranslatorConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back.endpoint, config.endpoint);
    assert_eq!(back.batch_size_max, config.batch_size_max);
}

#[test]
fn test_validate_withMalformedEndpoint_shouldFail() {
    let config = TranslatorConfig {
        endpoint: "not a url".to_string(),
        ..TranslatorConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_withZeroWordCount_shouldFail() {
    let config = TranslatorConfig {
        max_word_count: 0,
        ..TranslatorConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_withInvertedBatchRange_shouldFail() {
    let config = TranslatorConfig {
        batch_size_min: 20,
        batch_size_max: 10,
        ..TranslatorConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_lengthThresholds_scaleWithWordCount() {
    let config = TranslatorConfig {
        max_word_count: 10,
        ..TranslatorConfig::default()
    };
    let t = config.length_thresholds();
    assert_eq!(t.target, 10);
    assert_eq!(t.tolerance, 12);
    assert_eq!(t.warning, 15);
    assert_eq!(t.max, 20);
}

#[test]
fn test_renderTranslatePrompt_usesLanguageName() {
    let config = TranslatorConfig {
        target_language: "fr".to_string(),
        ..TranslatorConfig::default()
    };
    let prompt = config.render_translate_prompt();
    assert!(prompt.contains("French"));
    assert!(!prompt.contains("{target_language}"));
}
