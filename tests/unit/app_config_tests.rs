/*!
 * Tests for configuration loading and validation
 */

use anyhow::Result;
use yaptwai::app_config::{Config, LayoutPolicy, TranslationProvider};
use crate::common;

/// Test that an empty JSON object yields every default
#[test]
fn test_config_withEmptyJson_shouldUseDefaults() -> Result<()> {
    let config: Config = serde_json::from_str("{}")?;
    assert_eq!(config.source_language, "en");
    assert_eq!(config.target_language, "fa");
    assert_eq!(config.translation.provider, TranslationProvider::Ollama);
    assert_eq!(config.translation.common.retry_count, 3);
    assert_eq!(config.translation.common.retry_backoff_ms, 1000);
    assert_eq!(config.pdf.layout, LayoutPolicy::Auto);
    assert_eq!(config.pdf.min_font_size, 5.0);
    assert_eq!(config.pdf.fill_color, Some([1.0, 1.0, 1.0]));
    assert!(config.pdf.flag_untranslated);
    assert!(!config.pdf.summarize);
    Ok(())
}

/// Test that the pdf section is read from JSON
#[test]
fn test_config_withPdfSection_shouldParseFields() -> Result<()> {
    let json = r#"{
        "source_language": "en",
        "target_language": "es",
        "pdf": { "layout": "styled", "start_page": 2, "end_page": 3, "fill_color": null }
    }"#;
    let config: Config = serde_json::from_str(json)?;
    assert_eq!(config.pdf.layout, LayoutPolicy::Styled);
    assert_eq!(config.pdf.start_page, Some(2));
    assert_eq!(config.pdf.end_page, Some(3));
    assert_eq!(config.pdf.fill_color, None);
    Ok(())
}

/// Test that the default configuration is valid
#[test]
fn test_validate_withDefaultConfig_shouldPass() {
    assert!(Config::default().validate().is_ok());
}

/// Test that identical languages are rejected
#[test]
fn test_validate_withSameLanguages_shouldFail() {
    let config = Config {
        source_language: "en".to_string(),
        target_language: "eng".to_string(),
        ..Config::default()
    };
    assert!(config.validate().is_err());
}

/// Test that reversed and zero page numbers are rejected
#[test]
fn test_validate_withBadPageNumbers_shouldFail() {
    let mut config = Config::default();
    config.pdf.start_page = Some(3);
    config.pdf.end_page = Some(2);
    assert!(config.validate().is_err());

    config.pdf.start_page = Some(0);
    config.pdf.end_page = None;
    assert!(config.validate().is_err());
}

/// Test that hosted providers need a key
#[test]
fn test_validate_withHostedProviderAndNoKey_shouldFail() {
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::Anthropic;
    config.translation.active_provider_config_mut().api_key.clear();
    if std::env::var("ANTHROPIC_API_KEY").is_err() {
        assert!(config.validate().is_err());
    }
    config.translation.active_provider_config_mut().api_key = "key".to_string();
    assert!(config.validate().is_ok());
}

/// Test that save and from_file agree
#[test]
fn test_save_then_from_file_shouldPreserveValues() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = dir.path().join("conf.json");

    let mut config = Config::default();
    config.target_language = "ar".to_string();
    config.pdf.end_page = Some(7);
    config.save(&path)?;

    let loaded = Config::from_file(&path)?;
    assert_eq!(loaded.target_language, "ar");
    assert_eq!(loaded.pdf.end_page, Some(7));
    Ok(())
}

/// Test provider and layout parsing from strings
#[test]
fn test_from_str_withKnownNames_shouldParse() {
    assert_eq!("OpenAI".parse::<TranslationProvider>().unwrap(), TranslationProvider::OpenAI);
    assert_eq!("shrink".parse::<LayoutPolicy>().unwrap(), LayoutPolicy::Shrink);
    assert!("carrier-pigeon".parse::<TranslationProvider>().is_err());
}
