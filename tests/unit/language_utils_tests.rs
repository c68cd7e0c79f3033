/*!
 * Tests for language utility functions
 */

use yaptwai::language_utils::{get_language_name, is_rtl_language, language_codes_match, normalize_to_part2t};

/// Test normalization of language codes to ISO 639-2/T format
#[test]
fn test_normalize_to_part2t_withValidCodes_shouldNormalizeCorrectly() {
    assert_eq!(normalize_to_part2t("en").unwrap(), "eng");
    assert_eq!(normalize_to_part2t("fa").unwrap(), "fas");
    assert_eq!(normalize_to_part2t("per").unwrap(), "fas");
    assert_eq!(normalize_to_part2t(" EN ").unwrap(), "eng");
}

/// Test matching of different language code formats
#[test]
fn test_language_codes_match_withEquivalentCodes_shouldReturnTrue() {
    assert!(language_codes_match("en", "eng"));
    assert!(language_codes_match("fa", "per"));
    assert!(!language_codes_match("en", "es"));
}

/// Test language names used in prompts
#[test]
fn test_get_language_name_withKnownCodes_shouldReturnEnglishName() {
    assert_eq!(get_language_name("en").unwrap(), "English");
    assert_eq!(get_language_name("es").unwrap(), "Spanish");
    assert!(get_language_name("zz").is_err());
}

/// Test script direction detection
#[test]
fn test_is_rtl_language_withRtlAndLtrCodes_shouldClassify() {
    for code in ["fa", "ar", "he", "ur"] {
        assert!(is_rtl_language(code), "{} should be right to left", code);
    }
    for code in ["en", "es", "de", "ja"] {
        assert!(!is_rtl_language(code), "{} should be left to right", code);
    }
}
