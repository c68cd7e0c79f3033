use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for ISO language code handling
///
/// Languages can be given as ISO 639-1 (2-letter) or ISO 639-2 (3-letter)
/// codes, or by English name ("Persian", "German"). Everything is normalized
/// to ISO 639-2/T before comparison.
/// Language code type
#[derive(Debug, PartialEq, Eq)]
pub enum LanguageCodeType {
    /// ISO 639-1 (2-letter) code
    Part1,
    /// ISO 639-2/T (3-letter) code
    Part2T,
    /// ISO 639-2/B (3-letter) code
    Part2B,
    /// English language name
    Name,
}

/// Bibliographic codes that differ from their terminological counterpart
const PART2B_TO_PART2T: &[(&str, &str)] = &[
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

/// Languages written right to left (ISO 639-2/T)
const RTL_LANGUAGES: &[&str] = &[
    "ara", "arz", "ckb", "div", "fas", "heb", "pes", "prs", "pus", "snd", "syr", "uig", "urd",
    "yid",
];

/// Left-to-right languages whose script has no WinAnsi letters (ISO 639-2/T)
const NON_LATIN_LTR_LANGUAGES: &[&str] = &[
    "amh", "bel", "ben", "bod", "bul", "dzo", "ell", "guj", "hin", "hye", "jpn", "kan", "kat", "kaz",
    "khm", "kir", "kor", "lao", "mal", "mar", "mkd", "mon", "mya", "nep", "pan", "rus", "sin", "srp",
    "tam", "tel", "tgk", "tha", "tir", "ukr", "zho",
];

fn part2b_to_part2t(code: &str) -> Option<&'static str> {
    PART2B_TO_PART2T
        .iter()
        .find(|(b, _)| *b == code)
        .map(|(_, t)| *t)
}

fn language_from_name(name: &str) -> Option<Language> {
    let trimmed = name.trim();
    let mut candidates = vec![trimmed.to_string()];
    // "Persian فارسی" style labels carry the native name after the English one
    if let Some(first) = trimmed.split_whitespace().next() {
        candidates.push(first.to_string());
    }
    candidates.into_iter().find_map(|candidate| {
        let mut chars = candidate.chars();
        let titled = match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
            None => return None,
        };
        Language::from_name(&titled)
    })
}

/// Validate if a language code is a valid ISO 639-1 or ISO 639-2 code or an English name
pub fn validate_language_code(code: &str) -> Result<LanguageCodeType> {
    let normalized_code = code.trim().to_lowercase();

    if normalized_code.len() == 2 && Language::from_639_1(&normalized_code).is_some() {
        return Ok(LanguageCodeType::Part1);
    }
    if normalized_code.len() == 3 {
        if Language::from_639_3(&normalized_code).is_some() {
            return Ok(LanguageCodeType::Part2T);
        }
        if part2b_to_part2t(&normalized_code).is_some() {
            return Ok(LanguageCodeType::Part2B);
        }
    }
    if language_from_name(code).is_some() {
        return Ok(LanguageCodeType::Name);
    }

    Err(anyhow!("Invalid language code: {}", code))
}

/// Normalize a language code or name to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    let normalized_code = code.trim().to_lowercase();

    if normalized_code.len() == 2 {
        if let Some(lang) = Language::from_639_1(&normalized_code) {
            return Ok(lang.to_639_3().to_string());
        }
    } else if normalized_code.len() == 3 {
        if Language::from_639_3(&normalized_code).is_some() {
            return Ok(normalized_code);
        }
        if let Some(part2t) = part2b_to_part2t(&normalized_code) {
            return Ok(part2t.to_string());
        }
    }
    if let Some(lang) = language_from_name(code) {
        return Ok(lang.to_639_3().to_string());
    }

    Err(anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Normalize a language code to ISO 639-1 (2-letter) format if possible
/// Falls back to ISO 639-2/T if no ISO 639-1 code exists
pub fn normalize_to_part1_or_part2t(code: &str) -> Result<String> {
    let part2t = normalize_to_part2t(code)?;
    let lang = Language::from_639_3(&part2t)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", part2t))?;
    Ok(lang
        .to_639_1()
        .map(|c| c.to_string())
        .unwrap_or(part2t))
}

/// Check if two language codes match (represent the same language)
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (normalize_to_part2t(code1), normalize_to_part2t(code2)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Get the English language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let normalized = normalize_to_part2t(code)?;
    let lang = Language::from_639_3(&normalized)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", normalized))?;

    Ok(lang.to_name().to_string())
}

/// Whether the language is written right to left.
///
/// Unknown languages are treated as left to right.
pub fn is_rtl_language(code: &str) -> bool {
    normalize_to_part2t(code)
        .map(|c| RTL_LANGUAGES.contains(&c.as_str()))
        .unwrap_or(false)
}

/// Whether text in this language needs a font beyond the Latin standard
/// fonts. Unknown languages are assumed to be written in Latin script.
pub fn needs_unicode_font(code: &str) -> bool {
    normalize_to_part2t(code)
        .map(|c| RTL_LANGUAGES.contains(&c.as_str()) || NON_LATIN_LTR_LANGUAGES.contains(&c.as_str()))
        .unwrap_or(false)
}
