/*!
 * Prompt construction and response clean-up.
 */

use once_cell::sync::Lazy;
use regex::Regex;

pub use self::templates::PromptTemplate;

pub mod templates;

const INPUT_HEADING: &str = "### Input\n";

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[a-zA-Z0-9_-]*\s*\n(.*?)\n?```$").expect("valid regex"));

static ECHOED_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(###\s*)?(translation|summary)\s*:?\s*\n").expect("valid regex"));

/// Prompt asking for a translation of one block
pub fn translate_prompt(text: &str, source: &str, target: &str, context: Option<&str>) -> String {
    match context.map(str::trim).filter(|c| !c.is_empty()) {
        Some(context) => PromptTemplate::new(PromptTemplate::TRANSLATE_WITH_CONTEXT).render(&[
            ("source_lang", source),
            ("target_lang", target),
            ("context", context),
            ("chunk", text),
        ]),
        None => PromptTemplate::new(PromptTemplate::TRANSLATE).render(&[
            ("source_lang", source),
            ("target_lang", target),
            ("chunk", text),
        ]),
    }
}

/// Prompt asking for a summary of one chunk
pub fn summarize_prompt(chunk: &str) -> String {
    PromptTemplate::new(PromptTemplate::SUMMARIZE).render(&[("chunk", chunk)])
}

/// The payload of a prompt built by this module, if it has one
pub fn input_section(prompt: &str) -> Option<&str> {
    let start = prompt.find(INPUT_HEADING)? + INPUT_HEADING.len();
    let rest = &prompt[start..];
    let end = rest.rfind("\n\n### ")?;
    Some(&rest[..end])
}

/// Strip the wrapping models like to add around an answer
pub fn clean_response(raw: &str) -> String {
    let mut text = raw.trim().to_string();
    if let Some(captures) = CODE_FENCE.captures(&text) {
        text = captures[1].trim().to_string();
    }
    if let Some(found) = ECHOED_HEADING.find(&text) {
        text = text[found.end()..].trim().to_string();
    }
    text
}
