/*!
 * Prompt templates for block translation and summarization.
 *
 * Templates use `### Instructions` / `### Input` / `### <Answer>` sections so
 * small local models see a clear boundary between task and payload.
 */

/// A prompt with `{placeholder}` slots.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    /// Condense one chunk of a document.
    pub const SUMMARIZE: &'static str = "### Instructions\n\
Summarize the following text concisely. Keep the main meaning, clarity, and tone. \
Remove redundancy, simplify phrasing, and output only the summary text with no prefatory phrases or explanations.\n\n\
### Input\n{chunk}\n\n### Summary";

    /// Translate one block.
    pub const TRANSLATE: &'static str = "### Instructions\n\
Translate the following text from {source_lang} to {target_lang}. \
Output only the translated text with no explanations or extra phrases.\n\n\
### Input\n{chunk}\n\n### Translation";

    /// Translate one block with a document summary for disambiguation.
    pub const TRANSLATE_WITH_CONTEXT: &'static str = "### Instructions\n\
Translate the following text from {source_lang} to {target_lang}. \
Output only the translated text with no explanations or extra phrases. \
Use the document summary below only to resolve ambiguous terms; do not translate it. \
Keep proper names, dates, numbers, and formulas exactly as they appear in the input.\n\n\
### Document Summary\n{context}\n\n\
### Input\n{chunk}\n\n### Translation";

    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    /// Fill every `{key}` slot with its value in one pass over the template.
    ///
    /// Values are copied verbatim, so braces inside a value are never read
    /// as slots. Unknown slots are left as they are.
    pub fn render(&self, values: &[(&str, &str)]) -> String {
        let mut out = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let slot = after
                .find('}')
                .and_then(|close| values.iter().find(|(key, _)| *key == &after[..close]).map(|v| (close, v.1)));
            match slot {
                Some((close, value)) => {
                    out.push_str(value);
                    rest = &after[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}
