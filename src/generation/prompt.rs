// SPDX-License-Identifier: MIT
// Prompt construction and response clean-up for snippet generation.

use once_cell::sync::Lazy;
use regex::Regex;

/// One fenced-code opening marker, with an optional language annotation,
/// anchored to the very start of the text.
static FENCE_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^```\w*\n").expect("fence-open regex"));

/// One fenced-code closing marker anchored to the very end of the text.
static FENCE_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n```$").expect("fence-close regex"));

/// Build the single text prompt sent to the generation endpoint.
///
/// Embeds the current editor content fenced by the language tag, the user's
/// literal instruction, and a directive that the model must answer with a
/// bare code fragment suitable for direct insertion — no prose.
pub fn build_generation_prompt(existing_code: &str, instruction: &str, language: &str) -> String {
    format!(
        "Given the following existing code:\n\n\
         ```{language}\n\
         {existing_code}\n\
         ```\n\n\
         User request: {instruction}\n\n\
         Please provide only the code snippet that fulfills the user's request. \
         Do not include any explanations or text outside of the code. The output \
         must be valid {language} code that can be inserted directly into the \
         existing code, and remember that the code runs inside a live online \
         code editor."
    )
}

/// Trim the raw model output and strip one enclosing fenced-code-block pair.
///
/// Exactly one leading ```` ```lang ```` marker (language annotation optional)
/// is removed if present at the very start, and exactly one trailing
/// ```` ``` ```` if present at the very end. Fences anywhere else in the body
/// are left alone, so already-clean text passes through unchanged (modulo the
/// trim) and the operation is idempotent on it.
pub fn strip_code_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_open = FENCE_OPEN.replace(trimmed, "");
    FENCE_CLOSE.replace(&without_open, "").into_owned()
}
