//! Removes chain-of-thought scaffolding from model output.
//!
//! Small local models happily narrate their reasoning, wrapped in
//! `<think>` tags, fenced ```` ```analysis ```` blocks or a leading
//! `思考：` paragraph. None of that belongs in a speech bubble. An empty
//! result means the reply was all reasoning and the caller should retry.

use lazy_static::lazy_static;
use regex::Regex;

/// Character budget applied when no other is configured.
pub const MAX_OUTPUT_CHARS: usize = 1200;

/// Stop sequences for the second, stricter attempt: role labels the model
/// may start echoing, plus the openers of every reasoning construct.
pub const SOFT_STOPS: &[&str] = &[
    "系统：",
    "用户：",
    "System:",
    "User:",
    "analysis:",
    "Analysis:",
    "<think>",
    "</think>",
    "<analysis>",
    "</analysis>",
    "<assistant_thought>",
    "</assistant_thought>",
    "<scratchpad>",
    "</scratchpad>",
    "<|assistant_thought|>",
    "```think",
    "```analysis",
    "思考：",
    "分析：",
    "推理：",
];

const ALIASES: &str = "think|thinking|thought|analysis|reasoning|scratchpad|assistant_thought";

lazy_static! {
    /// One pattern per alias, so a span only ends at its own closing tag.
    static ref TAG_SPANS: Vec<Regex> = ALIASES
        .split('|')
        .map(|alias| {
            Regex::new(&format!(r"(?is)<\s*{alias}\b[^>]*>.*?</\s*{alias}\s*>"))
                .expect("tag span pattern")
        })
        .collect();
    static ref FENCED_BLOCK: Regex =
        Regex::new(&format!(r"(?is)```[ \t]*(?:{ALIASES})\b.*?```")).expect("fence pattern");
    static ref LEADING_BLOCK: Regex = Regex::new(
        r"(?is)\A\s*(?:思考|推理|分析|analysis|thought|thinking|reasoning)\s*[:：].*?(?:\n\s*\n|\z)"
    )
    .expect("leading block pattern");
    static ref STRAY_TAG: Regex = Regex::new(&format!(
        r"(?i)</\s*(?:{ALIASES})\s*>|<\s*(?:{ALIASES})\s*/>|<\|\s*(?:{ALIASES})\s*\|>"
    ))
    .expect("stray tag pattern");
    static ref OPEN_TAG: Regex =
        Regex::new(&format!(r"(?i)<\s*(?:{ALIASES})\b[^>]*>")).expect("open tag pattern");
    static ref FINAL_MARK: Regex =
        Regex::new(r"(?i)(?:最终答案|答案|结论|final\s+answer|answer)\s*[:：]")
            .expect("final marker pattern");
    static ref SPEAKER_LABEL: Regex =
        Regex::new(r"(?i)\A(?:答|助手|assistant)\s*[:：]\s*").expect("speaker label pattern");
}

/// Strips reasoning markup with the default [`MAX_OUTPUT_CHARS`] budget.
pub fn strip_thinking(raw: &str) -> String {
    Sanitizer::default().strip(raw)
}

/// Reasoning stripper with a configurable output budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sanitizer {
    max_chars: usize,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new(MAX_OUTPUT_CHARS)
    }
}

impl Sanitizer {
    /// `max_chars == 0` disables truncation.
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Returns the display-ready part of `raw`, or an empty string when
    /// nothing usable is left.
    ///
    /// The cleaning pass is repeated until it no longer changes the text, so
    /// `strip(strip(x)) == strip(x)`. Every pass only removes characters,
    /// which bounds the loop.
    pub fn strip(&self, raw: &str) -> String {
        let mut current = self.pass(raw);
        loop {
            let next = self.pass(&current);
            if next == current {
                return current;
            }
            current = next;
        }
    }

    fn pass(&self, raw: &str) -> String {
        if raw.trim().is_empty() {
            return String::new();
        }

        let mut text = raw.to_string();
        for span in TAG_SPANS.iter() {
            text = span.replace_all(&text, "").into_owned();
        }
        let text = FENCED_BLOCK.replace_all(&text, "");
        let text = LEADING_BLOCK.replace(&text, "");
        let mut text = STRAY_TAG.replace_all(&text, "").into_owned();

        // Anything after an opening tag that never closes is reasoning.
        if let Some(open) = OPEN_TAG.find(&text) {
            text.truncate(open.start());
        }

        if let Some(marker) = FINAL_MARK.find_iter(&text).last() {
            text = text[marker.end()..].to_string();
        }

        let text = SPEAKER_LABEL.replace(text.trim(), "");

        let joined = text
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        self.truncate(joined)
    }

    fn truncate(&self, text: String) -> String {
        if self.max_chars == 0 {
            return text;
        }
        match text.char_indices().nth(self.max_chars) {
            Some((cut, _)) => text[..cut].trim_end().to_string(),
            None => text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_alias_pattern_compiles() {
        assert_eq!(TAG_SPANS.len(), ALIASES.split('|').count());
        for pattern in [
            &*FENCED_BLOCK,
            &*LEADING_BLOCK,
            &*STRAY_TAG,
            &*OPEN_TAG,
            &*FINAL_MARK,
            &*SPEAKER_LABEL,
        ] {
            assert!(!pattern.as_str().is_empty());
        }
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let sanitizer = Sanitizer::new(3);
        assert_eq!(sanitizer.strip("香蕉香蕉香蕉"), "香蕉香");
    }

    #[test]
    fn zero_budget_disables_truncation() {
        let long = "a".repeat(5000);
        assert_eq!(Sanitizer::new(0).strip(&long).len(), 5000);
    }
}
