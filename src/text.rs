//! Text transformations between the language model and the synthesizer.

use crate::config::SpeechConfig;

/// Words that mark a sentence as a question when they open it.
const INTERROGATIVES: &[&str] = &["who", "what", "where", "when", "why", "how"];

/// Apply pronunciation replacements and (optionally) emoji stripping.
pub fn filter_reply(text: &str, config: &SpeechConfig) -> String {
    let mut out = text.to_owned();
    for (from, to) in &config.replacements {
        if !from.is_empty() {
            out = out.replace(from.as_str(), to);
        }
    }
    if config.strip_emoji {
        out = strip_emoji(&out);
    }
    out.trim().to_owned()
}

/// Remove characters outside the Basic Multilingual Plane (emoji and
/// pictographs the synthesizer would read out or choke on).
pub fn strip_emoji(text: &str) -> String {
    text.chars().filter(|c| u32::from(*c) < 0x1_0000).collect()
}

/// Split a reply into speakable segments on `.`, `!` and `?`.
///
/// Terminators are dropped and blank segments discarded.
pub fn split_into_sentences(paragraph: &str) -> Vec<String> {
    paragraph
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Split after sentence terminators that are followed by whitespace,
/// keeping the terminator with its sentence.
fn sentences_with_terminators(paragraph: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = paragraph.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?')
            && let Some(&(_, next)) = chars.peek()
            && next == ' '
        {
            out.push(&paragraph[start..=i]);
            start = i + 1;
        }
    }
    out.push(&paragraph[start..]);
    out
}

/// Return the first sentence of `paragraph` that reads as a question.
///
/// A sentence is a question when it ends with `?` or its first word is an
/// interrogative (who/what/where/when/why/how).
pub fn find_question(paragraph: &str) -> Option<&str> {
    sentences_with_terminators(paragraph)
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .find(|s| {
            if s.ends_with('?') {
                return true;
            }
            let first = s
                .split_whitespace()
                .next()
                .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
                .unwrap_or_default();
            INTERROGATIVES.contains(&first.as_str())
        })
}

pub fn is_question(paragraph: &str) -> bool {
    find_question(paragraph).is_some()
}

/// Lowercase, drop punctuation and collapse whitespace so that phrase
/// matching is resilient to transcription formatting.
/// For example, "Hey, Bunny!" becomes "hey bunny".
pub fn normalize_phrase(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether `phrase` occurs in `normalized` on word boundaries.
/// Both arguments must already be normalized.
pub fn contains_phrase(normalized: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return false;
    }
    format!(" {normalized} ").contains(&format!(" {phrase} "))
}
