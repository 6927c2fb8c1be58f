//! Sentence-aware line wrapping for caption text
//!
//! Text is cut into sentences at language-specific punctuation, then the
//! sentences are greedily packed into lines under a character budget. The
//! budget comes from the frame width, the font size and a per-language scale
//! (Latin glyphs are roughly half as wide as CJK glyphs at the same size).

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Scale used for languages missing from the table
pub const DEFAULT_SCALE: u32 = 2;

static EN_TERMINATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,.?!]").expect("valid sentence terminator pattern"));

static JA_TERMINATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[、。？！?!]").expect("valid sentence terminator pattern"));

const EN_TRAILING: &[&str] = &[",", ".", "?", "!"];
const JA_TRAILING: &[&str] = &["、", "。", "？", "！", "?", "!"];

fn is_japanese(language: &str) -> bool {
    language == "ja"
}

/// Characters-per-display-unit scale for each language code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageScales {
    scales: HashMap<String, u32>,
}

impl Default for LanguageScales {
    fn default() -> Self {
        let scales = [("en", 2), ("ja", 1)]
            .into_iter()
            .map(|(lang, scale)| (lang.to_string(), scale))
            .collect();
        Self { scales }
    }
}

impl LanguageScales {
    /// Set the scale for a language
    #[must_use]
    pub fn with_scale(mut self, language: &str, scale: u32) -> Self {
        self.scales.insert(language.to_string(), scale);
        self
    }

    /// Scale for `language`, falling back to the English entry.
    #[must_use]
    pub fn scale_for(&self, language: &str) -> u32 {
        self.scales
            .get(language)
            .or_else(|| self.scales.get("en"))
            .copied()
            .unwrap_or(DEFAULT_SCALE)
            .max(1)
    }
}

/// Character budget of one caption line.
///
/// `floor((width + side_margin) / char_width) * scale`; a non-positive
/// usable width gives zero.
#[must_use]
pub fn max_text_length(video_width: u32, side_margin: i32, char_width: f64, scale: u32) -> usize {
    let usable = f64::from(video_width) + f64::from(side_margin);
    if usable <= 0.0 || char_width <= 0.0 {
        return 0;
    }
    ((usable / char_width).floor() as usize).saturating_mul(scale as usize)
}

/// Whether `text` rendered on one line would overflow the usable width.
#[must_use]
pub fn needs_wrap(text: &str, scale: u32, char_width: f64, usable_width: f64) -> bool {
    let units = text.chars().count() / scale.max(1) as usize;
    units as f64 * char_width > usable_width
}

/// Split text into trimmed, non-empty sentences.
///
/// Terminal punctuation stays on the sentence it ends. Japanese uses
/// `、。？！?!`, every other language `,.?!`.
#[must_use]
pub fn split_sentences(text: &str, language: &str) -> Vec<String> {
    let terminators = if is_japanese(language) {
        &*JA_TERMINATORS
    } else {
        &*EN_TERMINATORS
    };

    let mut pieces = Vec::new();
    let mut last = 0;
    for m in terminators.find_iter(text) {
        pieces.push(&text[last..m.end()]);
        last = m.end();
    }
    pieces.push(&text[last..]);

    pieces
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Fold lines made only of a trailing punctuation mark into the line before.
///
/// The merged line is not re-checked against the budget.
fn merge_orphan_punctuation(lines: Vec<String>, language: &str) -> Vec<String> {
    let trailing = if is_japanese(language) {
        JA_TRAILING
    } else {
        EN_TRAILING
    };

    let mut merged: Vec<String> = Vec::with_capacity(lines.len());
    for line in lines {
        let orphan = !merged.is_empty() && trailing.contains(&line.as_str());
        match merged.last_mut() {
            Some(prev) if orphan => prev.push_str(&line),
            _ => merged.push(line),
        }
    }
    merged
}

fn hard_split(sentence: &str, max_length: usize) -> Vec<String> {
    let chars: Vec<char> = sentence.chars().collect();
    chars
        .chunks(max_length)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Reflow `text` into lines of fewer than `max_length` characters.
///
/// Sentences are appended to the current line while the result stays
/// strictly under the budget. A sentence longer than the budget is split
/// into `max_length`-sized chunks; one of exactly `max_length` stays whole.
#[must_use]
pub fn insert_newlines(text: &str, max_length: usize, language: &str) -> String {
    let max_length = max_length.max(1);
    let mut lines: Vec<String> = Vec::new();

    for sentence in split_sentences(text, language) {
        let len = sentence.chars().count();
        let fits = lines
            .last()
            .is_some_and(|current| current.chars().count() + len < max_length);

        if fits {
            if let Some(current) = lines.last_mut() {
                current.push_str(&sentence);
            }
        } else if len > max_length {
            lines.extend(hard_split(&sentence, max_length));
        } else {
            lines.push(sentence);
        }
    }

    merge_orphan_punctuation(lines, language).join("\n")
}
