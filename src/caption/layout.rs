//! Screen placement of caption lines and letters
//!
//! Lines stack upward from the bottom margin, each horizontally centred.
//! Letters use a fixed advance of `char_width / language_scale`, the same
//! estimate the line wrapper budgets with.

use super::motion::Position;

/// Geometry for one frame size, font size and language
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptionLayout {
    pub frame_width: f64,
    pub frame_height: f64,
    /// Line height in pixels
    pub line_height: f64,
    /// Horizontal advance of one letter in pixels
    pub advance: f64,
    pub bottom_margin: f64,
}

/// One placed line of caption text
#[derive(Debug, Clone, PartialEq)]
pub struct LineLayout {
    pub text: String,
    /// Top edge of the line
    pub y: f64,
}

/// One placed letter and its index in reveal order
#[derive(Debug, Clone, PartialEq)]
pub struct LetterLayout {
    pub letter: char,
    pub index: usize,
    pub origin: Position,
}

impl CaptionLayout {
    #[must_use]
    pub fn new(
        frame_width: u32,
        frame_height: u32,
        char_width: f64,
        scale: u32,
        bottom_margin: f64,
    ) -> Self {
        Self {
            frame_width: f64::from(frame_width),
            frame_height: f64::from(frame_height),
            line_height: char_width,
            advance: char_width / f64::from(scale.max(1)),
            bottom_margin,
        }
    }

    /// Top edge of line `k` out of `line_count`
    #[must_use]
    pub fn line_y(&self, k: usize, line_count: usize) -> f64 {
        self.frame_height - (line_count - k) as f64 * self.line_height - self.bottom_margin
    }

    /// Split wrapped text into positioned lines
    #[must_use]
    pub fn lines(&self, text: &str) -> Vec<LineLayout> {
        let lines: Vec<&str> = text.split('\n').collect();
        let count = lines.len();
        lines
            .into_iter()
            .enumerate()
            .map(|(k, line)| LineLayout {
                text: line.to_string(),
                y: self.line_y(k, count),
            })
            .collect()
    }

    /// Resting position of every non-newline character, numbered across lines
    #[must_use]
    pub fn letters(&self, text: &str) -> Vec<LetterLayout> {
        let mut letters = Vec::new();
        let mut index = 0;

        for line in self.lines(text) {
            let len = line.text.chars().count() as f64;
            let left = self.frame_width / 2.0 - len * self.advance / 2.0;
            for (pos, letter) in line.text.chars().enumerate() {
                letters.push(LetterLayout {
                    letter,
                    index,
                    origin: Position::new(left + pos as f64 * self.advance, line.y),
                });
                index += 1;
            }
        }

        letters
    }
}
