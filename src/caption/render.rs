//! Turning transcript segments into clip render plans
//!
//! Pure planning: clamps each segment to the video, wraps its text to the
//! frame, places lines or letters and attaches fades and motion. The
//! compositor executes the resulting [`ClipPlan`]s.

use tracing::debug;

use super::compositor::{ClipPlan, TextOverlay, VideoInfo};
use super::layout::CaptionLayout;
use super::motion::LetterEffect;
use super::segment::Segment;
use super::style::CaptionStyle;
use super::wrap::{insert_newlines, max_text_length, needs_wrap, LanguageScales};

/// Plans captioned clips for one video
#[derive(Debug, Clone)]
pub struct CaptionRenderer {
    pub style: CaptionStyle,
    pub effect: LetterEffect,
    pub language: String,
    pub scales: LanguageScales,
    /// Point-to-pixel correction applied to the font size
    pub px_per_pt: f64,
    /// Seconds one letter takes to settle with `arrive` / `cascade`
    pub transition_duration: f64,
}

impl Default for CaptionRenderer {
    fn default() -> Self {
        Self {
            style: CaptionStyle::default(),
            effect: LetterEffect::None,
            language: "en".to_string(),
            scales: LanguageScales::default(),
            px_per_pt: 1.0,
            transition_duration: 1.0,
        }
    }
}

impl CaptionRenderer {
    /// Width in pixels budgeted for one character
    #[must_use]
    pub fn char_width(&self) -> f64 {
        f64::from(self.style.font_size) * self.px_per_pt
    }

    fn scale(&self) -> u32 {
        self.scales.scale_for(&self.language)
    }

    /// Reflow `text` when it would overflow a frame `video_width` pixels wide.
    #[must_use]
    pub fn wrap_text(&self, text: &str, video_width: u32) -> String {
        let scale = self.scale();
        let char_width = self.char_width();
        let usable = f64::from(video_width) + f64::from(self.style.side_margin);

        if needs_wrap(text, scale, char_width, usable) {
            let max_length = max_text_length(video_width, self.style.side_margin, char_width, scale);
            insert_newlines(text, max_length, &self.language)
        } else {
            text.trim().to_string()
        }
    }

    /// Plan every segment, in order, skipping those empty after clamping
    #[must_use]
    pub fn plan(&self, segments: &[Segment], info: &VideoInfo) -> Vec<ClipPlan> {
        segments
            .iter()
            .filter_map(|seg| {
                let clamped = seg.clamped(info.duration);
                if clamped.duration() <= 0.0 {
                    debug!(
                        "Skipping empty segment {:.2}-{:.2} ({:?})",
                        seg.start, seg.end, seg.text
                    );
                    return None;
                }
                Some(clamped)
            })
            .enumerate()
            .map(|(index, seg)| self.plan_segment(index, &seg, info))
            .collect()
    }

    /// Plan one already clamped segment
    #[must_use]
    pub fn plan_segment(&self, index: usize, segment: &Segment, info: &VideoInfo) -> ClipPlan {
        let text = self.wrap_text(&segment.text, info.width);
        let layout = CaptionLayout::new(
            info.width,
            info.height,
            self.char_width(),
            self.scale(),
            self.style.bottom_margin_for(info.height),
        );
        let alpha = self.style.alpha_expr(segment.duration());

        let overlays = if self.effect.is_per_letter() {
            let letters = layout.letters(&text);
            let step = LetterEffect::step_for(letters.len());
            letters
                .into_iter()
                .filter_map(|letter| {
                    let curve = self.effect.curve(
                        letter.origin,
                        letter.index,
                        step,
                        self.transition_duration,
                    )?;
                    Some(
                        TextOverlay::new(letter.letter.to_string(), curve.x_expr(), curve.y_expr())
                            .with_alpha(alpha.clone())
                            .with_enable(curve.enable_expr()),
                    )
                })
                .collect()
        } else {
            layout
                .lines(&text)
                .into_iter()
                .filter(|line| !line.text.is_empty())
                .map(|line| {
                    TextOverlay::new(line.text, "(w-text_w)/2", format!("{}", line.y.round()))
                        .with_alpha(alpha.clone())
                })
                .collect()
        };

        ClipPlan {
            index,
            start: segment.start,
            end: segment.end,
            style: self.style.clone(),
            overlays,
        }
    }
}
