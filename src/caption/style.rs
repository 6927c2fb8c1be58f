//! Caption text styling and its ffmpeg drawtext form

use serde::{Deserialize, Serialize};

use super::compositor::quote_filter_value;

/// Look of the burned-in caption text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionStyle {
    /// Text color (name like `white`, or hex `RRGGBB` / `#RRGGBB`)
    pub text_color: String,
    /// Box drawn behind the text, none when unset
    pub background_color: Option<String>,
    /// Outline color, none when unset
    pub contour_color: Option<String>,
    /// Outline width in pixels (only used with a contour color)
    pub contour_width: f32,
    /// Font family name, or a path to a font file
    pub font: String,
    /// Font size in points
    pub font_size: u32,
    /// Seconds to fade the caption in (0 disables)
    pub fadein_duration: f64,
    /// Seconds to fade the caption out (0 disables)
    pub fadeout_duration: f64,
    /// Pixels added to the frame width when budgeting line length (may be negative)
    pub side_margin: i32,
    /// Pixels between the last line and the frame bottom; 5% of the height when unset
    pub bottom_margin: Option<u32>,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            text_color: "white".to_string(),
            background_color: None,
            contour_color: None,
            contour_width: 1.0,
            font: "VL-Gothic-Regular".to_string(),
            font_size: 50,
            fadein_duration: 0.0,
            fadeout_duration: 0.0,
            side_margin: 0,
            bottom_margin: None,
        }
    }
}

impl CaptionStyle {
    /// Bottom margin for a frame of the given height
    #[must_use]
    pub fn bottom_margin_for(&self, frame_height: u32) -> f64 {
        self.bottom_margin
            .map_or_else(|| f64::from(frame_height) * 0.05, f64::from)
    }

    /// drawtext options for font, size, color, contour and background
    #[must_use]
    pub fn to_drawtext_params(&self) -> Vec<String> {
        let font_key = if looks_like_font_file(&self.font) {
            "fontfile"
        } else {
            "font"
        };

        let mut params = vec![
            format!("{font_key}={}", quote_filter_value(&self.font)),
            format!("fontsize={}", self.font_size),
            format!("fontcolor={}", ffmpeg_color(&self.text_color)),
        ];

        if let Some(ref contour) = self.contour_color {
            if self.contour_width > 0.0 {
                params.push(format!("borderw={}", self.contour_width.round() as u32));
                params.push(format!("bordercolor={}", ffmpeg_color(contour)));
            }
        }

        if let Some(ref background) = self.background_color {
            params.push(format!(
                "box=1:boxcolor={}:boxborderw=5",
                ffmpeg_color(background)
            ));
        }

        params
    }

    /// Opacity expression for a caption shown for `duration` seconds.
    ///
    /// `None` when neither fade is enabled.
    #[must_use]
    pub fn alpha_expr(&self, duration: f64) -> Option<String> {
        let fade_in = (self.fadein_duration > 0.0)
            .then(|| format!("min(1,t/{})", self.fadein_duration));
        let fade_out = (self.fadeout_duration > 0.0).then(|| {
            format!(
                "min(1,max(0,({duration}-t)/{}))",
                self.fadeout_duration
            )
        });

        match (fade_in, fade_out) {
            (Some(a), Some(b)) => Some(format!("min({a},{b})")),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        }
    }
}

fn looks_like_font_file(font: &str) -> bool {
    let lower = font.to_ascii_lowercase();
    font.contains('/')
        || font.contains('\\')
        || [".ttf", ".otf", ".ttc"].iter().any(|ext| lower.ends_with(ext))
}

/// Convert a user color into ffmpeg color syntax.
///
/// Bare or `#`-prefixed six/eight digit hex becomes `0x...`; names and
/// anything else pass through unchanged.
fn ffmpeg_color(color: &str) -> String {
    let hex = color.strip_prefix('#').unwrap_or(color);
    let is_hex = matches!(hex.len(), 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit());
    if is_hex {
        format!("0x{hex}")
    } else {
        color.to_string()
    }
}
