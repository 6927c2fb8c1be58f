//! Transcript segments and their on-disk JSON form

use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::debug;

use super::Result;

/// One contiguous span of speech with its text and timing (seconds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl Segment {
    #[must_use]
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    /// Clamp both bounds into `[0, duration]`.
    ///
    /// Out-of-range times from the transcriber are truncated, never rejected.
    /// A NaN start counts as 0 and a NaN end as the start.
    #[must_use]
    pub fn clamped(&self, duration: f64) -> Self {
        let duration = duration.max(0.0);
        let start = if self.start.is_nan() { 0.0 } else { self.start };
        let start = start.clamp(0.0, duration);
        let end = if self.end.is_nan() { start } else { self.end };
        let end = end.clamp(start, duration);
        Self {
            start,
            end,
            text: self.text.clone(),
        }
    }

    /// Span length in seconds (never negative)
    #[must_use]
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

/// Write segments as a pretty-printed JSON array (four-space indent).
pub async fn save_segments(segments: &[Segment], path: &Path) -> Result<()> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    segments.serialize(&mut ser)?;

    fs::write(path, buf).await?;
    debug!("Saved {} segments to {:?}", segments.len(), path);
    Ok(())
}

/// Read segments previously written by [`save_segments`].
///
/// Extra fields (whisper writes `id`, `seek`, `tokens`, ...) are ignored.
pub async fn load_segments(path: &Path) -> Result<Vec<Segment>> {
    let content = fs::read_to_string(path).await?;
    let segments: Vec<Segment> = serde_json::from_str(&content)?;
    debug!("Loaded {} segments from {:?}", segments.len(), path);
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caption::CaptionError;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("stenocaptioner_{}_{name}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_clamp_within_bounds_is_identity() {
        let seg = Segment::new(1.0, 2.5, "hi");
        assert_eq!(seg.clamped(10.0), seg);
    }

    #[test]
    fn test_clamp_past_duration() {
        let seg = Segment::new(8.0, 12.0, "tail").clamped(10.0);
        assert_eq!(seg.start, 8.0);
        assert_eq!(seg.end, 10.0);

        let seg = Segment::new(11.0, 12.0, "gone").clamped(10.0);
        assert_eq!(seg.start, 10.0);
        assert_eq!(seg.end, 10.0);
        assert_eq!(seg.duration(), 0.0);
    }

    #[test]
    fn test_clamp_nan_bounds() {
        let seg = Segment::new(f64::NAN, 2.0, "x").clamped(5.0);
        assert_eq!((seg.start, seg.end), (0.0, 2.0));

        let seg = Segment::new(1.0, f64::NAN, "x").clamped(5.0);
        assert_eq!((seg.start, seg.end), (1.0, 1.0));
        assert_eq!(seg.duration(), 0.0);
    }

    #[test]
    fn test_clamp_negative_start() {
        let seg = Segment::new(-0.5, 1.0, "early").clamped(10.0);
        assert_eq!(seg.start, 0.0);
        assert_eq!(seg.end, 1.0);
    }

    #[tokio::test]
    async fn test_save_then_load_preserves_order() {
        let path = temp_path("transcript.json");
        let segments = vec![
            Segment::new(0.0, 1.5, " Hello there."),
            Segment::new(1.5, 3.25, "こんにちは、世界。"),
            Segment::new(3.25, 4.0, ""),
        ];

        save_segments(&segments, &path).await.unwrap();
        let loaded = load_segments(&path).await.unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, segments);
    }

    #[tokio::test]
    async fn test_saved_file_uses_four_space_indent() {
        let path = temp_path("indent.json");
        save_segments(&[Segment::new(0.0, 1.0, "a")], &path).await.unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert!(content.starts_with("[\n    {\n        \"start\""));
    }

    #[tokio::test]
    async fn test_load_ignores_whisper_fields() {
        let path = temp_path("whisper.json");
        std::fs::write(
            &path,
            r#"[{"id": 0, "seek": 0, "start": 0.0, "end": 2.0, "text": " Hi.", "tokens": [1, 2], "temperature": 0.0}]"#,
        )
        .unwrap();
        let loaded = load_segments(&path).await.unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, vec![Segment::new(0.0, 2.0, " Hi.")]);
    }

    #[tokio::test]
    async fn test_load_missing_file_is_io_error() {
        let err = load_segments(Path::new("/nonexistent/transcript.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, CaptionError::Io(_)));
    }
}
