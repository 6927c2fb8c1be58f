//! Caption pipeline: acquire -> transcribe -> wrap -> burn
//!
//! Turns a video (local file or hosted URL) into a copy with its speech
//! burned in as styled, optionally animated captions.
//!
//! # Stages
//!
//! - **Acquisition** - local path as-is, hosted videos via `yt-dlp`
//! - **Transcription** - `whisper` segments, or a transcript saved by an earlier run
//! - **Line wrapping** - sentence-aware reflow bounded by the frame width
//! - **Rendering** - per-segment `ffmpeg` drawtext overlays, concatenated
//!
//! # Example
//!
//! ```rust,no_run
//! use stenocaptioner::caption::{CaptionPipeline, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pipeline = CaptionPipeline::new(PipelineConfig::default())?;
//!     let result = pipeline.run("talk.mp4").await?;
//!     println!("{}", result.output_path.display());
//!     Ok(())
//! }
//! ```

pub mod compositor;
pub mod layout;
pub mod motion;
pub mod pipeline;
pub mod render;
pub mod segment;
pub mod source;
pub mod style;
pub mod transcribe;
pub mod wrap;

use thiserror::Error;

pub use compositor::{ClipPlan, EncoderConfig, FfmpegCompositor, TextOverlay, VideoCompositor, VideoInfo};
pub use layout::{CaptionLayout, LetterLayout, LineLayout};
pub use motion::{LetterEffect, MotionCurve, Position};
pub use pipeline::{CaptionPipeline, PipelineConfig, PipelineResult};
pub use render::CaptionRenderer;
pub use segment::{load_segments, save_segments, Segment};
pub use source::{SourceVideo, VideoSource, YtDlpSource};
pub use style::CaptionStyle;
pub use transcribe::{ModelSize, TranscriptionConfig, Transcriber, WhisperTranscriber};
pub use wrap::{insert_newlines, max_text_length, needs_wrap, split_sentences, LanguageScales};

/// Caption pipeline errors
#[derive(Error, Debug)]
pub enum CaptionError {
    #[error("FFmpeg error: {0}")]
    Ffmpeg(String),

    #[error("FFprobe error: {0}")]
    Ffprobe(String),

    #[error("Whisper error: {0}")]
    Whisper(String),

    #[error("Download error: {0}")]
    Download(String),

    #[error("letter_effect {0} is not supported (expected one of: none, typing, arrive, cascade)")]
    UnsupportedEffect(String),

    #[error("model type {0} is not supported (expected one of: tiny, base, small, medium, large)")]
    UnsupportedModel(String),

    #[error("No speech segments to caption in {0}")]
    EmptyTranscript(String),

    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CaptionError>;
