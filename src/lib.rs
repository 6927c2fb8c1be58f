//! `stenocaptioner` - Burn animated speech captions into video
//!
//! # Features
//!
//! - **Acquisition**: local files, or hosted videos fetched with `yt-dlp`
//! - **Transcription**: `whisper` speech segments, saved and reloaded as JSON
//! - **Line wrapping**: sentence-aware reflow sized to the frame and language
//! - **Letter effects**: `typing`, `arrive` and `cascade` per-letter motion
//!
//! # Example
//!
//! ```rust
//! use stenocaptioner::insert_newlines;
//!
//! let wrapped = insert_newlines("Hello, world. This is great!", 12, "en");
//! assert_eq!(wrapped, "Hello,\nworld.\nThis is grea\nt!");
//! ```

pub mod caption;
pub mod config;

pub use caption::{
    insert_newlines, max_text_length, split_sentences, CaptionError, CaptionPipeline,
    CaptionRenderer, CaptionStyle, LanguageScales, LetterEffect, ModelSize, MotionCurve,
    PipelineConfig, PipelineResult, Position, Segment,
};
pub use config::{load_config, Config};

/// Version of stenocaptioner
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
