//! `stenocaptioner` CLI - transcribe a video and burn captions onto it

mod cmd;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use stenocaptioner::{LetterEffect, ModelSize};

#[derive(Parser)]
#[command(name = "stenocaptioner")]
#[command(about = "Transcribe a video's speech and burn styled, animated captions onto it")]
#[command(version)]
pub struct Cli {
    /// Video URL (YouTube) or local file path
    pub url: String,

    /// Language of the speech (e.g., en, ja)
    #[arg(long, default_value = "en")]
    pub language: String,

    /// Whisper model size
    #[arg(long, value_enum, default_value = "medium")]
    pub model_type: ModelTypeArg,

    /// Caption text color
    #[arg(long, default_value = "white")]
    pub text_color: String,

    /// Box color behind the caption text
    #[arg(long)]
    pub background_color: Option<String>,

    /// Caption outline color
    #[arg(long)]
    pub contour_color: Option<String>,

    /// Caption outline width in pixels
    #[arg(long)]
    pub contour_width: Option<f32>,

    /// Font family name or font file path
    #[arg(long, default_value = "VL-Gothic-Regular")]
    pub font: String,

    /// Font size in points
    #[arg(long, default_value = "50")]
    pub fontsize: u32,

    /// Seconds to fade each caption in
    #[arg(long, default_value = "0.0")]
    pub fadein_duration: f64,

    /// Seconds to fade each caption out
    #[arg(long, default_value = "0.0")]
    pub fadeout_duration: f64,

    /// Save the transcript for reuse with --load-text
    #[arg(long)]
    pub save_text: bool,

    /// Load a saved transcript instead of transcribing
    #[arg(long)]
    pub load_text: Option<PathBuf>,

    /// Per-letter caption animation
    #[arg(long, value_enum, default_value = "none")]
    pub letter_effect: LetterEffectArg,

    /// Pixels added to the frame width when wrapping (negative narrows)
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    pub side_margin: i32,

    /// Pixels between captions and the frame bottom [default: 5% of height]
    #[arg(long)]
    pub bottom_margin: Option<u32>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModelTypeArg {
    Tiny,
    Base,
    Small,
    Medium,
    Large,
}

impl From<ModelTypeArg> for ModelSize {
    fn from(arg: ModelTypeArg) -> Self {
        match arg {
            ModelTypeArg::Tiny => Self::Tiny,
            ModelTypeArg::Base => Self::Base,
            ModelTypeArg::Small => Self::Small,
            ModelTypeArg::Medium => Self::Medium,
            ModelTypeArg::Large => Self::Large,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LetterEffectArg {
    /// Whole lines, no animation
    None,
    /// Letters appear one after another
    Typing,
    /// Letters slide in from the right
    Arrive,
    /// Letters drop in with a damped bounce
    Cascade,
}

impl From<LetterEffectArg> for LetterEffect {
    fn from(arg: LetterEffectArg) -> Self {
        match arg {
            LetterEffectArg::None => Self::None,
            LetterEffectArg::Typing => Self::Typing,
            LetterEffectArg::Arrive => Self::Arrive,
            LetterEffectArg::Cascade => Self::Cascade,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();
    cmd::cmd_caption(&cli).await
}
