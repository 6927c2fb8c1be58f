//! User configuration loaded from `~/.config/stenocaptioner/config.toml`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::caption::{EncoderConfig, LanguageScales, PipelineConfig};

/// External tool locations. Unset entries are looked up on `PATH`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg: Option<String>,
    pub ffprobe: Option<String>,
    pub whisper: Option<String>,
    pub yt_dlp: Option<String>,
}

/// Caption geometry and animation timing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Point-to-pixel correction applied to the font size.
    pub px_per_pt: f64,
    /// Seconds one letter takes to settle with `arrive` / `cascade`.
    pub transition_duration: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            px_per_pt: 1.0,
            transition_duration: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Let whisper print its own progress.
    pub verbose: bool,
    /// Where `--save-text` writes the transcript.
    pub transcript_file: PathBuf,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            verbose: true,
            transcript_file: PathBuf::from("transcript.json"),
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tools: ToolsConfig,
    pub layout: LayoutConfig,
    /// Overrides on top of the built-in `en = 2`, `ja = 1` table.
    pub language_scales: HashMap<String, u32>,
    pub encoder: EncoderConfig,
    pub transcription: TranscriptionSettings,
}

impl Config {
    /// Built-in scales with the configured overrides applied.
    #[must_use]
    pub fn language_scales(&self) -> LanguageScales {
        self.language_scales
            .iter()
            .fold(LanguageScales::default(), |scales, (lang, scale)| {
                scales.with_scale(lang, *scale)
            })
    }

    /// Pipeline settings derived from this file; CLI options go on top.
    #[must_use]
    pub fn pipeline_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig {
            language_scales: self.language_scales(),
            px_per_pt: self.layout.px_per_pt,
            transition_duration: self.layout.transition_duration,
            encoder: self.encoder.clone(),
            ffmpeg_path: self.tools.ffmpeg.clone(),
            ffprobe_path: self.tools.ffprobe.clone(),
            ytdlp_path: self.tools.yt_dlp.clone(),
            ..Default::default()
        };

        config.transcription = config
            .transcription
            .with_verbose(self.transcription.verbose);
        if let Some(whisper) = &self.tools.whisper {
            config.transcription.whisper_path.clone_from(whisper);
        }

        config
    }
}

/// Load the configuration from `~/.config/stenocaptioner/config.toml`.
///
/// Returns defaults if the file doesn't exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config() -> Result<Config> {
    load_config_from(&config_path())
}

/// Load the configuration from an explicit path.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    toml::from_str(&content).with_context(|| format!("invalid TOML in {}", path.display()))
}

/// Return the path to the config file.
#[must_use]
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stenocaptioner")
        .join("config.toml")
}
