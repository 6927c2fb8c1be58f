//! Speech-to-text via the Whisper CLI
//!
//! Runs `whisper` on the media file with JSON output into a work directory
//! and reads the segment list back.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::process::Stdio;
use std::str::FromStr;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, info};

use super::segment::Segment;
use super::{CaptionError, Result};

/// Whisper model size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSize {
    Tiny,
    Base,
    Small,
    #[default]
    Medium,
    Large,
}

impl ModelSize {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tiny => "tiny",
            Self::Base => "base",
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        }
    }
}

impl fmt::Display for ModelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelSize {
    type Err = CaptionError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tiny" => Ok(Self::Tiny),
            "base" => Ok(Self::Base),
            "small" => Ok(Self::Small),
            "medium" => Ok(Self::Medium),
            "large" => Ok(Self::Large),
            other => Err(CaptionError::UnsupportedModel(other.to_string())),
        }
    }
}

/// Configuration for Whisper transcription
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Whisper model size
    pub model: ModelSize,
    /// Language hint (e.g., "en", "ja")
    pub language: String,
    /// Let whisper print its own progress
    pub verbose: bool,
    /// Path to whisper executable (or "whisper" for PATH lookup)
    pub whisper_path: String,
    /// Additional whisper arguments
    pub extra_args: Vec<String>,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            model: ModelSize::default(),
            language: "en".to_string(),
            verbose: true,
            whisper_path: which::which("whisper").map_or_else(
                |_| "whisper".to_string(),
                |p| p.to_string_lossy().to_string(),
            ),
            extra_args: Vec::new(),
        }
    }
}

impl TranscriptionConfig {
    /// Set model size
    #[must_use]
    pub fn with_model(mut self, model: ModelSize) -> Self {
        self.model = model;
        self
    }

    /// Set language
    #[must_use]
    pub fn with_language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }

    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// The transcription engine the pipeline asks for segments
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe the audio track of `media`, using `workdir` for scratch files.
    async fn transcribe(&self, media: &Path, workdir: &Path) -> Result<Vec<Segment>>;
}

/// Whisper transcription output format (JSON)
#[derive(Debug, Clone, Deserialize)]
struct WhisperOutput {
    segments: Vec<WhisperSegment>,
}

#[derive(Debug, Clone, Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    text: String,
}

/// Transcriber running the `whisper` command line tool
pub struct WhisperTranscriber {
    config: TranscriptionConfig,
}

impl WhisperTranscriber {
    #[must_use]
    pub fn new(config: TranscriptionConfig) -> Self {
        Self { config }
    }

    fn build_args(&self, media: &Path, output_dir: &Path) -> Vec<String> {
        let mut args = vec![
            media.to_string_lossy().to_string(),
            "--model".to_string(),
            self.config.model.to_string(),
            "--language".to_string(),
            self.config.language.clone(),
            "--output_format".to_string(),
            "json".to_string(),
            "--output_dir".to_string(),
            output_dir.to_string_lossy().to_string(),
            "--verbose".to_string(),
            if self.config.verbose { "True" } else { "False" }.to_string(),
        ];

        args.extend(self.config.extra_args.clone());
        args
    }
}

/// Convert Whisper output to segments, ordered by start time
fn whisper_to_segments(whisper: WhisperOutput) -> Vec<Segment> {
    let mut segments: Vec<Segment> = whisper
        .segments
        .into_iter()
        .map(|seg| Segment::new(seg.start, seg.end, seg.text.trim()))
        .collect();
    segments.sort_by(|a, b| a.start.total_cmp(&b.start));
    segments
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, media: &Path, workdir: &Path) -> Result<Vec<Segment>> {
        let args = self.build_args(media, workdir);
        debug!("Running whisper with args: {:?}", args);
        info!(
            "Transcribing with Whisper ({}, language {})...",
            self.config.model, self.config.language
        );

        let stdout = if self.config.verbose {
            Stdio::inherit()
        } else {
            Stdio::null()
        };

        let output = Command::new(&self.config.whisper_path)
            .args(&args)
            .stdout(stdout)
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    CaptionError::MissingDependency(self.config.whisper_path.clone())
                }
                _ => CaptionError::Io(e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CaptionError::Whisper(format!(
                "Whisper transcription failed: {}",
                stderr.trim()
            )));
        }

        // whisper names its output after the input stem
        let stem = media
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let json_path = workdir.join(format!("{stem}.json"));

        if !json_path.exists() {
            return Err(CaptionError::Whisper(format!(
                "Whisper output file not found: {}",
                json_path.display()
            )));
        }

        let json_content = fs::read_to_string(&json_path).await?;
        let whisper_output: WhisperOutput = serde_json::from_str(&json_content)?;

        let _ = fs::remove_file(&json_path).await;

        let segments = whisper_to_segments(whisper_output);
        info!("Transcribed {} segments", segments.len());
        Ok(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_size_parse() {
        assert_eq!("tiny".parse::<ModelSize>().unwrap(), ModelSize::Tiny);
        assert_eq!("large".parse::<ModelSize>().unwrap(), ModelSize::Large);
        assert!(matches!(
            "huge".parse::<ModelSize>(),
            Err(CaptionError::UnsupportedModel(_))
        ));
        assert_eq!(ModelSize::default().to_string(), "medium");
    }

    #[test]
    fn test_build_args() {
        let config = TranscriptionConfig::default()
            .with_model(ModelSize::Small)
            .with_language("ja")
            .with_verbose(false);
        let args = WhisperTranscriber::new(config)
            .build_args(Path::new("talk.mp4"), Path::new("/tmp/run"));

        assert_eq!(
            args,
            vec![
                "talk.mp4", "--model", "small", "--language", "ja", "--output_format", "json",
                "--output_dir", "/tmp/run", "--verbose", "False",
            ]
        );
    }

    #[test]
    fn test_whisper_to_segments_trims_and_orders() {
        let json = r#"{
            "text": " Second. First.",
            "language": "en",
            "segments": [
                {"id": 1, "seek": 0, "start": 2.0, "end": 3.0, "text": " First.", "tokens": [1]},
                {"id": 0, "seek": 0, "start": 0.0, "end": 2.0, "text": " Second. ", "tokens": [2]}
            ]
        }"#;
        let output: WhisperOutput = serde_json::from_str(json).unwrap();
        let segments = whisper_to_segments(output);

        assert_eq!(
            segments,
            vec![Segment::new(0.0, 2.0, "Second."), Segment::new(2.0, 3.0, "First.")]
        );
    }

    #[test]
    fn test_transcription_config_from_toml() {
        let config: TranscriptionConfig = toml::from_str("model = \"tiny\"\nverbose = false").unwrap();
        assert_eq!(config.model, ModelSize::Tiny);
        assert!(!config.verbose);
        assert_eq!(config.language, "en");
    }

    #[tokio::test]
    async fn test_missing_whisper_binary() {
        let config = TranscriptionConfig {
            whisper_path: "/nonexistent/whisper".to_string(),
            ..Default::default()
        };
        let err = WhisperTranscriber::new(config)
            .transcribe(Path::new("a.mp4"), &std::env::temp_dir())
            .await
            .unwrap_err();
        assert!(matches!(err, CaptionError::MissingDependency(_)));
    }
}
