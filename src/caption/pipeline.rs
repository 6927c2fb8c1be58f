//! End-to-end captioning pipeline
//!
//! Strictly sequential: acquire, probe, transcribe (or load), plan, render
//! every clip, concatenate. Scratch files live in a per-run directory under
//! `temp_dir`, removed once the output is written.

use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::fs;
use tracing::{debug, info, warn};

use super::compositor::{EncoderConfig, FfmpegCompositor, VideoCompositor};
use super::motion::LetterEffect;
use super::render::CaptionRenderer;
use super::segment::{load_segments, save_segments, Segment};
use super::source::{SourceVideo, VideoSource, YtDlpSource};
use super::style::CaptionStyle;
use super::transcribe::{Transcriber, TranscriptionConfig, WhisperTranscriber};
use super::wrap::LanguageScales;
use super::{CaptionError, Result};

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub transcription: TranscriptionConfig,
    pub style: CaptionStyle,
    pub effect: LetterEffect,
    pub language_scales: LanguageScales,
    pub px_per_pt: f64,
    pub transition_duration: f64,
    pub encoder: EncoderConfig,
    /// Explicit tool paths; `None` uses the PATH lookup
    pub ffmpeg_path: Option<String>,
    pub ffprobe_path: Option<String>,
    pub ytdlp_path: Option<String>,
    /// Parent of the per-run scratch directories
    pub temp_dir: PathBuf,
    /// Write the segments here once they are known
    pub save_text: Option<PathBuf>,
    /// Read segments from here instead of transcribing
    pub load_text: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            transcription: TranscriptionConfig::default(),
            style: CaptionStyle::default(),
            effect: LetterEffect::None,
            language_scales: LanguageScales::default(),
            px_per_pt: 1.0,
            transition_duration: 1.0,
            encoder: EncoderConfig::default(),
            ffmpeg_path: None,
            ffprobe_path: None,
            ytdlp_path: None,
            temp_dir: std::env::temp_dir().join("stenocaptioner"),
            save_text: None,
            load_text: None,
        }
    }
}

impl PipelineConfig {
    #[must_use]
    pub fn with_effect(mut self, effect: LetterEffect) -> Self {
        self.effect = effect;
        self
    }

    #[must_use]
    pub fn with_style(mut self, style: CaptionStyle) -> Self {
        self.style = style;
        self
    }

    /// Reuse a transcript saved by an earlier run
    #[must_use]
    pub fn with_load_text(mut self, path: impl Into<PathBuf>) -> Self {
        self.load_text = Some(path.into());
        self
    }

    /// Save the transcript for later runs
    #[must_use]
    pub fn with_save_text(mut self, path: impl Into<PathBuf>) -> Self {
        self.save_text = Some(path.into());
        self
    }

    fn renderer(&self) -> CaptionRenderer {
        CaptionRenderer {
            style: self.style.clone(),
            effect: self.effect,
            language: self.transcription.language.clone(),
            scales: self.language_scales.clone(),
            px_per_pt: self.px_per_pt,
            transition_duration: self.transition_duration,
        }
    }
}

/// Result of pipeline processing
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub source: SourceVideo,
    pub output_path: PathBuf,
    /// Segments transcribed or loaded
    pub segment_count: usize,
    /// Clips rendered (empty segments are skipped)
    pub clip_count: usize,
    pub processing_time_secs: f64,
}

/// Full captioning pipeline
pub struct CaptionPipeline {
    config: PipelineConfig,
    renderer: CaptionRenderer,
    source: Box<dyn VideoSource>,
    transcriber: Box<dyn Transcriber>,
    compositor: Box<dyn VideoCompositor>,
}

impl CaptionPipeline {
    /// Create a pipeline backed by yt-dlp, whisper and ffmpeg
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let mut source = YtDlpSource::new();
        if let Some(path) = &config.ytdlp_path {
            source = source.with_ytdlp_path(path);
        }

        let mut compositor = FfmpegCompositor::new().with_encoder(config.encoder.clone());
        if let Some(path) = &config.ffmpeg_path {
            compositor = compositor.with_ffmpeg_path(path);
        }
        if let Some(path) = &config.ffprobe_path {
            compositor = compositor.with_ffprobe_path(path);
        }

        let transcriber = WhisperTranscriber::new(config.transcription.clone());

        Self::with_components(
            config,
            Box::new(source),
            Box::new(transcriber),
            Box::new(compositor),
        )
    }

    /// Create a pipeline around custom collaborators
    pub fn with_components(
        config: PipelineConfig,
        source: Box<dyn VideoSource>,
        transcriber: Box<dyn Transcriber>,
        compositor: Box<dyn VideoCompositor>,
    ) -> Result<Self> {
        std::fs::create_dir_all(&config.temp_dir)?;

        Ok(Self {
            renderer: config.renderer(),
            config,
            source,
            transcriber,
            compositor,
        })
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    async fn segments_for(&self, source: &SourceVideo, run_dir: &Path) -> Result<Vec<Segment>> {
        let segments = match &self.config.load_text {
            Some(path) => {
                info!("Loading transcript from {:?}", path);
                load_segments(path).await?
            }
            None => self.transcriber.transcribe(&source.path, run_dir).await?,
        };

        if let Some(path) = &self.config.save_text {
            save_segments(&segments, path).await?;
            info!("Saved transcript to {:?}", path);
        }

        Ok(segments)
    }

    /// Caption the video at `url` (hosted URL or local path)
    pub async fn run(&self, url: &str) -> Result<PipelineResult> {
        let start_time = Instant::now();
        info!("Starting caption pipeline for {}", url);

        // Step 1: Acquire
        let source = self.source.resolve(url).await?;
        let video = self.compositor.probe(&source.path).await?;
        info!(
            "Source {:?}: {}x{}, {:.2}s",
            source.path, video.width, video.height, video.duration
        );

        let run_dir = self
            .config
            .temp_dir
            .join(uuid::Uuid::new_v4().to_string());
        fs::create_dir_all(&run_dir).await?;

        // Step 2: Transcribe
        let segments = self.segments_for(&source, &run_dir).await?;

        // Step 3: Wrap and lay out
        let plans = self.renderer.plan(&segments, &video);
        if plans.is_empty() {
            let _ = fs::remove_dir_all(&run_dir).await;
            return Err(CaptionError::EmptyTranscript(url.to_string()));
        }
        info!("Planned {} clips from {} segments", plans.len(), segments.len());

        // Step 4: Render and join
        // clips share the output container so the join can stream-copy
        let clip_ext = if source.extension.is_empty() {
            "mkv"
        } else {
            source.extension.as_str()
        };
        let mut clips = Vec::with_capacity(plans.len());
        for plan in &plans {
            let clip = run_dir.join(format!("clip{:05}.{clip_ext}", plan.index));
            debug!("Rendering clip {} ({:.2}-{:.2})", plan.index, plan.start, plan.end);
            self.compositor
                .render_clip(&source.path, plan, &run_dir, &clip)
                .await?;
            clips.push(clip);
        }

        let output_path = source.captioned_path();
        self.compositor
            .concat(&clips, &run_dir, &output_path)
            .await?;

        if let Err(e) = fs::remove_dir_all(&run_dir).await {
            warn!("Failed to remove {:?}: {}", run_dir, e);
        }

        let elapsed = start_time.elapsed().as_secs_f64();
        info!("Pipeline completed in {:.2}s", elapsed);

        Ok(PipelineResult {
            source,
            output_path,
            segment_count: segments.len(),
            clip_count: clips.len(),
            processing_time_secs: elapsed,
        })
    }
}
