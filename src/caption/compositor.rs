//! ffmpeg-based compositor for burning captions into video
//!
//! Each caption segment becomes its own clip: the source is cut to the
//! segment span, every text overlay is drawn with a `drawtext` filter (x/y,
//! alpha and enable are time expressions, so letters animate), and the
//! result is encoded to a work file. The clips are then joined with the
//! concat demuxer.

use async_trait::async_trait;
use serde::Deserialize;
use std::fmt::Write as FmtWrite;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, info};

use super::style::CaptionStyle;
use super::{CaptionError, Result};

/// Dimensions and length of a probed video
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// Duration in seconds
    pub duration: f64,
}

/// One drawtext layer
#[derive(Debug, Clone, PartialEq)]
pub struct TextOverlay {
    pub text: String,
    /// x expression (may reference `t`, `w`, `text_w`)
    pub x: String,
    /// y expression
    pub y: String,
    /// Opacity expression
    pub alpha: Option<String>,
    /// Condition under which the layer is drawn
    pub enable: Option<String>,
}

impl TextOverlay {
    #[must_use]
    pub fn new(text: impl Into<String>, x: impl Into<String>, y: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            x: x.into(),
            y: y.into(),
            alpha: None,
            enable: None,
        }
    }

    #[must_use]
    pub fn with_alpha(mut self, alpha: Option<String>) -> Self {
        self.alpha = alpha;
        self
    }

    #[must_use]
    pub fn with_enable(mut self, enable: Option<String>) -> Self {
        self.enable = enable;
        self
    }
}

/// Everything needed to render one captioned clip
#[derive(Debug, Clone, PartialEq)]
pub struct ClipPlan {
    /// Position in the output, zero-based
    pub index: usize,
    /// Clamped start in the source, seconds
    pub start: f64,
    /// Clamped end in the source, seconds
    pub end: f64,
    pub style: CaptionStyle,
    pub overlays: Vec<TextOverlay>,
}

impl ClipPlan {
    #[must_use]
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

/// Encoder settings for the captioned clips
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    pub video_codec: String,
    pub audio_codec: String,
    /// x264-style preset, omitted when empty
    pub preset: String,
    /// Constant rate factor, omitted when unset
    pub crf: Option<u32>,
    /// Extra output arguments for each clip encode
    pub extra_args: Vec<String>,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            preset: "medium".to_string(),
            crf: Some(20),
            extra_args: Vec::new(),
        }
    }
}

const WEBM_VIDEO_CODECS: &[&str] = &["libvpx", "libvpx-vp9", "libaom-av1", "libsvtav1"];
const WEBM_AUDIO_CODECS: &[&str] = &["libopus", "libvorbis"];

impl EncoderConfig {
    /// Settings adjusted so clips can be muxed into a `.<extension>` file.
    ///
    /// WebM only takes VP8/VP9/AV1 with Opus/Vorbis; other containers keep
    /// the configured codecs.
    #[must_use]
    pub fn for_container(&self, extension: &str) -> Self {
        let mut encoder = self.clone();
        if !extension.eq_ignore_ascii_case("webm") {
            return encoder;
        }

        if !WEBM_VIDEO_CODECS.contains(&encoder.video_codec.as_str()) {
            encoder.video_codec = "libvpx-vp9".to_string();
            encoder.preset.clear();
            // libvpx needs a zero target bitrate for constant quality
            if encoder.crf.is_some() && !encoder.extra_args.iter().any(|a| a == "-b:v") {
                encoder.extra_args.extend(["-b:v".to_string(), "0".to_string()]);
            }
        }
        if !WEBM_AUDIO_CODECS.contains(&encoder.audio_codec.as_str()) {
            encoder.audio_codec = "libopus".to_string();
        }
        encoder
    }
}

/// The video compositing engine the pipeline renders through
#[async_trait]
pub trait VideoCompositor: Send + Sync {
    /// Read width, height and duration of a video.
    async fn probe(&self, input: &Path) -> Result<VideoInfo>;

    /// Cut `plan`'s span out of `input`, burn its overlays and encode to `output`.
    async fn render_clip(
        &self,
        input: &Path,
        plan: &ClipPlan,
        workdir: &Path,
        output: &Path,
    ) -> Result<()>;

    /// Join rendered clips in order into `output`.
    async fn concat(&self, clips: &[PathBuf], workdir: &Path, output: &Path) -> Result<()>;
}

/// Compositor backed by `ffprobe` and `ffmpeg` subprocesses
#[derive(Debug, Clone)]
pub struct FfmpegCompositor {
    ffmpeg_path: String,
    ffprobe_path: String,
    encoder: EncoderConfig,
}

impl Default for FfmpegCompositor {
    fn default() -> Self {
        Self {
            ffmpeg_path: find_tool("ffmpeg"),
            ffprobe_path: find_tool("ffprobe"),
            encoder: EncoderConfig::default(),
        }
    }
}

impl FfmpegCompositor {
    /// Create a compositor, searching for binaries in PATH
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Specify custom ffmpeg binary path
    #[must_use]
    pub fn with_ffmpeg_path(mut self, path: &str) -> Self {
        self.ffmpeg_path = path.to_string();
        self
    }

    /// Specify custom ffprobe binary path
    #[must_use]
    pub fn with_ffprobe_path(mut self, path: &str) -> Self {
        self.ffprobe_path = path.to_string();
        self
    }

    #[must_use]
    pub fn with_encoder(mut self, encoder: EncoderConfig) -> Self {
        self.encoder = encoder;
        self
    }

    /// Check if ffmpeg is available
    pub async fn check_available(&self) -> bool {
        Command::new(&self.ffmpeg_path)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Build the drawtext filter chain for a clip.
    ///
    /// `text_files[j]` holds the text of `plan.overlays[j]`; reading text from
    /// files keeps caption content out of filtergraph escaping.
    fn build_filter_script(plan: &ClipPlan, text_files: &[PathBuf]) -> String {
        if plan.overlays.is_empty() {
            return "null".to_string();
        }

        let style_params = plan.style.to_drawtext_params().join(":");

        plan.overlays
            .iter()
            .zip(text_files)
            .map(|(overlay, text_file)| {
                let mut filter = format!(
                    "drawtext=textfile={}:expansion=none:{style_params}:x='{}':y='{}'",
                    quote_filter_value(&text_file.to_string_lossy()),
                    overlay.x,
                    overlay.y,
                );
                if let Some(ref alpha) = overlay.alpha {
                    // Writing to String never fails
                    let _ = write!(filter, ":alpha='{alpha}'");
                }
                if let Some(ref enable) = overlay.enable {
                    let _ = write!(filter, ":enable='{enable}'");
                }
                filter
            })
            .collect::<Vec<_>>()
            .join(",\n")
    }

    /// Build ffmpeg arguments for one captioned clip.
    ///
    /// Codecs follow the container of `output`.
    fn build_clip_args(&self, input: &Path, plan: &ClipPlan, filter_script: &Path, output: &Path) -> Vec<String> {
        let extension = output
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();
        let encoder = self.encoder.for_container(&extension);

        let mut args: Vec<String> = ["-hide_banner", "-loglevel", "warning", "-stats"]
            .iter()
            .map(std::string::ToString::to_string)
            .collect();

        // Input seeking resets timestamps, so `t` in the filters starts at 0
        args.extend([
            "-ss".to_string(),
            format!("{:.3}", plan.start),
            "-t".to_string(),
            format!("{:.3}", plan.duration()),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-filter_script:v".to_string(),
            filter_script.to_string_lossy().to_string(),
            "-c:v".to_string(),
            encoder.video_codec.clone(),
        ]);

        if !encoder.preset.is_empty() {
            args.push("-preset".to_string());
            args.push(encoder.preset.clone());
        }

        if let Some(crf) = encoder.crf {
            args.push("-crf".to_string());
            args.push(crf.to_string());
        }

        args.push("-c:a".to_string());
        args.push(encoder.audio_codec.clone());

        args.extend(encoder.extra_args);

        args.push("-y".to_string());
        args.push(output.to_string_lossy().to_string());

        args
    }

    /// Build ffmpeg arguments for joining clips listed in `list_file`
    fn build_concat_args(list_file: &Path, output: &Path) -> Vec<String> {
        [
            "-hide_banner",
            "-loglevel",
            "warning",
            "-f",
            "concat",
            "-safe",
            "0",
            "-i",
        ]
        .iter()
        .map(std::string::ToString::to_string)
        .chain([
            list_file.to_string_lossy().to_string(),
            "-c".to_string(),
            "copy".to_string(),
            "-y".to_string(),
            output.to_string_lossy().to_string(),
        ])
        .collect()
    }

    /// Concat demuxer list: one `file '<path>'` line per clip
    fn build_concat_list(clips: &[PathBuf]) -> String {
        let mut list = String::new();
        for clip in clips {
            let path = clip.to_string_lossy().replace('\'', r"'\''");
            // Writing to String never fails
            let _ = writeln!(list, "file '{path}'");
        }
        list
    }

    async fn run_ffmpeg(&self, args: &[String]) -> Result<()> {
        debug!("ffmpeg args: {:?}", args);

        let output = Command::new(&self.ffmpeg_path)
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    CaptionError::MissingDependency(self.ffmpeg_path.clone())
                }
                _ => CaptionError::Io(e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CaptionError::Ffmpeg(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl VideoCompositor for FfmpegCompositor {
    async fn probe(&self, input: &Path) -> Result<VideoInfo> {
        let output = Command::new(&self.ffprobe_path)
            .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(input)
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    CaptionError::MissingDependency(self.ffprobe_path.clone())
                }
                _ => CaptionError::Io(e),
            })?;

        if !output.status.success() {
            return Err(CaptionError::Ffprobe(format!(
                "ffprobe failed on {}",
                input.display()
            )));
        }

        parse_probe(&output.stdout)
    }

    async fn render_clip(
        &self,
        input: &Path,
        plan: &ClipPlan,
        workdir: &Path,
        output: &Path,
    ) -> Result<()> {
        let mut text_files = Vec::with_capacity(plan.overlays.len());
        for (j, overlay) in plan.overlays.iter().enumerate() {
            let path = workdir.join(format!("clip{:05}_text{j:04}.txt", plan.index));
            fs::write(&path, &overlay.text).await?;
            text_files.push(path);
        }

        let script = Self::build_filter_script(plan, &text_files);
        let script_path = workdir.join(format!("clip{:05}.filter", plan.index));
        fs::write(&script_path, script).await?;

        let args = self.build_clip_args(input, plan, &script_path, output);
        self.run_ffmpeg(&args).await?;

        debug!(
            "Rendered clip {} ({:.2}s, {} overlays) to {:?}",
            plan.index,
            plan.duration(),
            plan.overlays.len(),
            output
        );
        Ok(())
    }

    async fn concat(&self, clips: &[PathBuf], workdir: &Path, output: &Path) -> Result<()> {
        let list_path = workdir.join("clips.txt");
        fs::write(&list_path, Self::build_concat_list(clips)).await?;

        let args = Self::build_concat_args(&list_path, output);
        self.run_ffmpeg(&args).await?;

        info!("Concatenated {} clips into {:?}", clips.len(), output);
        Ok(())
    }
}

/// Quote a drawtext option value, escaping `\`, `:` and `'`
#[must_use]
pub fn quote_filter_value(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace(':', "\\:")
        .replace('\'', "\\'");
    format!("'{escaped}'")
}

fn find_tool(name: &str) -> String {
    which::which(name).map_or_else(
        |_| name.to_string(),
        |p| p.to_string_lossy().to_string(),
    )
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

fn parse_probe(json: &[u8]) -> Result<VideoInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(json)?;

    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| CaptionError::Ffprobe("No video stream found".to_string()))?;

    let (Some(width), Some(height)) = (video.width, video.height) else {
        return Err(CaptionError::Ffprobe(
            "Video stream has no dimensions".to_string(),
        ));
    };

    let duration = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or(video.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok())
        .ok_or_else(|| CaptionError::Ffprobe("Unknown video duration".to_string()))?;

    Ok(VideoInfo {
        width,
        height,
        duration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(overlays: Vec<TextOverlay>) -> ClipPlan {
        ClipPlan {
            index: 3,
            start: 1.5,
            end: 4.0,
            style: CaptionStyle::default(),
            overlays,
        }
    }

    #[test]
    fn test_quote_filter_value() {
        assert_eq!(quote_filter_value("/tmp/a.txt"), "'/tmp/a.txt'");
        assert_eq!(quote_filter_value(r"C:\fonts\a.ttf"), r"'C\:\\fonts\\a.ttf'");
    }

    #[test]
    fn test_filter_script_without_overlays() {
        assert_eq!(FfmpegCompositor::build_filter_script(&plan(vec![]), &[]), "null");
    }

    #[test]
    fn test_filter_script_one_line() {
        let overlays = vec![TextOverlay::new("Hello", "(w-text_w)/2", "630")];
        let files = vec![PathBuf::from("/tmp/work/clip00003_text0000.txt")];
        let script = FfmpegCompositor::build_filter_script(&plan(overlays), &files);

        assert_eq!(
            script,
            "drawtext=textfile='/tmp/work/clip00003_text0000.txt':expansion=none:\
             font='VL-Gothic-Regular':fontsize=50:fontcolor=white:\
             x='(w-text_w)/2':y='630'"
        );
    }

    #[test]
    fn test_filter_script_alpha_and_enable() {
        let overlays = vec![
            TextOverlay::new("a", "10", "20").with_alpha(Some("min(1,t/0.5)".to_string())),
            TextOverlay::new("b", "30", "20").with_enable(Some("gte(t,0.5)".to_string())),
        ];
        let files = vec![PathBuf::from("/w/a.txt"), PathBuf::from("/w/b.txt")];
        let script = FfmpegCompositor::build_filter_script(&plan(overlays), &files);
        let filters: Vec<&str> = script.split(",\n").collect();

        assert_eq!(filters.len(), 2);
        assert!(filters[0].ends_with(":alpha='min(1,t/0.5)'"));
        assert!(!filters[0].contains("enable"));
        assert!(filters[1].ends_with(":enable='gte(t,0.5)'"));
    }

    #[test]
    fn test_build_clip_args() {
        let compositor = FfmpegCompositor::new();
        let args = compositor.build_clip_args(
            Path::new("in.mp4"),
            &plan(vec![]),
            Path::new("/w/clip.filter"),
            Path::new("/w/clip00003.mkv"),
        );

        let pos = |flag: &str| args.iter().position(|a| a == flag).unwrap();
        assert_eq!(args[pos("-ss") + 1], "1.500");
        assert_eq!(args[pos("-t") + 1], "2.500");
        assert!(pos("-ss") < pos("-i"));
        assert_eq!(args[pos("-i") + 1], "in.mp4");
        assert_eq!(args[pos("-filter_script:v") + 1], "/w/clip.filter");
        assert_eq!(args[pos("-c:v") + 1], "libx264");
        assert_eq!(args[pos("-crf") + 1], "20");
        assert_eq!(args[pos("-c:a") + 1], "aac");
        assert_eq!(args.last().unwrap(), "/w/clip00003.mkv");
    }

    #[test]
    fn test_build_clip_args_without_preset_or_crf() {
        let compositor = FfmpegCompositor::new().with_encoder(EncoderConfig {
            video_codec: "libvpx-vp9".to_string(),
            audio_codec: "libopus".to_string(),
            preset: String::new(),
            crf: None,
            extra_args: vec!["-b:v".to_string(), "0".to_string()],
        });
        let args = compositor.build_clip_args(
            Path::new("in.webm"),
            &plan(vec![]),
            Path::new("f"),
            Path::new("o.mkv"),
        );

        assert!(!args.contains(&"-preset".to_string()));
        assert!(!args.contains(&"-crf".to_string()));
        assert!(args.contains(&"libvpx-vp9".to_string()));
        assert!(args.contains(&"-b:v".to_string()));
    }

    #[test]
    fn test_webm_clip_uses_webm_codecs() {
        let compositor = FfmpegCompositor::new();
        let args = compositor.build_clip_args(
            Path::new("/v/talk.webm"),
            &plan(vec![]),
            Path::new("/w/clip.filter"),
            Path::new("/w/clip00003.webm"),
        );

        let pos = |flag: &str| args.iter().position(|a| a == flag).unwrap();
        assert_eq!(args[pos("-c:v") + 1], "libvpx-vp9");
        assert_eq!(args[pos("-c:a") + 1], "libopus");
        assert_eq!(args[pos("-b:v") + 1], "0");
        assert!(!args.contains(&"-preset".to_string()));
        assert!(!args.contains(&"libx264".to_string()));
    }

    #[test]
    fn test_for_container() {
        let default = EncoderConfig::default();
        assert_eq!(default.for_container("mp4"), default);
        assert_eq!(default.for_container(""), default);

        let webm = default.for_container("WEBM");
        assert_eq!(webm.video_codec, "libvpx-vp9");
        assert_eq!(webm.audio_codec, "libopus");
        assert_eq!(webm.extra_args, vec!["-b:v", "0"]);

        // codecs the container already accepts are kept
        let av1 = EncoderConfig {
            video_codec: "libaom-av1".to_string(),
            audio_codec: "libvorbis".to_string(),
            ..Default::default()
        };
        assert_eq!(av1.for_container("webm"), av1);
    }

    #[test]
    fn test_concat_list_and_args() {
        let clips = vec![PathBuf::from("/w/clip00000.mkv"), PathBuf::from("/w/it's.mkv")];
        assert_eq!(
            FfmpegCompositor::build_concat_list(&clips),
            "file '/w/clip00000.mkv'\nfile '/w/it'\\''s.mkv'\n"
        );

        let args = FfmpegCompositor::build_concat_args(Path::new("/w/clips.txt"), Path::new("out.mp4"));
        assert_eq!(
            args,
            vec![
                "-hide_banner", "-loglevel", "warning", "-f", "concat", "-safe", "0", "-i",
                "/w/clips.txt", "-c", "copy", "-y", "out.mp4",
            ]
        );
    }

    #[test]
    fn test_parse_probe() {
        let json = br#"{
            "streams": [
                {"codec_type": "audio", "duration": "12.0"},
                {"codec_type": "video", "width": 1280, "height": 720, "duration": "11.98"}
            ],
            "format": {"duration": "12.021"}
        }"#;
        let info = parse_probe(json).unwrap();
        assert_eq!(info.width, 1280);
        assert_eq!(info.height, 720);
        assert!((info.duration - 12.021).abs() < 1e-9);
    }

    #[test]
    fn test_parse_probe_falls_back_to_stream_duration() {
        let json = br#"{"streams": [{"codec_type": "video", "width": 640, "height": 360, "duration": "3.5"}]}"#;
        assert!((parse_probe(json).unwrap().duration - 3.5).abs() < 1e-9);
    }

    #[test]
    fn test_parse_probe_without_video() {
        let json = br#"{"streams": [{"codec_type": "audio"}], "format": {"duration": "1.0"}}"#;
        assert!(matches!(parse_probe(json), Err(CaptionError::Ffprobe(_))));
    }

    #[test]
    fn test_encoder_config_from_toml() {
        let encoder: EncoderConfig = toml::from_str("crf = 28\npreset = \"fast\"").unwrap();
        assert_eq!(encoder.crf, Some(28));
        assert_eq!(encoder.preset, "fast");
        assert_eq!(encoder.video_codec, "libx264");
    }
}
