//! Video acquisition: local paths as-is, hosted videos through yt-dlp

use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::LazyLock;
use tokio::process::Command;
use tracing::{debug, info};

use super::{CaptionError, Result};

/// Preferred download: mp4 video + m4a audio, else the best single file
pub const DEFAULT_FORMAT: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best";

/// Output template, relative to the download directory
pub const OUTPUT_TEMPLATE: &str = "%(id)s.%(ext)s";

static HOSTED_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://((www|m)\.)?(youtube\.com/|youtu\.be/)")
        .expect("valid hosted URL pattern")
});

/// Whether `url` points at a hosting platform we download from
#[must_use]
pub fn is_hosted_url(url: &str) -> bool {
    HOSTED_URL.is_match(url)
}

/// A video available on the local filesystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceVideo {
    pub path: PathBuf,
    /// Extension without the dot, empty when the file has none
    pub extension: String,
}

impl SourceVideo {
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();
        Self { path, extension }
    }

    /// `<name>_captioned.<ext>` next to the source
    #[must_use]
    pub fn captioned_path(&self) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let name = if self.extension.is_empty() {
            format!("{stem}_captioned")
        } else {
            format!("{stem}_captioned.{}", self.extension)
        };
        self.path.with_file_name(name)
    }
}

/// Where the pipeline gets its input video from
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// Turn a URL or path into a local video file.
    async fn resolve(&self, url: &str) -> Result<SourceVideo>;
}

/// Video source downloading hosted URLs with `yt-dlp`
#[derive(Debug, Clone)]
pub struct YtDlpSource {
    ytdlp_path: String,
    download_dir: PathBuf,
    format: String,
}

impl Default for YtDlpSource {
    fn default() -> Self {
        Self {
            ytdlp_path: which::which("yt-dlp").map_or_else(
                |_| "yt-dlp".to_string(),
                |p| p.to_string_lossy().to_string(),
            ),
            download_dir: PathBuf::from("."),
            format: DEFAULT_FORMAT.to_string(),
        }
    }
}

impl YtDlpSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Specify custom yt-dlp binary path
    #[must_use]
    pub fn with_ytdlp_path(mut self, path: &str) -> Self {
        self.ytdlp_path = path.to_string();
        self
    }

    /// Directory downloads land in (default: working directory)
    #[must_use]
    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    fn build_args(&self, url: &str) -> Vec<String> {
        vec![
            "-f".to_string(),
            self.format.clone(),
            "-o".to_string(),
            OUTPUT_TEMPLATE.to_string(),
            "--no-simulate".to_string(),
            "--print".to_string(),
            "after_move:filepath".to_string(),
            "--no-progress".to_string(),
            url.to_string(),
        ]
    }

    /// Final file path from yt-dlp's `--print` output
    fn parse_download_path(&self, stdout: &str) -> Option<PathBuf> {
        let line = stdout.lines().map(str::trim).rfind(|l| !l.is_empty())?;
        let path = Path::new(line);
        Some(if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.download_dir.join(path)
        })
    }

    async fn download(&self, url: &str) -> Result<SourceVideo> {
        let args = self.build_args(url);
        debug!("Running yt-dlp with args: {:?}", args);

        let output = Command::new(&self.ytdlp_path)
            .args(&args)
            .current_dir(&self.download_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    CaptionError::MissingDependency(self.ytdlp_path.clone())
                }
                _ => CaptionError::Io(e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CaptionError::Download(format!(
                "yt-dlp failed to download {url}: {}",
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let path = self.parse_download_path(&stdout).ok_or_else(|| {
            CaptionError::Download(format!("yt-dlp reported no output file for {url}"))
        })?;

        info!("Downloaded {} to {:?}", url, path);
        Ok(SourceVideo::from_path(path))
    }
}

#[async_trait]
impl VideoSource for YtDlpSource {
    async fn resolve(&self, url: &str) -> Result<SourceVideo> {
        if is_hosted_url(url) {
            self.download(url).await
        } else {
            Ok(SourceVideo::from_path(url))
        }
    }
}
