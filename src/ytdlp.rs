use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};

use crate::video_info::{VideoInfo, VideoInfoError};

const INFO_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(thiserror::Error, Debug)]
pub enum YtdlpError {
    #[error("could not run {bin}: {source}")]
    Spawn {
        bin: String,
        #[source]
        source: std::io::Error,
    },
    /// The tool exited non-zero; the message is its stderr, verbatim.
    #[error("{0}")]
    CommandFailed(String),
    #[error("timed out waiting for the downloader")]
    Timeout,
    #[error(transparent)]
    InvalidInfo(#[from] VideoInfoError),
}

/// Handle to the external downloader binary. Holds only the binary name so
/// it is cheap to clone into background tasks.
#[derive(Debug, Clone)]
pub struct Ytdlp {
    bin: String,
}

impl Ytdlp {
    pub fn new(bin: impl Into<String>) -> Self {
        Ytdlp { bin: bin.into() }
    }

    pub fn bin(&self) -> &str {
        &self.bin
    }

    /// Probe the binary. Returns its version string, or `None` when it
    /// cannot be executed.
    pub async fn version(&self) -> Option<String> {
        let output = Command::new(&self.bin).arg("--version").output().await.ok()?;
        if !output.status.success() {
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Fetch video metadata and the available format list for a URL.
    ///
    /// Runs `yt-dlp --dump-json --no-download --no-playlist <url>` with a
    /// 30 second budget. Tool errors (invalid URL, network failure, region
    /// lock) surface as [`YtdlpError::CommandFailed`] carrying the tool's
    /// stderr untouched.
    pub async fn fetch_info(&self, url: &str) -> Result<VideoInfo, YtdlpError> {
        self.fetch_info_with_timeout(url, INFO_TIMEOUT).await
    }

    async fn fetch_info_with_timeout(
        &self,
        url: &str,
        budget: Duration,
    ) -> Result<VideoInfo, YtdlpError> {
        // kill_on_drop so an expired timeout also terminates the child
        let output = tokio::time::timeout(
            budget,
            Command::new(&self.bin)
                .args(["--dump-json", "--no-download", "--no-playlist"])
                .arg(url)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| YtdlpError::Timeout)?
        .map_err(|e| YtdlpError::Spawn {
            bin: self.bin.clone(),
            source: e,
        })?;

        if !output.status.success() {
            return Err(YtdlpError::CommandFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        Ok(VideoInfo::from_json(&String::from_utf8_lossy(&output.stdout))?)
    }

    /// Build the argument list for a download. `--newline` keeps progress
    /// output line-buffered so it can be streamed; the MP3 path routes
    /// through yt-dlp's audio postprocessor, which drives ffmpeg.
    pub fn download_args(
        format_id: &str,
        output_template: &str,
        convert_to_mp3: bool,
        url: &str,
    ) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            format_id.to_string(),
            "-o".to_string(),
            output_template.to_string(),
            "--newline".to_string(),
            "--no-playlist".to_string(),
        ];

        if convert_to_mp3 {
            args.extend(
                ["--extract-audio", "--audio-format", "mp3", "--audio-quality", "0"]
                    .map(String::from),
            );
        }

        args.push(url.to_string());
        args
    }

    /// Spawn a download with piped stdout/stderr for progress streaming.
    /// The child is killed if the handle is dropped.
    pub fn spawn_download(&self, args: &[String]) -> Result<Child, YtdlpError> {
        Command::new(&self.bin)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| YtdlpError::Spawn {
                bin: self.bin.clone(),
                source: e,
            })
    }

    /// Run the downloader's self-update (`yt-dlp -U`) and return its
    /// combined output.
    pub async fn update(&self) -> Result<String, YtdlpError> {
        let output = Command::new(&self.bin)
            .arg("-U")
            .output()
            .await
            .map_err(|e| YtdlpError::Spawn {
                bin: self.bin.clone(),
                source: e,
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        if !stderr.is_empty() {
            if !combined.is_empty() {
                combined.push('\n');
            }
            combined.push_str(stderr);
        }

        if output.status.success() {
            Ok(combined)
        } else {
            Err(YtdlpError::CommandFailed(combined))
        }
    }
}
