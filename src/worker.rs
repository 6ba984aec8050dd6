use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

use crate::{
    config::Config,
    ffmpeg, progress,
    status::{CompletedFile, Stage, StatusRegistry},
    video_info::MediaKind,
    ytdlp::{Ytdlp, YtdlpError},
};

const STDERR_TAIL_LINES: usize = 50;

#[derive(thiserror::Error, Debug)]
pub enum WorkerError {
    #[error(transparent)]
    Ytdlp(#[from] YtdlpError),
    #[error("format {0} not found for this video")]
    FormatNotFound(String),
    #[error("ffmpeg is required for MP3 conversion but was not found")]
    FfmpegMissing,
    /// The download process exited non-zero; the message is its stderr tail.
    #[error("{0}")]
    DownloadFailed(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("download finished but no file was produced in {}", .0.display())]
    NoOutputFile(PathBuf),
}

/// A user-initiated download request, as accepted by the HTTP layer.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub url: String,
    pub format_id: String,
    pub convert_to_mp3: bool,
}

/// Entry point for the background task spawned per download. Never returns
/// an error: failures are parked in the registry for the poll endpoint.
pub async fn run(cfg: Config, ytdlp: Ytdlp, registry: StatusRegistry, id: Uuid, job: DownloadJob) {
    if let Err(e) = run_inner(&cfg, &ytdlp, &registry, &id, &job).await {
        warn!("download {} failed: {}", id, e);
        registry.fail(&id, e.to_string()).await;
    }
}

async fn run_inner(
    cfg: &Config,
    ytdlp: &Ytdlp,
    registry: &StatusRegistry,
    id: &Uuid,
    job: &DownloadJob,
) -> Result<(), WorkerError> {
    // The requested format decides whether this lands in audio/ or video/,
    // so the metadata has to be fetched again before the download starts.
    registry.set_stage(id, Stage::FetchingInfo).await;
    let info = ytdlp.fetch_info(&job.url).await?;
    let format = info
        .find_format(&job.format_id)
        .ok_or_else(|| WorkerError::FormatNotFound(job.format_id.clone()))?;
    let kind = format.kind;

    let convert = job.convert_to_mp3 && kind == MediaKind::Audio;
    if convert && !ffmpeg::is_available(&cfg.ffmpeg_bin).await {
        return Err(WorkerError::FfmpegMissing);
    }

    let outdir = match kind {
        MediaKind::Audio => cfg.audio_dir(),
        MediaKind::Video => cfg.video_dir(),
    };
    tokio::fs::create_dir_all(&outdir).await?;

    let template = outdir.join("%(title)s.%(ext)s");
    let args = Ytdlp::download_args(&job.format_id, &template.to_string_lossy(), convert, &job.url);

    registry.set_stage(id, Stage::Downloading).await;
    info!(
        "download {} started: {} format {} -> {}",
        id,
        job.url,
        job.format_id,
        outdir.display()
    );

    let started = std::time::SystemTime::now();
    let mut child = ytdlp.spawn_download(&args)?;
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    // yt-dlp writes progress to stdout and errors to stderr. Keep a bounded
    // stderr tail so a failure can be surfaced verbatim.
    let stderr_task = tokio::spawn(async move {
        let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
        if let Some(stderr) = stderr {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!("yt-dlp stderr: {}", line);
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
        }
        tail.into_iter().collect::<Vec<_>>().join("\n")
    });

    if let Some(stdout) = stdout {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!("yt-dlp: {}", line);
            if let Some(update) = progress::parse_progress(&line) {
                registry.set_progress(id, update.percent).await;
            } else if progress::is_postprocess_line(&line) {
                registry.set_stage(id, Stage::Converting).await;
            }
        }
    }

    let exit = child.wait().await?;
    let stderr_tail = stderr_task.await.unwrap_or_default();

    if !exit.success() {
        let message = if stderr_tail.is_empty() {
            format!("yt-dlp exited with {}", exit)
        } else {
            stderr_tail
        };
        return Err(WorkerError::DownloadFailed(message));
    }

    // The output name comes from the %(title)s template, so the result is
    // resolved as the newest file in the target directory.
    let file =
        newest_file(&outdir, started)?.ok_or_else(|| WorkerError::NoOutputFile(outdir.clone()))?;
    let size = std::fs::metadata(&file)?.len();

    info!("download {} completed: {} ({} bytes)", id, file.display(), size);
    registry
        .complete(
            id,
            CompletedFile {
                path: file.to_string_lossy().into_owned(),
                size,
            },
        )
        .await;

    Ok(())
}

/// Most recently modified regular file in `dir` with an mtime at or after
/// `not_before`, skipping yt-dlp's in-progress `.part`/`.ytdl` files.
/// `not_before` scopes the scan to files this download produced, so jobs
/// sharing a directory don't pick up each other's output.
pub fn newest_file(
    dir: &Path,
    not_before: std::time::SystemTime,
) -> std::io::Result<Option<PathBuf>> {
    let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.ends_with(".part") || name.ends_with(".ytdl") {
            continue;
        }

        let modified = entry.metadata()?.modified()?;
        if modified < not_before {
            continue;
        }
        if newest.as_ref().map_or(true, |(t, _)| modified > *t) {
            newest = Some((modified, entry.path()));
        }
    }

    Ok(newest.map(|(_, path)| path))
}
