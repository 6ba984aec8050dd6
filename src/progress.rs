use std::sync::OnceLock;

use regex::Regex;

/// A single progress report parsed from a yt-dlp output line.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    /// Percent complete, 0.0 to 100.0.
    pub percent: f32,
    /// Total size as printed by yt-dlp (e.g. "10.32MiB"), when known.
    pub total_size: Option<String>,
    /// Current speed as printed by yt-dlp (e.g. "1.21MiB/s"), when known.
    pub speed: Option<String>,
    /// Remaining time as printed by yt-dlp (e.g. "00:05"), when known.
    pub eta: Option<String>,
}

static DOWNLOAD_RE: OnceLock<Regex> = OnceLock::new();

// Matches lines like:
//   [download]  42.7% of   10.32MiB at    1.21MiB/s ETA 00:05
//   [download] 100.0% of 10.32MiB in 00:08
//   [download]   0.1% of ~ 3.45GiB at  512.00KiB/s ETA 01:55:03
fn download_re() -> &'static Regex {
    DOWNLOAD_RE.get_or_init(|| {
        Regex::new(
            r"^\[download\]\s+(?P<pct>\d{1,3}(?:\.\d+)?)%(?:\s+of\s+~?\s*(?P<size>\S+))?(?:\s+at\s+(?P<speed>\S+))?(?:\s+ETA\s+(?P<eta>\S+))?",
        )
        .expect("progress regex")
    })
}

/// Parse a progress report out of one line of yt-dlp output. Returns `None`
/// for lines that are not `[download] NN.N% ...` progress lines.
pub fn parse_progress(line: &str) -> Option<ProgressUpdate> {
    let caps = download_re().captures(line)?;
    let percent = caps.name("pct")?.as_str().parse().ok()?;

    Some(ProgressUpdate {
        percent,
        total_size: caps.name("size").map(|m| m.as_str().to_string()),
        speed: caps.name("speed").map(|m| m.as_str().to_string()),
        eta: caps.name("eta").map(|m| m.as_str().to_string()),
    })
}

/// Whether a yt-dlp output line marks the start of post-download processing
/// (audio extraction or stream muxing through the external transcoder).
pub fn is_postprocess_line(line: &str) -> bool {
    line.starts_with("[ExtractAudio]")
        || line.starts_with("[Merger]")
        || line.starts_with("[ffmpeg]")
}
