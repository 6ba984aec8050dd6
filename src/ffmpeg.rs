use tokio::process::Command;

/// Probe the external transcoder. Returns the first line of
/// `ffmpeg -version` output, or `None` when the binary cannot be executed.
///
/// ffmpeg is not invoked directly anywhere else: MP3 conversion goes through
/// yt-dlp's audio postprocessor, which requires ffmpeg to be on the PATH.
pub async fn version(bin: &str) -> Option<String> {
    let output = Command::new(bin).arg("-version").output().await.ok()?;
    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|l| l.trim().to_string())
}

pub async fn is_available(bin: &str) -> bool {
    version(bin).await.is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_is_unavailable() {
        assert!(!is_available("definitely-not-a-real-binary-1b9f").await);
        assert!(version("definitely-not-a-real-binary-1b9f").await.is_none());
    }
}
