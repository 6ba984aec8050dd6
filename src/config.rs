use std::path::PathBuf;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_DOWNLOAD_DIR: &str = "youtubestuff";

/// Runtime configuration, resolved once at startup from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the HTTP server listens on. Always bound on 127.0.0.1.
    pub port: u16,
    /// Root directory downloads are written into.
    pub download_dir: PathBuf,
    /// Name (or path) of the external downloader binary.
    pub ytdlp_bin: String,
    /// Name (or path) of the external transcoder binary.
    pub ffmpeg_bin: String,
}

impl Config {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let download_dir = std::env::var("DOWNLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DOWNLOAD_DIR));
        let ytdlp_bin = std::env::var("YTDLP_BIN").unwrap_or_else(|_| "yt-dlp".to_string());
        let ffmpeg_bin = std::env::var("FFMPEG_BIN").unwrap_or_else(|_| "ffmpeg".to_string());

        Config {
            port,
            download_dir,
            ytdlp_bin,
            ffmpeg_bin,
        }
    }

    /// Target directory for audio-only downloads.
    pub fn audio_dir(&self) -> PathBuf {
        self.download_dir.join("audio")
    }

    /// Target directory for video downloads.
    pub fn video_dir(&self) -> PathBuf {
        self.download_dir.join("video")
    }

    /// Create the download root and both subdirectories if absent.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.audio_dir())?;
        std::fs::create_dir_all(self.video_dir())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(root: PathBuf) -> Config {
        Config {
            port: 0,
            download_dir: root,
            ytdlp_bin: "yt-dlp".into(),
            ffmpeg_bin: "ffmpeg".into(),
        }
    }

    #[test]
    fn subdirectories_hang_off_download_root() {
        let cfg = test_config(PathBuf::from("/tmp/media"));
        assert_eq!(cfg.audio_dir(), PathBuf::from("/tmp/media/audio"));
        assert_eq!(cfg.video_dir(), PathBuf::from("/tmp/media/video"));
    }

    #[test]
    fn ensure_directories_creates_both_subdirectories() {
        let tmp = tempfile::tempdir().expect("Could not create tempdir");
        let cfg = test_config(tmp.path().join("stuff"));

        cfg.ensure_directories().expect("Could not create directories");

        assert!(cfg.audio_dir().is_dir());
        assert!(cfg.video_dir().is_dir());

        // Idempotent on a second call
        cfg.ensure_directories().expect("Second call failed");
    }
}
