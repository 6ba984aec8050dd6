use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum VideoInfoError {
    #[error("could not parse video info: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Whether a format carries only an audio stream or (also) a video stream.
/// Decides which subdirectory a download lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

/// One downloadable format, flattened from yt-dlp's format list to the
/// fields the UI actually renders.
#[derive(Debug, Clone, Serialize)]
pub struct FormatInfo {
    pub format_id: String,
    pub ext: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub quality: String,
    pub filesize: Option<u64>,
    pub resolution: Option<String>,
    pub fps: Option<f64>,
    pub abr: Option<f64>,
    pub vbr: Option<f64>,
}

/// Video metadata as reported by `yt-dlp --dump-json`, reduced to what the
/// front-end needs.
#[derive(Debug, Clone, Serialize)]
pub struct VideoInfo {
    pub title: Option<String>,
    pub duration: Option<f64>,
    pub uploader: Option<String>,
    pub formats: Vec<FormatInfo>,
}

#[derive(Debug, Deserialize)]
struct RawVideoInfo {
    title: Option<String>,
    duration: Option<f64>,
    uploader: Option<String>,
    #[serde(default)]
    formats: Vec<RawFormat>,
}

#[derive(Debug, Deserialize)]
struct RawFormat {
    format_id: String,
    ext: String,
    vcodec: Option<String>,
    acodec: Option<String>,
    format_note: Option<String>,
    filesize: Option<u64>,
    resolution: Option<String>,
    fps: Option<f64>,
    abr: Option<f64>,
    vbr: Option<f64>,
}

// yt-dlp reports an absent stream as the literal string "none"; a missing
// codec field means the extractor simply didn't say, which counts as present.
fn codec_present(codec: Option<&str>) -> bool {
    codec.map_or(true, |c| c != "none")
}

fn classify(fmt: &RawFormat) -> Option<MediaKind> {
    let has_video = codec_present(fmt.vcodec.as_deref());
    let has_audio = codec_present(fmt.acodec.as_deref());

    match (has_video, has_audio) {
        // Storyboards and other streamless entries are not downloadable media
        (false, false) => None,
        (false, true) => Some(MediaKind::Audio),
        (true, _) => Some(MediaKind::Video),
    }
}

impl VideoInfo {
    pub fn from_json(json: &str) -> Result<Self, VideoInfoError> {
        let raw: RawVideoInfo = serde_json::from_str(json)?;

        let formats = raw
            .formats
            .into_iter()
            .filter_map(|f| {
                let kind = classify(&f)?;
                Some(FormatInfo {
                    format_id: f.format_id,
                    ext: f.ext,
                    kind,
                    quality: f.format_note.unwrap_or_else(|| "Unknown".to_string()),
                    filesize: f.filesize,
                    resolution: f.resolution,
                    fps: f.fps,
                    abr: f.abr,
                    vbr: f.vbr,
                })
            })
            .collect();

        Ok(VideoInfo {
            title: raw.title,
            duration: raw.duration,
            uploader: raw.uploader,
            formats,
        })
    }

    pub fn find_format(&self, format_id: &str) -> Option<&FormatInfo> {
        self.formats.iter().find(|f| f.format_id == format_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(vcodec: Option<&str>, acodec: Option<&str>) -> RawFormat {
        RawFormat {
            format_id: "0".into(),
            ext: "mp4".into(),
            vcodec: vcodec.map(Into::into),
            acodec: acodec.map(Into::into),
            format_note: None,
            filesize: None,
            resolution: None,
            fps: None,
            abr: None,
            vbr: None,
        }
    }

    #[test]
    fn classify_audio_only() {
        assert_eq!(
            classify(&raw(Some("none"), Some("mp4a.40.2"))),
            Some(MediaKind::Audio)
        );
    }

    #[test]
    fn classify_video_only_and_muxed() {
        assert_eq!(
            classify(&raw(Some("avc1.64001f"), Some("none"))),
            Some(MediaKind::Video)
        );
        assert_eq!(
            classify(&raw(Some("avc1.64001f"), Some("mp4a.40.2"))),
            Some(MediaKind::Video)
        );
    }

    #[test]
    fn classify_drops_streamless_formats() {
        assert_eq!(classify(&raw(Some("none"), Some("none"))), None);
    }

    #[test]
    fn classify_treats_missing_codec_as_present() {
        // Extractors that don't report codecs still yield downloadable video
        assert_eq!(classify(&raw(None, None)), Some(MediaKind::Video));
        assert_eq!(classify(&raw(Some("none"), None)), Some(MediaKind::Audio));
    }

    fn get_test_json(fname: &str) -> String {
        let mut d = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        d.push("resources/test/");
        d.push(fname);
        std::fs::read_to_string(d).expect(format!("Could not read {}", fname).as_str())
    }

    #[test]
    fn parse_dump_json() {
        let json = get_test_json("video_info.json");
        let info = VideoInfo::from_json(&json).expect("Could not parse video info");

        assert_eq!(info.title.as_deref(), Some("Big Buck Bunny"));
        assert_eq!(info.uploader.as_deref(), Some("Blender"));
        assert_eq!(info.duration, Some(596.0));

        // The storyboard entry must have been dropped
        assert_eq!(info.formats.len(), 3);
        assert!(info.find_format("sb0").is_none());

        let audio = info.find_format("140").expect("Missing audio format");
        assert_eq!(audio.kind, MediaKind::Audio);
        assert_eq!(audio.ext, "m4a");
        assert_eq!(audio.abr, Some(129.478));

        let video = info.find_format("137").expect("Missing video format");
        assert_eq!(video.kind, MediaKind::Video);
        assert_eq!(video.resolution.as_deref(), Some("1920x1080"));
        assert_eq!(video.quality, "1080p");

        let muxed = info.find_format("18").expect("Missing muxed format");
        assert_eq!(muxed.kind, MediaKind::Video);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(VideoInfo::from_json("ERROR: not json").is_err());
    }

    #[test]
    fn missing_format_note_becomes_unknown() {
        let info = VideoInfo::from_json(
            r#"{"title":"t","formats":[{"format_id":"1","ext":"mp4","vcodec":"avc1","acodec":"none"}]}"#,
        )
        .expect("Could not parse video info");
        assert_eq!(info.formats[0].quality, "Unknown");
    }
}
