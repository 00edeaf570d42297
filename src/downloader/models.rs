// Common data models for the downloader

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One rendition of the source media, as reported by yt-dlp.
///
/// Built from the engine's loosely-typed JSON with [`StreamDescriptor::from_json`];
/// fields the engine omits or reports with an unexpected type are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamDescriptor {
    /// Format ID (e.g., "137", "140")
    pub format_id: String,
    /// Video height in pixels
    pub height: Option<u32>,
    /// Video codec (avc1, vp9, av01, none)
    pub vcodec: Option<String>,
    /// Audio codec (mp4a, opus, none)
    pub acodec: Option<String>,
    /// File extension (mp4, webm, m4a)
    pub ext: Option<String>,
    /// File size in bytes
    pub filesize: Option<u64>,
    /// Approximate file size (when exact is unknown)
    pub filesize_approx: Option<u64>,
    /// Frames per second
    pub fps: Option<f64>,
    /// Format note (e.g., "1080p", "tiny")
    pub format_note: Option<String>,
}

impl StreamDescriptor {
    pub fn from_json(f: &serde_json::Value) -> Self {
        Self {
            format_id: f["format_id"].as_str().unwrap_or("").to_string(),
            height: f["height"].as_u64().and_then(|h| u32::try_from(h).ok()),
            vcodec: f["vcodec"].as_str().map(|s| s.to_string()),
            acodec: f["acodec"].as_str().map(|s| s.to_string()),
            ext: f["ext"].as_str().map(|s| s.to_string()),
            filesize: f["filesize"].as_u64(),
            filesize_approx: f["filesize_approx"].as_u64(),
            fps: f["fps"].as_f64(),
            format_note: f["format_note"].as_str().map(|s| s.to_string()),
        }
    }

    /// Exact size if known and non-zero, else the approximate size, else 0
    pub fn effective_size(&self) -> u64 {
        self.filesize
            .filter(|&s| s > 0)
            .or(self.filesize_approx)
            .unwrap_or(0)
    }

    pub fn has_video(&self) -> bool {
        matches!(self.vcodec.as_deref(), Some(v) if v != "none" && !v.is_empty())
    }

    pub fn has_audio(&self) -> bool {
        matches!(self.acodec.as_deref(), Some(a) if a != "none" && !a.is_empty())
    }

    pub fn is_audio_only(&self) -> bool {
        self.has_audio() && !self.has_video()
    }
}

/// Media metadata plus the raw descriptor list from one extraction
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    pub title: String,
    pub thumbnail: String,
    pub duration: u64,
    pub uploader: String,
    pub view_count: u64,
    pub formats: Vec<StreamDescriptor>,
}

impl MediaInfo {
    pub fn from_json(json: &serde_json::Value) -> Self {
        let formats = json["formats"]
            .as_array()
            .map(|fmts| fmts.iter().map(StreamDescriptor::from_json).collect())
            .unwrap_or_default();

        Self {
            title: json["title"].as_str().unwrap_or("Unknown Title").to_string(),
            thumbnail: json["thumbnail"].as_str().unwrap_or("").to_string(),
            duration: json["duration"].as_f64().unwrap_or(0.0) as u64,
            uploader: json["uploader"].as_str().unwrap_or("Unknown").to_string(),
            view_count: json["view_count"].as_u64().unwrap_or(0),
            formats,
        }
    }
}

/// Quality option shown to the user; serialized as the FormatOption JSON shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityOption {
    /// yt-dlp format selector to request on download
    pub format_id: String,
    /// "1080p", "Best Available" or "Audio Only"
    pub resolution: String,
    /// Resolution key; 9999 for best, 0 for audio-only
    pub height: u32,
    /// Estimated total size in bytes (0 when unknown)
    pub filesize: u64,
    pub filesize_mb: f64,
    pub ext: String,
    pub fps: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub vcodec: Option<String>,
    pub quality_label: String,
}

/// Response body of a successful describe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub title: String,
    pub thumbnail: String,
    pub duration: u64,
    pub uploader: String,
    pub view_count: u64,
    pub formats: Vec<QualityOption>,
}

/// What the engine should fetch for a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Format selector handed to the engine (possibly degraded, see lifecycle)
    pub format: String,
    /// Extract audio and convert to mp3
    pub audio_only: bool,
}

/// One in-flight fetch: where the engine must write and what it must fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadJob {
    pub id: u64,
    /// `<dir>/video_<id>`; the engine appends `.<ext>`
    pub base_path: PathBuf,
    pub format_id: String,
    pub audio_only: bool,
}

impl DownloadJob {
    /// Output template in yt-dlp syntax
    pub fn output_template(&self) -> String {
        format!("{}.%(ext)s", self.base_path.to_string_lossy())
    }

    pub fn path_with_ext(&self, ext: &str) -> PathBuf {
        let mut name = self.base_path.as_os_str().to_owned();
        name.push(".");
        name.push(ext);
        PathBuf::from(name)
    }
}

/// What the engine reports back after a successful download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    pub title: String,
}

/// The single file a job resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedFile {
    pub path: PathBuf,
    /// Sanitized title plus extension, as offered to the client
    pub filename: String,
    pub ext: String,
    pub size: u64,
}
