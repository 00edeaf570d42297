// FormatSelector - turns raw yt-dlp formats into the options offered to the user
//
// Handles:
// - One option per distinct height (largest estimated size wins)
// - Size estimation (video-only streams get the best audio size added)
// - Synthetic "Best Available" (first) and "Audio Only" (last) entries

use std::collections::BTreeMap;

use super::models::{MediaInfo, QualityOption, StreamDescriptor, VideoInfo};

/// Streams below this height are thumbnails/storyboards, not real renditions
pub const MIN_HEIGHT: u32 = 144;

/// Resolution key of the "Best Available" entry; above any real height
pub const BEST_HEIGHT: u32 = 9999;

/// Resolution key of the "Audio Only" entry
pub const AUDIO_HEIGHT: u32 = 0;

pub const BEST_FORMAT_SPEC: &str = "bestvideo+bestaudio/best";
pub const AUDIO_FORMAT_ID: &str = "bestaudio";

const DEFAULT_EXT: &str = "mp4";
const DEFAULT_FPS: f64 = 30.0;

pub struct FormatSelector;

impl FormatSelector {
    /// Describe a media item: metadata passed through, formats normalized
    pub fn describe(info: &MediaInfo) -> VideoInfo {
        VideoInfo {
            title: info.title.clone(),
            thumbnail: info.thumbnail.clone(),
            duration: info.duration,
            uploader: info.uploader.clone(),
            view_count: info.view_count,
            formats: Self::build_quality_options(&info.formats),
        }
    }

    /// Build quality options from raw formats.
    ///
    /// The result is ordered by descending height, with "Best Available"
    /// prepended when any video stream survived and "Audio Only" always last.
    pub fn build_quality_options(formats: &[StreamDescriptor]) -> Vec<QualityOption> {
        let best_audio_size = Self::best_audio_size(formats);

        let mut by_height: BTreeMap<u32, QualityOption> = BTreeMap::new();

        for f in formats {
            let height = match f.height {
                Some(h) if h >= MIN_HEIGHT => h,
                _ => continue,
            };

            // Audio-only rows are covered by the synthetic entry
            if !f.has_video() {
                continue;
            }

            let mut filesize = f.effective_size();
            if !f.has_audio() {
                // Video-only: will be muxed with the best audio track
                filesize += best_audio_size;
            }

            // Strict `>`: on equal sizes the first seen stream is kept
            let replace = by_height
                .get(&height)
                .map_or(true, |existing| filesize > existing.filesize);

            if replace {
                by_height.insert(height, Self::stream_option(f, height, filesize));
            }
        }

        let mut options: Vec<QualityOption> = by_height.into_values().rev().collect();

        if let Some(top) = options.first() {
            let best = Self::best_option(top.filesize);
            options.insert(0, best);
        }

        options.push(Self::audio_option(best_audio_size));
        options
    }

    /// Largest size among audio-only streams (0 if none report a size)
    pub fn best_audio_size(formats: &[StreamDescriptor]) -> u64 {
        formats
            .iter()
            .filter(|f| f.is_audio_only())
            .map(StreamDescriptor::effective_size)
            .max()
            .unwrap_or(0)
    }

    fn stream_option(f: &StreamDescriptor, height: u32, filesize: u64) -> QualityOption {
        let resolution = format!("{}p", height);

        QualityOption {
            format_id: f.format_id.clone(),
            resolution: resolution.clone(),
            height,
            filesize,
            filesize_mb: size_in_mb(filesize),
            ext: f.ext.clone().unwrap_or_else(|| DEFAULT_EXT.to_string()),
            fps: f.fps.unwrap_or(DEFAULT_FPS),
            vcodec: f.vcodec.clone(),
            quality_label: f.format_note.clone().unwrap_or(resolution),
        }
    }

    fn best_option(filesize: u64) -> QualityOption {
        QualityOption {
            format_id: BEST_FORMAT_SPEC.to_string(),
            resolution: "Best Available".to_string(),
            height: BEST_HEIGHT,
            filesize,
            filesize_mb: size_in_mb(filesize),
            ext: DEFAULT_EXT.to_string(),
            fps: 60.0,
            vcodec: None,
            quality_label: "Highest Quality".to_string(),
        }
    }

    fn audio_option(filesize: u64) -> QualityOption {
        QualityOption {
            format_id: AUDIO_FORMAT_ID.to_string(),
            resolution: "Audio Only".to_string(),
            height: AUDIO_HEIGHT,
            filesize,
            filesize_mb: size_in_mb(filesize),
            ext: "mp3".to_string(),
            fps: 0.0,
            vcodec: None,
            quality_label: "MP3 Audio".to_string(),
        }
    }
}

/// Size in MiB rounded to one decimal
fn size_in_mb(bytes: u64) -> f64 {
    if bytes == 0 {
        return 0.0;
    }
    let mb = bytes as f64 / 1_048_576.0;
    (mb * 10.0).round() / 10.0
}
