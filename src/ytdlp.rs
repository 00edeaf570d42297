//! yt-dlp CLI engine.
//!
//! Metadata comes from `--dump-json`; downloads write to the job's output
//! template and print the title once the final file is in place.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::downloader::tools::{ToolManager, ToolType};
use crate::downloader::utils::{engine_error_message, last_printed_line, run_output_with_timeout};
use crate::downloader::{
    DownloadError, DownloadJob, DownloadOutcome, DownloadRequest, MediaEngine, MediaInfo,
};

/// Bitrate target for mp3 extraction
const AUDIO_QUALITY: &str = "192K";

pub struct YtDlpEngine {
    ytdlp_path: String,
    cookie_file: Option<PathBuf>,
    has_muxer: bool,
    info_timeout: Duration,
    download_timeout: Duration,
}

impl YtDlpEngine {
    pub fn new(
        ytdlp_path: String,
        cookie_file: Option<PathBuf>,
        has_muxer: bool,
        info_timeout: Duration,
        download_timeout: Duration,
    ) -> Self {
        Self {
            ytdlp_path,
            cookie_file,
            has_muxer,
            info_timeout,
            download_timeout,
        }
    }

    /// Locate yt-dlp and probe for ffmpeg once, at startup
    pub async fn from_config(config: &AppConfig) -> Self {
        let ytdlp = ToolManager::locate(ToolType::YtDlp, config.ytdlp_path.as_deref()).await;
        let ffmpeg = ToolManager::locate(ToolType::Ffmpeg, config.ffmpeg_path.as_deref()).await;

        if ytdlp.is_available {
            info!(path = %ytdlp.path, version = ?ytdlp.version, "yt-dlp found");
        } else {
            warn!(path = %ytdlp.path, "yt-dlp did not answer --version; requests will fail until it is installed");
        }
        if !ffmpeg.is_available {
            warn!("ffmpeg not available: combined video+audio formats will fall back to single-stream 'best'");
        }

        Self::new(
            ytdlp.path,
            config.cookie_file.clone(),
            ffmpeg.is_available,
            config.info_timeout,
            config.download_timeout,
        )
    }

    fn cookie_args(&self) -> Vec<String> {
        match &self.cookie_file {
            Some(path) => vec!["--cookies".to_string(), path.to_string_lossy().to_string()],
            None => Vec::new(),
        }
    }

    fn build_info_args(&self, url: &str) -> Vec<String> {
        let mut args = vec![
            "--dump-json".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--no-check-certificates".to_string(),
        ];
        args.extend(self.cookie_args());
        args.push(url.to_string());
        args
    }

    fn build_download_args(
        &self,
        url: &str,
        job: &DownloadJob,
        request: &DownloadRequest,
    ) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            request.format.clone(),
            "-o".to_string(),
            job.output_template(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--no-check-certificates".to_string(),
            // Local write time, not the remote Last-Modified; the sweep ages files by mtime
            "--no-mtime".to_string(),
            // Printing after the move keeps the download itself enabled
            "--print".to_string(),
            "after_move:title".to_string(),
        ];

        if request.audio_only {
            args.extend(vec![
                "-x".to_string(),
                "--audio-format".to_string(),
                "mp3".to_string(),
                "--audio-quality".to_string(),
                AUDIO_QUALITY.to_string(),
            ]);
        } else {
            args.push("--merge-output-format".to_string());
            args.push("mp4".to_string());
        }

        args.extend(self.cookie_args());
        args.push(url.to_string());
        args
    }
}

#[async_trait]
impl MediaEngine for YtDlpEngine {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    fn has_muxer(&self) -> bool {
        self.has_muxer
    }

    async fn extract_info(&self, url: &str) -> Result<MediaInfo, DownloadError> {
        let args = self.build_info_args(url);
        let output =
            run_output_with_timeout(&self.ytdlp_path, args, self.info_timeout.as_secs()).await?;

        if !output.status.success() {
            return Err(DownloadError::from(engine_error_message(&output.stderr)));
        }

        parse_media_info(&output.stdout)
    }

    async fn download(
        &self,
        url: &str,
        job: &DownloadJob,
        request: &DownloadRequest,
    ) -> Result<DownloadOutcome, DownloadError> {
        let args = self.build_download_args(url, job, request);
        let output =
            run_output_with_timeout(&self.ytdlp_path, args, self.download_timeout.as_secs())
                .await?;

        if !output.status.success() {
            return Err(DownloadError::from(engine_error_message(&output.stderr)));
        }

        let title = last_printed_line(&output.stdout).unwrap_or_else(|| "video".to_string());
        Ok(DownloadOutcome { title })
    }
}

// Shared JSON parsing logic
fn parse_media_info(stdout: &[u8]) -> Result<MediaInfo, DownloadError> {
    let json_str = String::from_utf8_lossy(stdout);
    let json: serde_json::Value = serde_json::from_str(&json_str)
        .map_err(|e| DownloadError::ParseError(format!("Invalid JSON: {}", e)))?;

    Ok(MediaInfo::from_json(&json))
}
