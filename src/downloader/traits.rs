// Extraction engine trait definition

use async_trait::async_trait;

use super::errors::DownloadError;
use super::models::{DownloadJob, DownloadOutcome, DownloadRequest, MediaInfo};

/// An out-of-process media extraction engine (yt-dlp in production).
///
/// Both calls may take seconds to minutes; implementations must not hold
/// state shared between requests other than read-only configuration.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Name of the engine (for logging)
    fn name(&self) -> &'static str;

    /// Whether a muxer is available to combine separate video+audio streams
    fn has_muxer(&self) -> bool;

    /// Resolve a URL into metadata and its raw stream descriptors
    async fn extract_info(&self, url: &str) -> Result<MediaInfo, DownloadError>;

    /// Download `request` for `url`, writing one file at `job`'s output template
    async fn download(
        &self,
        url: &str,
        job: &DownloadJob,
        request: &DownloadRequest,
    ) -> Result<DownloadOutcome, DownloadError>;
}
