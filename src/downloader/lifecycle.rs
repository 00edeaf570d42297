//! Transient download files: naming, materialization, streaming, cleanup.
//!
//! Every fetch gets its own `video_<id>` base path inside the download
//! directory. The engine picks the extension, so the produced file is found by
//! probing a fixed list of extensions. Files are deleted once streamed; files
//! whose stream never completed are left to the retention sweep.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use futures::future;
use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};
use unicode_normalization::UnicodeNormalization;

use super::errors::DownloadError;
use super::format_selector::AUDIO_FORMAT_ID;
use super::models::{DownloadJob, DownloadRequest, MaterializedFile};
use super::traits::MediaEngine;

/// Prefix shared by every file this manager creates
pub const FILE_PREFIX: &str = "video_";

/// Extensions probed after a download, in order
pub const PROBE_EXTENSIONS: [&str; 4] = ["mp3", "mp4", "webm", "mkv"];

pub const STREAM_CHUNK_SIZE: usize = 8 * 1024;

const MAX_TITLE_CHARS: usize = 150;

/// Selector used when a combined format can't be muxed locally
const SINGLE_STREAM_FALLBACK: &str = "best";

const AUDIO_SELECTOR: &str = "bestaudio/best";

lazy_static! {
    static ref UNSAFE_FILENAME_CHARS: Regex =
        Regex::new(r#"[<>:"/\\|?*\x00-\x1f\x7f]"#).unwrap();
}

/// Wall-clock millisecond ids, forced strictly increasing within the process.
#[derive(Debug, Default)]
pub struct JobIdGenerator {
    last: AtomicU64,
}

impl JobIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> u64 {
        let now = now_millis();
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(prev + 1);
            match self
                .last
                .compare_exchange_weak(prev, candidate, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return candidate,
                Err(actual) => prev = actual,
            }
        }
    }
}

fn now_millis() -> u64 {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    u64::try_from(millis).unwrap_or(0)
}

pub struct FileLifecycleManager {
    download_dir: PathBuf,
    engine: Arc<dyn MediaEngine>,
    ids: JobIdGenerator,
    retention: Duration,
}

impl FileLifecycleManager {
    pub fn new(download_dir: PathBuf, engine: Arc<dyn MediaEngine>, retention: Duration) -> Self {
        Self {
            download_dir,
            engine,
            ids: JobIdGenerator::new(),
            retention,
        }
    }

    pub fn create_job(&self, format_id: &str) -> DownloadJob {
        let id = self.ids.next_id();
        DownloadJob {
            id,
            base_path: self.download_dir.join(format!("{}{}", FILE_PREFIX, id)),
            format_id: format_id.to_string(),
            audio_only: format_id == AUDIO_FORMAT_ID,
        }
    }

    /// What to actually ask the engine for.
    ///
    /// Audio-only jobs request the best audio track; combined selectors
    /// (`a+b`) degrade to a single pre-muxed stream when no muxer exists.
    pub fn request_for(&self, job: &DownloadJob) -> DownloadRequest {
        if job.audio_only {
            return DownloadRequest {
                format: AUDIO_SELECTOR.to_string(),
                audio_only: true,
            };
        }

        let format = if job.format_id.contains('+') && !self.engine.has_muxer() {
            warn!(
                format_id = %job.format_id,
                "no muxer available, falling back to single-stream '{}'",
                SINGLE_STREAM_FALLBACK
            );
            SINGLE_STREAM_FALLBACK.to_string()
        } else {
            job.format_id.clone()
        };

        DownloadRequest {
            format,
            audio_only: false,
        }
    }

    /// Run the engine for `format_id` and resolve the file it produced
    pub async fn materialize(
        &self,
        url: &str,
        format_id: &str,
    ) -> Result<MaterializedFile, DownloadError> {
        let job = self.create_job(format_id);
        let request = self.request_for(&job);

        info!(
            engine = self.engine.name(),
            job_id = job.id,
            %url,
            format = %request.format,
            audio_only = request.audio_only,
            "starting download"
        );

        let outcome = self.engine.download(url, &job, &request).await?;

        let (path, ext) = self.locate(&job).await.ok_or_else(|| {
            warn!(job_id = job.id, "engine finished but no output file matched");
            DownloadError::FileNotFound
        })?;

        let size = tokio::fs::metadata(&path).await?.len();
        let filename = display_filename(&outcome.title, ext);

        info!(job_id = job.id, path = %path.display(), size, %filename, "download materialized");

        Ok(MaterializedFile {
            path,
            filename,
            ext: ext.to_string(),
            size,
        })
    }

    /// First existing `<base>.<ext>` in probe order
    pub async fn locate(&self, job: &DownloadJob) -> Option<(PathBuf, &'static str)> {
        for ext in PROBE_EXTENSIONS {
            let candidate = job.path_with_ext(ext);
            if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                return Some((candidate, ext));
            }
        }
        None
    }

    /// Stream the file in fixed-size chunks and delete it after the last one.
    ///
    /// If the stream is dropped early the file stays on disk for the sweep.
    pub async fn open_stream(
        &self,
        file: &MaterializedFile,
    ) -> Result<impl Stream<Item = io::Result<Bytes>> + Send + 'static, DownloadError> {
        let handle = tokio::fs::File::open(&file.path).await?;
        let path = file.path.clone();

        let chunks = ReaderStream::with_capacity(handle, STREAM_CHUNK_SIZE);
        let cleanup = stream::once(async move {
            if let Err(e) = remove_file(&path).await {
                debug!(path = %path.display(), error = %e, "post-stream cleanup failed");
            }
            None::<io::Result<Bytes>>
        })
        .filter_map(future::ready);

        Ok(chunks.chain(cleanup))
    }

    /// Delete `video_*` files older than the retention window
    pub async fn sweep(&self) -> usize {
        self.sweep_at(SystemTime::now()).await
    }

    pub async fn sweep_at(&self, now: SystemTime) -> usize {
        let mut entries = match tokio::fs::read_dir(&self.download_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %self.download_dir.display(), error = %e, "cannot read download dir for sweep");
                return 0;
            }
        };

        let mut removed = 0;
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "sweep stopped while listing download dir");
                    break;
                }
            };

            if !entry.file_name().to_string_lossy().starts_with(FILE_PREFIX) {
                continue;
            }

            let modified = match entry.metadata().await.and_then(|meta| meta.modified()) {
                Ok(t) => t,
                Err(_) => continue,
            };

            let age = now.duration_since(modified).unwrap_or_default();
            if age <= self.retention {
                continue;
            }

            let path = entry.path();
            match remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) => debug!(path = %path.display(), error = %e, "sweep could not remove file"),
            }
        }

        if removed > 0 {
            info!(removed, "retention sweep removed stale files");
        }
        removed
    }
}

/// Delete a file; a file that is already gone counts as deleted
pub async fn remove_file(path: &Path) -> io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Title with characters illegal in file names/headers removed, length-capped
pub fn sanitize_title(title: &str) -> String {
    let cleaned = UNSAFE_FILENAME_CHARS.replace_all(title, "");
    cleaned
        .trim()
        .chars()
        .take(MAX_TITLE_CHARS)
        .collect::<String>()
        .trim_end()
        .to_string()
}

pub fn display_filename(title: &str, ext: &str) -> String {
    let stem = sanitize_title(title);
    let stem = if stem.is_empty() { "video".to_string() } else { stem };
    format!("{}.{}", stem, ext)
}

/// ASCII-only variant of a display filename for legacy `filename=` parameters.
///
/// Compatibility decomposition first, so accented letters keep their base
/// letter and only the combining marks are lost.
pub fn ascii_fallback(filename: &str) -> String {
    let ascii: String = filename
        .nfkd()
        .filter(|c| c.is_ascii() && !c.is_ascii_control() && *c != '"' && *c != '\\')
        .collect();
    let ascii = ascii.trim();

    if ascii.is_empty() {
        "video".to_string()
    } else if ascii.starts_with('.') {
        format!("video{}", ascii)
    } else {
        ascii.to_string()
    }
}
