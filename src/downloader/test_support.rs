//! In-process engine for tests: no network, writes files where yt-dlp would.

use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;

use super::errors::DownloadError;
use super::models::{DownloadJob, DownloadOutcome, DownloadRequest, MediaInfo};
use super::traits::MediaEngine;

pub struct FakeEngine {
    muxer: bool,
    output: Option<(&'static str, Vec<u8>)>,
    title: String,
    backdate: Option<Duration>,
    failure: Option<String>,
    info: Option<MediaInfo>,
    requests: Mutex<Vec<DownloadRequest>>,
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self {
            muxer: true,
            output: None,
            title: "Test Video".to_string(),
            backdate: None,
            failure: None,
            info: None,
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl FakeEngine {
    pub fn without_muxer(mut self) -> Self {
        self.muxer = false;
        self
    }

    /// Write `payload` to `<base>.<ext>` on download
    pub fn writing(mut self, ext: &'static str, payload: Vec<u8>) -> Self {
        self.output = Some((ext, payload));
        self
    }

    /// Give the written file an mtime this far in the past
    pub fn backdated(mut self, age: Duration) -> Self {
        self.backdate = Some(age);
        self
    }

    pub fn titled(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    /// Fail every call with this engine message
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn with_info(mut self, info: MediaInfo) -> Self {
        self.info = Some(info);
        self
    }

    pub fn requests(&self) -> Vec<DownloadRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaEngine for FakeEngine {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn has_muxer(&self) -> bool {
        self.muxer
    }

    async fn extract_info(&self, _url: &str) -> Result<MediaInfo, DownloadError> {
        if let Some(message) = &self.failure {
            return Err(DownloadError::Extraction(message.clone()));
        }
        self.info
            .clone()
            .ok_or_else(|| DownloadError::Extraction("no info configured".to_string()))
    }

    async fn download(
        &self,
        _url: &str,
        job: &DownloadJob,
        request: &DownloadRequest,
    ) -> Result<DownloadOutcome, DownloadError> {
        self.requests.lock().unwrap().push(request.clone());

        if let Some(message) = &self.failure {
            return Err(DownloadError::Extraction(message.clone()));
        }
        if let Some((ext, payload)) = &self.output {
            let path = job.path_with_ext(ext);
            tokio::fs::write(&path, payload).await?;
            if let Some(age) = self.backdate {
                let file = std::fs::File::options().write(true).open(&path)?;
                file.set_modified(SystemTime::now() - age)?;
            }
        }
        Ok(DownloadOutcome {
            title: self.title.clone(),
        })
    }
}
