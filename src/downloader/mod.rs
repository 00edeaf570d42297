// Downloader module - format normalization and transient file lifecycle

pub mod errors;
pub mod format_selector;
pub mod lifecycle;
pub mod models;
pub mod tools;
pub mod traits;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

pub use errors::DownloadError;
pub use format_selector::FormatSelector;
pub use lifecycle::FileLifecycleManager;
pub use models::{
    DownloadJob, DownloadOutcome, DownloadRequest, MaterializedFile, MediaInfo, QualityOption,
    StreamDescriptor, VideoInfo,
};
pub use traits::MediaEngine;
