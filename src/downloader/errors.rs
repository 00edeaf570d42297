// Error types for the extraction engine and the file lifecycle

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    /// yt-dlp (or another engine binary) could not be started
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// The engine ran but refused the URL or format; carries its own message
    #[error("{0}")]
    Extraction(String),

    /// The engine did not finish within the configured timeout
    #[error("Timed out after {0}s")]
    Timeout(u64),

    /// Failed to parse the engine's JSON output
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The engine reported success but no file matched the job's template
    #[error("File not found after download")]
    FileNotFound,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl DownloadError {
    /// Error for a failed spawn of `program`, distinguishing a missing binary.
    pub fn spawn_failed(program: &str, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            Self::ToolNotFound(program.to_string())
        } else {
            Self::Extraction(format!("Failed to start {}: {}", program, err))
        }
    }
}

// Engine stderr arrives as plain text
impl From<String> for DownloadError {
    fn from(s: String) -> Self {
        if s.contains("command not found") || s.contains("No such file or directory") {
            return Self::ToolNotFound(s);
        }

        if s.contains("Invalid JSON") || s.contains("Failed to parse JSON") {
            return Self::ParseError(s);
        }

        Self::Extraction(s)
    }
}
