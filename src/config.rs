//! Process-wide configuration, resolved once at startup.
//!
//! Nothing here is global: the resolved [`AppConfig`] is handed to the engine
//! and the lifecycle manager as constructor arguments.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{info, warn};

pub const DEFAULT_PORT: u16 = 10000;
pub const COOKIE_FILE_NAME: &str = "ytdlp_cookies.txt";

#[derive(Clone)]
pub struct AppConfig {
    /// Listening port (bound on 0.0.0.0)
    pub port: u16,
    /// Shared directory for `video_*` transient files
    pub download_dir: PathBuf,
    /// Explicit yt-dlp binary; located automatically when unset
    pub ytdlp_path: Option<String>,
    /// Explicit ffmpeg binary used for the muxer probe
    pub ffmpeg_path: Option<String>,
    /// Netscape cookie-jar contents from the environment
    pub cookies_payload: Option<String>,
    /// Where the payload was written, once provisioned
    pub cookie_file: Option<PathBuf>,
    pub info_timeout: Duration,
    pub download_timeout: Duration,
    /// Age after which `video_*` files are swept
    pub retention: Duration,
    /// Period of the background sweep
    pub sweep_interval: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            download_dir: std::env::temp_dir(),
            ytdlp_path: None,
            ffmpeg_path: None,
            cookies_payload: None,
            cookie_file: None,
            info_timeout: Duration::from_secs(60),
            download_timeout: Duration::from_secs(900),
            retention: Duration::from_secs(3600),
            sweep_interval: Duration::from_secs(600),
        }
    }
}

// Keeps the cookie payload out of logs
impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("download_dir", &self.download_dir)
            .field("ytdlp_path", &self.ytdlp_path)
            .field("ffmpeg_path", &self.ffmpeg_path)
            .field("cookies", &self.cookies_payload.as_ref().map(|_| "<set>"))
            .field("cookie_file", &self.cookie_file)
            .field("info_timeout", &self.info_timeout)
            .field("download_timeout", &self.download_timeout)
            .field("retention", &self.retention)
            .field("sweep_interval", &self.sweep_interval)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or blank values keep their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let secs = |key: &str, default: Duration| match get(key) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(n) => Duration::from_secs(n),
                Err(_) => {
                    warn!(key, value = %raw, "not a number of seconds, using default");
                    default
                }
            },
            None => default,
        };

        let defaults = Self::default();

        let port = match get("PORT") {
            Some(raw) => raw.parse::<u16>().unwrap_or_else(|_| {
                warn!(value = %raw, "invalid PORT, using {}", DEFAULT_PORT);
                DEFAULT_PORT
            }),
            None => DEFAULT_PORT,
        };

        Self {
            port,
            download_dir: get("DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.download_dir),
            ytdlp_path: get("YTDLP_PATH"),
            ffmpeg_path: get("FFMPEG_PATH"),
            // Cookie jars are whitespace-sensitive; only blank payloads are dropped
            cookies_payload: lookup("YTDLP_COOKIES").filter(|v| !v.trim().is_empty()),
            cookie_file: None,
            info_timeout: secs("INFO_TIMEOUT_SECS", defaults.info_timeout),
            download_timeout: secs("DOWNLOAD_TIMEOUT_SECS", defaults.download_timeout),
            retention: secs("RETENTION_SECS", defaults.retention),
            sweep_interval: secs("SWEEP_INTERVAL_SECS", defaults.sweep_interval),
        }
    }

    /// Write the cookie payload (if any) to a file every engine call can reference
    pub fn provision_cookies(&mut self) -> io::Result<()> {
        let Some(payload) = &self.cookies_payload else {
            return Ok(());
        };

        std::fs::create_dir_all(&self.download_dir)?;
        let path = self.download_dir.join(COOKIE_FILE_NAME);
        std::fs::write(&path, payload)?;

        info!(path = %path.display(), "cookie file provisioned");
        self.cookie_file = Some(path);
        Ok(())
    }
}
