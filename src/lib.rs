pub mod config;
pub mod downloader;
pub mod handlers;
pub mod server;
pub mod ytdlp;

use tracing_subscriber::EnvFilter;

pub use config::AppConfig;
pub use server::run_server;

const DEFAULT_LOG_FILTER: &str = "youtube_downloader_web=info,tower_http=info";

/// Console logging; `RUST_LOG` overrides the default filter
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
