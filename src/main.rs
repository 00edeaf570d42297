use tracing::{error, warn};
use youtube_downloader_web::{init_tracing, run_server, AppConfig};

#[tokio::main]
async fn main() {
    init_tracing();

    let mut config = AppConfig::from_env();
    if let Err(e) = config.provision_cookies() {
        warn!(error = %e, "could not write cookie file; continuing without cookies");
    }

    if let Err(e) = run_server(config).await {
        error!("server error: {}", e);
        std::process::exit(1);
    }
}
