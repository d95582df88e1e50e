use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::dashboard::Dashboard;

mod cache;
mod client;
mod config;
mod dashboard;
mod endpoints;
mod error;
mod grid;
mod refresh;
mod telemetry;
#[cfg(test)]
mod testing;
mod types;
mod web;

const CONFIG_PATH: &str = "dashboard.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_telemetry();

    let config = AppConfig::load(CONFIG_PATH)?;
    info!("⚙️ Configuration loaded: {:?}", config);

    let dashboard = Arc::new(Dashboard::new(&config));

    // A failed discovery is shown on the page; the user can fix the base
    // URL or rescan from there.
    if let Err(e) = dashboard.mount().await {
        warn!("Initial discovery failed: {}", e);
    }

    let web_dashboard = dashboard.clone();
    let web_handle = tokio::spawn(async move {
        if let Err(e) = web::start_web_server(config.web_port, web_dashboard).await {
            error!("Web server failed: {}", e);
        }
    });

    tokio::select! {
        result = web_handle => {
            if let Err(e) = result {
                error!("❌ Web server task failed: {:?}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("🛑 Ctrl-C received, shutting down");
        }
    }

    Ok(())
}
