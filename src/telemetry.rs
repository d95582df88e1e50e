use tracing::info;
use tracing_subscriber::EnvFilter;

/// Initialize the fmt subscriber at info, with this crate at debug.
/// `RUST_LOG` replaces the filter; there is no journal or file output.
pub fn init_telemetry() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,surveillance_dashboard=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .with_line_number(true)
        .init();

    info!("📊 Telemetry initialized");
}
