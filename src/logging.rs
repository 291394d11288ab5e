use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "FINVAULT_LOG";
pub const DEFAULT_FILTER: &str = "finvault=info,sqlx=warn";

fn env_filter() -> EnvFilter {
    std::env::var(LOG_ENV)
        .ok()
        .and_then(|raw| EnvFilter::try_new(raw).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the JSON subscriber on stderr. Safe to call more than once.
pub fn init_logging() {
    let _ = tracing_log::LogTracer::init();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .json()
        .with_target(true)
        .with_timer(UtcTime::rfc_3339())
        .with_writer(std::io::stderr)
        .try_init();
}
