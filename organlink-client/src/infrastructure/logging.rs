use tracing_subscriber::{EnvFilter, fmt};

/// Used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_LOG_FILTER: &str = "info,organlink_client=debug,organlink=debug";

fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Installs the JSON subscriber. Logs go to stderr, leaving stdout to the
/// command output. A second call keeps the first subscriber.
pub fn init_logging() {
    let subscriber = fmt()
        .json()
        .with_env_filter(log_filter())
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_target(false)
        .with_current_span(true)
        .with_writer(std::io::stderr)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("logging already initialised");
    }
}
