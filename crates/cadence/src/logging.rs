use tracing_subscriber::EnvFilter;

/// Log filter variable, checked before `RUST_LOG`
pub const LOG_ENV: &str = "CADENCE_LOG";
const DEFAULT_FILTER: &str = "warn";

/// Filter directive from `CADENCE_LOG`, then `RUST_LOG`, then the default.
pub fn filter_directive() -> String {
    std::env::var(LOG_ENV)
        .or_else(|_| std::env::var("RUST_LOG"))
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

/// Install the stderr subscriber. An unparsable filter falls back to the default.
pub fn init() {
    let filter = EnvFilter::try_new(filter_directive())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
