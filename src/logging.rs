use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Install the global subscriber. Diagnostics go to stderr so task reports on
/// stdout stay clean; the filter comes from `AMR_LOG`, then `RUST_LOG`,
/// defaulting to `info`.
pub fn init() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = std::env::var("AMR_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .map(EnvFilter::new)
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let installed = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_thread_names(true)
            .with_target(false)
            .try_init();
        if installed.is_err() {
            tracing::debug!("global tracing subscriber already set; keeping it");
        }
    });
}
