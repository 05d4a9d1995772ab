use tracing_subscriber::{layer::SubscriberExt, EnvFilter};

/// Installs a fmt subscriber filtered by `RUST_LOG`, falling back to
/// `default_filter`, and routes `log` records into it.
///
/// Returns `false` when a global subscriber was already set. In that case the
/// `log` bridge is left untouched.
pub fn init_logging(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false));

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        return false;
    }
    // A host that already set a `log` logger keeps it; tracing output still works.
    let _ = tracing_log::LogTracer::init();
    true
}
