//! Telemetry helpers for structured logging and tracing.

/// Initialize tracing. Users can install their own subscriber; this helper
/// installs an env-filtered fmt subscriber (`RUST_LOG`) if none is set yet.
///
/// Worker threads are named by the pool's thread factory, so thread names are
/// included in the output.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_thread_names(true)
        .try_init();
}
