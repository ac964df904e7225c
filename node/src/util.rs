use tracing_subscriber::EnvFilter;

/// Initialises the `tracing` subscriber from `RUST_LOG` (falling back to
/// `info`), matching the teacher's own `util::init_tracing`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}
