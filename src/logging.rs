use tracing_subscriber::EnvFilter;

/// Install the stderr subscriber. `RUST_LOG`, when set, wins over `verbosity`.
pub fn setup(verbosity: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
