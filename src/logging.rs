use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber.
///
/// `level` (from `--log-level`) wins over `RUST_LOG`; with neither set the
/// filter is `info`. Logs go to stderr so `ask` output stays clean.
pub fn init(level: Option<&str>) {
    let filter = match level {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    // A subscriber may already be installed (tests, repeated in-process calls).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
