use tracing_subscriber::EnvFilter;

/// Initialize a `tracing_subscriber` writing to stderr
///
/// Reports all the log events sent either with the `log` crate or the `tracing` crate.
///
/// If `debug` is `false` then only `error!`, `warn!` and `info!` are reported.
/// If `debug` is `true` then `debug!` is reported too.
/// `RUST_LOG` takes precedence over both.
pub fn initialise_tracing_subscriber(debug: bool) {
    let log_level = if debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    let filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_env_filter(filter)
        .init();
}
