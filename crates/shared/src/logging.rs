use tracing_subscriber::{fmt, EnvFilter};

/// Install the stderr tracing subscriber. `RUST_LOG` picks the filter
/// (default `info`); `ARXIV_DIGEST_LOG_JSON=1` switches to JSON lines.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if std::env::var("ARXIV_DIGEST_LOG_JSON").ok().as_deref() == Some("1") {
        fmt.json().init();
    } else {
        fmt.init();
    }
}
