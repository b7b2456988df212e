use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing for the host binary.
///
/// Level comes from RUST_LOG (default "info"). Output goes to stderr so
/// command output on stdout stays machine-readable; `json` switches to one
/// JSON object per line.
pub fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
