//! Tracing setup for the CLI. Library code only emits events.

use tracing_subscriber::EnvFilter;

/// Installs a stderr subscriber. `RUST_LOG` wins over `fallback`, `-v` selects
/// debug and `-vv` trace. Calling it twice is harmless.
pub fn init(fallback: &str, verbosity: u8) {
    let level = match verbosity {
        0 => fallback,
        1 => "dsmeta=debug",
        _ => "dsmeta=trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
