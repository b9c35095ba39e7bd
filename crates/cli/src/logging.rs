// Log output: library crates log through the `log` facade; this installs a
// tracing fmt subscriber on stderr that also receives those records.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const LOG_ENV: &str = "GRIDCHECK_LOG";

/// `GRIDCHECK_LOG` wins when set and valid, otherwise `level`.
pub fn init_logging(level: &str) {
    let filter = std::env::var(LOG_ENV)
        .ok()
        .and_then(|_| EnvFilter::try_from_env(LOG_ENV).ok())
        .unwrap_or_else(|| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}
