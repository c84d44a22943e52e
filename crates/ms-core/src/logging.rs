//! Logging setup for the modsync binary.
//!
//! Logs go to stderr so stdout stays parseable. `RUST_LOG` applies when no
//! `-v` flag is given; each `-v` raises the level one step above `warn`.

use tracing_subscriber::{fmt, EnvFilter};

/// Default filter directive for a `-v` count.
pub fn level_for(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn filter_for(verbose: u8) -> EnvFilter {
    if verbose == 0 {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_for(0)))
    } else {
        EnvFilter::new(level_for(verbose))
    }
}

/// Install the global subscriber. Calling it twice is harmless.
pub fn init(verbose: u8, json: bool) {
    let builder = fmt()
        .with_env_filter(filter_for(verbose))
        .with_writer(std::io::stderr)
        .with_target(true);
    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if result.is_err() {
        tracing::debug!("log subscriber already installed");
    }
}
