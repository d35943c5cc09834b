//! Tracing subscriber setup for the `cookie-taster` binary.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber.
///
/// Logs go to stderr so the final report on stdout stays machine-readable.
/// `RUST_LOG` overrides `level` when set; `json` switches to newline-delimited
/// JSON. Only the first call in a process takes effect.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if json {
        registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false).json())
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init()
    };

    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
