//! Logging setup
//!
//! Every account operation and transfer outcome is a structured `tracing`
//! event. This module installs the subscriber that renders them on stderr,
//! keeping stdout free for the CSV balance report.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global stderr subscriber
///
/// `RUST_LOG` takes precedence over `default_level` when set. Calling this
/// more than once keeps the first subscriber.
pub fn init_logging(default_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(true),
        )
        .try_init();
}
