//! Structured logging via tracing
//!
//! Everything goes to stderr so command output on stdout stays clean. The
//! `RUST_LOG` environment variable always wins over the verbosity flag.
//!
//! Useful targets:
//! - `followgraph::connector=debug` - ticket issue, join and settle
//! - `followgraph::graph=debug` - fan-out sizes and failed items
//! - `followgraph::client=info` - optimistic applies and merged pages

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter directive for a `-v` count
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "followgraph=info,warn",
        2 => "followgraph=debug,info",
        _ => "trace",
    }
}

/// Install the global subscriber with the quiet default
pub fn init() -> crate::Result<()> {
    init_with_verbosity(0)
}

/// Install the global subscriber, falling back to `default_directive(verbosity)`
/// when `RUST_LOG` is unset or invalid
///
/// # Errors
/// Returns an error if a global subscriber is already installed
pub fn init_with_verbosity(verbosity: u8) -> crate::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true),
        )
        .try_init()
        .map_err(|e| {
            crate::FollowGraphError::Config(format!("Failed to initialize tracing: {}", e))
        })
}

/// Initialize logging for tests (no-op if already initialized)
pub fn init_test() {
    let _ = init();
}
