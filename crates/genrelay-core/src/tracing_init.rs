//! Logging setup for the genrelay binary.
//!
//! Installs a `tracing_subscriber` registry filtered to the genrelay crates at
//! the configured `server.log_level`. `RUST_LOG`, when set, replaces that
//! filter entirely. `--log-json` switches to one JSON object per line.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber.
pub fn init_tracing(log_level: &str, log_json: bool) {
    let env_filter = resolve_filter(std::env::var("RUST_LOG").ok(), log_level);
    if log_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Default filter directive for the relay crates at `level`.
pub fn default_filter(level: &str) -> String {
    format!("genrelay_server={level},genrelay_core={level},tower_http=warn")
}

fn resolve_filter(rust_log: Option<String>, log_level: &str) -> EnvFilter {
    EnvFilter::new(rust_log.unwrap_or_else(|| default_filter(log_level)))
}
