//! Logging setup for applications embedding the client

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Parse a level name; unknown names fall back to INFO
pub fn parse_level(name: &str) -> Level {
    match name.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Install a global fmt subscriber
///
/// `RUST_LOG`, when set, takes precedence over `level`.
pub fn init_logging(level: &str) -> Result<()> {
    let level = parse_level(level);

    let builder = FmtSubscriber::builder().with_target(true);
    match EnvFilter::try_from_default_env() {
        Ok(filter) => {
            tracing::subscriber::set_global_default(builder.with_env_filter(filter).finish())?
        }
        Err(_) => tracing::subscriber::set_global_default(builder.with_max_level(level).finish())?,
    }
    Ok(())
}
