use anyhow::anyhow;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

use crate::conf;

/// `RUST_LOG` directives, if any, refine the configured level.
///
/// Logs go to stderr, keeping stdout for command output.
pub fn init() -> anyhow::Result<()> {
    let conf = conf::global();
    let level = LevelFilter::from_level(conf.effective_log_level());
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow!("Failed to init tracing: {error}"))?;
    Ok(())
}
