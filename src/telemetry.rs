//! Tracing subscriber set-up

use tracing_subscriber::EnvFilter;

use crate::config::{Args, LogStyle};

/// Install the global subscriber
///
/// `RUST_LOG`, when set, takes precedence over `--log`.
pub fn init(args: &Args) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&args.log_filter)?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let installed = match args.log_style {
        LogStyle::Text => builder.try_init(),
        LogStyle::Json => builder.json().try_init(),
    };

    installed.map_err(|e| anyhow::anyhow!(e))
}
