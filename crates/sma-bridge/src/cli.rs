//! Clap derive structures for the `sma-bridge` binary.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{ArgAction, Parser};

/// sma-bridge -- flat JSON bridge for SMA Data Manager live measurements
#[derive(Debug, Parser)]
#[command(
    name = "sma-bridge",
    version,
    about = "Serve SMA Data Manager live measurements as flat JSON",
    long_about = "An HTTP service that logs into an SMA Data Manager on behalf of the caller,\n\
        queries live measurements, and answers with a flat alias -> value object.\n\n\
        Settings come from the config file, then SMA_BRIDGE_* environment variables,\n\
        then the flags below."
)]
pub struct Cli {
    /// Config file (default: the platform config dir, sma-bridge/config.toml)
    #[arg(long, short = 'c', env = "SMA_BRIDGE_CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Address to listen on, e.g. 0.0.0.0:8080
    #[arg(long, short = 'l')]
    pub listen: Option<SocketAddr>,

    /// Seconds between fresh backend fetches
    #[arg(long)]
    pub cooldown: Option<f64>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = ArgAction::Count)]
    pub verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}
