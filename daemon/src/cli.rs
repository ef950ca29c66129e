use std::path::PathBuf;

use clap::Parser;

/// Power-cycles the modem and router when the measured download speed stays
/// low.
#[derive(Debug, Parser)]
#[command(name = "speedtest-rebooter", version, about)]
pub struct Cli {
    /// INI file holding the `[Config]` section.
    #[arg(short, long, value_name = "PATH", default_value = "config.ini")]
    pub config: PathBuf,

    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(short, long)]
    pub verbose: bool,

    /// Validate the configuration and exit without touching any GPIO line.
    #[arg(long)]
    pub check_config: bool,
}
