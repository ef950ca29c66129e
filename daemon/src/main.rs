mod buzzer;
mod cli;
mod clock;
mod display;
mod error;
mod hw;
mod logging;
mod measure;
mod notify;
mod runtime;
mod settings;
mod status;

use std::process;

use clap::Parser;
use tracing::{error, info};

use crate::cli::Cli;
use crate::settings::Settings;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let settings = match Settings::load(&cli.config) {
        Ok(settings) => settings,
        Err(err) => {
            error!("config: {err}");
            process::exit(err.exit_code());
        }
    };
    settings.log_summary();

    if cli.check_config {
        info!("config: ok path={}", settings.path.display());
        return;
    }

    match runtime::run(&settings) {
        Ok(never) => match never {},
        Err(err) => {
            error!("daemon: {err}");
            process::exit(err.exit_code());
        }
    }
}
