use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use rebooter_core::config::ConfigError;
use rebooter_core::report::ReportError;
use thiserror::Error;

/// Exit status for a missing or invalid configuration file.
pub const CONFIG_EXIT_CODE: i32 = 2;
/// Exit status for every other start-up failure.
pub const FAILURE_EXIT_CODE: i32 = 1;

/// Fatal start-up errors.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("cannot read {}: {source}", .path.display())]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration in {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },

    #[error(transparent)]
    Gpio(#[from] GpioError),

    #[error(transparent)]
    Measure(#[from] MeasureError),

    #[error("cannot install the termination handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("cannot start the measurement thread: {0}")]
    Worker(#[source] io::Error),
}

impl DaemonError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            DaemonError::ReadConfig { .. } | DaemonError::Config { .. } => CONFIG_EXIT_CODE,
            _ => FAILURE_EXIT_CODE,
        }
    }
}

/// Failures while claiming GPIO lines at start-up.
#[derive(Debug, Error)]
pub enum GpioError {
    #[error("cannot open {}: {source}", .chip.display())]
    Chip {
        chip: PathBuf,
        #[source]
        source: gpio_cdev::errors::Error,
    },

    #[error("cannot claim line {offset} for the {role}: {source}")]
    Line {
        offset: u32,
        role: &'static str,
        #[source]
        source: gpio_cdev::errors::Error,
    },

    #[error("cannot program the buzzer PWM channel {}: {source}", .path.display())]
    Pwm {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A speed test that produced no usable figure.
#[derive(Debug, Error)]
pub enum MeasureError {
    #[error("speed test command is empty")]
    EmptyCommand,

    #[error("cannot run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` exited with {status}")]
    Failed { command: String, status: ExitStatus },

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("measurement thread has stopped")]
    WorkerGone,
}
