//! Speed measurements.
//!
//! A speed test blocks for tens of seconds, so it runs on a dedicated OS
//! thread. The async side posts a request over a channel and awaits the
//! result through a [`Signal`], leaving the executor free to service the
//! button and the warn timer in the meantime.

use std::io;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use rebooter_core::Mbps;
use rebooter_core::report::parse_download;
use tracing::debug;

use crate::error::MeasureError;

/// Hand-off slot for measurement results.
pub type MeasureSignal = Signal<CriticalSectionRawMutex, Result<Mbps, MeasureError>>;

/// Blocking source of download-speed measurements.
pub trait MeasurementSource: Send + 'static {
    /// # Errors
    ///
    /// Returns [`MeasureError`] when no usable figure could be obtained.
    fn measure(&mut self) -> Result<Mbps, MeasureError>;
}

/// Runs an external speed-test program and parses its output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpeedTestCommand {
    program: String,
    args: Vec<String>,
}

impl SpeedTestCommand {
    /// Splits `command_line` on whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`MeasureError::EmptyCommand`] for a blank command line.
    pub fn from_command_line(command_line: &str) -> Result<Self, MeasureError> {
        let mut words = command_line.split_whitespace().map(str::to_owned);
        let program = words.next().ok_or(MeasureError::EmptyCommand)?;
        Ok(Self {
            program,
            args: words.collect(),
        })
    }
}

impl MeasurementSource for SpeedTestCommand {
    fn measure(&mut self) -> Result<Mbps, MeasureError> {
        debug!("measure: running program={} args={:?}", self.program, self.args);
        let output = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| MeasureError::Spawn {
                command: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(MeasureError::Failed {
                command: self.program.clone(),
                status: output.status,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_download(&stdout)?)
    }
}

/// Async handle to the measurement thread.
pub struct MeasurementWorker {
    requests: mpsc::Sender<()>,
    results: &'static MeasureSignal,
}

impl MeasurementWorker {
    /// Starts the thread that owns `source`.
    ///
    /// # Errors
    ///
    /// Returns the I/O error from the thread builder.
    pub fn spawn<S>(mut source: S, results: &'static MeasureSignal) -> io::Result<Self>
    where
        S: MeasurementSource,
    {
        let (requests, queue) = mpsc::channel::<()>();
        thread::Builder::new()
            .name("speedtest".into())
            .spawn(move || {
                while queue.recv().is_ok() {
                    results.signal(source.measure());
                }
            })?;

        Ok(Self { requests, results })
    }

    /// Runs one measurement on the worker thread.
    ///
    /// # Errors
    ///
    /// Returns the source's error, or [`MeasureError::WorkerGone`] when the
    /// thread has exited.
    pub async fn measure(&self) -> Result<Mbps, MeasureError> {
        self.results.reset();
        self.requests
            .send(())
            .map_err(|_| MeasureError::WorkerGone)?;
        self.results.wait().await
    }
}
