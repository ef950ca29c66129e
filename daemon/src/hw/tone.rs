//! Buzzer output: a GPIO line for an active buzzer, or a Linux PWM channel
//! for a passive one.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use embedded_hal::digital::{Error as _, ErrorKind, OutputPin, PinState};

/// Whatever the buzzer is wired to.
#[derive(Debug)]
pub enum BuzzerOutput<P> {
    /// Sounds while the line is high.
    Line(P),
    /// Sounds while the channel is enabled.
    Pwm(PwmChannel),
}

impl<P> BuzzerOutput<P>
where
    P: OutputPin,
{
    /// # Errors
    ///
    /// Returns the pin's error kind, or [`ErrorKind::Other`] when the PWM
    /// channel cannot be written.
    pub fn set_sounding(&mut self, sounding: bool) -> Result<(), ErrorKind> {
        match self {
            BuzzerOutput::Line(pin) => pin
                .set_state(PinState::from(sounding))
                .map_err(|err| err.kind()),
            BuzzerOutput::Pwm(channel) => channel
                .set_enabled(sounding)
                .map_err(|_| ErrorKind::Other),
        }
    }
}

/// One channel under `/sys/class/pwm/pwmchipN/`, programmed for a 50% duty
/// square wave.
#[derive(Debug)]
pub struct PwmChannel {
    path: PathBuf,
}

impl PwmChannel {
    /// Exports the channel when its directory is missing, then sets the
    /// period for `frequency_hz` with the output disabled.
    ///
    /// # Errors
    ///
    /// Returns the I/O error of the first attribute that cannot be written.
    pub fn open(path: &Path, frequency_hz: u32) -> io::Result<Self> {
        if !path.is_dir() {
            export(path)?;
        }

        let channel = Self {
            path: path.to_path_buf(),
        };
        let period = period_ns(frequency_hz);
        channel.write("enable", "0")?;
        // The kernel rejects a period shorter than the current duty cycle.
        channel.write("duty_cycle", "0")?;
        channel.write("period", &period.to_string())?;
        channel.write("duty_cycle", &(period / 2).to_string())?;
        Ok(channel)
    }

    /// # Errors
    ///
    /// Returns the I/O error from the `enable` attribute.
    pub fn set_enabled(&mut self, enabled: bool) -> io::Result<()> {
        self.write("enable", if enabled { "1" } else { "0" })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, attribute: &str, value: &str) -> io::Result<()> {
        fs::write(self.path.join(attribute), value)
    }
}

/// Asks the chip to create `pwmN` for a `.../pwmchipM/pwmN` path.
fn export(path: &Path) -> io::Result<()> {
    let index = path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.strip_prefix("pwm"))
        .filter(|index| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()));
    let (Some(chip), Some(index)) = (path.parent(), index) else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is not a pwmchipN/pwmM channel", path.display()),
        ));
    };
    fs::write(chip.join("export"), index)
}

/// Period of one cycle at `frequency_hz`, in nanoseconds.
#[must_use]
pub fn period_ns(frequency_hz: u32) -> u64 {
    1_000_000_000 / u64::from(frequency_hz.max(1))
}
