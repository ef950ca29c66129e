//! GPIO bring-up on the Linux character device.

#[cfg(test)]
pub mod mock;
pub mod panel;
pub mod power;
pub mod tone;

use gpio_cdev::{Chip, LineRequestFlags};
use linux_embedded_hal::CdevPin;
use tracing::info;

pub use panel::{ButtonInput, Panel};
pub use power::PowerLines;
pub use tone::{BuzzerOutput, PwmChannel};

use crate::error::GpioError;
use crate::settings::Settings;

/// Consumer label shown by `gpioinfo`.
const CONSUMER: &str = "speedtest-rebooter";

/// Every claimed line, ready to hand to the runtime.
pub struct Hardware {
    pub power: PowerLines<CdevPin>,
    pub panel: Panel<CdevPin>,
    pub button: ButtonInput<CdevPin>,
}

impl Hardware {
    /// Claims the GPIO lines and, when configured, the buzzer's PWM channel.
    /// Power lines start powered; LEDs and the buzzer start off.
    ///
    /// # Errors
    ///
    /// Returns [`GpioError`] when the chip cannot be opened, a line cannot be
    /// claimed, or the PWM channel cannot be programmed.
    pub fn open(settings: &Settings) -> Result<Self, GpioError> {
        let mut chip = Chip::new(&settings.gpio_chip).map_err(|source| GpioError::Chip {
            chip: settings.gpio_chip.clone(),
            source,
        })?;

        let pins = &settings.pins;
        let powered = u8::from(!pins.power_active_low);

        let modem = output(&mut chip, pins.modem, "modem relay", powered)?;
        let router = output(&mut chip, pins.router, "router relay", powered)?;
        let normal = output(&mut chip, pins.normal_led, "normal LED", 0)?;
        let slow = output(&mut chip, pins.slow_led, "slow LED", 0)?;
        let rebooting = output(&mut chip, pins.rebooting_led, "rebooting LED", 0)?;
        let button = input(&mut chip, pins.button, "button")?;
        let buzzer = match &settings.buzzer_pwm {
            Some(path) => {
                let frequency_hz = settings.rebooter.buzzer_frequency_hz;
                let channel =
                    PwmChannel::open(path, frequency_hz).map_err(|source| GpioError::Pwm {
                        path: path.clone(),
                        source,
                    })?;
                info!(
                    "gpio: buzzer on pwm channel={} frequency_hz={frequency_hz}",
                    channel.path().display()
                );
                BuzzerOutput::Pwm(channel)
            }
            None => BuzzerOutput::Line(output(&mut chip, pins.buzzer, "buzzer", 0)?),
        };

        let count = if matches!(buzzer, BuzzerOutput::Line(_)) { 7 } else { 6 };
        info!(
            "gpio: claimed lines chip={} count={count}",
            settings.gpio_chip.display()
        );

        Ok(Self {
            power: PowerLines::new(modem, router, pins.power_active_low),
            panel: Panel::new([normal, slow, rebooting], buzzer),
            button: ButtonInput::new(button, pins.button_active_low),
        })
    }
}

fn output(
    chip: &mut Chip,
    offset: u32,
    role: &'static str,
    initial: u8,
) -> Result<CdevPin, GpioError> {
    request(chip, offset, role, LineRequestFlags::OUTPUT, initial)
}

fn input(chip: &mut Chip, offset: u32, role: &'static str) -> Result<CdevPin, GpioError> {
    request(chip, offset, role, LineRequestFlags::INPUT, 0)
}

fn request(
    chip: &mut Chip,
    offset: u32,
    role: &'static str,
    flags: LineRequestFlags,
    initial: u8,
) -> Result<CdevPin, GpioError> {
    let handle = chip
        .get_line(offset)
        .and_then(|line| line.request(flags, initial, CONSUMER))
        .map_err(|source| GpioError::Line {
            offset,
            role,
            source,
        })?;

    CdevPin::new(handle).map_err(|source| GpioError::Line {
        offset,
        role,
        source,
    })
}
