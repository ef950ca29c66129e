//! Front-panel indicators, buzzer, and button.

use embedded_hal::digital::{Error as _, ErrorKind, InputPin, OutputPin, PinState};
use rebooter_core::machine::IndicatorRole;

use super::tone::BuzzerOutput;

/// Active-high LEDs and the buzzer.
#[derive(Debug)]
pub struct Panel<P> {
    indicators: [P; 3],
    buzzer: BuzzerOutput<P>,
}

impl<P> Panel<P>
where
    P: OutputPin,
{
    /// `indicators` is ordered by [`IndicatorRole::as_index`].
    pub const fn new(indicators: [P; 3], buzzer: BuzzerOutput<P>) -> Self {
        Self { indicators, buzzer }
    }

    /// # Errors
    ///
    /// Returns the pin's error kind when the write fails.
    pub fn set_indicator(&mut self, role: IndicatorRole, lit: bool) -> Result<(), ErrorKind> {
        self.indicators[role.as_index()]
            .set_state(PinState::from(lit))
            .map_err(|err| err.kind())
    }

    /// # Errors
    ///
    /// Returns the output's error kind when the write fails.
    pub fn set_buzzer(&mut self, sounding: bool) -> Result<(), ErrorKind> {
        self.buzzer.set_sounding(sounding)
    }

    /// Drives every output low, returning how many writes failed.
    pub fn all_off(&mut self) -> usize {
        let mut failures = usize::from(self.set_buzzer(false).is_err());
        for role in IndicatorRole::ALL {
            failures += usize::from(self.set_indicator(role, false).is_err());
        }
        failures
    }
}

/// Push button with configurable polarity.
#[derive(Debug)]
pub struct ButtonInput<P> {
    pin: P,
    active_low: bool,
}

impl<P> ButtonInput<P>
where
    P: InputPin,
{
    pub const fn new(pin: P, active_low: bool) -> Self {
        Self { pin, active_low }
    }

    /// # Errors
    ///
    /// Returns the pin's error kind when the line cannot be read.
    pub fn is_pressed(&mut self) -> Result<bool, ErrorKind> {
        let high = self.pin.is_high().map_err(|err| err.kind())?;
        Ok(high != self.active_low)
    }
}
