//! Modem and router relay outputs.

use embedded_hal::digital::{Error as _, OutputPin, PinState};
use rebooter_core::sequence::{PowerAction, PowerDriver, PowerError, PowerLine};
use tracing::{debug, warn};

/// Relay outputs for the two power lines.
#[derive(Debug)]
pub struct PowerLines<P> {
    modem: P,
    router: P,
    active_low: bool,
}

impl<P> PowerLines<P>
where
    P: OutputPin,
{
    /// `active_low` means the equipment is powered while the line is low.
    pub const fn new(modem: P, router: P, active_low: bool) -> Self {
        Self {
            modem,
            router,
            active_low,
        }
    }

    /// Line level that produces `action`.
    const fn level(&self, action: PowerAction) -> PinState {
        let powered = matches!(action, PowerAction::On);
        if powered == self.active_low {
            PinState::Low
        } else {
            PinState::High
        }
    }

    fn drive(&mut self, line: PowerLine, action: PowerAction) -> Result<(), P::Error> {
        let level = self.level(action);
        let pin = match line {
            PowerLine::Modem => &mut self.modem,
            PowerLine::Router => &mut self.router,
        };
        pin.set_state(level)
    }
}

impl<P> PowerDriver for PowerLines<P>
where
    P: OutputPin,
{
    fn apply(&mut self, line: PowerLine, action: PowerAction) -> Result<(), PowerError> {
        self.drive(line, action).map_err(|err| {
            warn!(
                "power: write failed line={line} action={action} kind={:?}",
                err.kind()
            );
            PowerError::WriteFailed
        })?;
        debug!("power: line={line} action={action}");
        Ok(())
    }

    fn release_all(&mut self) {
        for line in [PowerLine::Modem, PowerLine::Router] {
            if let Err(err) = self.drive(line, PowerAction::On) {
                warn!("power: release failed line={line} kind={:?}", err.kind());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use embedded_hal::digital::{ErrorKind, ErrorType};

    use super::*;

    #[derive(Debug, Default)]
    struct MockPin {
        levels: Vec<PinState>,
        broken: bool,
    }

    impl ErrorType for MockPin {
        type Error = ErrorKind;
    }

    impl OutputPin for MockPin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.set_state(PinState::Low)
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.set_state(PinState::High)
        }

        fn set_state(&mut self, state: PinState) -> Result<(), Self::Error> {
            if self.broken {
                return Err(ErrorKind::Other);
            }
            self.levels.push(state);
            Ok(())
        }
    }

    #[test]
    fn active_high_relays_drive_high_for_power() {
        let mut lines = PowerLines::new(MockPin::default(), MockPin::default(), false);
        lines.apply(PowerLine::Modem, PowerAction::Off).expect("write");
        lines.apply(PowerLine::Modem, PowerAction::On).expect("write");
        assert_eq!(lines.modem.levels, [PinState::Low, PinState::High]);
        assert!(lines.router.levels.is_empty());
    }

    #[test]
    fn active_low_relays_invert_the_level() {
        let mut lines = PowerLines::new(MockPin::default(), MockPin::default(), true);
        lines.apply(PowerLine::Router, PowerAction::Off).expect("write");
        lines.apply(PowerLine::Router, PowerAction::On).expect("write");
        assert_eq!(lines.router.levels, [PinState::High, PinState::Low]);
    }

    #[test]
    fn write_failure_is_reported_not_panicked() {
        let broken = MockPin {
            broken: true,
            ..MockPin::default()
        };
        let mut lines = PowerLines::new(broken, MockPin::default(), false);
        assert_eq!(
            lines.apply(PowerLine::Modem, PowerAction::Off),
            Err(PowerError::WriteFailed)
        );
    }

    #[test]
    fn release_powers_every_line_even_after_a_failure() {
        let broken = MockPin {
            broken: true,
            ..MockPin::default()
        };
        let mut lines = PowerLines::new(broken, MockPin::default(), true);
        lines.release_all();
        assert_eq!(lines.router.levels, [PinState::Low]);
    }
}
