//! Quiet-hours gate and alert cadence for the buzzer.

use core::time::Duration;

use rebooter_core::machine::FlashPattern;
use rebooter_core::quiet::QuietHours;

use crate::clock::WallClock;

/// Decides whether an alert may sound right now.
#[derive(Debug)]
pub struct BuzzerGate<C> {
    quiet: QuietHours,
    clock: C,
}

impl<C> BuzzerGate<C>
where
    C: WallClock,
{
    pub const fn new(quiet: QuietHours, clock: C) -> Self {
        Self { quiet, clock }
    }

    /// Returns the current local hour when the buzzer may sound.
    ///
    /// # Errors
    ///
    /// Returns the current hour when it lies inside the quiet window.
    pub fn check(&self) -> Result<u8, u8> {
        let hour = self.clock.local_hour();
        if self.quiet.contains(hour) {
            Err(hour)
        } else {
            Ok(hour)
        }
    }

    pub const fn quiet_hours(&self) -> QuietHours {
        self.quiet
    }
}

/// Beeps while an alert sounds. The pitch comes from the hardware: an active
/// buzzer's own oscillator or the PWM channel's period.
pub const ALERT_CADENCE: FlashPattern = FlashPattern {
    on: Duration::from_millis(250),
    off: Duration::from_millis(250),
};

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedClock(u8);

    impl WallClock for FixedClock {
        fn local_hour(&self) -> u8 {
            self.0
        }
    }

    fn gate(hour: u8) -> BuzzerGate<FixedClock> {
        let quiet = QuietHours::new(22, 8).expect("valid hours");
        BuzzerGate::new(quiet, FixedClock(hour))
    }

    #[test]
    fn silent_overnight() {
        assert!(gate(22).check().is_err());
        assert!(gate(3).check().is_err());
        assert_eq!(gate(7).check(), Err(7));
    }

    #[test]
    fn sounds_during_the_day() {
        assert!(gate(8).check().is_ok());
        assert!(gate(12).check().is_ok());
        assert_eq!(gate(21).check(), Ok(21));
    }

    #[test]
    fn empty_window_never_silences() {
        let gate = BuzzerGate::new(QuietHours::NEVER, FixedClock(0));
        assert!(gate.check().is_ok());
    }
}
