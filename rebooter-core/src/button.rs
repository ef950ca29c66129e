//! Debounced button monitor.
//!
//! The runtime samples the raw switch level at a fixed cadence and feeds each
//! sample through [`ButtonMonitor::sample`]. A level change is only accepted
//! once it has been stable for the debounce window. Every accepted
//! press/release cycle yields exactly one event: [`ButtonEvent::HeldFor`] as
//! soon as the hold threshold is reached, or [`ButtonEvent::Pressed`] on
//! release when it was not.

use core::ops::Add;
use core::time::Duration;

/// Stability window applied to raw switch transitions.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(20);

/// Logical events derived from the physical button.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ButtonEvent {
    /// Short press, reported on release.
    Pressed,
    /// Continuous press that reached the configured threshold.
    HeldFor(Duration),
}

/// Timing parameters for the monitor.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ButtonTiming {
    pub hold_threshold: Duration,
    pub debounce: Duration,
}

impl ButtonTiming {
    #[must_use]
    pub const fn new(hold_threshold: Duration) -> Self {
        Self {
            hold_threshold,
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    #[must_use]
    pub const fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

/// Turns raw level samples into [`ButtonEvent`]s.
#[derive(Clone, Debug)]
pub struct ButtonMonitor<I> {
    timing: ButtonTiming,
    pressed: bool,
    candidate: Option<(bool, I)>,
    pressed_at: Option<I>,
    hold_reported: bool,
}

impl<I> ButtonMonitor<I>
where
    I: Copy + Ord + Add<Duration, Output = I>,
{
    /// Creates a monitor that starts with the button released.
    #[must_use]
    pub const fn new(timing: ButtonTiming) -> Self {
        Self {
            timing,
            pressed: false,
            candidate: None,
            pressed_at: None,
            hold_reported: false,
        }
    }

    #[must_use]
    pub const fn timing(&self) -> ButtonTiming {
        self.timing
    }

    /// Returns the debounced level.
    #[must_use]
    pub const fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// Feeds a raw sample taken at `now`.
    pub fn sample(&mut self, pressed: bool, now: I) -> Option<ButtonEvent> {
        if pressed == self.pressed {
            self.candidate = None;
            return self.check_hold(now);
        }

        let since = match self.candidate {
            Some((level, since)) if level == pressed => since,
            _ => {
                self.candidate = Some((pressed, now));
                now
            }
        };

        if since + self.timing.debounce > now {
            return self.check_hold(now);
        }

        self.candidate = None;
        self.pressed = pressed;

        if pressed {
            self.pressed_at = Some(since);
            self.hold_reported = false;
            self.check_hold(now)
        } else {
            self.pressed_at = None;
            let held = core::mem::replace(&mut self.hold_reported, false);
            if held { None } else { Some(ButtonEvent::Pressed) }
        }
    }

    fn check_hold(&mut self, now: I) -> Option<ButtonEvent> {
        if !self.pressed || self.hold_reported {
            return None;
        }

        let pressed_at = self.pressed_at?;
        if pressed_at + self.timing.hold_threshold <= now {
            self.hold_reported = true;
            Some(ButtonEvent::HeldFor(self.timing.hold_threshold))
        } else {
            None
        }
    }
}
