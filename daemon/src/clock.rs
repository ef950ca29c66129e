//! Monotonic and wall-clock time sources.

use core::ops::Add;
use core::time::Duration;

use chrono::{Local, Timelike};
use embassy_time::{Instant, TICK_HZ};

/// Monotonic instant handed to the core state machine.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct MonotonicInstant(Instant);

impl MonotonicInstant {
    #[must_use]
    pub fn now() -> Self {
        Self(Instant::now())
    }

    #[must_use]
    pub const fn into_embassy(self) -> Instant {
        self.0
    }
}

impl From<Instant> for MonotonicInstant {
    fn from(instant: Instant) -> Self {
        Self(instant)
    }
}

impl Add<Duration> for MonotonicInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0.checked_add(to_embassy(rhs)).unwrap_or(Instant::MAX))
    }
}

/// Converts a `core` duration to whole ticks, rounding up and saturating at
/// the largest representable value.
#[must_use]
pub fn to_embassy(duration: Duration) -> embassy_time::Duration {
    let ticks = duration
        .as_nanos()
        .saturating_mul(u128::from(TICK_HZ))
        .div_ceil(1_000_000_000);
    embassy_time::Duration::from_ticks(u64::try_from(ticks).unwrap_or(u64::MAX))
}

/// Instant `duration` from now, clamped to [`Instant::MAX`].
#[must_use]
pub fn deadline_after(duration: Duration) -> Instant {
    (MonotonicInstant::now() + duration).into_embassy()
}

/// Source of the local wall-clock hour used by quiet hours.
pub trait WallClock {
    fn local_hour(&self) -> u8;
}

/// The system's local time zone.
#[derive(Copy, Clone, Debug, Default)]
pub struct LocalClock;

impl WallClock for LocalClock {
    fn local_hour(&self) -> u8 {
        u8::try_from(Local::now().hour()).unwrap_or(0)
    }
}
