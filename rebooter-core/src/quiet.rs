//! Quiet-hours gate for audible alerts.
//!
//! The window is a half-open `[start, end)` range of wall-clock hours that
//! wraps past midnight when `start > end`, so `22 → 8` silences the buzzer
//! from 22:00 until 07:59. Indicators and the display ignore the gate.

use core::fmt;

/// Number of hours in a day; valid hours are `0..HOURS_PER_DAY`.
pub const HOURS_PER_DAY: u8 = 24;

/// Daily window during which the buzzer stays silent.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct QuietHours {
    start: u8,
    end: u8,
}

/// Error returned when an hour falls outside `0..24`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct InvalidHour(pub u8);

impl fmt::Display for InvalidHour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hour {} is outside 0-23", self.0)
    }
}

impl core::error::Error for InvalidHour {}

impl QuietHours {
    /// Window that never silences anything.
    pub const NEVER: Self = Self { start: 0, end: 0 };

    /// Creates a window from `start` (inclusive) to `end` (exclusive).
    ///
    /// # Errors
    ///
    /// Returns [`InvalidHour`] when either bound is 24 or larger.
    pub const fn new(start: u8, end: u8) -> Result<Self, InvalidHour> {
        if start >= HOURS_PER_DAY {
            return Err(InvalidHour(start));
        }
        if end >= HOURS_PER_DAY {
            return Err(InvalidHour(end));
        }
        Ok(Self { start, end })
    }

    #[must_use]
    pub const fn start(self) -> u8 {
        self.start
    }

    #[must_use]
    pub const fn end(self) -> u8 {
        self.end
    }

    /// Returns `true` when the window spans midnight.
    #[must_use]
    pub const fn wraps(self) -> bool {
        self.start > self.end
    }

    /// Returns `true` when `hour` falls inside the window.
    ///
    /// An empty window (`start == end`) never matches. Hours outside `0..24`
    /// never match either.
    #[must_use]
    pub const fn contains(self, hour: u8) -> bool {
        if hour >= HOURS_PER_DAY || self.start == self.end {
            return false;
        }

        if self.wraps() {
            hour >= self.start || hour < self.end
        } else {
            hour >= self.start && hour < self.end
        }
    }
}

impl Default for QuietHours {
    fn default() -> Self {
        Self::NEVER
    }
}

impl fmt::Display for QuietHours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:00-{:02}:00", self.start, self.end)
    }
}

/// Returns `true` when audible output must be suppressed at `hour`.
#[must_use]
pub const fn is_quiet(hour: u8, range: QuietHours) -> bool {
    range.contains(hour)
}
