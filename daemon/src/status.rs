//! Shared status counters.
//!
//! Tasks publish what they observe through lock-free atomics so any task can
//! log a [`StatusSnapshot`] without touching the machine.

use core::fmt;

use portable_atomic::{AtomicU8, AtomicU32, Ordering};
use rebooter_core::Mbps;
use rebooter_core::machine::OperatingState;
use rebooter_core::sequence::SequenceReport;

/// Bit pattern of a NaN never produced by the report parser.
const UNKNOWN_SPEED: u32 = u32::MAX;

const fn encode_state(state: OperatingState) -> u8 {
    match state {
        OperatingState::Normal => 0,
        OperatingState::Low => 1,
        OperatingState::WarnReboot => 2,
        OperatingState::Rebooting => 3,
    }
}

const fn decode_state(raw: u8) -> OperatingState {
    match raw {
        1 => OperatingState::Low,
        2 => OperatingState::WarnReboot,
        3 => OperatingState::Rebooting,
        _ => OperatingState::Normal,
    }
}

#[derive(Debug)]
pub struct StatusBoard {
    state: AtomicU8,
    speed_bits: AtomicU32,
    reboots: AtomicU32,
    measure_failures: AtomicU32,
    power_failures: AtomicU32,
}

impl StatusBoard {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(encode_state(OperatingState::Normal)),
            speed_bits: AtomicU32::new(UNKNOWN_SPEED),
            reboots: AtomicU32::new(0),
            measure_failures: AtomicU32::new(0),
            power_failures: AtomicU32::new(0),
        }
    }

    pub fn set_state(&self, state: OperatingState) {
        self.state.store(encode_state(state), Ordering::Relaxed);
    }

    #[must_use]
    pub fn state(&self) -> OperatingState {
        decode_state(self.state.load(Ordering::Relaxed))
    }

    pub fn record_speed(&self, speed: Mbps) {
        self.speed_bits
            .store(speed.as_f32().to_bits(), Ordering::Relaxed);
    }

    /// Counts a failed measurement and returns the running total.
    pub fn record_measure_failure(&self) -> u32 {
        self.measure_failures
            .fetch_add(1, Ordering::Relaxed)
            .saturating_add(1)
    }

    pub fn record_reboot(&self, report: &SequenceReport) {
        self.reboots.fetch_add(1, Ordering::Relaxed);
        let failures = u32::try_from(report.failures.len()).unwrap_or(u32::MAX);
        self.power_failures.fetch_add(failures, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        let bits = self.speed_bits.load(Ordering::Relaxed);
        StatusSnapshot {
            state: self.state(),
            last_speed: (bits != UNKNOWN_SPEED).then(|| Mbps::new(f32::from_bits(bits))),
            reboots: self.reboots.load(Ordering::Relaxed),
            measure_failures: self.measure_failures.load(Ordering::Relaxed),
            power_failures: self.power_failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the [`StatusBoard`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct StatusSnapshot {
    pub state: OperatingState,
    pub last_speed: Option<Mbps>,
    pub reboots: u32,
    pub measure_failures: u32,
    pub power_failures: u32,
}

impl fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "state={} speed_mbps=", self.state)?;
        match self.last_speed {
            Some(speed) => write!(f, "{speed}")?,
            None => f.write_str("-")?,
        }
        write!(
            f,
            " reboots={} measure_failures={} power_failures={}",
            self.reboots, self.measure_failures, self.power_failures
        )
    }
}

#[cfg(test)]
mod tests {
    use core::time::Duration;

    use heapless::Vec;
    use rebooter_core::sequence::{
        PowerAction, PowerError, PowerLine, RebootStep, StepFailure,
    };

    use super::*;

    #[test]
    fn starts_normal_without_a_speed() {
        let board = StatusBoard::new();
        let snapshot = board.snapshot();
        assert_eq!(snapshot.state, OperatingState::Normal);
        assert_eq!(snapshot.last_speed, None);
        assert_eq!(
            snapshot.to_string(),
            "state=normal speed_mbps=- reboots=0 measure_failures=0 power_failures=0"
        );
    }

    #[test]
    fn tracks_state_speed_and_counters() {
        let board = StatusBoard::new();
        board.set_state(OperatingState::WarnReboot);
        board.record_speed(Mbps::new(3.25));
        assert_eq!(board.record_measure_failure(), 1);
        assert_eq!(board.record_measure_failure(), 2);

        let mut failures = Vec::new();
        failures
            .push(StepFailure {
                step: RebootStep::new(PowerLine::Router, PowerAction::Off, Duration::ZERO),
                error: PowerError::WriteFailed,
            })
            .expect("capacity");
        board.record_reboot(&SequenceReport {
            applied: 3,
            failures,
            waited: Duration::from_secs(90),
        });

        assert_eq!(
            board.snapshot().to_string(),
            "state=warn_reboot speed_mbps=3.25 reboots=1 measure_failures=2 power_failures=1"
        );
    }
}
