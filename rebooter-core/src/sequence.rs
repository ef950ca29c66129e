//! Reboot plan and its asynchronous executor.
//!
//! A reboot is a fixed four-step plan: both power lines off, wait, modem on,
//! wait, router on. The executor is generic over the power driver and an
//! `embedded-hal-async` delay so the daemon can run it on the embassy timer
//! while tests and the emulator substitute a recording delay.

use core::fmt;
use core::time::Duration;

use embedded_hal_async::delay::DelayNs;
use heapless::Vec;

/// Number of steps in every reboot plan.
pub const REBOOT_STEPS: usize = 4;

/// Switched power outputs.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PowerLine {
    Modem,
    Router,
}

impl PowerLine {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            PowerLine::Modem => "modem",
            PowerLine::Router => "router",
        }
    }
}

impl fmt::Display for PowerLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Logical level requested for a power line.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PowerAction {
    Off,
    On,
}

impl fmt::Display for PowerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerAction::Off => f.write_str("off"),
            PowerAction::On => f.write_str("on"),
        }
    }
}

/// Failure reported by a [`PowerDriver`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PowerError {
    /// The output could not be written.
    WriteFailed,
    /// No output is bound to the requested line.
    Unavailable,
}

impl fmt::Display for PowerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerError::WriteFailed => f.write_str("output write failed"),
            PowerError::Unavailable => f.write_str("line not available"),
        }
    }
}

impl core::error::Error for PowerError {}

/// Hardware seam for the power relays.
pub trait PowerDriver {
    /// Drives `line` to the requested logical level.
    ///
    /// # Errors
    ///
    /// Returns [`PowerError`] when the output cannot be driven.
    fn apply(&mut self, line: PowerLine, action: PowerAction) -> Result<(), PowerError>;

    /// Returns every line to the powered state, ignoring failures.
    fn release_all(&mut self);
}

/// One step of a reboot plan: apply the action, then wait `hold_for`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RebootStep {
    pub line: PowerLine,
    pub action: PowerAction,
    pub hold_for: Duration,
}

impl RebootStep {
    #[must_use]
    pub const fn new(line: PowerLine, action: PowerAction, hold_for: Duration) -> Self {
        Self {
            line,
            action,
            hold_for,
        }
    }
}

/// Ordered power-cycle plan derived from the configured delays.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RebootPlan {
    steps: [RebootStep; REBOOT_STEPS],
}

impl RebootPlan {
    /// Builds the plan: modem off, router off, `reboot_delay`, modem on,
    /// `router_delay`, router on.
    #[must_use]
    pub const fn new(reboot_delay: Duration, router_delay: Duration) -> Self {
        Self {
            steps: [
                RebootStep::new(PowerLine::Modem, PowerAction::Off, Duration::ZERO),
                RebootStep::new(PowerLine::Router, PowerAction::Off, reboot_delay),
                RebootStep::new(PowerLine::Modem, PowerAction::On, router_delay),
                RebootStep::new(PowerLine::Router, PowerAction::On, Duration::ZERO),
            ],
        }
    }

    #[must_use]
    pub const fn steps(&self) -> &[RebootStep] {
        &self.steps
    }

    /// Sum of every wait in the plan.
    #[must_use]
    pub fn total_duration(&self) -> Duration {
        self.steps
            .iter()
            .fold(Duration::ZERO, |acc, step| acc.saturating_add(step.hold_for))
    }
}

/// A step whose power operation failed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StepFailure {
    pub step: RebootStep,
    pub error: PowerError,
}

/// Outcome of one executed plan.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SequenceReport {
    pub applied: usize,
    pub failures: Vec<StepFailure, REBOOT_STEPS>,
    pub waited: Duration,
}

impl SequenceReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs `plan` against `driver`, waiting on `delay` between steps.
///
/// Power failures do not abort the plan; every step is attempted and the
/// failures are collected in the returned report.
pub async fn execute<P, D>(plan: &RebootPlan, driver: &mut P, delay: &mut D) -> SequenceReport
where
    P: PowerDriver,
    D: DelayNs,
{
    let mut report = SequenceReport::default();

    for step in plan.steps() {
        match driver.apply(step.line, step.action) {
            Ok(()) => report.applied += 1,
            Err(error) => {
                // Capacity equals the step count.
                let _ = report.failures.push(StepFailure { step: *step, error });
            }
        }

        if !step.hold_for.is_zero() {
            wait(delay, step.hold_for).await;
            report.waited = report.waited.saturating_add(step.hold_for);
        }
    }

    report
}

async fn wait<D: DelayNs>(delay: &mut D, duration: Duration) {
    let mut remaining = duration.as_millis();
    while remaining > 0 {
        let chunk = u32::try_from(remaining).unwrap_or(u32::MAX);
        delay.delay_ms(chunk).await;
        remaining -= u128::from(chunk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[derive(Default)]
    struct RecordingDriver {
        log: Vec<(PowerLine, PowerAction), 8>,
        fail_on: Option<(PowerLine, PowerAction)>,
        released: bool,
    }

    impl PowerDriver for RecordingDriver {
        fn apply(&mut self, line: PowerLine, action: PowerAction) -> Result<(), PowerError> {
            self.log.push((line, action)).expect("log capacity");
            if self.fail_on == Some((line, action)) {
                Err(PowerError::WriteFailed)
            } else {
                Ok(())
            }
        }

        fn release_all(&mut self) {
            self.released = true;
        }
    }

    #[derive(Default)]
    struct RecordingDelay {
        waits_ms: Vec<u32, 8>,
    }

    impl DelayNs for RecordingDelay {
        async fn delay_ns(&mut self, ns: u32) {
            self.waits_ms.push(ns / 1_000_000).expect("wait capacity");
        }

        async fn delay_ms(&mut self, ms: u32) {
            self.waits_ms.push(ms).expect("wait capacity");
        }
    }

    #[test]
    fn plan_orders_steps_and_delays() {
        let plan = RebootPlan::new(Duration::from_secs(30), Duration::from_secs(60));
        let steps = plan.steps();

        assert_eq!(steps.len(), REBOOT_STEPS);
        assert_eq!((steps[0].line, steps[0].action), (PowerLine::Modem, PowerAction::Off));
        assert_eq!((steps[1].line, steps[1].action), (PowerLine::Router, PowerAction::Off));
        assert_eq!(steps[1].hold_for, Duration::from_secs(30));
        assert_eq!((steps[2].line, steps[2].action), (PowerLine::Modem, PowerAction::On));
        assert_eq!(steps[2].hold_for, Duration::from_secs(60));
        assert_eq!((steps[3].line, steps[3].action), (PowerLine::Router, PowerAction::On));
        assert_eq!(plan.total_duration(), Duration::from_secs(90));
    }

    #[test]
    fn execute_applies_every_step_in_order() {
        let plan = RebootPlan::new(Duration::from_secs(2), Duration::from_secs(3));
        let mut driver = RecordingDriver::default();
        let mut delay = RecordingDelay::default();

        let report = block_on(execute(&plan, &mut driver, &mut delay));

        assert!(report.is_clean());
        assert_eq!(report.applied, 4);
        assert_eq!(report.waited, Duration::from_secs(5));
        assert_eq!(
            driver.log.as_slice(),
            &[
                (PowerLine::Modem, PowerAction::Off),
                (PowerLine::Router, PowerAction::Off),
                (PowerLine::Modem, PowerAction::On),
                (PowerLine::Router, PowerAction::On),
            ]
        );
        assert_eq!(delay.waits_ms.as_slice(), &[2_000, 3_000]);
        assert!(!driver.released);
    }

    #[test]
    fn execute_continues_after_a_failed_step() {
        let plan = RebootPlan::new(Duration::from_secs(1), Duration::from_secs(1));
        let mut driver = RecordingDriver {
            fail_on: Some((PowerLine::Modem, PowerAction::On)),
            ..RecordingDriver::default()
        };
        let mut delay = RecordingDelay::default();

        let report = block_on(execute(&plan, &mut driver, &mut delay));

        assert_eq!(report.applied, 3);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].step.line, PowerLine::Modem);
        assert_eq!(report.failures[0].error, PowerError::WriteFailed);
        assert_eq!(driver.log.len(), 4, "router still powered back on");
    }

    #[test]
    fn zero_delays_skip_waiting() {
        let plan = RebootPlan::new(Duration::ZERO, Duration::ZERO);
        let mut driver = RecordingDriver::default();
        let mut delay = RecordingDelay::default();

        let report = block_on(execute(&plan, &mut driver, &mut delay));

        assert_eq!(report.applied, 4);
        assert!(delay.waits_ms.is_empty());
        assert_eq!(report.waited, Duration::ZERO);
    }
}
