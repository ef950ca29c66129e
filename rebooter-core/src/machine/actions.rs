//! Side effects requested by the state machine.
//!
//! The machine never touches hardware. Each transition produces an ordered
//! list of [`Action`]s that the runtime applies; a failing actuator is the
//! runtime's problem to log and never rolls a transition back.

use core::time::Duration;

use heapless::Vec;

use crate::Mbps;
use crate::timer::{ArmedTimer, WarnTimerToken};

use super::Transition;

/// Upper bound on actions produced by a single event.
pub const MAX_ACTIONS: usize = 16;

/// The three status LEDs.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IndicatorRole {
    Normal,
    Low,
    Rebooting,
}

impl IndicatorRole {
    pub const ALL: [IndicatorRole; 3] = [
        IndicatorRole::Normal,
        IndicatorRole::Low,
        IndicatorRole::Rebooting,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            IndicatorRole::Normal => "normal",
            IndicatorRole::Low => "slow",
            IndicatorRole::Rebooting => "rebooting",
        }
    }

    #[must_use]
    pub const fn as_index(self) -> usize {
        match self {
            IndicatorRole::Normal => 0,
            IndicatorRole::Low => 1,
            IndicatorRole::Rebooting => 2,
        }
    }
}

/// On/off cadence for a flashing indicator.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FlashPattern {
    pub on: Duration,
    pub off: Duration,
}

impl FlashPattern {
    /// Low indicator while a reboot is pending.
    pub const WARN: Self = Self {
        on: Duration::from_millis(500),
        off: Duration::from_millis(500),
    };

    /// Rebooting indicator while the power cycle runs.
    pub const REBOOT: Self = Self {
        on: Duration::from_millis(1_000),
        off: Duration::from_millis(500),
    };
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IndicatorCommand {
    Off,
    On,
    Flash(FlashPattern),
}

/// Display blink rate.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum BlinkRate {
    #[default]
    Off,
    Slow,
    Fast,
}

/// One side effect, in the order it must be applied.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Action<I> {
    Indicator {
        role: IndicatorRole,
        command: IndicatorCommand,
    },
    /// Start the buzzer tone. The runtime applies the quiet-hours gate.
    BuzzerStart,
    BuzzerStop,
    DisplayBlink(BlinkRate),
    /// Show the most recent measurement with two decimals.
    ShowSpeed(Mbps),
    ArmWarnTimer(ArmedTimer<I>),
    CancelWarnTimer(WarnTimerToken),
    /// Tell the operator a reboot is pending.
    NotifyWarn { speed: Mbps, timeout: Duration },
    /// Power-cycle the modem and router, then report back with
    /// `RebooterMachine::finish_reboot`.
    RunRebootSequence,
}

/// Outcome of feeding one event to the machine.
#[derive(Clone, Debug, PartialEq)]
pub struct Reaction<I> {
    pub transition: Option<Transition>,
    pub actions: Vec<Action<I>, MAX_ACTIONS>,
}

impl<I> Reaction<I> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            transition: None,
            actions: Vec::new(),
        }
    }

    /// `true` when the event changed nothing observable.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transition.is_none() && self.actions.is_empty()
    }

    /// `true` when the host must now run the reboot sequence.
    #[must_use]
    pub fn requests_reboot(&self) -> bool {
        self.actions
            .iter()
            .any(|action| matches!(action, Action::RunRebootSequence))
    }

    pub(super) fn push(&mut self, action: Action<I>) {
        let pushed = self.actions.push(action).is_ok();
        debug_assert!(pushed, "reaction exceeded {MAX_ACTIONS} actions");
    }

    pub(super) fn indicator(&mut self, role: IndicatorRole, command: IndicatorCommand) {
        self.push(Action::Indicator { role, command });
    }
}

impl<I> Default for Reaction<I> {
    fn default() -> Self {
        Self::new()
    }
}
