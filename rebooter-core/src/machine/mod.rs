//! Rebooter state machine.
//!
//! The machine owns the operating state, the most recent measurement, and the
//! warn-timer bookkeeping. Events are applied one at a time through
//! [`RebooterMachine::handle`]; the returned [`Reaction`] lists the side
//! effects in the order exit(old), entry(new). Events with no matching row in
//! the transition table are ignored, and a transition into the current state
//! produces no entry or exit effects.

use core::fmt;
use core::ops::Add;
use core::time::Duration;

use crate::button::ButtonEvent;
use crate::config::RebooterConfig;
use crate::timer::{WarnTimer, WarnTimerToken};

mod actions;
mod history;

pub use actions::{
    Action, BlinkRate, FlashPattern, IndicatorCommand, IndicatorRole, MAX_ACTIONS, Reaction,
};
pub use history::{HISTORY_CAPACITY, TransitionLog, TransitionRecord};

/// Throughput in megabits per second.
#[derive(Copy, Clone, Debug, Default, PartialEq, PartialOrd)]
pub struct Mbps(f32);

impl Mbps {
    #[must_use]
    pub const fn new(value: f32) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn as_f32(self) -> f32 {
        self.0
    }
}

impl fmt::Display for Mbps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum OperatingState {
    #[default]
    Normal,
    Low,
    WarnReboot,
    Rebooting,
}

impl OperatingState {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            OperatingState::Normal => "normal",
            OperatingState::Low => "low",
            OperatingState::WarnReboot => "warn_reboot",
            OperatingState::Rebooting => "rebooting",
        }
    }
}

impl fmt::Display for OperatingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Inputs accepted by [`RebooterMachine::handle`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum RebooterEvent {
    Update(Mbps),
    ButtonPressed,
    ButtonHeld,
    WarnTimerExpired(WarnTimerToken),
}

impl RebooterEvent {
    #[must_use]
    pub const fn trigger(self) -> Trigger {
        match self {
            RebooterEvent::Update(_) => Trigger::Update,
            RebooterEvent::ButtonPressed => Trigger::ButtonPressed,
            RebooterEvent::ButtonHeld => Trigger::ButtonHeld,
            RebooterEvent::WarnTimerExpired(_) => Trigger::WarnTimerExpired,
        }
    }
}

impl From<ButtonEvent> for RebooterEvent {
    fn from(event: ButtonEvent) -> Self {
        match event {
            ButtonEvent::Pressed => RebooterEvent::ButtonPressed,
            ButtonEvent::HeldFor(_) => RebooterEvent::ButtonHeld,
        }
    }
}

/// Payload-free trigger names used by the transition table and history.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Trigger {
    Update,
    ButtonPressed,
    ButtonHeld,
    WarnTimerExpired,
    /// The host finished running the reboot sequence.
    RebootFinished,
}

impl Trigger {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Trigger::Update => "update",
            Trigger::ButtonPressed => "button_pressed",
            Trigger::ButtonHeld => "button_held",
            Trigger::WarnTimerExpired => "warn_expired",
            Trigger::RebootFinished => "reboot_finished",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Transition {
    pub from: OperatingState,
    pub to: OperatingState,
    pub trigger: Trigger,
}

/// Transition table.
///
/// `link_ok` is the `can_go_normal` guard evaluated against the stored
/// measurement; `timer_current` tells whether an expiry belongs to the
/// pending warn-timer arming. Returns `None` when no row matches.
#[must_use]
pub const fn next_state(
    state: OperatingState,
    trigger: Trigger,
    link_ok: bool,
    timer_current: bool,
) -> Option<OperatingState> {
    use OperatingState::{Low, Normal, Rebooting, WarnReboot};

    match (state, trigger) {
        (Normal, Trigger::Update) if !link_ok => Some(Low),
        (Low, Trigger::Update) if !link_ok => Some(WarnReboot),
        (Normal | Low | WarnReboot, Trigger::Update) if link_ok => Some(Normal),
        (WarnReboot, Trigger::WarnTimerExpired) if timer_current => Some(Rebooting),
        (Low | WarnReboot, Trigger::ButtonPressed) => Some(Normal),
        (Normal | Low, Trigger::ButtonHeld) => Some(Rebooting),
        (Rebooting, Trigger::RebootFinished) => Some(Normal),
        _ => None,
    }
}

/// The rebooter state machine, generic over the runtime's instant type.
#[derive(Debug)]
pub struct RebooterMachine<I>
where
    I: Copy,
{
    state: OperatingState,
    slow_speed: Mbps,
    last_speed: Mbps,
    warn_timer: WarnTimer<I>,
    history: TransitionLog<I>,
}

impl<I> RebooterMachine<I>
where
    I: Copy + Ord + Add<Duration, Output = I>,
{
    /// Creates a machine in `Normal` with the stored measurement at the
    /// threshold.
    #[must_use]
    pub const fn new(slow_speed: Mbps, warn_timeout: Duration) -> Self {
        Self {
            state: OperatingState::Normal,
            slow_speed,
            last_speed: slow_speed,
            warn_timer: WarnTimer::new(warn_timeout),
            history: TransitionLog::new(),
        }
    }

    #[must_use]
    pub const fn from_config(config: &RebooterConfig) -> Self {
        Self::new(config.slow_speed, config.warn_timeout)
    }

    #[must_use]
    pub const fn state(&self) -> OperatingState {
        self.state
    }

    #[must_use]
    pub const fn slow_speed(&self) -> Mbps {
        self.slow_speed
    }

    #[must_use]
    pub const fn last_speed(&self) -> Mbps {
        self.last_speed
    }

    #[must_use]
    pub const fn warn_timer(&self) -> &WarnTimer<I> {
        &self.warn_timer
    }

    #[must_use]
    pub const fn history(&self) -> &TransitionLog<I> {
        &self.history
    }

    /// Guard: the stored measurement meets the threshold.
    #[must_use]
    pub fn can_go_normal(&self) -> bool {
        self.last_speed >= self.slow_speed
    }

    #[must_use]
    pub fn can_go_low(&self) -> bool {
        !self.can_go_normal()
    }

    /// Entry effects of the initial `Normal` state, applied once at start-up.
    pub fn start(&mut self, now: I) -> Reaction<I> {
        let mut reaction = Reaction::new();
        self.enter(self.state, now, &mut reaction);
        reaction
    }

    /// Applies one event.
    pub fn handle(&mut self, event: RebooterEvent, now: I) -> Reaction<I> {
        let mut reaction = Reaction::new();

        if let RebooterEvent::Update(speed) = event {
            self.last_speed = speed;
            reaction.push(Action::ShowSpeed(speed));
        }

        let timer_current = match event {
            RebooterEvent::WarnTimerExpired(token) => self.warn_timer.is_current(token),
            _ => false,
        };

        if let Some(target) = next_state(
            self.state,
            event.trigger(),
            self.can_go_normal(),
            timer_current,
        ) {
            self.transition(target, event.trigger(), now, &mut reaction);
        }

        reaction
    }

    /// Reports that the reboot sequence has completed.
    ///
    /// The stored measurement is reset to the threshold so the next sample
    /// decides the state afresh. Outside `Rebooting` this does nothing.
    pub fn finish_reboot(&mut self, now: I) -> Reaction<I> {
        let mut reaction = Reaction::new();
        if let Some(target) = next_state(self.state, Trigger::RebootFinished, true, false) {
            self.last_speed = self.slow_speed;
            self.transition(target, Trigger::RebootFinished, now, &mut reaction);
        }
        reaction
    }

    fn transition(
        &mut self,
        target: OperatingState,
        trigger: Trigger,
        now: I,
        reaction: &mut Reaction<I>,
    ) {
        if target == self.state {
            return;
        }

        let transition = Transition {
            from: self.state,
            to: target,
            trigger,
        };

        self.exit(self.state, reaction);
        self.state = target;
        self.enter(target, now, reaction);

        self.history.record(transition, now);
        reaction.transition = Some(transition);
    }

    fn exit(&mut self, state: OperatingState, reaction: &mut Reaction<I>) {
        match state {
            OperatingState::WarnReboot => {
                if let Some(armed) = self.warn_timer.cancel() {
                    reaction.push(Action::CancelWarnTimer(armed.token));
                }
                reaction.indicator(IndicatorRole::Low, IndicatorCommand::Off);
                reaction.push(Action::BuzzerStop);
            }
            OperatingState::Rebooting => {
                reaction.indicator(IndicatorRole::Rebooting, IndicatorCommand::Off);
                reaction.push(Action::DisplayBlink(BlinkRate::Off));
            }
            OperatingState::Normal | OperatingState::Low => {}
        }
    }

    fn enter(&mut self, state: OperatingState, now: I, reaction: &mut Reaction<I>) {
        match state {
            OperatingState::Normal => {
                reaction.push(Action::BuzzerStop);
                reaction.indicator(IndicatorRole::Low, IndicatorCommand::Off);
                reaction.indicator(IndicatorRole::Rebooting, IndicatorCommand::Off);
                reaction.indicator(IndicatorRole::Normal, IndicatorCommand::On);
                reaction.push(Action::DisplayBlink(BlinkRate::Off));
            }
            OperatingState::Low => {
                reaction.push(Action::BuzzerStop);
                reaction.indicator(IndicatorRole::Normal, IndicatorCommand::Off);
                reaction.indicator(IndicatorRole::Rebooting, IndicatorCommand::Off);
                reaction.indicator(IndicatorRole::Low, IndicatorCommand::On);
                reaction.push(Action::DisplayBlink(BlinkRate::Slow));
            }
            OperatingState::WarnReboot => {
                let armed = self.warn_timer.arm(now);
                reaction.push(Action::ArmWarnTimer(armed));
                reaction.indicator(IndicatorRole::Normal, IndicatorCommand::Off);
                reaction.indicator(IndicatorRole::Rebooting, IndicatorCommand::Off);
                reaction.indicator(
                    IndicatorRole::Low,
                    IndicatorCommand::Flash(FlashPattern::WARN),
                );
                reaction.push(Action::BuzzerStart);
                reaction.push(Action::NotifyWarn {
                    speed: self.last_speed,
                    timeout: self.warn_timer.delay(),
                });
                reaction.push(Action::DisplayBlink(BlinkRate::Fast));
            }
            OperatingState::Rebooting => {
                reaction.indicator(IndicatorRole::Normal, IndicatorCommand::Off);
                reaction.indicator(IndicatorRole::Low, IndicatorCommand::Off);
                reaction.indicator(
                    IndicatorRole::Rebooting,
                    IndicatorCommand::Flash(FlashPattern::REBOOT),
                );
                reaction.push(Action::RunRebootSequence);
            }
        }
    }
}
