use core::ops::Add;
use core::time::Duration;

use rebooter_core::Mbps;
use rebooter_core::machine::{
    Action, IndicatorCommand, IndicatorRole, OperatingState, RebooterEvent, RebooterMachine,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct MockInstant(u64);

impl Add<Duration> for MockInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0 + u64::try_from(rhs.as_millis()).unwrap_or(u64::MAX))
    }
}

const THRESHOLD: f32 = 10.0;

fn fresh_machine() -> RebooterMachine<MockInstant> {
    let mut machine = RebooterMachine::new(Mbps::new(THRESHOLD), Duration::from_secs(30));
    let _ = machine.start(MockInstant(0));
    machine
}

fn update(machine: &mut RebooterMachine<MockInstant>, speed: f32, at: u64) {
    let _ = machine.handle(RebooterEvent::Update(Mbps::new(speed)), MockInstant(at));
}

fn side_effects(actions: &[Action<MockInstant>]) -> usize {
    actions
        .iter()
        .filter(|action| !matches!(action, Action::ShowSpeed(_)))
        .count()
}

#[test]
fn state_is_normal_iff_latest_speed_meets_threshold() {
    let speeds = [
        12.0, 3.0, 11.0, 9.9, 10.0, 1.0, 2.0, 50.0, 0.0, 9.0, 10.5, 7.0, 7.0, 20.0,
    ];
    let mut machine = fresh_machine();

    for (index, speed) in speeds.into_iter().enumerate() {
        update(&mut machine, speed, index as u64 * 1_000);
        assert_eq!(
            machine.state() == OperatingState::Normal,
            speed >= THRESHOLD,
            "after speed {speed}"
        );
        assert_eq!(machine.can_go_low(), speed < THRESHOLD);
    }
}

#[test]
fn repeated_qualifying_updates_do_not_flicker() {
    let mut machine = fresh_machine();
    for at in 0..5 {
        let reaction = machine.handle(RebooterEvent::Update(Mbps::new(40.0)), MockInstant(at));
        assert!(reaction.transition.is_none());
        assert_eq!(side_effects(&reaction.actions), 0);
    }

    update(&mut machine, 1.0, 10);
    update(&mut machine, 1.0, 20);
    let armed = machine.warn_timer().armed().expect("armed");
    for at in 30..35 {
        let reaction = machine.handle(RebooterEvent::Update(Mbps::new(1.0)), MockInstant(at));
        assert!(reaction.transition.is_none());
        assert_eq!(side_effects(&reaction.actions), 0);
    }
    assert_eq!(machine.warn_timer().armed(), Some(armed), "timer not re-armed");
}

#[test]
fn warn_state_has_exactly_three_exits() {
    let enter_warn = || {
        let mut machine = fresh_machine();
        update(&mut machine, 1.0, 0);
        update(&mut machine, 1.0, 1);
        assert_eq!(machine.state(), OperatingState::WarnReboot);
        machine
    };

    let mut machine = enter_warn();
    let _ = machine.handle(RebooterEvent::ButtonPressed, MockInstant(2));
    assert_eq!(machine.state(), OperatingState::Normal);

    let mut machine = enter_warn();
    update(&mut machine, 25.0, 2);
    assert_eq!(machine.state(), OperatingState::Normal);

    let mut machine = enter_warn();
    let token = machine.warn_timer().armed().expect("armed").token;
    let _ = machine.handle(RebooterEvent::WarnTimerExpired(token), MockInstant(30_001));
    assert_eq!(machine.state(), OperatingState::Rebooting);

    // Nothing else leaves the warning state.
    let mut machine = enter_warn();
    let reaction = machine.handle(RebooterEvent::ButtonHeld, MockInstant(2));
    assert!(reaction.is_empty());
    update(&mut machine, 0.5, 3);
    assert_eq!(machine.state(), OperatingState::WarnReboot);
}

#[test]
fn held_button_bypasses_the_speed_guard() {
    let mut machine = fresh_machine();
    update(&mut machine, 99.0, 0);
    let _ = machine.handle(RebooterEvent::ButtonHeld, MockInstant(1));
    assert_eq!(machine.state(), OperatingState::Rebooting);

    let mut machine = fresh_machine();
    update(&mut machine, 1.0, 0);
    assert_eq!(machine.state(), OperatingState::Low);
    let reaction = machine.handle(RebooterEvent::ButtonHeld, MockInstant(1));
    assert_eq!(machine.state(), OperatingState::Rebooting);
    assert!(reaction.actions.contains(&Action::Indicator {
        role: IndicatorRole::Low,
        command: IndicatorCommand::Off,
    }));
    assert!(reaction.requests_reboot());
}

#[test]
fn invalid_triggers_are_silently_ignored() {
    let mut machine = fresh_machine();
    let reaction = machine.handle(RebooterEvent::ButtonPressed, MockInstant(0));
    assert!(reaction.is_empty());
    assert_eq!(machine.state(), OperatingState::Normal);

    let _ = machine.handle(RebooterEvent::ButtonHeld, MockInstant(1));
    assert_eq!(machine.state(), OperatingState::Rebooting);
    for event in [
        RebooterEvent::ButtonPressed,
        RebooterEvent::ButtonHeld,
        RebooterEvent::Update(Mbps::new(100.0)),
    ] {
        let reaction = machine.handle(event, MockInstant(2));
        assert!(reaction.transition.is_none());
        assert_eq!(machine.state(), OperatingState::Rebooting);
    }
    assert_eq!(machine.last_speed(), Mbps::new(100.0), "update still stored");
}
