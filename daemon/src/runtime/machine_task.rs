use std::process;

use embassy_futures::select::{Either, select};
use embassy_time::Delay;
use embedded_hal::digital::OutputPin;
use linux_embedded_hal::CdevPin;
use rebooter_core::machine::{Action, Reaction, RebooterEvent, RebooterMachine};
use rebooter_core::sequence::{PowerDriver, RebootPlan, execute};
use tracing::{debug, info, warn};

use super::{Context, TimerCommand};
use crate::buzzer::BuzzerGate;
use crate::clock::{LocalClock, MonotonicInstant};
use crate::display::{LogDisplay, SpeedDisplay};
use crate::hw::PowerLines;
use crate::notify::{Notifications, Notifier, warn_message};

type Machine = RebooterMachine<MonotonicInstant>;

#[embassy_executor::task]
pub async fn run(
    ctx: &'static Context,
    power: PowerLines<CdevPin>,
    notifier: Notifications,
) -> ! {
    drive(ctx, power, notifier).await
}

/// Sole consumer of the event channel. Applies each reaction, then runs any
/// requested power cycle to completion before taking the next event.
pub(super) async fn drive<P>(
    ctx: &Context<P>,
    power: PowerLines<P>,
    notifier: Notifications,
) -> !
where
    P: OutputPin,
{
    let mut machine = Machine::from_config(&ctx.config);
    let mut host = Host {
        ctx,
        power,
        notifier,
        display: LogDisplay::new(),
        gate: BuzzerGate::new(ctx.config.quiet_hours, LocalClock),
        plan: ctx.config.reboot_plan(),
    };

    let reaction = machine.start(MonotonicInstant::now());
    host.apply(&machine, &reaction);
    info!("machine: started state={}", machine.state());

    loop {
        let event = match select(ctx.events.receive(), ctx.shutdown.wait()).await {
            Either::First(event) => event,
            Either::Second(()) => host.shutdown(),
        };
        debug!("machine: event={event:?} state={}", machine.state());

        let mut reaction = machine.handle(event, MonotonicInstant::now());
        if let RebooterEvent::Update(speed) = event {
            ctx.status.record_speed(speed);
            ctx.update_applied.signal(machine.state());
        }
        host.apply(&machine, &reaction);

        while reaction.requests_reboot() {
            host.reboot().await;
            reaction = machine.finish_reboot(MonotonicInstant::now());
            host.apply(&machine, &reaction);
        }
    }
}

/// Applies the machine's actions to the outside world.
struct Host<'a, P> {
    ctx: &'a Context<P>,
    power: PowerLines<P>,
    notifier: Notifications,
    display: LogDisplay,
    gate: BuzzerGate<LocalClock>,
    plan: RebootPlan,
}

impl<P> Host<'_, P>
where
    P: OutputPin,
{
    fn apply(&mut self, machine: &Machine, reaction: &Reaction<MonotonicInstant>) {
        if let Some(transition) = reaction.transition {
            self.ctx.status.set_state(transition.to);
            info!(
                "machine: transition from={} to={} trigger={} seq={}",
                transition.from,
                transition.to,
                transition.trigger,
                machine.history().total()
            );
        }

        for action in &reaction.actions {
            self.perform(*action);
        }

        if reaction.transition.is_some() {
            info!("machine: status {}", self.ctx.status.snapshot());
        }
    }

    fn perform(&mut self, action: Action<MonotonicInstant>) {
        match action {
            Action::Indicator { role, command } => self.ctx.indicator(role).signal(command),
            Action::BuzzerStart => match self.gate.check() {
                Ok(hour) => {
                    debug!("buzzer: start hour={hour}");
                    self.ctx.buzzer.signal(true);
                }
                Err(hour) => info!(
                    "buzzer: silenced hour={hour} quiet_hours={}",
                    self.gate.quiet_hours()
                ),
            },
            Action::BuzzerStop => self.ctx.buzzer.signal(false),
            Action::DisplayBlink(rate) => self.display.set_blink_rate(rate),
            Action::ShowSpeed(speed) => self.display.show_float(speed.as_f32(), 2),
            Action::ArmWarnTimer(armed) => self.ctx.timer.signal(TimerCommand::Arm(armed)),
            Action::CancelWarnTimer(token) => self.ctx.timer.signal(TimerCommand::Cancel(token)),
            Action::NotifyWarn { speed, timeout } => {
                let (subject, body) = warn_message(speed, timeout);
                self.notifier.send(&subject, &body);
            }
            // Run by the task loop once the whole reaction is applied.
            Action::RunRebootSequence => {}
        }
    }

    async fn reboot(&mut self) {
        info!(
            "reboot: power cycle started expected_s={}",
            self.plan.total_duration().as_secs()
        );

        let mut delay = Delay;
        let outcome = select(
            execute(&self.plan, &mut self.power, &mut delay),
            self.ctx.shutdown.wait(),
        )
        .await;
        let report = match outcome {
            Either::First(report) => report,
            Either::Second(()) => self.shutdown(),
        };

        self.ctx.status.record_reboot(&report);
        if report.is_clean() {
            info!(
                "reboot: power cycle finished steps={} waited_s={}",
                report.applied,
                report.waited.as_secs()
            );
        } else {
            for failure in &report.failures {
                warn!(
                    "reboot: step failed line={} action={} error={}",
                    failure.step.line, failure.step.action, failure.error
                );
            }
            warn!(
                "reboot: power cycle finished with failures steps={} failed={} waited_s={}",
                report.applied,
                report.failures.len(),
                report.waited.as_secs()
            );
        }
    }

    /// Leaves the hardware safe and exits the process.
    fn shutdown(&mut self) -> ! {
        info!("daemon: shutting down");

        let failures = self.ctx.panel.lock(|panel| panel.borrow_mut().all_off());
        if failures > 0 {
            warn!("daemon: panel cleanup failed outputs={failures}");
        }
        self.display.clear();
        self.power.release_all();

        info!("daemon: stopped {}", self.ctx.status.snapshot());
        process::exit(0)
    }
}
