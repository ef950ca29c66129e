//! Executor wiring.
//!
//! One [`Context`] is built at start-up and shared by every task. The machine
//! task is the only consumer of the event channel; the sampler, the button
//! poller, and the warn timer are its producers. Indicator and buzzer tasks
//! own the output patterns and take their orders through signals.

use core::cell::RefCell;
use core::convert::Infallible;

use embassy_executor::Executor;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use linux_embedded_hal::CdevPin;
use rebooter_core::config::RebooterConfig;
use rebooter_core::machine::{IndicatorCommand, IndicatorRole, OperatingState, RebooterEvent};
use rebooter_core::timer::{ArmedTimer, WarnTimerToken};
use static_cell::StaticCell;
use tracing::info;

use crate::clock::MonotonicInstant;
use crate::error::DaemonError;
use crate::hw::{Hardware, Panel};
use crate::measure::{MeasureSignal, MeasurementWorker, SpeedTestCommand};
use crate::notify::Notifications;
use crate::settings::Settings;
use crate::status::StatusBoard;

mod button_task;
mod buzzer_task;
mod indicator_task;
mod machine_task;
mod sampling_task;
mod timer_task;

/// Depth of the machine's event queue.
pub const EVENT_QUEUE_DEPTH: usize = 8;

pub type Events = Channel<CriticalSectionRawMutex, RebooterEvent, EVENT_QUEUE_DEPTH>;
pub type SharedPanel<P> = Mutex<CriticalSectionRawMutex, RefCell<Panel<P>>>;

/// Orders for the warn-timer task.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TimerCommand {
    Arm(ArmedTimer<MonotonicInstant>),
    Cancel(WarnTimerToken),
}

/// Generic over the panel's pin type so the tasks can run against recording
/// pins.
pub struct Context<P = CdevPin> {
    pub config: RebooterConfig,
    pub events: Events,
    pub timer: Signal<CriticalSectionRawMutex, TimerCommand>,
    /// Indexed by [`IndicatorRole::as_index`].
    pub indicators: [Signal<CriticalSectionRawMutex, IndicatorCommand>; 3],
    /// `true` starts the alert, `false` silences it.
    pub buzzer: Signal<CriticalSectionRawMutex, bool>,
    pub shutdown: Signal<CriticalSectionRawMutex, ()>,
    /// State after the machine applied the sampler's latest update.
    pub update_applied: Signal<CriticalSectionRawMutex, OperatingState>,
    pub measurements: MeasureSignal,
    pub status: StatusBoard,
    pub panel: SharedPanel<P>,
}

impl<P> Context<P> {
    #[must_use]
    pub fn new(config: RebooterConfig, panel: Panel<P>) -> Self {
        Self {
            config,
            events: Channel::new(),
            timer: Signal::new(),
            indicators: [Signal::new(), Signal::new(), Signal::new()],
            buzzer: Signal::new(),
            shutdown: Signal::new(),
            update_applied: Signal::new(),
            measurements: Signal::new(),
            status: StatusBoard::new(),
            panel: Mutex::new(RefCell::new(panel)),
        }
    }

    #[must_use]
    pub fn indicator(
        &self,
        role: IndicatorRole,
    ) -> &Signal<CriticalSectionRawMutex, IndicatorCommand> {
        &self.indicators[role.as_index()]
    }
}

static CONTEXT: StaticCell<Context> = StaticCell::new();
static EXECUTOR: StaticCell<Executor> = StaticCell::new();

/// Claims the hardware and runs the executor until the process exits.
///
/// # Errors
///
/// Returns [`DaemonError`] when any start-up step fails. Once the executor is
/// running the function never returns.
pub fn run(settings: &Settings) -> Result<Infallible, DaemonError> {
    let source = SpeedTestCommand::from_command_line(&settings.speedtest_command)?;
    let notifier = Notifications::from_settings(settings.notify_command.as_deref());
    let Hardware {
        power,
        panel,
        button,
    } = Hardware::open(settings)?;

    let ctx: &'static Context = CONTEXT.init(Context::new(settings.rebooter, panel));
    let worker =
        MeasurementWorker::spawn(source, &ctx.measurements).map_err(DaemonError::Worker)?;

    let shutdown = &ctx.shutdown;
    ctrlc::set_handler(move || shutdown.signal(()))?;

    info!(
        "daemon: running slow_speed_mbps={} check_interval_s={}",
        ctx.config.slow_speed,
        ctx.config.check_interval.as_secs()
    );

    let executor = EXECUTOR.init(Executor::new());
    executor.run(move |spawner| {
        spawner
            .spawn(machine_task::run(ctx, power, notifier))
            .expect("failed to spawn machine task");
        spawner
            .spawn(timer_task::run(ctx))
            .expect("failed to spawn warn timer task");
        spawner
            .spawn(button_task::run(ctx, button))
            .expect("failed to spawn button task");
        spawner
            .spawn(buzzer_task::run(ctx))
            .expect("failed to spawn buzzer task");
        for role in IndicatorRole::ALL {
            spawner
                .spawn(indicator_task::run(ctx, role))
                .expect("failed to spawn indicator task");
        }
        spawner
            .spawn(sampling_task::run(ctx, worker))
            .expect("failed to spawn sampling task");
    })
}
