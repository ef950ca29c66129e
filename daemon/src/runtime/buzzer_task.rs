use embassy_futures::select::{Either, select};
use embassy_time::Timer;
use embedded_hal::digital::OutputPin;
use tracing::{debug, warn};

use super::Context;
use crate::buzzer::ALERT_CADENCE;
use crate::clock::to_embassy;

/// Beeps the buzzer in [`ALERT_CADENCE`] while `Context::buzzer` last said
/// `true`. The quiet-hours gate is applied before the signal is raised.
#[embassy_executor::task]
pub async fn run(ctx: &'static Context) -> ! {
    drive(ctx).await
}

pub(super) async fn drive<P>(ctx: &Context<P>) -> !
where
    P: OutputPin,
{
    loop {
        if !ctx.buzzer.wait().await {
            write(ctx, false);
            continue;
        }

        debug!("buzzer: alert on");
        let mut failed = false;
        'alert: loop {
            for (sounding, hold) in [(true, ALERT_CADENCE.on), (false, ALERT_CADENCE.off)] {
                if !write(ctx, sounding) && !failed {
                    warn!("buzzer: write failed");
                    failed = true;
                }
                match select(ctx.buzzer.wait(), Timer::after(to_embassy(hold))).await {
                    Either::First(false) => break 'alert,
                    Either::First(true) | Either::Second(()) => {}
                }
            }
        }

        write(ctx, false);
        debug!("buzzer: alert off");
    }
}

fn write<P>(ctx: &Context<P>, sounding: bool) -> bool
where
    P: OutputPin,
{
    ctx.panel
        .lock(|panel| panel.borrow_mut().set_buzzer(sounding))
        .is_ok()
}
