use core::time::Duration;

use embassy_time::Timer;
use rebooter_core::machine::{OperatingState, RebooterEvent};
use tracing::{debug, info, warn};

use super::Context;
use crate::clock::deadline_after;
use crate::measure::MeasurementWorker;

#[embassy_executor::task]
pub async fn run(ctx: &'static Context, worker: MeasurementWorker) -> ! {
    loop {
        let interval = sample_once(ctx, &worker).await;
        Timer::at(deadline_after(interval)).await;
    }
}

/// Measures, posts the result, and returns the interval that fits the state
/// the update produced. No measurement is taken while rebooting.
pub(super) async fn sample_once<P>(ctx: &Context<P>, worker: &MeasurementWorker) -> Duration {
    let mut state = ctx.status.state();

    if state == OperatingState::Rebooting {
        debug!("sampler: skipped while rebooting");
    } else {
        match worker.measure().await {
            Ok(speed) => {
                info!(
                    "sampler: measured download_mbps={speed} slow_speed_mbps={}",
                    ctx.config.slow_speed
                );
                ctx.update_applied.reset();
                ctx.events.send(RebooterEvent::Update(speed)).await;
                state = ctx.update_applied.wait().await;
            }
            Err(err) => {
                let failures = ctx.status.record_measure_failure();
                warn!("sampler: measurement failed error={err} failures={failures}");
            }
        }
    }

    let interval = ctx.config.sampling_interval(state);
    debug!("sampler: sleeping interval_s={} state={state}", interval.as_secs());
    interval
}
