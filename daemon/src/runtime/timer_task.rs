use embassy_futures::select::{Either, select};
use embassy_time::Timer;
use rebooter_core::machine::RebooterEvent;
use rebooter_core::timer::ArmedTimer;
use tracing::{debug, info};

use super::{Context, TimerCommand};
use crate::clock::MonotonicInstant;

type Pending = Option<ArmedTimer<MonotonicInstant>>;

#[embassy_executor::task]
pub async fn run(ctx: &'static Context) -> ! {
    drive(ctx).await
}

/// Holds at most one deadline and reports it to the machine when it passes.
pub(super) async fn drive<P>(ctx: &Context<P>) -> ! {
    let mut pending: Pending = None;

    loop {
        let Some(armed) = pending else {
            pending = apply(pending, ctx.timer.wait().await);
            continue;
        };

        match select(ctx.timer.wait(), Timer::at(armed.deadline.into_embassy())).await {
            Either::First(command) => pending = apply(pending, command),
            Either::Second(()) => {
                pending = None;
                info!("timer: expired generation={}", armed.token.generation());
                ctx.events
                    .send(RebooterEvent::WarnTimerExpired(armed.token))
                    .await;
            }
        }
    }
}

/// Folds one command into the pending deadline. A cancel only clears the
/// deadline it names.
fn apply(pending: Pending, command: TimerCommand) -> Pending {
    match command {
        TimerCommand::Arm(armed) => {
            debug!("timer: armed generation={}", armed.token.generation());
            Some(armed)
        }
        TimerCommand::Cancel(token) => match pending {
            Some(armed) if armed.token == token => {
                debug!("timer: cancelled generation={}", token.generation());
                None
            }
            other => other,
        },
    }
}
