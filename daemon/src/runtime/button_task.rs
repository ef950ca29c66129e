use embassy_time::{Duration, Ticker};
use linux_embedded_hal::CdevPin;
use rebooter_core::button::{ButtonEvent, ButtonMonitor};
use tracing::{info, warn};

use super::Context;
use crate::clock::MonotonicInstant;
use crate::hw::ButtonInput;

/// Sampling period for the button line; well under the debounce window.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[embassy_executor::task]
pub async fn run(ctx: &'static Context, mut button: ButtonInput<CdevPin>) -> ! {
    let mut monitor = ButtonMonitor::<MonotonicInstant>::new(ctx.config.button_timing());
    let mut ticker = Ticker::every(POLL_INTERVAL);
    let mut read_failed = false;

    loop {
        ticker.next().await;

        let pressed = match button.is_pressed() {
            Ok(pressed) => {
                read_failed = false;
                pressed
            }
            Err(kind) => {
                if !read_failed {
                    warn!("button: read failed kind={kind:?}");
                }
                read_failed = true;
                continue;
            }
        };

        let Some(event) = monitor.sample(pressed, MonotonicInstant::now()) else {
            continue;
        };
        match event {
            ButtonEvent::Pressed => info!("button: pressed"),
            ButtonEvent::HeldFor(held) => info!("button: held held_ms={}", held.as_millis()),
        }
        ctx.events.send(event.into()).await;
    }
}
