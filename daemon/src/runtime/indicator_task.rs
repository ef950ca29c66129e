use embassy_futures::select::{Either, select};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::Timer;
use rebooter_core::machine::{FlashPattern, IndicatorCommand, IndicatorRole};
use tracing::warn;

use super::Context;
use crate::clock::to_embassy;

type Commands = Signal<CriticalSectionRawMutex, IndicatorCommand>;

#[embassy_executor::task(pool_size = 3)]
pub async fn run(ctx: &'static Context, role: IndicatorRole) -> ! {
    let commands = ctx.indicator(role);
    let mut led = Led {
        ctx,
        role,
        failed: false,
    };
    let mut command = IndicatorCommand::Off;

    loop {
        led.failed = false;
        command = match command {
            IndicatorCommand::Off => {
                led.set(false);
                commands.wait().await
            }
            IndicatorCommand::On => {
                led.set(true);
                commands.wait().await
            }
            IndicatorCommand::Flash(pattern) => led.flash(pattern, commands).await,
        };
    }
}

struct Led {
    ctx: &'static Context,
    role: IndicatorRole,
    /// Set after the first failed write of the current command.
    failed: bool,
}

impl Led {
    fn set(&mut self, lit: bool) {
        let role = self.role;
        let result = self
            .ctx
            .panel
            .lock(|panel| panel.borrow_mut().set_indicator(role, lit));
        if let Err(kind) = result {
            if !self.failed {
                warn!("indicator: write failed role={} kind={kind:?}", role.name());
            }
            self.failed = true;
        }
    }

    /// Flashes until a new command arrives, then returns it.
    async fn flash(&mut self, pattern: FlashPattern, commands: &Commands) -> IndicatorCommand {
        loop {
            self.set(true);
            if let Either::First(next) =
                select(commands.wait(), Timer::after(to_embassy(pattern.on))).await
            {
                return next;
            }

            self.set(false);
            if let Either::First(next) =
                select(commands.wait(), Timer::after(to_embassy(pattern.off))).await
            {
                return next;
            }
        }
    }
}
