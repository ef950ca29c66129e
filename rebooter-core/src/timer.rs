//! Warn-timer bookkeeping shared by the daemon and the emulator.
//!
//! The machine arms the timer when it enters `WarnReboot` and cancels it on
//! every exit. Each arming gets a fresh [`WarnTimerToken`]; the runtime hands
//! the token back with the expiry event so the machine can discard firings
//! that belong to an earlier arming.

use core::ops::Add;
use core::time::Duration;

/// Default delay between entering `WarnReboot` and escalating to a reboot.
pub const DEFAULT_WARN_TIMEOUT: Duration = Duration::from_secs(30);

/// Generation identifier attached to a single arming of the warn timer.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct WarnTimerToken(u32);

impl WarnTimerToken {
    /// Returns the raw generation counter.
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.0
    }
}

/// A pending expiry: which arming it belongs to and when it fires.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ArmedTimer<I> {
    pub token: WarnTimerToken,
    pub deadline: I,
}

/// Single-slot timer with cancel-on-rearm semantics.
#[derive(Clone, Debug)]
pub struct WarnTimer<I> {
    delay: Duration,
    armed: Option<ArmedTimer<I>>,
    next_generation: u32,
}

impl<I> WarnTimer<I>
where
    I: Copy + Ord + Add<Duration, Output = I>,
{
    /// Creates a disarmed timer that fires `delay` after each arming.
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            armed: None,
            next_generation: 0,
        }
    }

    /// Returns the configured expiry delay.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Arms the timer relative to `now`, replacing any pending arming.
    pub fn arm(&mut self, now: I) -> ArmedTimer<I> {
        self.cancel();

        let token = WarnTimerToken(self.next_generation);
        self.next_generation = self.next_generation.wrapping_add(1);

        let armed = ArmedTimer {
            token,
            deadline: now + self.delay,
        };
        self.armed = Some(armed);
        armed
    }

    /// Disarms the timer, returning the arming that was pending, if any.
    ///
    /// Calling this while nothing is armed is a no-op.
    pub fn cancel(&mut self) -> Option<ArmedTimer<I>> {
        self.armed.take()
    }

    /// Returns the pending arming, if any.
    #[must_use]
    pub fn armed(&self) -> Option<ArmedTimer<I>> {
        self.armed
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Returns `true` when `token` identifies the arming that is still pending.
    #[must_use]
    pub fn is_current(&self, token: WarnTimerToken) -> bool {
        self.armed.is_some_and(|armed| armed.token == token)
    }

    /// Returns the pending token once its deadline has passed.
    ///
    /// Polling does not disarm the timer; the machine does that when it
    /// consumes the expiry.
    #[must_use]
    pub fn poll_expired(&self, now: I) -> Option<WarnTimerToken> {
        match self.armed {
            Some(armed) if now >= armed.deadline => Some(armed.token),
            _ => None,
        }
    }
}

impl<I> Default for WarnTimer<I>
where
    I: Copy + Ord + Add<Duration, Output = I>,
{
    fn default() -> Self {
        Self::new(DEFAULT_WARN_TIMEOUT)
    }
}
