#![forbid(unsafe_code)]

//! Debounce and throttle gates for scroll handling.
//!
//! The gate never calls anything itself. [`RateLimiter::on_event`] and
//! [`RateLimiter::on_timer`] report whether the caller should run its handler
//! now; deferred work is represented by a timer scheduled on the host.
//!
//! - **Debounce**: every event restarts the timer; the handler runs once,
//!   `interval` after the last event.
//! - **Throttle**: the handler runs at most once per `interval`. With
//!   `leading` the first event in a window runs immediately; with `trailing`
//!   one call is scheduled for the end of the window. With `leading = false`
//!   the first event only opens the window.

use std::time::Duration;

use crate::config::RateLimitPolicy;
use crate::host::{Scheduler, TimerId};

/// What the caller should do after feeding the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Run the handler now.
    Fire,
    /// A timer is pending; the handler will run when it fires.
    Deferred,
    /// Swallowed without scheduling anything.
    Dropped,
}

#[derive(Debug, Clone)]
pub struct RateLimiter {
    policy: RateLimitPolicy,
    interval: Duration,
    pending: Option<TimerId>,
    /// Start of the current throttle window.
    previous: Option<Duration>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(policy: RateLimitPolicy, interval: Duration) -> Self {
        Self {
            policy,
            interval,
            pending: None,
            previous: None,
        }
    }

    #[must_use]
    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    #[must_use]
    pub fn pending(&self) -> Option<TimerId> {
        self.pending
    }

    /// Feed one raw event.
    pub fn on_event(&mut self, scheduler: &mut impl Scheduler) -> Gate {
        match self.policy {
            RateLimitPolicy::Debounce => {
                if let Some(timer) = self.pending.take() {
                    scheduler.cancel(timer);
                }
                self.pending = Some(scheduler.schedule(self.interval));
                Gate::Deferred
            }
            RateLimitPolicy::Throttle { leading, trailing } => {
                let now = scheduler.now();
                if self.previous.is_none() && !leading {
                    self.previous = Some(now);
                }
                let elapsed = self.previous.map(|prev| now.saturating_sub(prev));
                let window_open = match elapsed {
                    // A clock that went backwards also reopens the window.
                    Some(elapsed) => {
                        elapsed >= self.interval || self.previous.is_some_and(|prev| prev > now)
                    }
                    None => true,
                };
                if window_open {
                    if let Some(timer) = self.pending.take() {
                        scheduler.cancel(timer);
                    }
                    self.previous = Some(now);
                    Gate::Fire
                } else if self.pending.is_some() {
                    Gate::Deferred
                } else if trailing {
                    let remaining = self.interval.saturating_sub(elapsed.unwrap_or_default());
                    self.pending = Some(scheduler.schedule(remaining));
                    Gate::Deferred
                } else {
                    Gate::Dropped
                }
            }
        }
    }

    /// Feed an elapsed timer. Returns `true` when it was this gate's pending
    /// timer and the handler should run.
    pub fn on_timer(&mut self, timer: TimerId, scheduler: &impl Scheduler) -> bool {
        if self.pending != Some(timer) {
            return false;
        }
        self.pending = None;
        if let RateLimitPolicy::Throttle { leading, .. } = self.policy {
            self.previous = if leading { Some(scheduler.now()) } else { None };
        }
        true
    }

    /// Drop any pending invocation.
    pub fn cancel(&mut self, scheduler: &mut impl Scheduler) {
        if let Some(timer) = self.pending.take() {
            scheduler.cancel(timer);
        }
        self.previous = None;
    }
}
