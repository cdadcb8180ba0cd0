//! Cancellable one-shot timers driven by an explicit clock.
//!
//! Scheduling always supersedes whatever was pending. A host event loop
//! that delivers callbacks later can hold the [`TimerToken`] returned by
//! [`Timer::schedule`] and call [`Timer::fire`]; stale tokens are ignored.

use chrono::{DateTime, Duration, Utc};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerToken(u64);

#[derive(Debug, Clone)]
struct Pending<T> {
    token: TimerToken,
    deadline: DateTime<Utc>,
    payload: T,
}

#[derive(Debug, Clone)]
pub struct Timer<T> {
    pending: Option<Pending<T>>,
    next_token: u64,
}

impl<T> Default for Timer<T> {
    fn default() -> Self {
        Self {
            pending: None,
            next_token: 0,
        }
    }
}

impl<T> Timer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, now: DateTime<Utc>, delay: Duration, payload: T) -> TimerToken {
        if self.pending.is_some() {
            trace!("superseding pending timer");
        }
        self.next_token += 1;
        let token = TimerToken(self.next_token);
        self.pending = Some(Pending {
            token,
            deadline: now + delay,
            payload,
        });
        token
    }

    /// Returns true if something was pending.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    /// Fires the pending payload if its deadline has passed.
    pub fn poll(&mut self, now: DateTime<Utc>) -> Option<T> {
        if self.pending.as_ref().is_some_and(|p| p.deadline <= now) {
            return self.pending.take().map(|p| p.payload);
        }
        None
    }

    /// Fires the payload scheduled under `token`, regardless of the clock.
    pub fn fire(&mut self, token: TimerToken) -> Option<T> {
        if self.pending.as_ref().is_some_and(|p| p.token == token) {
            return self.pending.take().map(|p| p.payload);
        }
        trace!(?token, "ignoring stale timer callback");
        None
    }
}
