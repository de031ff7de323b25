//! Focus timer: wall-clock bookkeeping for the task awaiting an outcome.
//!
//! The clock is injected so tests can drive time explicitly.

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use std::sync::Mutex;

use crate::session::SessionState;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Calendar day used to stamp a new session.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(start) }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.lock();
        *now += by;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
        // A poisoned clock still holds a valid timestamp.
        self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.lock()
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }

    fn today(&self) -> NaiveDate {
        (**self).today()
    }
}

/// Starts and stops the per-session focus timer.
#[derive(Debug, Clone)]
pub struct Timer<C> {
    clock: C,
}

impl<C: Clock> Timer<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Record now as the start. Overwrites a running timer.
    pub fn start(&self, state: &mut SessionState) {
        state.active_timer_start = Some(self.clock.now());
    }

    /// Stop the timer and return whole elapsed minutes.
    ///
    /// Returns 0 when no timer was running. A timer that did run counts at
    /// least one minute.
    pub fn stop(&self, state: &mut SessionState) -> u32 {
        let Some(started) = state.active_timer_start.take() else {
            return 0;
        };
        let elapsed = (self.clock.now() - started).num_seconds().max(0);
        let minutes = u32::try_from(elapsed / 60).unwrap_or(u32::MAX);
        minutes.max(1)
    }
}
