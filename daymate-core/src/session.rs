//! Session state: round, position and per-task log for one conversation.
//!
//! Pure data. All mutation goes through [`crate::engine::ProgressionEngine`]
//! (and the timer helpers it drives); this module only knows how to describe
//! and check a state.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::InvariantViolation;

/// User's resolution of a presented task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Completed,
    Deferred,
}

/// Which pass over the catalog is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Round {
    /// First pass, full catalog in order.
    #[default]
    Main,
    /// Second pass over tasks deferred in the main round, in deferral order.
    Extra,
}

impl std::fmt::Display for Round {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Round::Main => f.write_str("main"),
            Round::Extra => f.write_str("extra"),
        }
    }
}

/// Log entry for one catalog position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Main-round result. `None` until answered.
    pub first_outcome: Option<Outcome>,
    /// Extra-round result; only ever set when `first_outcome` is `Deferred`.
    pub second_outcome: Option<Outcome>,
    pub main_minutes: u32,
    pub extra_minutes: u32,
}

impl TaskRecord {
    pub fn total_minutes(&self) -> u32 {
        self.main_minutes.saturating_add(self.extra_minutes)
    }
}

/// The task currently waiting for an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Awaiting {
    pub catalog_index: usize,
    pub round: Round,
    /// 1-based position within the round.
    pub position: usize,
    pub total_in_round: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Next catalog index to present in the main round. Equal to the task
    /// count once the main round is exhausted.
    pub next_main_index: usize,
    /// Catalog indices deferred in the main round, in deferral order, unique.
    pub deferred: Vec<usize>,
    pub mode: Round,
    /// Pointer into `deferred` for the extra round.
    pub next_extra_position: usize,
    /// Set while a presented task awaits its outcome.
    pub active_timer_start: Option<DateTime<Utc>>,
    pub records: Vec<TaskRecord>,
    /// Local calendar day the session was begun on.
    #[serde(default)]
    pub started_on: Option<NaiveDate>,
}

impl SessionState {
    /// All records unset, main round, nothing presented yet.
    pub fn fresh(task_count: usize) -> Self {
        Self {
            records: vec![TaskRecord::default(); task_count],
            ..Self::default()
        }
    }

    pub fn task_count(&self) -> usize {
        self.records.len()
    }

    pub fn timer_running(&self) -> bool {
        self.active_timer_start.is_some()
    }

    /// Append `index` to the deferred list unless it is already there.
    pub(crate) fn push_deferred(&mut self, index: usize) {
        if !self.deferred.contains(&index) {
            self.deferred.push(index);
        }
    }

    /// The task awaiting an outcome, if any.
    pub fn awaiting(&self) -> Option<Awaiting> {
        let n = self.task_count();
        match self.mode {
            Round::Main => {
                if self.next_main_index == 0 || self.next_main_index > n {
                    return None;
                }
                // Last main task answered with nothing deferred: timer is off.
                if self.next_main_index == n && !self.timer_running() {
                    return None;
                }
                let idx = self.next_main_index - 1;
                Some(Awaiting {
                    catalog_index: idx,
                    round: Round::Main,
                    position: idx + 1,
                    total_in_round: n,
                })
            }
            Round::Extra => {
                let idx = *self.deferred.get(self.next_extra_position)?;
                Some(Awaiting {
                    catalog_index: idx,
                    round: Round::Extra,
                    position: self.next_extra_position + 1,
                    total_in_round: self.deferred.len(),
                })
            }
        }
    }

    /// True once no further task will be presented today.
    pub fn is_finished(&self) -> bool {
        self.awaiting().is_none() && self.next_main_index >= self.task_count()
    }

    /// Check the structural invariants a persisted state must satisfy.
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        let n = self.task_count();

        if self.next_main_index > n {
            return Err(InvariantViolation::MainIndexOutOfRange {
                index: self.next_main_index,
                task_count: n,
            });
        }

        let mut seen = HashSet::new();
        for &idx in &self.deferred {
            if idx >= n {
                return Err(InvariantViolation::DeferredOutOfRange { index: idx, task_count: n });
            }
            if !seen.insert(idx) {
                return Err(InvariantViolation::DuplicateDeferred { index: idx });
            }
        }

        if self.next_extra_position > self.deferred.len() {
            return Err(InvariantViolation::ExtraPositionOutOfRange {
                position: self.next_extra_position,
                deferred: self.deferred.len(),
            });
        }

        if self.mode == Round::Extra && self.next_main_index != n {
            return Err(InvariantViolation::ExtraBeforeMainExhausted {
                next_main_index: self.next_main_index,
            });
        }

        for (idx, r) in self.records.iter().enumerate() {
            if r.second_outcome.is_some() && r.first_outcome != Some(Outcome::Deferred) {
                return Err(InvariantViolation::SecondOutcomeWithoutDeferral { index: idx });
            }
        }

        // The main round ends either with nothing deferred or by switching
        // to the extra round; it never idles with deferrals queued.
        if self.mode == Round::Main
            && n > 0
            && self.next_main_index == n
            && !self.timer_running()
            && !self.deferred.is_empty()
        {
            return Err(InvariantViolation::ExtraRoundNotEntered {
                deferred: self.deferred.len(),
            });
        }

        // A timer runs exactly while a task awaits its outcome.
        let awaiting = self.awaiting().is_some();
        if awaiting != self.timer_running() {
            return Err(InvariantViolation::TimerOutOfStep {
                running: self.timer_running(),
                awaiting,
            });
        }

        Ok(())
    }
}
