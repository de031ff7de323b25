//! Progression engine — the two-round task state machine.
//!
//! Main round: every catalog task once, in order. Tasks deferred there are
//! queued (unique, in deferral order) for a single extra round. A task
//! deferred again in the extra round stays pending; there is no third pass.
//!
//! Every operation works on a copy of the input state and returns the full
//! next state, so callers can persist it before anything becomes visible.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::TaskCatalog;
use crate::error::{EngineError, Result};
use crate::session::{Awaiting, Outcome, Round, SessionState};
use crate::timer::{Clock, Timer};

/// Task handed to the transport for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentedTask {
    pub catalog_index: usize,
    /// 1-based position within the round.
    pub display_position: usize,
    pub total_in_round: usize,
    pub task_text: String,
    pub round: Round,
}

impl PresentedTask {
    pub fn task_ref(&self) -> TaskRef {
        TaskRef {
            catalog_index: self.catalog_index,
            round: self.round,
        }
    }
}

/// Identifies which presentation an outcome answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskRef {
    pub catalog_index: usize,
    pub round: Round,
}

impl From<Awaiting> for TaskRef {
    fn from(a: Awaiting) -> Self {
        Self {
            catalog_index: a.catalog_index,
            round: a.round,
        }
    }
}

/// What the transport should show after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextStep {
    PresentTask(PresentedTask),
    /// Main round exhausted; first deferred task is up.
    EnterExtraRound(PresentedTask),
    Finished,
}

impl NextStep {
    pub fn presented(&self) -> Option<&PresentedTask> {
        match self {
            NextStep::PresentTask(t) | NextStep::EnterExtraRound(t) => Some(t),
            NextStep::Finished => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProgressionEngine<C> {
    catalog: TaskCatalog,
    timer: Timer<C>,
}

impl<C: Clock> ProgressionEngine<C> {
    pub fn new(catalog: TaskCatalog, clock: C) -> Self {
        Self {
            catalog,
            timer: Timer::new(clock),
        }
    }

    pub fn catalog(&self) -> &TaskCatalog {
        &self.catalog
    }

    /// Fresh state for today with the first task presented and timed.
    ///
    /// An empty catalog yields `Finished` and no running timer.
    pub fn begin_day(&self) -> (SessionState, NextStep) {
        let mut state = SessionState::fresh(self.catalog.len());
        state.started_on = Some(self.timer.clock().today());

        if state.task_count() == 0 {
            return (state, NextStep::Finished);
        }

        state.next_main_index = 1;
        self.timer.start(&mut state);
        let step = self.current_step(&state);
        debug!(tasks = state.task_count(), "day begun");
        (state, step)
    }

    /// Re-present whatever awaits an outcome, without touching the state.
    pub fn current_step(&self, state: &SessionState) -> NextStep {
        match state.awaiting() {
            Some(a) => NextStep::PresentTask(self.present(a)),
            None => NextStep::Finished,
        }
    }

    /// Restart the timer for the awaiting task ("I'm starting now").
    pub fn start_task(&self, state: &SessionState) -> (SessionState, NextStep) {
        let mut next = state.clone();
        if next.awaiting().is_some() {
            self.timer.start(&mut next);
        }
        let step = self.current_step(&next);
        (next, step)
    }

    /// Apply an outcome only if it answers the task currently awaiting one.
    ///
    /// A mismatch means the event is a late duplicate; the state is returned
    /// unchanged and the current task is re-presented.
    pub fn record_outcome_for(
        &self,
        state: &SessionState,
        target: TaskRef,
        outcome: Outcome,
    ) -> Result<(SessionState, NextStep)> {
        match state.awaiting() {
            Some(a) if TaskRef::from(a) != target => {
                debug!(?target, awaiting = ?TaskRef::from(a), "ignoring outcome for stale task");
                Ok((state.clone(), self.current_step(state)))
            }
            _ => self.record_outcome(state, outcome),
        }
    }

    /// Record the outcome of the awaiting task and move on.
    pub fn record_outcome(
        &self,
        state: &SessionState,
        outcome: Outcome,
    ) -> Result<(SessionState, NextStep)> {
        match state.mode {
            Round::Main => self.record_main(state, outcome),
            Round::Extra => Ok(self.record_extra(state, outcome)),
        }
    }

    fn record_main(
        &self,
        state: &SessionState,
        outcome: Outcome,
    ) -> Result<(SessionState, NextStep)> {
        let n = state.task_count();

        if state.awaiting().is_none() {
            if state.next_main_index == 0 && n > 0 {
                return Err(EngineError::NothingPresented);
            }
            // Round already over (or empty catalog).
            return Ok((state.clone(), NextStep::Finished));
        }

        let mut next = state.clone();
        let idx = next.next_main_index - 1;

        let minutes = self.timer.stop(&mut next);
        let record = &mut next.records[idx];
        record.main_minutes = record.main_minutes.saturating_add(minutes);
        record.first_outcome = Some(outcome);
        if outcome == Outcome::Deferred {
            next.push_deferred(idx);
        }
        debug!(task = idx, ?outcome, minutes, "main round outcome");

        if next.next_main_index < n {
            next.next_main_index += 1;
            self.timer.start(&mut next);
            let step = self.current_step(&next);
            return Ok((next, step));
        }

        if next.deferred.is_empty() {
            return Ok((next, NextStep::Finished));
        }

        next.mode = Round::Extra;
        next.next_extra_position = 0;
        self.timer.start(&mut next);
        let step = match next.awaiting() {
            Some(a) => NextStep::EnterExtraRound(self.present(a)),
            None => NextStep::Finished,
        };
        debug!(deferred = next.deferred.len(), "entering extra round");
        Ok((next, step))
    }

    fn record_extra(&self, state: &SessionState, outcome: Outcome) -> (SessionState, NextStep) {
        let Some(&task_idx) = state.deferred.get(state.next_extra_position) else {
            return (state.clone(), NextStep::Finished);
        };

        let mut next = state.clone();
        let minutes = self.timer.stop(&mut next);
        if let Some(record) = next.records.get_mut(task_idx) {
            record.extra_minutes = record.extra_minutes.saturating_add(minutes);
            record.second_outcome = Some(outcome);
        }
        debug!(task = task_idx, ?outcome, minutes, "extra round outcome");

        next.next_extra_position += 1;
        if next.next_extra_position < next.deferred.len() {
            self.timer.start(&mut next);
        }
        let step = self.current_step(&next);
        (next, step)
    }

    fn present(&self, a: Awaiting) -> PresentedTask {
        PresentedTask {
            catalog_index: a.catalog_index,
            display_position: a.position,
            total_in_round: a.total_in_round,
            task_text: self.catalog.text(a.catalog_index),
            round: a.round,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::ManualClock;
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::Arc;

    fn engine(tasks: &[&str]) -> (ProgressionEngine<Arc<ManualClock>>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap(),
        ));
        (
            ProgressionEngine::new(TaskCatalog::new(tasks.iter().copied()), clock.clone()),
            clock,
        )
    }

    #[test]
    fn begin_day_presents_first_task_with_timer() {
        let (e, _) = engine(&["a", "b"]);
        let (s, step) = e.begin_day();
        assert_eq!(s.next_main_index, 1);
        assert!(s.timer_running());
        assert_eq!(s.started_on, chrono::NaiveDate::from_ymd_opt(2026, 3, 2));
        let t = step.presented().unwrap();
        assert_eq!(t.catalog_index, 0);
        assert_eq!(t.display_position, 1);
        assert_eq!(t.total_in_round, 2);
        assert_eq!(t.task_text, "a");
        assert_eq!(t.round, Round::Main);
    }

    #[test]
    fn minutes_saturate_on_a_timer_started_ages_ago() {
        let (e, _) = engine(&["a", "b"]);
        let (mut s, _) = e.begin_day();
        s.records[0].main_minutes = 10;
        s.active_timer_start = Some(Utc.with_ymd_and_hms(-200_000, 1, 1, 0, 0, 0).unwrap());

        let (s, _) = e.record_outcome(&s, Outcome::Deferred).unwrap();
        assert_eq!(s.records[0].main_minutes, u32::MAX);
        assert_eq!(s.records[0].total_minutes(), u32::MAX);

        let (mut s, _) = e.record_outcome(&s, Outcome::Completed).unwrap();
        assert_eq!(s.mode, Round::Extra);
        s.records[0].extra_minutes = 10;
        s.active_timer_start = Some(Utc.with_ymd_and_hms(-200_000, 1, 1, 0, 0, 0).unwrap());
        let (s, step) = e.record_outcome(&s, Outcome::Completed).unwrap();
        assert_eq!(step, NextStep::Finished);
        assert_eq!(s.records[0].extra_minutes, u32::MAX);
        assert_eq!(s.records[0].total_minutes(), u32::MAX);
    }

    #[test]
    fn begin_day_with_empty_catalog_is_finished() {
        let (e, _) = engine(&[]);
        let (s, step) = e.begin_day();
        assert_eq!(step, NextStep::Finished);
        assert!(!s.timer_running());
        let (s2, step2) = e.record_outcome(&s, Outcome::Completed).unwrap();
        assert_eq!(step2, NextStep::Finished);
        assert_eq!(s2, s);
    }

    #[test]
    fn outcome_before_any_presentation_is_rejected() {
        let (e, _) = engine(&["a"]);
        let s = SessionState::fresh(1);
        assert!(matches!(
            e.record_outcome(&s, Outcome::Completed),
            Err(EngineError::NothingPresented)
        ));
    }

    #[test]
    fn main_outcome_accumulates_minutes_and_advances() {
        let (e, clock) = engine(&["a", "b"]);
        let (s, _) = e.begin_day();
        clock.advance(Duration::minutes(12));
        let (s, step) = e.record_outcome(&s, Outcome::Completed).unwrap();
        assert_eq!(s.records[0].main_minutes, 12);
        assert_eq!(s.records[0].first_outcome, Some(Outcome::Completed));
        assert_eq!(s.next_main_index, 2);
        assert_eq!(step.presented().unwrap().catalog_index, 1);
        assert_eq!(s.active_timer_start, Some(clock.now()));
    }

    #[test]
    fn all_completed_finishes_without_extra_round() {
        let (e, _) = engine(&["a", "b", "c"]);
        let (mut s, _) = e.begin_day();
        let mut last = None;
        for _ in 0..3 {
            let (ns, step) = e.record_outcome(&s, Outcome::Completed).unwrap();
            s = ns;
            last = Some(step);
        }
        assert_eq!(last, Some(NextStep::Finished));
        assert_eq!(s.mode, Round::Main);
        assert!(!s.timer_running());
        assert!(s.is_finished());
    }

    #[test]
    fn last_main_deferral_enters_extra_round() {
        let (e, _) = engine(&["a", "b"]);
        let (s, _) = e.begin_day();
        let (s, _) = e.record_outcome(&s, Outcome::Completed).unwrap();
        let (s, step) = e.record_outcome(&s, Outcome::Deferred).unwrap();
        assert_eq!(s.mode, Round::Extra);
        assert_eq!(s.deferred, vec![1]);
        assert!(s.timer_running());
        match step {
            NextStep::EnterExtraRound(t) => {
                assert_eq!(t.catalog_index, 1);
                assert_eq!(t.display_position, 1);
                assert_eq!(t.total_in_round, 1);
                assert_eq!(t.round, Round::Extra);
            }
            other => panic!("expected extra round, got {other:?}"),
        }
    }

    #[test]
    fn extra_round_redeferral_is_final() {
        let (e, _) = engine(&["a"]);
        let (s, _) = e.begin_day();
        let (s, _) = e.record_outcome(&s, Outcome::Deferred).unwrap();
        let (s, step) = e.record_outcome(&s, Outcome::Deferred).unwrap();
        assert_eq!(step, NextStep::Finished);
        assert_eq!(s.records[0].second_outcome, Some(Outcome::Deferred));
        assert_eq!(s.next_extra_position, 1);
        assert!(!s.timer_running());

        // Stray outcome after the extra round: nothing changes.
        let (s2, step2) = e.record_outcome(&s, Outcome::Completed).unwrap();
        assert_eq!(step2, NextStep::Finished);
        assert_eq!(s2, s);
    }

    #[test]
    fn stray_outcome_after_main_round_finished_is_ignored() {
        let (e, _) = engine(&["a"]);
        let (s, _) = e.begin_day();
        let (s, _) = e.record_outcome(&s, Outcome::Completed).unwrap();
        let (s2, step) = e.record_outcome(&s, Outcome::Deferred).unwrap();
        assert_eq!(step, NextStep::Finished);
        assert_eq!(s2, s);
        assert!(s2.deferred.is_empty());
    }

    #[test]
    fn targeted_duplicate_does_not_touch_next_task() {
        let (e, clock) = engine(&["a", "b", "c"]);
        let (s, first) = e.begin_day();
        let target = first.presented().unwrap().task_ref();

        clock.advance(Duration::minutes(5));
        let (s, _) = e.record_outcome_for(&s, target, Outcome::Completed).unwrap();
        clock.advance(Duration::minutes(2));
        let (dup, step) = e.record_outcome_for(&s, target, Outcome::Completed).unwrap();

        assert_eq!(dup, s);
        assert_eq!(dup.next_main_index, 2);
        assert_eq!(dup.records[1].main_minutes, 0);
        assert_eq!(dup.records[0].main_minutes, 5);
        assert_eq!(step.presented().unwrap().catalog_index, 1);
    }

    #[test]
    fn main_round_ref_does_not_answer_extra_round_presentation() {
        let (e, _) = engine(&["a"]);
        let (s, first) = e.begin_day();
        let main_ref = first.presented().unwrap().task_ref();
        let (s, _) = e.record_outcome_for(&s, main_ref, Outcome::Deferred).unwrap();
        assert_eq!(s.mode, Round::Extra);

        let (s2, step) = e.record_outcome_for(&s, main_ref, Outcome::Completed).unwrap();
        assert_eq!(s2, s);
        assert_eq!(step.presented().unwrap().round, Round::Extra);
    }

    #[test]
    fn start_task_restarts_timer_only_when_awaiting() {
        let (e, clock) = engine(&["a"]);
        let (s, _) = e.begin_day();
        clock.advance(Duration::minutes(40));
        let (s, _) = e.start_task(&s);
        clock.advance(Duration::minutes(6));
        let (s, _) = e.record_outcome(&s, Outcome::Completed).unwrap();
        assert_eq!(s.records[0].main_minutes, 6);

        let (s2, step) = e.start_task(&s);
        assert_eq!(step, NextStep::Finished);
        assert!(!s2.timer_running());
    }

    #[test]
    fn input_state_is_never_mutated() {
        let (e, clock) = engine(&["a", "b"]);
        let (s, _) = e.begin_day();
        let before = s.clone();
        clock.advance(Duration::minutes(3));
        let _ = e.record_outcome(&s, Outcome::Deferred).unwrap();
        assert_eq!(s, before);
    }
}
