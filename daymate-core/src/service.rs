//! Event handling: load a session, run the engine, save, reply.
//!
//! `DayService` is the single owner of its store; `handle` takes `&mut self`
//! so events for a store are processed one at a time. The next state is
//! computed in memory and only becomes visible once the store accepted it.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::catalog::TaskCatalog;
use crate::engine::{NextStep, PresentedTask, ProgressionEngine, TaskRef};
use crate::error::{EngineError, Result, StoreError};
use crate::session::{Outcome, SessionState};
use crate::store::{Lookup, SessionStore};
use crate::summary::{summarize, Report};
use crate::timer::Clock;

/// Inbound event from the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    BeginDay {
        session_id: String,
    },
    /// User actually started the presented task; restarts its timer.
    StartTask {
        session_id: String,
    },
    TaskOutcome {
        session_id: String,
        outcome: Outcome,
        /// Presentation being answered, when the transport knows it.
        #[serde(default)]
        task: Option<TaskRef>,
    },
    RequestSummary {
        session_id: String,
    },
    /// Re-show whatever awaits an outcome.
    CurrentTask {
        session_id: String,
    },
}

impl Event {
    pub fn session_id(&self) -> &str {
        match self {
            Event::BeginDay { session_id }
            | Event::StartTask { session_id }
            | Event::TaskOutcome { session_id, .. }
            | Event::RequestSummary { session_id }
            | Event::CurrentTask { session_id } => session_id,
        }
    }
}

/// Outbound payload for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Presented(PresentedTask),
    ExtraRound(PresentedTask),
    /// No further task today; carries the final report.
    Finished(Report),
    Summary(Report),
    /// No day has been begun for this session.
    NotStarted,
}

pub struct DayService<S, C> {
    store: S,
    engine: ProgressionEngine<C>,
}

impl<S: SessionStore, C: Clock> DayService<S, C> {
    pub fn new(store: S, catalog: TaskCatalog, clock: C) -> Self {
        Self {
            store,
            engine: ProgressionEngine::new(catalog, clock),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn handle(&mut self, event: Event) -> Result<Reply> {
        let session_id = event.session_id().to_string();
        debug!(session_id = %session_id, ?event, "handling event");

        match event {
            Event::BeginDay { .. } => self.begin_day(&session_id),

            Event::StartTask { .. } => match self.load(&session_id)? {
                Lookup::Absent => self.implicit_begin(&session_id),
                Lookup::Found(state) => {
                    let (next, step) = self.engine.start_task(&state);
                    self.commit(&session_id, &state, next, step)
                }
            },

            Event::TaskOutcome { outcome, task, .. } => match self.load(&session_id)? {
                Lookup::Absent => self.implicit_begin(&session_id),
                Lookup::Found(state) => {
                    let (next, step) = match task {
                        Some(target) => self.engine.record_outcome_for(&state, target, outcome)?,
                        None => self.engine.record_outcome(&state, outcome)?,
                    };
                    if next == state && step == NextStep::Finished {
                        debug!(session_id = %session_id, "outcome arrived after the day finished");
                    }
                    self.commit(&session_id, &state, next, step)
                }
            },

            Event::RequestSummary { .. } => {
                let state = match self.load(&session_id)? {
                    Lookup::Found(state) => state,
                    Lookup::Absent => SessionState::fresh(self.engine.catalog().len()),
                };
                Ok(Reply::Summary(summarize(&state, self.engine.catalog())))
            }

            Event::CurrentTask { .. } => match self.load(&session_id)? {
                Lookup::Absent => Ok(Reply::NotStarted),
                Lookup::Found(state) => {
                    let step = self.engine.current_step(&state);
                    Ok(self.reply(&state, step))
                }
            },
        }
    }

    fn begin_day(&mut self, session_id: &str) -> Result<Reply> {
        let (state, step) = self.engine.begin_day();
        self.persist(session_id, &state)?;
        info!(session_id, tasks = state.task_count(), "day begun");
        Ok(self.reply(&state, step))
    }

    /// An event for a session nobody began: start the day instead of failing.
    /// The event itself answered nothing the user had seen, so it is dropped.
    fn implicit_begin(&mut self, session_id: &str) -> Result<Reply> {
        warn!(session_id, "no active session; beginning the day implicitly");
        self.begin_day(session_id)
    }

    fn load(&self, session_id: &str) -> Result<Lookup> {
        let lookup = self.store.load(session_id).map_err(|source| EngineError::Load {
            session_id: session_id.to_string(),
            source,
        })?;

        if let Lookup::Found(state) = &lookup {
            state.validate().map_err(|violation| EngineError::Load {
                session_id: session_id.to_string(),
                source: StoreError::Corrupt {
                    session_id: session_id.to_string(),
                    violation,
                },
            })?;
        }
        Ok(lookup)
    }

    /// Save `next` when it differs from `prev`, then build the reply.
    fn commit(
        &mut self,
        session_id: &str,
        prev: &SessionState,
        next: SessionState,
        step: NextStep,
    ) -> Result<Reply> {
        if next != *prev {
            self.persist(session_id, &next)?;
        }
        match &step {
            NextStep::EnterExtraRound(_) => {
                info!(session_id, deferred = next.deferred.len(), "extra round started")
            }
            NextStep::Finished if !prev.is_finished() => info!(session_id, "day finished"),
            _ => {}
        }
        Ok(self.reply(&next, step))
    }

    fn persist(&mut self, session_id: &str, state: &SessionState) -> Result<()> {
        self.store.save(session_id, state).map_err(|source| {
            error!(session_id, error = %source, "failed to save session");
            EngineError::Persistence {
                session_id: session_id.to_string(),
                source,
            }
        })
    }

    fn reply(&self, state: &SessionState, step: NextStep) -> Reply {
        match step {
            NextStep::PresentTask(t) => Reply::Presented(t),
            NextStep::EnterExtraRound(t) => Reply::ExtraRound(t),
            NextStep::Finished => Reply::Finished(summarize(state, self.engine.catalog())),
        }
    }
}
