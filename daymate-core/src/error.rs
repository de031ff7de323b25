//! Error types for the daymate core.

/// Session store failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("state encoding error: {0}")]
    Json(#[from] serde_json::Error),

    /// A stored session decoded but breaks a structural invariant.
    #[error("session {session_id} is corrupt: {violation}")]
    Corrupt {
        session_id: String,
        violation: InvariantViolation,
    },

    /// Backend-specific failure that fits none of the above.
    #[error("{0}")]
    Backend(String),
}

/// A broken structural invariant of [`crate::SessionState`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("next main index {index} exceeds task count {task_count}")]
    MainIndexOutOfRange { index: usize, task_count: usize },

    #[error("deferred index {index} exceeds task count {task_count}")]
    DeferredOutOfRange { index: usize, task_count: usize },

    #[error("task {index} deferred more than once")]
    DuplicateDeferred { index: usize },

    #[error("extra position {position} exceeds {deferred} deferred tasks")]
    ExtraPositionOutOfRange { position: usize, deferred: usize },

    #[error("extra round active while main round is at {next_main_index}")]
    ExtraBeforeMainExhausted { next_main_index: usize },

    #[error("task {index} has a second outcome but was never deferred")]
    SecondOutcomeWithoutDeferral { index: usize },

    #[error("timer running: {running}, but a task awaiting an outcome: {awaiting}")]
    TimerOutOfStep { running: bool, awaiting: bool },

    #[error("main round over with {deferred} deferred tasks but extra round not entered")]
    ExtraRoundNotEntered { deferred: usize },
}

/// Failure to apply an event.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Outcome arrived in the main round before any task was presented.
    #[error("no task has been presented in this session")]
    NothingPresented,

    /// The next state could not be saved; the event did not happen.
    #[error("failed to persist session {session_id}: {source}")]
    Persistence {
        session_id: String,
        #[source]
        source: StoreError,
    },

    /// The current state could not be read.
    #[error("failed to load session {session_id}: {source}")]
    Load {
        session_id: String,
        #[source]
        source: StoreError,
    },
}

pub type Result<T> = std::result::Result<T, EngineError>;
