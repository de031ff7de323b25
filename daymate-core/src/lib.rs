//! daymate-core: task progression, timing and reporting for the daily checklist

pub mod catalog;
pub mod engine;
pub mod error;
pub mod service;
pub mod session;
pub mod store;
pub mod summary;
pub mod timer;

pub use catalog::TaskCatalog;
pub use engine::{NextStep, PresentedTask, ProgressionEngine, TaskRef};
pub use error::{EngineError, InvariantViolation, StoreError};
pub use service::{DayService, Event, Reply};
pub use session::{Awaiting, Outcome, Round, SessionState, TaskRecord};
pub use store::{Lookup, MemoryStore, SessionStore};
pub use summary::{summarize, Report, ReportItem};
pub use timer::{Clock, ManualClock, SystemClock, Timer};
