//! Session store contract and an in-memory implementation.

use std::collections::HashMap;

use crate::error::StoreError;
use crate::session::SessionState;

/// Result of looking a session up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(SessionState),
    Absent,
}

impl Lookup {
    pub fn into_option(self) -> Option<SessionState> {
        match self {
            Lookup::Found(s) => Some(s),
            Lookup::Absent => None,
        }
    }
}

/// Durable mapping of session id to state.
///
/// `save` must either persist the whole state or fail without side effects;
/// callers treat a failed save as "the event did not happen".
pub trait SessionStore: Send {
    fn load(&self, session_id: &str) -> Result<Lookup, StoreError>;

    fn save(&mut self, session_id: &str, state: &SessionState) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    sessions: HashMap<String, SessionState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl SessionStore for MemoryStore {
    fn load(&self, session_id: &str) -> Result<Lookup, StoreError> {
        Ok(match self.sessions.get(session_id) {
            Some(s) => Lookup::Found(s.clone()),
            None => Lookup::Absent,
        })
    }

    fn save(&mut self, session_id: &str, state: &SessionState) -> Result<(), StoreError> {
        self.sessions.insert(session_id.to_string(), state.clone());
        Ok(())
    }
}
