use anyhow::{Context, Result};
use daymate_core::{Lookup, SessionState, SessionStore, StoreError};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// `$DAYMATE_HOME`, or `~/.daymate`.
pub fn daymate_home() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("DAYMATE_HOME") {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".daymate"))
}

pub fn ensure_daymate_home() -> Result<PathBuf> {
    let dir = daymate_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

/// Session table kept in one pretty-printed JSON file.
///
/// The whole table is read at open and rewritten on every save. A save goes
/// to a sibling temp file first and is renamed into place; the in-memory
/// table only changes once that succeeded.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    sessions: BTreeMap<String, SessionState>,
}

impl JsonFileStore {
    /// Missing file means no sessions yet. An unreadable file is an error,
    /// never an empty table.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let sessions = if path.exists() {
            let s = fs::read_to_string(&path)?;
            if s.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&s)?
            }
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, sessions })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn session_ids(&self) -> impl Iterator<Item = &str> {
        self.sessions.keys().map(String::as_str)
    }

    fn write(&self, sessions: &BTreeMap<String, SessionState>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(sessions)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SessionStore for JsonFileStore {
    fn load(&self, session_id: &str) -> Result<Lookup, StoreError> {
        Ok(match self.sessions.get(session_id) {
            Some(s) => Lookup::Found(s.clone()),
            None => Lookup::Absent,
        })
    }

    fn save(&mut self, session_id: &str, state: &SessionState) -> Result<(), StoreError> {
        let mut next = self.sessions.clone();
        next.insert(session_id.to_string(), state.clone());
        self.write(&next)?;
        self.sessions = next;
        Ok(())
    }
}
