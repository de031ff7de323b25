//! Task catalog: the fixed, ordered checklist for one day.

use serde::{Deserialize, Serialize};

/// Ordered, read-only list of task descriptions.
///
/// Indices are stable for the lifetime of a day; the session state refers to
/// tasks only by position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskCatalog {
    tasks: Vec<String>,
}

impl TaskCatalog {
    pub fn new<I, S>(tasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tasks: tasks.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.tasks.get(index).map(String::as_str)
    }

    /// Text for `index`, or a placeholder when a persisted state outlived a
    /// shorter catalog.
    pub fn text(&self, index: usize) -> String {
        self.get(index)
            .map(str::to_string)
            .unwrap_or_else(|| format!("(task #{})", index + 1))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(String::as_str)
    }
}
