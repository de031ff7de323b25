//! Summary aggregator: turns a session state into the daily progress report.
//!
//! `summarize` is pure. It can be called mid-day and never touches the timer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::catalog::TaskCatalog;
use crate::session::{Outcome, SessionState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportItem {
    pub catalog_index: usize,
    pub text: String,
    /// Minutes attributed to the task for this bucket; 0 means "not shown".
    pub minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub day: Option<NaiveDate>,
    pub total_tasks: usize,
    pub done_in_main: Vec<ReportItem>,
    pub done_in_extra: Vec<ReportItem>,
    pub pending: Vec<ReportItem>,
    pub count_done: usize,
    pub count_pending: usize,
    /// floor(100 * done / total), 0 for an empty catalog.
    pub completion_percent: u32,
    pub main_minutes: u64,
    pub extra_minutes: u64,
    /// Main plus extra minutes over every task, whatever its outcome.
    pub focus_minutes: u64,
}

impl Report {
    pub fn all_done(&self) -> bool {
        self.pending.is_empty()
    }
}

pub fn summarize(state: &SessionState, catalog: &TaskCatalog) -> Report {
    let mut done_in_main = Vec::new();
    let mut done_in_extra = Vec::new();
    let mut pending = Vec::new();
    let mut main_minutes = 0u64;
    let mut extra_minutes = 0u64;

    for (idx, record) in state.records.iter().enumerate() {
        main_minutes += u64::from(record.main_minutes);
        extra_minutes += u64::from(record.extra_minutes);

        let item = |minutes| ReportItem {
            catalog_index: idx,
            text: catalog.text(idx),
            minutes,
        };

        if record.second_outcome == Some(Outcome::Completed) {
            done_in_extra.push(item(record.extra_minutes));
        } else if record.first_outcome == Some(Outcome::Completed) {
            done_in_main.push(item(record.main_minutes));
        } else {
            pending.push(item(record.total_minutes()));
        }
    }

    let total_tasks = state.task_count();
    let count_done = done_in_main.len() + done_in_extra.len();
    let completion_percent = if total_tasks == 0 {
        0
    } else {
        (100 * count_done / total_tasks) as u32
    };

    Report {
        day: state.started_on,
        total_tasks,
        count_done,
        count_pending: pending.len(),
        completion_percent,
        main_minutes,
        extra_minutes,
        focus_minutes: main_minutes + extra_minutes,
        done_in_main,
        done_in_extra,
        pending,
    }
}

fn write_items(f: &mut fmt::Formatter<'_>, heading: &str, items: &[ReportItem]) -> fmt::Result {
    if items.is_empty() {
        return Ok(());
    }
    writeln!(f, "{heading}")?;
    for item in items {
        if item.minutes > 0 {
            writeln!(f, "- {}  (~{} min)", item.text, item.minutes)?;
        } else {
            writeln!(f, "- {}", item.text)?;
        }
    }
    writeln!(f)
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.day {
            Some(day) => writeln!(f, "Daily report ({})", day.format("%Y-%m-%d"))?,
            None => writeln!(f, "Daily report")?,
        }
        writeln!(f)?;
        writeln!(f, "- Tasks: {}", self.total_tasks)?;
        writeln!(f, "- Done: {}", self.count_done)?;
        if !self.done_in_extra.is_empty() {
            writeln!(f, "  - of which in extra time: {}", self.done_in_extra.len())?;
        }
        writeln!(f, "- Left for later: {}", self.count_pending)?;
        writeln!(f, "- Progress: {}%", self.completion_percent)?;
        writeln!(f, "- Focus time: {} min", self.focus_minutes)?;
        writeln!(f)?;

        write_items(f, "Done in the main round:", &self.done_in_main)?;
        write_items(f, "Done in extra time:", &self.done_in_extra)?;

        if self.all_done() {
            write!(f, "Everything on today's plan is done. Well done!")
        } else {
            write_items(f, "Left for tomorrow:", &self.pending)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::TaskRecord;

    fn record(first: Option<Outcome>, second: Option<Outcome>, main: u32, extra: u32) -> TaskRecord {
        TaskRecord {
            first_outcome: first,
            second_outcome: second,
            main_minutes: main,
            extra_minutes: extra,
        }
    }

    #[test]
    fn empty_catalog_reports_zero() {
        let r = summarize(&SessionState::fresh(0), &TaskCatalog::default());
        assert_eq!(r.total_tasks, 0);
        assert_eq!(r.count_done, 0);
        assert_eq!(r.completion_percent, 0);
        assert!(r.all_done());
    }

    #[test]
    fn buckets_are_disjoint_and_in_catalog_order() {
        let catalog = TaskCatalog::new(["a", "b", "c", "d"]);
        let mut s = SessionState::fresh(4);
        s.records = vec![
            record(Some(Outcome::Deferred), Some(Outcome::Completed), 2, 9),
            record(Some(Outcome::Completed), None, 5, 0),
            record(Some(Outcome::Deferred), Some(Outcome::Deferred), 1, 3),
            record(None, None, 0, 0),
        ];

        let r = summarize(&s, &catalog);
        let idx = |items: &[ReportItem]| items.iter().map(|i| i.catalog_index).collect::<Vec<_>>();
        assert_eq!(idx(&r.done_in_extra), vec![0]);
        assert_eq!(idx(&r.done_in_main), vec![1]);
        assert_eq!(idx(&r.pending), vec![2, 3]);
        assert_eq!(r.count_done, 2);
        assert_eq!(r.count_pending, 2);
        assert_eq!(r.completion_percent, 50);
        assert_eq!(r.done_in_extra[0].minutes, 9);
        assert_eq!(r.pending[0].minutes, 4);
    }

    #[test]
    fn focus_time_counts_deferred_work() {
        let mut s = SessionState::fresh(2);
        s.records[0] = record(Some(Outcome::Deferred), None, 7, 0);
        s.records[1] = record(Some(Outcome::Completed), None, 3, 0);
        let r = summarize(&s, &TaskCatalog::new(["a", "b"]));
        assert_eq!(r.main_minutes, 10);
        assert_eq!(r.focus_minutes, 10);
    }

    #[test]
    fn totals_do_not_overflow_on_huge_records() {
        let half = u32::MAX / 2 + 1;
        let mut s = SessionState::fresh(2);
        s.next_main_index = 2;
        s.records[0] = record(Some(Outcome::Completed), None, half, 0);
        s.records[1] = record(Some(Outcome::Completed), None, half, 0);
        assert!(s.validate().is_ok());

        let r = summarize(&s, &TaskCatalog::new(["a", "b"]));
        assert_eq!(r.main_minutes, 2 * u64::from(half));
        assert_eq!(r.focus_minutes, u64::from(u32::MAX) + 1);
        assert!(r.to_string().contains(&format!("- Focus time: {} min", r.focus_minutes)));
    }

    #[test]
    fn rendering_branches_on_pending() {
        let catalog = TaskCatalog::new(["stretch", "apply"]);
        let mut s = SessionState::fresh(2);
        s.records[0] = record(Some(Outcome::Completed), None, 4, 0);

        let text = summarize(&s, &catalog).to_string();
        assert!(text.contains("Left for tomorrow:"));
        assert!(text.contains("- stretch  (~4 min)"));
        assert!(text.contains("- apply\n"));
        assert!(!text.contains("Well done"));

        s.records[1] = record(Some(Outcome::Completed), None, 0, 0);
        let text = summarize(&s, &catalog).to_string();
        assert!(text.contains("Well done"));
        assert!(!text.contains("Left for tomorrow"));
        assert!(text.contains("- Progress: 100%"));
    }

    #[test]
    fn summarize_is_repeatable() {
        let mut s = SessionState::fresh(2);
        s.records[0] = record(Some(Outcome::Completed), None, 4, 0);
        let catalog = TaskCatalog::new(["a", "b"]);
        assert_eq!(summarize(&s, &catalog), summarize(&s, &catalog));
    }
}
