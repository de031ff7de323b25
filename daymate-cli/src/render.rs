use daymate_core::{PresentedTask, Reply, Round};

const START_HINT: &str = "Press \"start\" when you actually begin.";

pub fn present_task(task: &PresentedTask) -> String {
    let mut s = String::new();
    if task.round == Round::Extra {
        s.push_str("Extra time - second round\n\n");
    }
    s.push_str(&format!(
        "Task {} of {}:\n{}\n\n{}",
        task.display_position, task.total_in_round, task.task_text, START_HINT
    ));
    s
}

pub fn render_reply(reply: &Reply) -> String {
    match reply {
        Reply::Presented(t) | Reply::ExtraRound(t) => present_task(t),
        Reply::Finished(report) | Reply::Summary(report) => report.to_string(),
        Reply::NotStarted => "No day started yet. Run `daymate today` to begin.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(round: Round) -> PresentedTask {
        PresentedTask {
            catalog_index: 2,
            display_position: 1,
            total_in_round: 2,
            task_text: "Stretch".to_string(),
            round,
        }
    }

    #[test]
    fn main_round_task() {
        let s = present_task(&task(Round::Main));
        assert!(s.starts_with("Task 1 of 2:\nStretch"));
        assert!(!s.contains("Extra time"));
    }

    #[test]
    fn extra_round_task_has_banner() {
        let s = render_reply(&Reply::ExtraRound(task(Round::Extra)));
        assert!(s.starts_with("Extra time - second round"));
        assert!(s.contains("Task 1 of 2:"));
    }
}
