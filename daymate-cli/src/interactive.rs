use anyhow::Result;
use daymate_core::{Event, Outcome, Reply, TaskRef};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use crate::render::render_reply;
use crate::worker::WorkerHandle;

/// One line of user input in the interactive conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Today,
    Start,
    Done,
    Later,
    Report,
    Current,
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Option<Command> {
    let cmd = match line.trim().to_lowercase().as_str() {
        "t" | "today" => Command::Today,
        "s" | "start" => Command::Start,
        "d" | "done" => Command::Done,
        "l" | "later" | "skip" => Command::Later,
        "r" | "report" | "summary" => Command::Report,
        "c" | "current" => Command::Current,
        "h" | "help" | "?" => Command::Help,
        "q" | "quit" | "exit" => Command::Quit,
        _ => return None,
    };
    Some(cmd)
}

const HELP: &str = "Commands: [t]oday  [s]tart  [d]one  [l]ater  [r]eport  [c]urrent  [q]uit";

/// Conversation loop. Outcomes are tagged with the task last shown, so a
/// double-typed answer cannot resolve the following task.
pub async fn run(worker: WorkerHandle, session_id: String) -> Result<()> {
    println!("Daymate - one task at a time.");
    println!("{HELP}\n");

    let mut shown: Option<TaskRef> = None;

    let first = worker
        .send(Event::CurrentTask { session_id: session_id.clone() })
        .await?;
    println!("{}\n", render_reply(&first));
    remember(&mut shown, &first);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = lines.next_line().await? else { break };
        if line.trim().is_empty() {
            continue;
        }
        let Some(cmd) = parse_command(&line) else {
            println!("Unknown command. {HELP}");
            continue;
        };

        let event = match cmd {
            Command::Quit => break,
            Command::Help => {
                println!("{HELP}");
                continue;
            }
            Command::Today => Event::BeginDay { session_id: session_id.clone() },
            Command::Start => Event::StartTask { session_id: session_id.clone() },
            Command::Done | Command::Later => Event::TaskOutcome {
                session_id: session_id.clone(),
                outcome: if cmd == Command::Done { Outcome::Completed } else { Outcome::Deferred },
                task: shown,
            },
            Command::Report => Event::RequestSummary { session_id: session_id.clone() },
            Command::Current => Event::CurrentTask { session_id: session_id.clone() },
        };

        match worker.send(event).await {
            Ok(reply) => {
                println!("{}", reply_text(cmd, shown, &reply));
                remember(&mut shown, &reply);
            }
            Err(e) => {
                warn!(error = %e, "event failed");
                println!("Could not record that: {e:#}. Nothing was changed.");
            }
        }
    }

    Ok(())
}

/// A restart of the task already on screen only needs a confirmation;
/// anything newly presented is shown in full.
fn reply_text(cmd: Command, shown: Option<TaskRef>, reply: &Reply) -> String {
    match reply {
        Reply::Presented(t) if cmd == Command::Start && shown == Some(t.task_ref()) => {
            "Timer started.".to_string()
        }
        _ => format!("{}\n", render_reply(reply)),
    }
}

fn remember(shown: &mut Option<TaskRef>, reply: &Reply) {
    match reply {
        Reply::Presented(t) | Reply::ExtraRound(t) => *shown = Some(t.task_ref()),
        Reply::Finished(_) | Reply::NotStarted => *shown = None,
        Reply::Summary(_) => {}
    }
}
