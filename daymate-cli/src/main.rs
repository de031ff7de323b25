use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use daymate_core::{DayService, Event, Outcome, SystemClock};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod config;
mod interactive;
mod render;
mod state;
mod worker;

use crate::config::{load_config, Config};
use crate::render::render_reply;
use crate::state::{ensure_daymate_home, JsonFileStore};

#[derive(Parser, Debug)]
#[command(
    name = "daymate",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("DAYMATE_BUILD_SHA"), ")"),
    about = "Daily checklist companion: one task at a time, then a report"
)]
struct Cli {
    /// Session id (defaults to config [session].default_id)
    #[arg(long, global = true)]
    session: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default ~/.daymate/config.toml
    Init,

    /// Begin today's plan from the first task (discards today's progress)
    Today,

    /// Restart the timer: you are actually starting the current task now
    Start,

    /// Mark the current task done
    Done,

    /// Defer the current task to extra time
    Later,

    /// Show today's report
    Summary,

    /// Show the task waiting for an answer
    Status,

    /// List the configured tasks
    Tasks,

    /// Interactive conversation (one-letter commands)
    Chat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = load_config()?;
    init_tracing(&cfg);

    let session_id = cli
        .session
        .clone()
        .unwrap_or_else(|| cfg.session.default_id.clone());

    let event = match cli.command {
        Command::Init => return config::init_config(),
        Command::Tasks => {
            list_tasks(&cfg);
            return Ok(());
        }
        Command::Chat => return run_chat(&cfg, session_id).await,
        Command::Today => Event::BeginDay { session_id },
        Command::Start => Event::StartTask { session_id },
        Command::Done => Event::TaskOutcome {
            session_id,
            outcome: Outcome::Completed,
            task: None,
        },
        Command::Later => Event::TaskOutcome {
            session_id,
            outcome: Outcome::Deferred,
            task: None,
        },
        Command::Summary => Event::RequestSummary { session_id },
        Command::Status => Event::CurrentTask { session_id },
    };

    let mut service = open_service(&cfg)?;
    let reply = service
        .handle(event)
        .context("could not record progress; nothing was changed")?;
    println!("{}", render_reply(&reply));
    Ok(())
}

fn init_tracing(cfg: &Config) {
    let fallback = cfg
        .log
        .filter
        .clone()
        .unwrap_or_else(|| "daymate=info,daymate_core=info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn open_service(cfg: &Config) -> Result<DayService<JsonFileStore, SystemClock>> {
    let home = ensure_daymate_home()?;
    let path = cfg.state_path(&home);
    let store = JsonFileStore::open(&path)
        .with_context(|| format!("open session store {}", path.display()))?;
    debug!(
        path = %store.path().display(),
        sessions = store.session_ids().count(),
        "session store opened"
    );
    Ok(DayService::new(store, cfg.catalog(), SystemClock))
}

async fn run_chat(cfg: &Config, session_id: String) -> Result<()> {
    let service = open_service(cfg)?;
    info!(session_id = %session_id, "starting interactive session");
    let (handle, join) = worker::WorkerHandle::spawn(service);
    interactive::run(handle, session_id).await?;
    join.await.context("event worker panicked")?;
    Ok(())
}

fn list_tasks(cfg: &Config) {
    let catalog = cfg.catalog();
    if catalog.is_empty() {
        println!("No tasks configured. Add them under [day] tasks in config.toml.");
        return;
    }
    for (i, t) in catalog.iter().enumerate() {
        println!("{}. {}", i + 1, t);
    }
}
