//! Subcommand handlers over one engine session.
//!
//! # Invariants
//! - Every handler works on a `LifeService` opened from the resolved config.
//! - Save failures are printed as warnings; the command still succeeds.

use crate::cli::{Commands, GlobalArgs, NoteCommands, TaskCommands, TxCommands};
use chrono::NaiveDate;
use lifesync_core::recurrence::is_completed_on;
use lifesync_core::{
    core_version, init_logging_from_config, ping, ConfigError, EngineConfig, LifeService,
    NoteDraft, NotePatch, PersistenceGateway, SlotError, SqliteSlot, Task, TaskDraft,
    TransactionDraft, WeekdaySet, WEEK_SPAN_DAYS,
};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub enum CliError {
    Config(ConfigError),
    Storage(SlotError),
    Io { path: PathBuf, source: std::io::Error },
    Rejected(String),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Storage(err) => write!(f, "cannot open storage: {err}"),
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Rejected(message) => write!(f, "{message}"),
        }
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Storage(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::Rejected(_) => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<SlotError> for CliError {
    fn from(value: SlotError) -> Self {
        Self::Storage(value)
    }
}

type Session = LifeService<SqliteSlot>;

/// Resolves config: file or environment, then command-line flags.
pub fn resolve_config(global: &GlobalArgs) -> CliResult<EngineConfig> {
    let mut config = match &global.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::from_env(),
    };
    if let Some(db) = &global.db {
        config.db_path = db.clone();
    }
    if let Some(key) = &global.key {
        config.storage_key = key.clone();
    }
    if let Some(log_dir) = &global.log_dir {
        config.log_dir = Some(log_dir.clone());
    }
    Ok(config)
}

pub fn run(global: &GlobalArgs, command: Commands) -> CliResult<()> {
    if let Commands::Ping = command {
        println!("lifesync_core ping={}", ping());
        println!("lifesync_core version={}", core_version());
        return Ok(());
    }

    let config = resolve_config(global)?;
    if let Err(err) = init_logging_from_config(&config) {
        eprintln!("warning: logging disabled: {err}");
    }
    let mut session = open_session(&config)?;

    match command {
        Commands::Ping => Ok(()),
        Commands::Export { out } => export(&session, out),
        Commands::Import { file } => import(&mut session, file),
        Commands::Reset { yes } => reset(&mut session, yes),
        Commands::Agenda { date, week } => {
            agenda(&session, date, week);
            Ok(())
        }
        Commands::Summary => {
            summary(&session);
            Ok(())
        }
        Commands::Task { command } => task(&mut session, command),
        Commands::Tx { command } => tx(&mut session, command),
        Commands::Note { command } => note(&mut session, command),
    }
}

fn open_session(config: &EngineConfig) -> CliResult<Session> {
    let slot = SqliteSlot::open(&config.db_path)?;
    info!(
        "event=cli_session_open module=cli status=ok db_path={}",
        config.db_path.display()
    );
    Ok(LifeService::open(PersistenceGateway::new(
        slot,
        config.storage_key.clone(),
    )))
}

fn export(session: &Session, out: Option<PathBuf>) -> CliResult<()> {
    let json = session
        .export_snapshot()
        .map_err(|err| CliError::Rejected(err.to_string()))?;
    match out {
        Some(path) => {
            std::fs::write(&path, json).map_err(|source| CliError::Io {
                path: path.clone(),
                source,
            })?;
            println!(
                "Exported {} item(s) to {}",
                session.state().len(),
                path.display()
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn import(session: &mut Session, file: PathBuf) -> CliResult<()> {
    let text = std::fs::read_to_string(&file).map_err(|source| CliError::Io {
        path: file.clone(),
        source,
    })?;
    if !session.import_snapshot(&text) {
        return Err(CliError::Rejected(format!(
            "{} is not a valid backup file; nothing was changed",
            file.display()
        )));
    }
    println!("Imported {} item(s).", session.state().len());
    warn_if_unsaved(session);
    Ok(())
}

fn reset(session: &mut Session, yes: bool) -> CliResult<()> {
    if !yes {
        return Err(CliError::Rejected(
            "refusing to delete all data without --yes".to_string(),
        ));
    }
    session.reset_all();
    println!("All data cleared.");
    warn_if_unsaved(session);
    Ok(())
}

fn agenda(session: &Session, date: Option<NaiveDate>, week: bool) {
    let day = date.unwrap_or_else(|| session.today());
    if week {
        let tasks = lifesync_core::query::tasks_within(session.tasks(), day, WEEK_SPAN_DAYS);
        println!("Week of {day}: {} task(s)", tasks.len());
        for task in tasks {
            print_task(task, day);
        }
        return;
    }

    let tasks = session.agenda(day);
    let progress = session.day_progress(day);
    println!(
        "{day}: {}/{} done",
        progress.completed, progress.scheduled
    );
    for task in tasks {
        print_task(task, day);
    }
}

fn print_task(task: &Task, day: NaiveDate) {
    let mark = if is_completed_on(task, day) { "x" } else { " " };
    let repeat = if task.is_recurring() { " (weekly)" } else { "" };
    println!(
        "[{mark}] {:<6} {}{repeat}  {}",
        task.priority.as_str(),
        task.title,
        task.id
    );
}

fn summary(session: &Session) {
    let today = session.today();
    let progress = session.day_progress(today);
    let finance = session.finance_summary();
    let pinned = session.notes().iter().filter(|note| note.is_pinned).count();

    println!("Tasks:         {}", session.tasks().len());
    println!(
        "Today:         {}/{} done, {} open",
        progress.completed,
        progress.scheduled,
        progress.pending()
    );
    println!("Transactions:  {}", session.transactions().len());
    println!("Income:        {:.2}", finance.income);
    println!("Expense:       {:.2}", finance.expense);
    println!("Balance:       {:.2}", finance.balance);
    println!("Notes:         {} ({pinned} pinned)", session.notes().len());
}

fn task(session: &mut Session, command: TaskCommands) -> CliResult<()> {
    match command {
        TaskCommands::Add {
            title,
            date,
            weekly,
            priority,
            description,
        } => {
            let day = date.unwrap_or_else(|| session.today());
            let mut draft = TaskDraft::new(title, day).priority(priority.into());
            if !weekly.is_empty() {
                draft = draft.weekly(WeekdaySet::from_indices(weekly));
            }
            if let Some(description) = description {
                draft = draft.description(description);
            }
            let id = session.add_task(draft);
            println!("Task created: {id}");
        }
        TaskCommands::Toggle { id, date } => {
            let day = date.unwrap_or_else(|| session.today());
            if session.toggle_task_completion_on(&id, day).is_none() {
                return Err(not_found("task", &id));
            }
            let done = session
                .store()
                .task(&id)
                .is_some_and(|task| is_completed_on(task, day));
            println!("Task {id} {} for {day}", if done { "completed" } else { "reopened" });
        }
        TaskCommands::Delete { id } => {
            if !session.delete_task(&id) {
                return Err(not_found("task", &id));
            }
            println!("Task deleted: {id}");
        }
    }
    warn_if_unsaved(session);
    Ok(())
}

fn tx(session: &mut Session, command: TxCommands) -> CliResult<()> {
    match command {
        TxCommands::Add {
            kind,
            amount,
            date,
            category,
            note,
        } => {
            let day = date.unwrap_or_else(|| session.today());
            let mut draft = TransactionDraft::new(kind.into(), amount, day);
            if let Some(category) = category {
                draft = draft.category(category);
            }
            if let Some(note) = note {
                draft = draft.note(note);
            }
            let id = session
                .add_transaction(draft)
                .ok_or_else(|| CliError::Rejected(format!("invalid amount `{amount}`")))?;
            println!("Transaction recorded: {id}");
        }
        TxCommands::Delete { id } => {
            if !session.delete_transaction(&id) {
                return Err(not_found("transaction", &id));
            }
            println!("Transaction deleted: {id}");
        }
    }
    warn_if_unsaved(session);
    Ok(())
}

fn note(session: &mut Session, command: NoteCommands) -> CliResult<()> {
    match command {
        NoteCommands::Add {
            title,
            content,
            pinned,
        } => {
            let id = session.add_note(NoteDraft::new(title, content).pinned(pinned));
            println!("Note created: {id}");
        }
        NoteCommands::Pin { id, off } => {
            let patch = NotePatch {
                is_pinned: Some(!off),
                ..NotePatch::default()
            };
            if !session.update_note(&id, patch) {
                return Err(not_found("note", &id));
            }
            println!("Note {id} {}", if off { "unpinned" } else { "pinned" });
        }
        NoteCommands::Delete { id } => {
            if !session.delete_note(&id) {
                return Err(not_found("note", &id));
            }
            println!("Note deleted: {id}");
        }
    }
    warn_if_unsaved(session);
    Ok(())
}

fn not_found(kind: &str, id: &str) -> CliError {
    CliError::Rejected(format!("{kind} `{id}` not found"))
}

fn warn_if_unsaved(session: &Session) {
    if let Some(err) = session.last_save_error() {
        eprintln!("warning: change kept for this run but not saved: {err}");
    }
}
