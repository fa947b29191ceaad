//! `anagrafe`: terminal patient registry.
//!
//! # Usage
//!
//! ```
//! anagrafe                          # interactive UI
//! anagrafe --store ~/pazienti.db list
//! anagrafe add --nome Mario --cognome Rossi \
//!   --codice-fiscale RSSMRA85T10A562S --numero-cartella C-001
//! anagrafe delete 3
//! anagrafe clear --yes
//! ```

mod app;
mod commands;
mod confirm;
mod form;
mod settings;
mod ui;

use std::{
  fs::OpenOptions,
  io,
  path::PathBuf,
  process::ExitCode,
  sync::Mutex,
  time::{Duration, Instant},
};

use anagrafe_core::{
  patient::PatientFields,
  persistence::Persistence,
  registry::Registry,
};
use anagrafe_store_sqlite::SqliteKv;
use anyhow::{Context, Result};
use app::App;
use clap::{Parser, Subcommand};
use crossterm::{
  event::{self, Event},
  execute,
  terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use settings::{DEFAULT_CONFIG_FILE, Settings};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "anagrafe", version, about = "Registro pazienti da terminale")]
struct Args {
  /// Path to a TOML config file (store_path, slot, log_file, log_level, …).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// SQLite database file; overrides `store_path`.
  #[arg(long, value_name = "FILE")]
  store: Option<PathBuf>,

  /// Log level or filter directive; overrides `log_level`.
  #[arg(long)]
  log_level: Option<String>,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Print every patient.
  List,
  /// Register a patient.
  Add {
    #[arg(long)]
    nome:            String,
    #[arg(long)]
    cognome:         String,
    #[arg(long)]
    codice_fiscale:  String,
    #[arg(long)]
    numero_cartella: String,
    #[arg(long, default_value = "")]
    note:            String,
  },
  /// Delete a patient by id.
  Delete {
    id:  u64,
    /// Do not ask for confirmation.
    #[arg(short, long)]
    yes: bool,
  },
  /// Delete every patient and restart numbering.
  Clear {
    /// Do not ask for confirmation.
    #[arg(short, long)]
    yes: bool,
  },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<ExitCode> {
  let args = Args::parse();

  let (config_path, explicit) = match &args.config {
    Some(path) => (path.clone(), true),
    None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
  };
  let mut settings = Settings::load(&config_path, explicit)?;

  // CLI flags override config file and environment.
  if let Some(store) = args.store {
    settings.store_path = settings::expand_tilde(&store);
  }
  if let Some(level) = args.log_level {
    settings.log_level = level;
  }

  init_tracing(&settings, args.command.is_none())?;

  let kv = SqliteKv::open(&settings.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", settings.store_path))?;
  let persistence = Persistence::with_slot(kv, settings.slot.clone());
  let mut registry = Registry::open(persistence, settings.policy()).await;

  let ok = match args.command {
    None => {
      run_tui(registry).await?;
      true
    }
    Some(Command::List) => commands::list(&mut registry).await,
    Some(Command::Add { nome, cognome, codice_fiscale, numero_cartella, note }) => {
      let fields =
        PatientFields::new(nome, cognome, codice_fiscale, numero_cartella).with_note(note);
      commands::add(&mut registry, fields).await
    }
    Some(Command::Delete { id, yes }) => commands::delete(&mut registry, id, yes).await,
    Some(Command::Clear { yes }) => commands::clear(&mut registry, yes).await,
  };

  Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// The UI owns the terminal, so it logs to a file; subcommands log to stderr.
fn init_tracing(settings: &Settings, tui: bool) -> Result<()> {
  let filter = EnvFilter::builder()
    .with_default_directive(LevelFilter::INFO.into())
    .parse(&settings.log_level)
    .with_context(|| format!("invalid log level {:?}", settings.log_level))?;

  if tui {
    let file = OpenOptions::new()
      .create(true)
      .append(true)
      .open(&settings.log_file)
      .with_context(|| format!("opening log file {}", settings.log_file.display()))?;
    tracing_subscriber::fmt()
      .with_env_filter(filter)
      .with_writer(Mutex::new(file))
      .with_ansi(false)
      .init();
  } else {
    tracing_subscriber::fmt()
      .with_env_filter(filter)
      .with_writer(io::stderr)
      .init();
  }
  Ok(())
}

// ─── Terminal UI ──────────────────────────────────────────────────────────────

async fn run_tui(registry: Registry<SqliteKv>) -> Result<()> {
  let mut app = App::new(registry);

  // Set up the terminal.
  enable_raw_mode().context("enabling raw mode")?;
  let mut stdout = io::stdout();
  execute!(stdout, EnterAlternateScreen).context("entering alternate screen")?;
  let backend = CrosstermBackend::new(stdout);
  let mut terminal = Terminal::new(backend).context("creating terminal")?;

  // Run the event loop; restore terminal even on error.
  let run_result = run_event_loop(&mut terminal, &mut app).await;

  // Restore terminal regardless of result.
  disable_raw_mode().ok();
  execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
  terminal.show_cursor().ok();

  run_result
}

async fn run_event_loop(
  terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
  app: &mut App<SqliteKv>,
) -> Result<()> {
  loop {
    app.tick(Instant::now());
    terminal.draw(|f| ui::draw(f, app)).context("drawing frame")?;

    // Poll for an event, yielding control to tokio while waiting.
    let maybe_event = tokio::task::block_in_place(|| {
      if event::poll(Duration::from_millis(100))? {
        Ok::<_, io::Error>(Some(event::read()?))
      } else {
        Ok(None)
      }
    })?;

    if let Some(Event::Key(key)) = maybe_event
      && !app.handle_key(key).await
    {
      break;
    }
  }

  Ok(())
}
