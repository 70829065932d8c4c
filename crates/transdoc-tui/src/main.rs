use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use ratatui::crossterm::event;
use ratatui::crossterm::execute;
use ratatui::crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::prelude::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use transdoc_core::{
    Config, ConfigFile, Direction, DocumentUpload, HttpTaskApi, Session, TaskApi, TaskId,
};

mod action;
mod app;
mod backend;
mod input;
mod model;
mod theme;
mod tui_event;
mod view;

use action::Command;
use app::App;
use tui_event::BackendEvent;

/// Transdoc TUI: upload a .docx, follow its translation, review and edit blocks.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// .docx document to upload as a new task
    document: Option<PathBuf>,

    /// Translation direction for the upload
    #[arg(long, default_value = "zh->en")]
    direction: Direction,

    /// Attach to an existing task instead of uploading
    #[arg(long, conflicts_with = "document")]
    task_id: Option<String>,

    /// Start translating as soon as the task is ready
    #[arg(long)]
    translate: bool,

    /// Backend base URL
    #[arg(long)]
    backend_url: Option<String>,

    /// Port file written by a locally spawned backend
    #[arg(long)]
    port_file: Option<PathBuf>,

    /// Config file (default: <config dir>/transdoc/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory exported documents are written to
    #[arg(long, default_value = ".")]
    export_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    let _log_guard = init_tracing()?;

    // Resolve config from CLI flags > env vars > config file > defaults
    let file = ConfigFile::load_or_default(args.config.as_deref())?;
    let mut config = Config::from_file(&file);
    config.apply_env(|key| std::env::var(key).ok())?;
    if let Some(url) = args.backend_url {
        config.backend_url = url;
    }
    if let Some(path) = args.port_file {
        config.port_file = Some(path);
    }
    config.validate()?;

    // Read the document up front so a bad path fails before the terminal is taken over
    let startup = match (&args.document, args.task_id) {
        (Some(path), _) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("cannot read document {}", path.display()))?;
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());
            Some(Command::Upload {
                upload: DocumentUpload {
                    filename,
                    bytes,
                    direction: args.direction,
                },
                translate: args.translate,
            })
        }
        (None, Some(id)) => Some(Command::Attach {
            task_id: TaskId::new(id),
            translate: args.translate,
        }),
        (None, None) => None,
    };
    let document_name = match &startup {
        Some(Command::Upload { upload, .. }) => Some(upload.filename.clone()),
        _ => None,
    };

    let base_url = transdoc_core::discovery::resolve_base_url(&config).await?;
    tracing::info!("using backend at {base_url}");
    let api = HttpTaskApi::new(base_url.clone(), config.request_timeout)?;
    api.health()
        .await
        .with_context(|| format!("backend at {base_url} is not reachable"))?;
    let (session, mut session_rx) = Session::new(Arc::new(api), config.poll.clone());

    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    // Install panic hook that restores terminal before printing panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Drain any stray input events (e.g. Enter keypress from launching the command)
    while event::poll(Duration::from_millis(50)).unwrap_or(false) {
        let _ = event::read();
    }

    let mut app = App::new(document_name);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();

    let dispatch = |app: &mut App, command: Command| {
        if command.is_async() {
            app.command_started();
            tokio::spawn(backend::run_command(
                session.clone(),
                command,
                args.export_dir.clone(),
                tx.clone(),
                cancel.clone(),
            ));
        } else if let Some(message) = backend::apply_local(&session, command) {
            app.set_error(message);
        }
        app.sync(session.snapshot());
    };

    if let Some(command) = startup {
        dispatch(&mut app, command);
    }

    // Also handle Ctrl+C at the OS level for clean shutdown
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_for_signal.cancel();
        }
    });

    // Main event loop
    let tick_rate = Duration::from_millis(100);

    loop {
        terminal.draw(|f| app.view(f))?;

        let mut pending = None;
        let editing = app.editing;
        tokio::select! {
            maybe_event = session_rx.recv() => {
                if let Some(event) = maybe_event {
                    app.handle_backend_event(BackendEvent::Session(event));
                    while let Ok(evt) = session_rx.try_recv() {
                        app.handle_backend_event(BackendEvent::Session(evt));
                    }
                }
            }
            maybe_event = rx.recv() => {
                if let Some(event) = maybe_event {
                    app.handle_backend_event(event);
                    while let Ok(evt) = rx.try_recv() {
                        app.handle_backend_event(evt);
                    }
                }
            }
            // Terminal input events
            action = async {
                if event::poll(tick_rate).unwrap_or(false) {
                    if let Ok(evt) = event::read() {
                        return input::map_event(&evt, editing);
                    }
                }
                action::Action::None
            } => {
                pending = app.update(action);
            }
            _ = cancel.cancelled() => {
                app.should_quit = true;
            }
        }

        if let Some(command) = pending {
            dispatch(&mut app, command);
        }

        app.update(action::Action::Tick);
        app.sync(session.snapshot());

        if app.should_quit {
            cancel.cancel();
            break;
        }
    }

    session.stop_polling();

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    Ok(())
}

/// Log to a daily file so the alternate screen stays clean.
fn init_tracing() -> anyhow::Result<WorkerGuard> {
    let dir = dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("transdoc")
        .join("logs");
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("cannot create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::daily(&dir, "transdoc-tui.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,transdoc_core=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(guard)
}
