use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use transdoc_core::{
    BlockId, Config, ConfigFile, Direction, DocumentUpload, HttpTaskApi, Session, SessionEvent,
    Settings, TaskApi, TaskId,
};

mod output;
mod progress;

/// Transdoc - translate .docx documents through a local translation backend
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Cmd,

    /// Backend base URL
    #[arg(long, global = true)]
    backend_url: Option<String>,

    /// Port file written by a locally spawned backend
    #[arg(long, global = true)]
    port_file: Option<PathBuf>,

    /// Config file (default: <config dir>/transdoc/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Show or change the model settings stored by the backend
    Settings {
        #[command(subcommand)]
        action: SettingsCmd,
    },
    /// Upload a document, translate it and export the result
    Translate {
        /// .docx document to translate
        file: PathBuf,

        #[arg(long, default_value = "zh->en")]
        direction: Direction,

        /// Directory the translated document is written to
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,

        /// Stop once translation finishes, without exporting
        #[arg(long)]
        no_export: bool,
    },
    /// Print the blocks of a task
    Blocks {
        task_id: String,

        /// Print the raw block list as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace the translation of one block
    Edit {
        task_id: String,
        block_id: String,
        /// New translated text
        text: String,
    },
    /// Download the translated document of a task
    Export {
        task_id: String,

        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum SettingsCmd {
    Show,
    Set {
        #[arg(long)]
        base_url: Option<String>,
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        model: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.verbose)?;
    let color = !args.no_color && std::io::stdout().is_terminal();

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

    let base_url = transdoc_core::discovery::resolve_base_url(&config).await?;
    tracing::debug!("using backend at {base_url}");
    let api: Arc<dyn TaskApi> =
        Arc::new(HttpTaskApi::new(base_url.clone(), config.request_timeout)?);
    api.health()
        .await
        .with_context(|| format!("backend at {base_url} is not reachable"))?;

    match args.command {
        Cmd::Settings { action } => settings(api, action, color).await,
        Cmd::Translate {
            file,
            direction,
            out_dir,
            no_export,
        } => {
            let (session, events) = Session::new(api, config.poll.clone());
            translate(&session, events, &file, direction, (!no_export).then_some(out_dir)).await
        }
        Cmd::Blocks { task_id, json } => {
            let (session, _events) = Session::new(api, config.poll.clone());
            session.attach_task(TaskId::new(task_id));
            session.load_blocks().await?;
            session.stop_polling();
            let view = session.snapshot();
            if json {
                println!("{}", serde_json::to_string_pretty(&view.blocks)?);
            } else {
                output::print_blocks(&view.blocks, color);
                println!("{} translated", view.completion);
            }
            Ok(())
        }
        Cmd::Edit {
            task_id,
            block_id,
            text,
        } => {
            let (session, _events) = Session::new(api, config.poll.clone());
            session.attach_task(TaskId::new(task_id));
            session.load_blocks().await?;
            let block_id = BlockId::new(block_id);
            session.select(&block_id)?;
            session.set_destination(text)?;
            session.save().await?;
            session.stop_polling();

            let view = session.snapshot();
            let saved: Vec<_> = view.blocks.into_iter().filter(|b| b.id == block_id).collect();
            output::print_blocks(&saved, color);
            Ok(())
        }
        Cmd::Export { task_id, out_dir } => {
            let (session, _events) = Session::new(api, config.poll.clone());
            session.attach_task(TaskId::new(task_id));
            session.stop_polling();
            let path = session.export_to(&out_dir).await?;
            println!("{}", path.display());
            Ok(())
        }
    }
}

async fn settings(api: Arc<dyn TaskApi>, action: SettingsCmd, color: bool) -> anyhow::Result<()> {
    match action {
        SettingsCmd::Show => {
            let current = api.get_settings().await?;
            output::print_settings(&current, color);
        }
        SettingsCmd::Set {
            base_url,
            api_key,
            model,
        } => {
            if base_url.is_none() && api_key.is_none() && model.is_none() {
                bail!("nothing to set; pass --base-url, --api-key or --model");
            }
            let current = api.get_settings().await?;
            let updated = Settings {
                base_url: base_url.unwrap_or(current.base_url),
                api_key: api_key.unwrap_or(current.api_key),
                model: model.unwrap_or(current.model),
            };
            api.save_settings(&updated).await?;
            output::print_settings(&updated, color);
        }
    }
    Ok(())
}

/// Upload, start translation and follow progress until the task ends.
async fn translate(
    session: &Session,
    mut events: tokio::sync::mpsc::UnboundedReceiver<SessionEvent>,
    file: &Path,
    direction: Direction,
    out_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let bytes =
        std::fs::read(file).with_context(|| format!("cannot read document {}", file.display()))?;
    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| file.display().to_string());

    let created = session
        .create_task(DocumentUpload {
            filename,
            bytes,
            direction,
        })
        .await?;
    eprintln!("task {} created with {} blocks", created.task_id, created.blocks);
    session.run_translate().await?;

    let bar = progress::task_bar(created.task_id.as_str());
    loop {
        let event = tokio::select! {
            event = events.recv() => event,
            _ = tokio::signal::ctrl_c() => {
                session.stop_polling();
                bar.abandon_with_message("interrupted");
                bail!("interrupted; task {} keeps running on the backend", created.task_id);
            }
        };
        match event {
            Some(SessionEvent::Progress(view)) => progress::update(&bar, &view),
            Some(SessionEvent::Finished { .. }) => {
                bar.finish_with_message("finished");
                break;
            }
            Some(SessionEvent::Failed { message, .. }) => {
                bar.abandon_with_message("failed");
                bail!("translation failed: {message}");
            }
            Some(_) => {}
            None => bail!("session closed before the task finished"),
        }
    }

    if let Some(dir) = out_dir {
        let path = session.export_to(&dir).await?;
        println!("{}", path.display());
    }
    Ok(())
}

fn init_tracing(verbose: u8) -> anyhow::Result<()> {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow::anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init()
        .map_err(|e| anyhow::anyhow!("cannot install log subscriber: {e}"))?;
    Ok(())
}
