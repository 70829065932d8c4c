use std::path::PathBuf;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use transdoc_core::{CoreError, Session};

use crate::action::Command;
use crate::tui_event::BackendEvent;

/// Apply a command that needs no network round trip.
///
/// Returns an error message for the status line when the session refuses it.
pub fn apply_local(session: &Session, command: Command) -> Option<String> {
    let result = match command {
        Command::Select(block_id) => session.select(&block_id),
        Command::BeginEdit => session.begin_edit(),
        Command::SetDestination(text) => session.set_destination(text),
        Command::DiscardEdit => {
            session.discard_edit();
            Ok(())
        }
        other => {
            tracing::warn!("{other:?} is not a local command");
            Ok(())
        }
    };
    result.err().map(|e| e.to_string())
}

/// Run one backend command to completion, reporting the outcome on `tx`.
///
/// Cancellation only abandons the wait; a request already sent still completes
/// server side.
pub async fn run_command(
    session: Session,
    command: Command,
    export_dir: PathBuf,
    tx: mpsc::UnboundedSender<BackendEvent>,
    cancel: CancellationToken,
) {
    let outcome = tokio::select! {
        _ = cancel.cancelled() => return,
        outcome = execute(&session, command, &export_dir) => outcome,
    };
    let event = match outcome {
        Ok(message) => BackendEvent::CommandDone { message },
        Err(e) => {
            if !e.is_precondition() {
                tracing::warn!("command failed: {e}");
            }
            BackendEvent::CommandFailed {
                message: e.to_string(),
            }
        }
    };
    let _ = tx.send(event);
}

async fn execute(
    session: &Session,
    command: Command,
    export_dir: &std::path::Path,
) -> Result<String, CoreError> {
    match command {
        Command::Upload { upload, translate } => {
            let filename = upload.filename.clone();
            let created = session.create_task(upload).await?;
            if translate {
                session.run_translate().await?;
            }
            Ok(format!(
                "uploaded {filename}: task {} with {} blocks",
                created.task_id, created.blocks
            ))
        }
        Command::Attach { task_id, translate } => {
            session.attach_task(task_id.clone());
            if translate {
                session.run_translate().await?;
            }
            Ok(format!("attached to task {task_id}"))
        }
        Command::LoadBlocks => {
            let completion = session.load_blocks().await?;
            Ok(format!("loaded blocks ({completion} translated)"))
        }
        Command::Translate => {
            session.run_translate().await?;
            Ok("translation started".to_string())
        }
        Command::Save => {
            session.save().await?;
            Ok("saved".to_string())
        }
        Command::Export => {
            let path = session.export_to(export_dir).await?;
            Ok(format!("exported to {}", path.display()))
        }
        Command::Select(_) | Command::BeginEdit | Command::SetDestination(_) | Command::DiscardEdit => {
            Ok(String::new())
        }
    }
}
