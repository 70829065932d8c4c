//! The per-user session: current task, progress tracker, block synchronizer, edit
//! session and the orchestration of the two poll loops.
//!
//! All state sits behind one mutex that is never held across an await. Every fetch
//! records the session generation it was issued under and its result is dropped if a
//! new task has been created or attached in the meantime, so a late response for an
//! old task can never reach the new task's view.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::api::TaskApi;
use crate::cache::BlockCache;
use crate::config::PollConfig;
use crate::edit::EditSession;
use crate::model::{Block, BlockId, Completion, CreatedTask, DocumentUpload, TaskId};
use crate::poller::{PollHandle, spawn_loop};
use crate::progress::{ProgressView, TrackerOutcome};
use crate::CoreError;

/// Change notifications for front ends. Sends never block; a dropped receiver is
/// ignored.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    TaskCreated { task_id: TaskId, blocks: u64 },
    TaskAttached { task_id: TaskId },
    Progress(ProgressView),
    BlocksRefreshed { completion: Completion, version: u64 },
    /// The open block's buffers were overwritten from a fresh snapshot.
    SelectionRefreshed { block_id: BlockId },
    Finished { task_id: TaskId },
    Failed { task_id: TaskId, message: String },
    PollingStarted,
    PollingStopped,
}

/// Point-in-time copy of everything a front end renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionView {
    pub task_id: Option<TaskId>,
    pub generation: u64,
    pub progress: ProgressView,
    pub blocks: Vec<Block>,
    pub completion: Completion,
    pub blocks_loaded: bool,
    pub selected: Option<BlockId>,
    pub source: String,
    pub destination: String,
    pub dirty: bool,
    pub polling: bool,
}

#[derive(Debug, Default)]
struct SessionState {
    task_id: Option<TaskId>,
    generation: u64,
    progress: ProgressView,
    cache: BlockCache,
    blocks_loaded: bool,
    edit: EditSession,
    /// The tracker has seen finished or error for this generation.
    terminal: bool,
}

struct Inner {
    api: Arc<dyn TaskApi>,
    poll: PollConfig,
    state: Mutex<SessionState>,
    pollers: Mutex<Option<PollHandle>>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

/// Cloneable handle to one client session.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Session")
            .field("task_id", &state.task_id)
            .field("generation", &state.generation)
            .field("cache", &state.cache)
            .field("polling", &self.inner.pollers.lock().is_some())
            .finish()
    }
}

impl Session {
    /// Create an idle session and the receiving end of its event stream.
    pub fn new(
        api: Arc<dyn TaskApi>,
        poll: PollConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let session = Self {
            inner: Arc::new(Inner {
                api,
                poll,
                state: Mutex::new(SessionState::default()),
                pollers: Mutex::new(None),
                events,
            }),
        };
        (session, rx)
    }

    /// The accessor this session talks to (e.g. for settings pass-through).
    pub fn api(&self) -> &Arc<dyn TaskApi> {
        &self.inner.api
    }

    pub fn poll_config(&self) -> &PollConfig {
        &self.inner.poll
    }

    pub fn task_id(&self) -> Option<TaskId> {
        self.inner.state.lock().task_id.clone()
    }

    pub fn is_polling(&self) -> bool {
        self.inner.pollers.lock().is_some()
    }

    pub fn snapshot(&self) -> SessionView {
        let state = self.inner.state.lock();
        SessionView {
            task_id: state.task_id.clone(),
            generation: state.generation,
            progress: state.progress.clone(),
            blocks: state.cache.blocks().to_vec(),
            completion: state.cache.completion(),
            blocks_loaded: state.blocks_loaded,
            selected: state.edit.selected().cloned(),
            source: state.edit.source().to_string(),
            destination: state.edit.destination().to_string(),
            dirty: state.edit.is_dirty(),
            polling: self.inner.pollers.lock().is_some(),
        }
    }

    // ---- lifecycle ----

    /// Upload a document as a new task, then reset all session state and start
    /// both poll loops for it.
    ///
    /// On failure the previous task (if any) keeps running untouched.
    pub async fn create_task(&self, upload: DocumentUpload) -> Result<CreatedTask, CoreError> {
        validate_upload(&upload)?;
        let created = self.inner.api.create_task(&upload).await?;
        log::info!(
            "created task {} with {} blocks",
            created.task_id,
            created.blocks
        );
        self.begin_task(created.task_id.clone());
        self.emit(SessionEvent::TaskCreated {
            task_id: created.task_id.clone(),
            blocks: created.blocks,
        });
        Ok(created)
    }

    /// Make an existing task current, with the same full reset as
    /// [`create_task`](Session::create_task).
    pub fn attach_task(&self, task_id: TaskId) {
        log::info!("attaching to task {task_id}");
        self.begin_task(task_id.clone());
        self.emit(SessionEvent::TaskAttached { task_id });
    }

    /// Ask the backend to translate the current task and make sure both loops run.
    pub async fn run_translate(&self) -> Result<serde_json::Value, CoreError> {
        let task_id = self.require_task()?;
        let echo = self.inner.api.run_translate(&task_id).await?;
        {
            let mut state = self.inner.state.lock();
            if state.task_id.as_ref() == Some(&task_id) {
                state.terminal = false;
            }
        }
        self.ensure_polling();
        Ok(echo)
    }

    /// Switch the block cache into loaded mode and fill it immediately.
    ///
    /// Polling is (re)started unless the task is already known to be finished or
    /// failed.
    pub async fn load_blocks(&self) -> Result<Completion, CoreError> {
        self.require_task()?;
        self.inner.state.lock().blocks_loaded = true;
        let refreshed = self.refresh_blocks(false).await;
        if !self.inner.state.lock().terminal {
            self.ensure_polling();
        }
        Ok(refreshed?.unwrap_or_default())
    }

    /// Fetch the whole block list and replace the cache.
    ///
    /// Does nothing (`Ok(None)`) unless blocks are loaded and a task is current.
    /// With `preserve_edit_focus`, the open block's buffers are refreshed from the
    /// snapshot unless they hold an uncommitted edit.
    pub async fn refresh_blocks(
        &self,
        preserve_edit_focus: bool,
    ) -> Result<Option<Completion>, CoreError> {
        self.refresh_for(None, preserve_edit_focus).await
    }

    /// Stop both loops. In-flight fetches still land (they are full replacements).
    pub fn stop_polling(&self) {
        let handle = self.inner.pollers.lock().take();
        if let Some(handle) = handle {
            drop(handle);
            log::debug!("polling stopped");
            self.emit(SessionEvent::PollingStopped);
        }
    }

    // ---- selection and edits ----

    /// Open `block_id`, loading its stored texts and discarding any unsaved edit.
    pub fn select(&self, block_id: &BlockId) -> Result<(), CoreError> {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        if state.task_id.is_none() {
            return Err(CoreError::NoTask);
        }
        let block = state
            .cache
            .get(block_id)
            .ok_or_else(|| CoreError::UnknownBlock(block_id.clone()))?;
        state.edit.select(block);
        Ok(())
    }

    /// Replace the destination buffer with user input, marking it uncommitted.
    pub fn set_destination(&self, text: impl Into<String>) -> Result<(), CoreError> {
        let mut state = self.inner.state.lock();
        if state.edit.selected().is_none() {
            return Err(CoreError::NoSelection);
        }
        state.edit.set_destination(text);
        Ok(())
    }

    /// Mark the destination buffer as being edited without changing it.
    pub fn begin_edit(&self) -> Result<(), CoreError> {
        let mut state = self.inner.state.lock();
        if state.edit.selected().is_none() {
            return Err(CoreError::NoSelection);
        }
        state.edit.begin_edit();
        Ok(())
    }

    /// Drop the uncommitted edit and show the cached texts again.
    pub fn discard_edit(&self) {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        let block = state
            .edit
            .selected()
            .and_then(|id| state.cache.get(id));
        state.edit.discard(block);
    }

    /// Submit the destination buffer as the selected block's translation.
    ///
    /// The cache is not touched optimistically: when blocks are loaded, an
    /// immediate refresh brings back the server-confirmed state.
    pub async fn save(&self) -> Result<(), CoreError> {
        let (task_id, block_id, text, generation) = {
            let state = self.inner.state.lock();
            let task_id = state.task_id.clone().ok_or(CoreError::NoTask)?;
            let block_id = state.edit.selected().cloned().ok_or(CoreError::NoSelection)?;
            (
                task_id,
                block_id,
                state.edit.destination().to_string(),
                state.generation,
            )
        };

        self.inner
            .api
            .update_block(&task_id, &block_id, &text)
            .await?;
        log::debug!("saved block {block_id} of task {task_id}");

        let loaded = {
            let mut state = self.inner.state.lock();
            if state.generation != generation {
                return Ok(());
            }
            if state.edit.selected() == Some(&block_id) {
                state.edit.mark_committed(&text);
            }
            state.blocks_loaded
        };

        if loaded {
            if let Err(e) = self.refresh_for(Some(generation), true).await {
                log::warn!("refresh after saving block {block_id} failed: {e}");
            }
        }
        Ok(())
    }

    /// Download the rendered document into `dir`, returning the written path.
    pub async fn export_to(&self, dir: &Path) -> Result<PathBuf, CoreError> {
        let task_id = self.require_task()?;
        let document = self.inner.api.export(&task_id).await?;
        let target = dir.join(&document.filename);
        let written = target.clone();
        tokio::task::spawn_blocking(move || atomic_write(&target, &document.bytes))
            .await
            .map_err(|e| CoreError::Io(std::io::Error::other(e.to_string())))??;
        log::info!("exported task {task_id} to {}", written.display());
        Ok(written)
    }

    // ---- internals ----

    fn emit(&self, event: SessionEvent) {
        let _ = self.inner.events.send(event);
    }

    fn require_task(&self) -> Result<TaskId, CoreError> {
        self.task_id().ok_or(CoreError::NoTask)
    }

    /// Stop the old loops, reset every piece of core state and start fresh loops
    /// for `task_id`.
    fn begin_task(&self, task_id: TaskId) {
        self.stop_polling();
        let generation = {
            let mut state = self.inner.state.lock();
            let generation = state.generation + 1;
            // Cache versions stay monotonic across tasks.
            let mut cache = std::mem::take(&mut state.cache);
            cache.clear();
            *state = SessionState {
                task_id: Some(task_id.clone()),
                generation,
                cache,
                ..SessionState::default()
            };
            generation
        };
        self.start_polling(task_id, generation);
    }

    /// Start both loops for the current task unless they already run.
    fn ensure_polling(&self) {
        let (task_id, generation) = {
            let state = self.inner.state.lock();
            match &state.task_id {
                Some(id) => (id.clone(), state.generation),
                None => return,
            }
        };
        if self.inner.pollers.lock().is_some() {
            return;
        }
        self.start_polling(task_id, generation);
    }

    fn start_polling(&self, task_id: TaskId, generation: u64) {
        let handle = PollHandle::new(generation);

        let weak = Arc::downgrade(&self.inner);
        spawn_loop(
            "status",
            self.inner.poll.status_interval,
            handle.token(),
            move || {
                let session = upgrade(&weak)?;
                let task_id = task_id.clone();
                Some(async move { session.status_tick(task_id, generation).await })
            },
        );

        let weak = Arc::downgrade(&self.inner);
        spawn_loop(
            "blocks",
            self.inner.poll.block_interval,
            handle.token(),
            move || {
                let session = upgrade(&weak)?;
                Some(async move {
                    if let Err(e) = session.refresh_for(Some(generation), true).await {
                        log::debug!("block poll failed: {e}");
                    }
                })
            },
        );

        let previous = self.inner.pollers.lock().replace(handle);
        drop(previous);
        log::debug!("polling started for generation {generation}");
        self.emit(SessionEvent::PollingStarted);
    }

    /// Stop the loops only if they still belong to `generation`.
    fn stop_polling_for(&self, generation: u64) {
        let handle = {
            let mut pollers = self.inner.pollers.lock();
            match pollers.as_ref() {
                Some(h) if h.generation() == generation => pollers.take(),
                _ => None,
            }
        };
        if handle.is_some() {
            drop(handle);
            self.emit(SessionEvent::PollingStopped);
        }
    }

    /// One progress tracker tick. Transport failures are swallowed; the next tick
    /// retries on the same cadence.
    async fn status_tick(&self, task_id: TaskId, generation: u64) {
        let fetched = match self.inner.api.task_progress(&task_id).await {
            Ok(p) => p,
            Err(e) => {
                log::debug!("status poll for {task_id} failed: {e}");
                return;
            }
        };

        let (view, outcome, first_terminal) = {
            let mut state = self.inner.state.lock();
            if state.generation != generation {
                log::debug!("dropping stale status for {task_id}");
                return;
            }
            if state.terminal && !fetched.status.is_terminal() {
                log::debug!("dropping late {} status for {task_id}", fetched.status.label());
                return;
            }
            let outcome = state.progress.apply(&fetched);
            let first_terminal = outcome != TrackerOutcome::Continue && !state.terminal;
            if outcome != TrackerOutcome::Continue {
                state.terminal = true;
            }
            (state.progress.clone(), outcome, first_terminal)
        };
        self.emit(SessionEvent::Progress(view));

        if !first_terminal {
            return;
        }
        match outcome {
            TrackerOutcome::Continue => {}
            TrackerOutcome::Finished => {
                log::info!("task {task_id} finished");
                self.schedule_final_refresh(generation);
                self.stop_polling_for(generation);
                self.emit(SessionEvent::Finished { task_id });
            }
            TrackerOutcome::Failed(message) => {
                log::warn!("task {task_id} failed: {message}");
                self.stop_polling_for(generation);
                self.emit(SessionEvent::Failed { task_id, message });
            }
        }
    }

    /// One last block refresh after a grace delay, to pick up blocks written just
    /// before the task reported finished.
    fn schedule_final_refresh(&self, generation: u64) {
        let weak = Arc::downgrade(&self.inner);
        let delay = self.inner.poll.final_refresh_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(session) = upgrade(&weak) else {
                return;
            };
            if let Err(e) = session.refresh_for(Some(generation), true).await {
                log::debug!("final block refresh failed: {e}");
            }
        });
    }

    async fn refresh_for(
        &self,
        expected_generation: Option<u64>,
        preserve_edit_focus: bool,
    ) -> Result<Option<Completion>, CoreError> {
        let (task_id, generation) = {
            let state = self.inner.state.lock();
            if !state.blocks_loaded {
                return Ok(None);
            }
            let Some(task_id) = state.task_id.clone() else {
                return Ok(None);
            };
            if expected_generation.is_some_and(|g| g != state.generation) {
                return Ok(None);
            }
            (task_id, state.generation)
        };

        let blocks = self
            .inner
            .api
            .list_blocks(&task_id, 0, self.inner.poll.block_page_limit)
            .await?;

        let (completion, version, refreshed) = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            if state.generation != generation {
                log::debug!("dropping stale block list for {task_id}");
                return Ok(None);
            }
            state.cache.replace(blocks);
            let mut refreshed = None;
            if preserve_edit_focus {
                if let Some(selected) = state.edit.selected().cloned() {
                    match state.cache.get(&selected) {
                        Some(block) => {
                            if state.edit.apply_snapshot(block) {
                                refreshed = Some(selected);
                            }
                        }
                        None => log::debug!("selected block {selected} missing from snapshot"),
                    }
                }
            }
            (state.cache.completion(), state.cache.version(), refreshed)
        };

        self.emit(SessionEvent::BlocksRefreshed {
            completion,
            version,
        });
        if let Some(block_id) = refreshed {
            self.emit(SessionEvent::SelectionRefreshed { block_id });
        }
        Ok(Some(completion))
    }
}

fn upgrade(weak: &Weak<Inner>) -> Option<Session> {
    weak.upgrade().map(|inner| Session { inner })
}

/// Only `.docx` uploads are accepted by the backend.
fn validate_upload(upload: &DocumentUpload) -> Result<(), CoreError> {
    if upload.filename.trim().is_empty() {
        return Err(CoreError::InvalidUpload("file name is empty".into()));
    }
    if !upload.filename.to_lowercase().ends_with(".docx") {
        return Err(CoreError::InvalidUpload(format!(
            "only .docx documents are supported, got {}",
            upload.filename
        )));
    }
    Ok(())
}

fn atomic_write(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Direction;

    fn upload(name: &str) -> DocumentUpload {
        DocumentUpload {
            filename: name.into(),
            bytes: vec![1, 2, 3],
            direction: Direction::ZhToEn,
        }
    }

    #[test]
    fn upload_requires_docx() {
        assert!(validate_upload(&upload("report.docx")).is_ok());
        assert!(validate_upload(&upload("REPORT.DOCX")).is_ok());
        assert!(matches!(
            validate_upload(&upload("report.pdf")),
            Err(CoreError::InvalidUpload(_))
        ));
        assert!(matches!(
            validate_upload(&upload("  ")),
            Err(CoreError::InvalidUpload(_))
        ));
    }

    #[test]
    fn atomic_write_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("translated.docx");
        atomic_write(&path, b"PK").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"PK");
        assert!(!path.with_extension("tmp").exists());
    }
}
