//! In-memory stand-in for the translation backend.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use transdoc_core::{
    Block, BlockId, BlockStatus, CoreError, CreatedTask, DocumentUpload, ExportedDocument,
    Settings, TaskApi, TaskId, TaskProgress, TaskStatus,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct Calls {
    pub create: usize,
    pub translate: usize,
    pub status: usize,
    pub list: usize,
    pub patch: usize,
}

#[derive(Debug)]
struct FakeTask {
    progress: Option<f64>,
    status: TaskStatus,
    error: Option<String>,
    blocks: Vec<Block>,
    delay: Option<Duration>,
    stall_next_status: Option<Duration>,
    calls: Calls,
}

#[derive(Debug, Default)]
struct FakeState {
    tasks: HashMap<TaskId, FakeTask>,
    next_task: u64,
    blocks_per_task: usize,
    fail_status: bool,
    fail_blocks: bool,
    create_calls: usize,
    settings: Settings,
}

#[derive(Debug, Default)]
pub struct FakeBackend {
    state: Mutex<FakeState>,
}

impl FakeBackend {
    /// Every created task gets `n` pending blocks `b0..b{n-1}` with matching `order_no`.
    pub fn with_blocks(n: usize) -> Self {
        let backend = Self::default();
        backend.state.lock().unwrap().blocks_per_task = n;
        backend
    }

    pub fn calls(&self, task_id: &TaskId) -> Calls {
        self.state
            .lock()
            .unwrap()
            .tasks
            .get(task_id)
            .map(|t| t.calls)
            .unwrap_or_default()
    }

    pub fn create_calls(&self) -> usize {
        self.state.lock().unwrap().create_calls
    }

    pub fn set_status(&self, task_id: &TaskId, progress: Option<f64>, status: &str, error: Option<&str>) {
        let mut state = self.state.lock().unwrap();
        let task = state.tasks.get_mut(task_id).expect("known task");
        task.progress = progress;
        task.status = TaskStatus::from(status.to_string());
        task.error = error.map(Into::into);
    }

    pub fn translate_block(&self, task_id: &TaskId, block_id: &str, text: &str) {
        let mut state = self.state.lock().unwrap();
        let task = state.tasks.get_mut(task_id).expect("known task");
        let block = task
            .blocks
            .iter_mut()
            .find(|b| b.id.as_str() == block_id)
            .expect("known block");
        block.translated_text = Some(text.into());
        block.status = BlockStatus::Translated;
    }

    pub fn remove_block(&self, task_id: &TaskId, block_id: &str) {
        let mut state = self.state.lock().unwrap();
        let task = state.tasks.get_mut(task_id).expect("known task");
        task.blocks.retain(|b| b.id.as_str() != block_id);
    }

    pub fn set_delay(&self, task_id: &TaskId, delay: Duration) {
        let mut state = self.state.lock().unwrap();
        state.tasks.get_mut(task_id).expect("known task").delay = Some(delay);
    }

    /// The next status fetch answers with the state at call time, `delay` later.
    pub fn stall_next_status(&self, task_id: &TaskId, delay: Duration) {
        let mut state = self.state.lock().unwrap();
        state.tasks.get_mut(task_id).expect("known task").stall_next_status = Some(delay);
    }

    pub fn set_fail_status(&self, fail: bool) {
        self.state.lock().unwrap().fail_status = fail;
    }

    pub fn set_fail_blocks(&self, fail: bool) {
        self.state.lock().unwrap().fail_blocks = fail;
    }

    pub fn block(&self, task_id: &TaskId, block_id: &str) -> Block {
        let state = self.state.lock().unwrap();
        state.tasks[task_id]
            .blocks
            .iter()
            .find(|b| b.id.as_str() == block_id)
            .cloned()
            .expect("known block")
    }

    fn delay_for(&self, task_id: &TaskId) -> Option<Duration> {
        self.state
            .lock()
            .unwrap()
            .tasks
            .get(task_id)
            .and_then(|t| t.delay)
    }

    fn not_found() -> CoreError {
        CoreError::Api {
            status: 404,
            message: r#"{"detail":"task not found"}"#.into(),
        }
    }
}

#[async_trait]
impl TaskApi for FakeBackend {
    async fn health(&self) -> Result<(), CoreError> {
        Ok(())
    }

    async fn get_settings(&self) -> Result<Settings, CoreError> {
        Ok(self.state.lock().unwrap().settings.clone())
    }

    async fn save_settings(&self, settings: &Settings) -> Result<(), CoreError> {
        self.state.lock().unwrap().settings = settings.clone();
        Ok(())
    }

    async fn create_task(&self, _upload: &DocumentUpload) -> Result<CreatedTask, CoreError> {
        let mut state = self.state.lock().unwrap();
        state.create_calls += 1;
        state.next_task += 1;
        let task_id = TaskId::new(format!("task_{}", state.next_task));
        let blocks: Vec<Block> = (0..state.blocks_per_task)
            .map(|i| Block {
                id: BlockId::new(format!("b{i}")),
                order_no: i as i64,
                status: BlockStatus::Pending,
                source_text: format!("段落 {i}"),
                translated_text: None,
                locator: format!("p:{i}"),
                kind: "paragraph".into(),
            })
            .collect();
        let count = blocks.len() as u64;
        state.tasks.insert(
            task_id.clone(),
            FakeTask {
                progress: Some(0.0),
                status: TaskStatus::Created,
                error: None,
                blocks,
                delay: None,
                stall_next_status: None,
                calls: Calls::default(),
            },
        );
        Ok(CreatedTask {
            task_id,
            blocks: count,
        })
    }

    async fn run_translate(&self, task_id: &TaskId) -> Result<serde_json::Value, CoreError> {
        let mut state = self.state.lock().unwrap();
        let task = state.tasks.get_mut(task_id).ok_or_else(Self::not_found)?;
        task.calls.translate += 1;
        if task.status == TaskStatus::Running {
            return Ok(json!({"ok": true, "status": "running"}));
        }
        task.status = TaskStatus::Running;
        task.error = None;
        Ok(json!({"ok": true}))
    }

    async fn task_progress(&self, task_id: &TaskId) -> Result<TaskProgress, CoreError> {
        let stalled = {
            let mut state = self.state.lock().unwrap();
            let fail = state.fail_status;
            let task = state.tasks.get_mut(task_id).ok_or_else(Self::not_found)?;
            task.calls.status += 1;
            if fail {
                return Err(CoreError::Api {
                    status: 503,
                    message: "backend restarting".into(),
                });
            }
            task.stall_next_status.take().map(|delay| {
                let progress = TaskProgress {
                    progress: task.progress,
                    status: task.status.clone(),
                    error: task.error.clone(),
                    direction: Some("zh->en".into()),
                };
                (delay, progress)
            })
        };
        if let Some((delay, progress)) = stalled {
            tokio::time::sleep(delay).await;
            return Ok(progress);
        }
        if let Some(delay) = self.delay_for(task_id) {
            tokio::time::sleep(delay).await;
        }
        let state = self.state.lock().unwrap();
        let task = state.tasks.get(task_id).ok_or_else(Self::not_found)?;
        Ok(TaskProgress {
            progress: task.progress,
            status: task.status.clone(),
            error: task.error.clone(),
            direction: Some("zh->en".into()),
        })
    }

    async fn list_blocks(
        &self,
        task_id: &TaskId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Block>, CoreError> {
        {
            let mut state = self.state.lock().unwrap();
            let fail = state.fail_blocks;
            let task = state.tasks.get_mut(task_id).ok_or_else(Self::not_found)?;
            task.calls.list += 1;
            if fail {
                return Err(CoreError::Api {
                    status: 500,
                    message: "database is locked".into(),
                });
            }
        }
        if let Some(delay) = self.delay_for(task_id) {
            tokio::time::sleep(delay).await;
        }
        let state = self.state.lock().unwrap();
        let task = state.tasks.get(task_id).ok_or_else(Self::not_found)?;
        let mut blocks = task.blocks.clone();
        blocks.sort_by_key(|b| b.order_no);
        Ok(blocks.into_iter().skip(offset).take(limit).collect())
    }

    async fn update_block(
        &self,
        task_id: &TaskId,
        block_id: &BlockId,
        translated_text: &str,
    ) -> Result<serde_json::Value, CoreError> {
        let mut state = self.state.lock().unwrap();
        let task = state.tasks.get_mut(task_id).ok_or_else(Self::not_found)?;
        task.calls.patch += 1;
        let block = task
            .blocks
            .iter_mut()
            .find(|b| &b.id == block_id)
            .ok_or_else(|| CoreError::Api {
                status: 404,
                message: r#"{"detail":"block not found"}"#.into(),
            })?;
        block.translated_text = Some(translated_text.to_string());
        block.status = BlockStatus::Edited;
        Ok(json!({"ok": true}))
    }

    async fn export(&self, task_id: &TaskId) -> Result<ExportedDocument, CoreError> {
        let state = self.state.lock().unwrap();
        let task = state.tasks.get(task_id).ok_or_else(Self::not_found)?;
        let text: Vec<String> = task
            .blocks
            .iter()
            .map(|b| b.translated().to_string())
            .collect();
        Ok(ExportedDocument {
            filename: format!("translated_{task_id}.docx"),
            bytes: text.join("\n").into_bytes(),
        })
    }
}
