//! Wire and domain types mirrored from the translation backend.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a translation task (e.g. `task_4f1c...`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identifier of a block within a task (e.g. `blk_9a0e...`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub String);

impl BlockId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Coarse lifecycle of a task. The backend may report values we don't know yet,
/// which are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    Created,
    Running,
    Finished,
    Error,
    Other(String),
}

impl TaskStatus {
    pub fn label(&self) -> &str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Finished => "finished",
            Self::Error => "error",
            Self::Other(s) => s,
        }
    }

    /// Finished and error both end status polling.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Error)
    }
}

impl From<String> for TaskStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "created" => Self::Created,
            "running" => Self::Running,
            "finished" => Self::Finished,
            "error" => Self::Error,
            _ => Self::Other(s),
        }
    }
}

impl From<TaskStatus> for String {
    fn from(status: TaskStatus) -> Self {
        status.label().to_string()
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Translation state of a single block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BlockStatus {
    Pending,
    Translated,
    Edited,
    Other(String),
}

impl BlockStatus {
    pub fn label(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Translated => "translated",
            Self::Edited => "edited",
            Self::Other(s) => s,
        }
    }

    /// Translated and edited blocks count toward completion.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Translated | Self::Edited)
    }
}

impl From<String> for BlockStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => Self::Pending,
            "translated" => Self::Translated,
            "edited" => Self::Edited,
            _ => Self::Other(s),
        }
    }
}

impl From<BlockStatus> for String {
    fn from(status: BlockStatus) -> Self {
        status.label().to_string()
    }
}

impl fmt::Display for BlockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Response of `GET /api/tasks/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskProgress {
    #[serde(default)]
    pub progress: Option<f64>,
    pub status: TaskStatus,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
}

impl TaskProgress {
    /// Progress as a displayable fraction: clamped to `[0, 1]`, missing or
    /// non-finite values read as 0.
    pub fn fraction(&self) -> f64 {
        clamp_progress(self.progress.unwrap_or(0.0))
    }
}

/// Clamp a raw progress value into `[0, 1]`. NaN and infinities become 0.
pub fn clamp_progress(raw: f64) -> f64 {
    if raw.is_finite() {
        raw.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// One unit of source text within a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub order_no: i64,
    pub status: BlockStatus,
    pub source_text: String,
    #[serde(default)]
    pub translated_text: Option<String>,
    #[serde(default)]
    pub locator: String,
    #[serde(default)]
    pub kind: String,
}

impl Block {
    /// Translated text, or the empty string while none has been produced.
    pub fn translated(&self) -> &str {
        self.translated_text.as_deref().unwrap_or("")
    }
}

/// Translation direction accepted by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ZhToEn,
    EnToZh,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ZhToEn => "zh->en",
            Self::EnToZh => "en->zh",
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "zh->en" => Ok(Self::ZhToEn),
            "en->zh" => Ok(Self::EnToZh),
            other => Err(format!("direction must be zh->en or en->zh, got '{other}'")),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document to upload as a new task.
#[derive(Clone)]
pub struct DocumentUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub direction: Direction,
}

impl fmt::Debug for DocumentUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentUpload")
            .field("filename", &self.filename)
            .field("bytes", &self.bytes.len())
            .field("direction", &self.direction)
            .finish()
    }
}

/// Response of `POST /api/tasks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedTask {
    pub task_id: TaskId,
    pub blocks: u64,
}

/// Model credentials stored by the backend.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub model: String,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

/// Rendered document returned by the export endpoint.
#[derive(Clone)]
pub struct ExportedDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for ExportedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportedDocument")
            .field("filename", &self.filename)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Completed blocks (translated or edited) versus all blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Completion {
    pub completed: usize,
    pub total: usize,
}

impl fmt::Display for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.completed, self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_handles_out_of_range_and_non_finite() {
        assert_eq!(clamp_progress(0.42), 0.42);
        assert_eq!(clamp_progress(-0.5), 0.0);
        assert_eq!(clamp_progress(1.7), 1.0);
        assert_eq!(clamp_progress(f64::NAN), 0.0);
        assert_eq!(clamp_progress(f64::INFINITY), 0.0);
        assert_eq!(clamp_progress(f64::NEG_INFINITY), 0.0);
    }

    #[test]
    fn task_progress_missing_progress_reads_zero() {
        let p: TaskProgress = serde_json::from_str(r#"{"status":"running"}"#).unwrap();
        assert_eq!(p.fraction(), 0.0);
        assert_eq!(p.status, TaskStatus::Running);
        assert!(p.error.is_none());
    }

    #[test]
    fn unknown_statuses_are_kept() {
        let p: TaskProgress =
            serde_json::from_str(r#"{"progress":0.5,"status":"queued"}"#).unwrap();
        assert_eq!(p.status, TaskStatus::Other("queued".into()));
        assert!(!p.status.is_terminal());
        assert_eq!(p.status.label(), "queued");
    }

    #[test]
    fn block_deserializes_with_null_translation() {
        let b: Block = serde_json::from_str(
            r#"{"id":"b1","order_no":0,"status":"pending","source_text":"你好","translated_text":null}"#,
        )
        .unwrap();
        assert_eq!(b.id, BlockId::new("b1"));
        assert_eq!(b.translated(), "");
        assert!(!b.status.is_complete());
        assert!(b.locator.is_empty());
    }

    #[test]
    fn block_status_completion() {
        assert!(BlockStatus::Translated.is_complete());
        assert!(BlockStatus::Edited.is_complete());
        assert!(!BlockStatus::Pending.is_complete());
        assert!(!BlockStatus::Other("failed".into()).is_complete());
    }

    #[test]
    fn direction_parse() {
        assert_eq!("zh->en".parse::<Direction>(), Ok(Direction::ZhToEn));
        assert_eq!("en->zh".parse::<Direction>(), Ok(Direction::EnToZh));
        assert!("fr->en".parse::<Direction>().is_err());
    }

    #[test]
    fn settings_debug_redacts_key() {
        let s = Settings {
            base_url: "https://api.example.com".into(),
            api_key: "sk-secret".into(),
            model: "gpt".into(),
        };
        let rendered = format!("{s:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn completion_display() {
        let c = Completion {
            completed: 0,
            total: 12,
        };
        assert_eq!(c.to_string(), "0 / 12");
    }
}
