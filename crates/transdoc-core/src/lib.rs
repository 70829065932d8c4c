use thiserror::Error;

pub mod api;
pub mod cache;
pub mod config;
pub mod discovery;
pub mod edit;
pub mod model;
mod poller;
pub mod progress;
pub mod session;

// Re-export for convenience
pub use api::{HttpTaskApi, TaskApi};
pub use cache::BlockCache;
pub use config::{Config, ConfigFile, PollConfig};
pub use edit::EditSession;
pub use model::{
    Block, BlockId, BlockStatus, Completion, CreatedTask, Direction, DocumentUpload,
    ExportedDocument, Settings, TaskId, TaskProgress, TaskStatus,
};
pub use progress::ProgressView;
pub use session::{Session, SessionEvent, SessionView};

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("no current task")]
    NoTask,
    #[error("no block selected")]
    NoSelection,
    #[error("block {0} is not in the loaded block list")]
    UnknownBlock(BlockId),
    #[error("invalid upload: {0}")]
    InvalidUpload(String),
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("configuration error: {0}")]
    Config(String),
}

impl CoreError {
    /// Precondition failures are raised before any network call is attempted.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::NoTask | Self::NoSelection | Self::UnknownBlock(_) | Self::InvalidUpload(_)
        )
    }
}
