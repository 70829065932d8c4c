use transdoc_core::{BlockId, DocumentUpload, TaskId};

/// Actions that the TUI can process, mapped from keyboard input or internal events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Quit,
    NavigateBack,
    DrillIn,
    MoveUp,
    MoveDown,
    PageUp,
    PageDown,
    GoTop,
    GoBottom,
    LoadBlocks,
    Translate,
    Edit,
    Save,
    Export,
    ToggleHelp,
    /// Text input while the destination buffer is being edited.
    InsertChar(char),
    Newline,
    Backspace,
    Tick,
    Resize(u16, u16),
    None,
}

/// Work the event loop performs against the session on behalf of the app.
///
/// The first group is applied synchronously; the rest hit the backend and are
/// spawned so the UI keeps drawing while they run.
#[derive(Debug, Clone)]
pub enum Command {
    Select(BlockId),
    BeginEdit,
    SetDestination(String),
    DiscardEdit,
    Upload { upload: DocumentUpload, translate: bool },
    Attach { task_id: TaskId, translate: bool },
    LoadBlocks,
    Translate,
    Save,
    Export,
}

impl Command {
    /// Whether the command needs a network round trip.
    pub fn is_async(&self) -> bool {
        !matches!(
            self,
            Self::Select(_) | Self::BeginEdit | Self::SetDestination(_) | Self::DiscardEdit
        )
    }
}
