use transdoc_core::SessionEvent;

/// Events flowing from the session and spawned commands to the TUI.
#[derive(Debug, Clone)]
pub enum BackendEvent {
    /// Change notification from the session's poll loops or operations.
    Session(SessionEvent),
    /// A spawned command completed; the message goes to the status line.
    CommandDone { message: String },
    /// A spawned command failed before or during its request.
    CommandFailed { message: String },
}
