/// Severity of a status line message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Error,
}

/// One-line message shown under the main view until it expires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub text: String,
    pub kind: StatusKind,
    /// Tick at which the message was posted.
    pub posted_at: usize,
}

/// Info messages disappear after this many ticks (~5s at the 100ms tick rate).
/// Errors stay until replaced.
const INFO_TTL_TICKS: usize = 50;

impl StatusLine {
    pub fn info(text: impl Into<String>, tick: usize) -> Self {
        Self {
            text: text.into(),
            kind: StatusKind::Info,
            posted_at: tick,
        }
    }

    pub fn error(text: impl Into<String>, tick: usize) -> Self {
        Self {
            text: text.into(),
            kind: StatusKind::Error,
            posted_at: tick,
        }
    }

    pub fn is_expired(&self, tick: usize) -> bool {
        self.kind == StatusKind::Info && tick.wrapping_sub(self.posted_at) >= INFO_TTL_TICKS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_expires_error_sticks() {
        let info = StatusLine::info("saved", 10);
        assert!(!info.is_expired(59));
        assert!(info.is_expired(60));

        let error = StatusLine::error("no block selected", 10);
        assert!(!error.is_expired(10_000));
    }
}
