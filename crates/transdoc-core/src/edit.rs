//! Selection and edit buffers for the single open block.

use crate::model::{Block, BlockId};

/// Which block is open plus its display buffers.
///
/// `dirty` marks an uncommitted local edit of the destination buffer. While it is
/// set, background refreshes must leave both buffers alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditSession {
    selected: Option<BlockId>,
    source: String,
    destination: String,
    dirty: bool,
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `block`, discarding any unsaved edit to the previous selection.
    pub fn select(&mut self, block: &Block) {
        self.selected = Some(block.id.clone());
        self.source = block.source_text.clone();
        self.destination = block.translated().to_string();
        self.dirty = false;
    }

    pub fn selected(&self) -> Option<&BlockId> {
        self.selected.as_ref()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Replace the destination buffer with user input.
    pub fn set_destination(&mut self, text: impl Into<String>) {
        self.destination = text.into();
        self.dirty = true;
    }

    /// Claim the destination buffer without changing it (the user started editing).
    pub fn begin_edit(&mut self) {
        if self.selected.is_some() {
            self.dirty = true;
        }
    }

    /// Overwrite both buffers from a fresh snapshot of the selected block.
    ///
    /// Returns `false` and leaves the buffers untouched when the destination holds an
    /// uncommitted edit or `block` is not the selected one.
    pub fn apply_snapshot(&mut self, block: &Block) -> bool {
        if self.dirty || self.selected.as_ref() != Some(&block.id) {
            return false;
        }
        self.source = block.source_text.clone();
        self.destination = block.translated().to_string();
        true
    }

    /// The backend accepted `submitted`. The edit is committed only if the user has
    /// not typed past it in the meantime.
    pub fn mark_committed(&mut self, submitted: &str) {
        if self.destination == submitted {
            self.dirty = false;
        }
    }

    /// Drop the uncommitted edit, reloading from `block` when it is still known.
    pub fn discard(&mut self, block: Option<&Block>) {
        self.dirty = false;
        if let Some(block) = block {
            self.apply_snapshot(block);
        }
    }

    /// Forget the selection and both buffers.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
