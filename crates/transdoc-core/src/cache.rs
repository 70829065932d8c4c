//! Locally materialized block list for the current task.
//!
//! The cache is only ever replaced wholesale with a fresh snapshot from the backend;
//! there is no incremental patching. Staleness is therefore bounded by one poll
//! interval and a partially applied update cannot exist.

use std::collections::HashMap;

use crate::model::{Block, BlockId, Completion};

/// Ordered, id-keyed snapshot of a task's blocks.
#[derive(Default, Clone)]
pub struct BlockCache {
    blocks: Vec<Block>,
    index: HashMap<BlockId, usize>,
    /// Bumped on every replacement (including [`clear`](BlockCache::clear)).
    version: u64,
}

impl BlockCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole cache with `snapshot`, keeping the fetched order.
    ///
    /// At most one entry per id is kept: if the backend repeats an id, the first
    /// occurrence wins.
    pub fn replace(&mut self, snapshot: Vec<Block>) {
        let mut blocks = Vec::with_capacity(snapshot.len());
        let mut index = HashMap::with_capacity(snapshot.len());
        for block in snapshot {
            if index.contains_key(&block.id) {
                log::warn!("duplicate block id {} in snapshot, ignoring", block.id);
                continue;
            }
            index.insert(block.id.clone(), blocks.len());
            blocks.push(block);
        }
        self.blocks = blocks;
        self.index = index;
        self.version += 1;
    }

    /// Drop every cached block.
    pub fn clear(&mut self) {
        self.blocks.clear();
        self.index.clear();
        self.version += 1;
    }

    pub fn get(&self, id: &BlockId) -> Option<&Block> {
        self.index.get(id).map(|&i| &self.blocks[i])
    }

    /// Position of `id` in fetched order.
    pub fn position(&self, id: &BlockId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Blocks whose status is translated or edited, versus all blocks.
    pub fn completion(&self) -> Completion {
        Completion {
            completed: self.blocks.iter().filter(|b| b.status.is_complete()).count(),
            total: self.blocks.len(),
        }
    }
}

impl std::fmt::Debug for BlockCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockCache")
            .field("blocks", &self.blocks.len())
            .field("completion", &self.completion())
            .field("version", &self.version)
            .finish()
    }
}
