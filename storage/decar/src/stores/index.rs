use indexmap::IndexMap;
use ipld_core::cid::Cid;

/// Location of a block's data inside the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLocation {
    /// Absolute offset of the first data byte, the CID is not included.
    pub offset: u64,
    /// Data length in bytes.
    pub length: u64,
}

impl BlockLocation {
    /// Construct a new [`BlockLocation`].
    pub fn new(offset: u64, length: u64) -> Self {
        Self { offset, length }
    }
}

/// Maps each [`Cid`] in the archive to the location of its data.
///
/// Blocks are kept in archive order. The index is built once, when opening the archive,
/// and never changes afterwards.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BlockIndex {
    entries: IndexMap<Cid, BlockLocation>,
}

impl BlockIndex {
    /// Insert a new block location.
    ///
    /// If the [`Cid`] has been previously inserted, the previous location is kept
    /// and this function returns `false`.
    pub(crate) fn insert(&mut self, cid: Cid, location: BlockLocation) -> bool {
        if self.entries.contains_key(&cid) {
            return false;
        }
        self.entries.insert(cid, location);
        true
    }

    /// Get the location of a block.
    pub fn get(&self, cid: &Cid) -> Option<BlockLocation> {
        self.entries.get(cid).copied()
    }

    pub fn contains(&self, cid: &Cid) -> bool {
        self.entries.contains_key(cid)
    }

    /// Number of unique blocks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the indexed [`Cid`]s, in the order they appear in the archive.
    pub fn cids(&self) -> impl Iterator<Item = &Cid> {
        self.entries.keys()
    }
}
