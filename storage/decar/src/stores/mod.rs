mod blockstore;
mod filestore;
mod index;

pub use blockstore::CarBlockstore;
pub use filestore::{extract_file, ExtractSummary};
pub use index::{BlockIndex, BlockLocation};
use ipld_core::cid::Cid;

/// The default maximum depth of the DAG.
///
/// A balanced tree with the [boxo](https://github.com/ipfs/boxo/blob/625ba769263c2beeec934836f54bbd6624db945a/ipld/unixfs/importer/helpers/helpers.go#L16-L30)
/// defaults (256KiB chunks, 174 links per block) is 4 levels deep for a 200TiB file,
/// trickle DAGs grow deeper, but not by this much.
pub(crate) const DEFAULT_MAX_DEPTH: usize = 64;

/// Extraction configuration options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Check that each subtree produces as many bytes as its parent declares.
    pub verify_sizes: bool,

    /// Fail when the DAG is deeper than this.
    pub max_depth: usize,

    /// Treat a zero length section as the end of the archive,
    /// instead of failing.
    pub zero_length_section_as_eof: bool,

    /// Extract this root instead of the first root declared by the archive.
    pub root: Option<Cid>,
}

impl Config {
    /// Set whether subtree sizes are checked.
    pub fn with_verify_sizes(mut self, verify_sizes: bool) -> Self {
        self.verify_sizes = verify_sizes;
        self
    }

    /// Set the maximum DAG depth.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set whether zero length sections end the archive.
    pub fn with_zero_length_section_as_eof(mut self, zero_length_section_as_eof: bool) -> Self {
        self.zero_length_section_as_eof = zero_length_section_as_eof;
        self
    }

    /// Set the root to extract.
    pub fn with_root(mut self, root: Option<Cid>) -> Self {
        self.root = root;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            verify_sizes: true,
            max_depth: DEFAULT_MAX_DEPTH,
            zero_length_section_as_eof: false,
            root: None,
        }
    }
}
