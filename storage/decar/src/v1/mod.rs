mod reader;

use ipld_core::cid::Cid;
use serde::{Deserialize, Serialize};

pub(crate) use crate::v1::reader::{read_header, scan_blocks};

/// Low-level CAR header, as found at the start of every CARv1 (and CARv2) file.
///
/// The version is kept wide and the roots optional, as the same structure
/// is used to tell CARv1 and CARv2 apart, the CARv2 pragma being
/// `{"version": 2}` without any roots.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Header {
    /// CAR file version.
    pub version: u64,

    /// Root [`Cid`](`ipld_core::cid::Cid`)s for the contained data.
    #[serde(default)]
    pub roots: Vec<Cid>,
}

impl Header {
    /// Construct a new CARv1 [`Header`].
    #[cfg(test)]
    pub fn new(roots: Vec<Cid>) -> Self {
        Self { version: 1, roots }
    }
}
