//! Extract the original file out of a CAR (Content Addressable aRchive).
//!
//! The archive is scanned once to index its blocks, the DAG rooted at the
//! archive root is then walked depth-first, in link order, and the leaves
//! are streamed into the output.
//!
//! Both [CARv1](https://ipld.io/specs/transport/car/carv1/) and
//! [CARv2](https://ipld.io/specs/transport/car/carv2/) containers are supported,
//! the file must be encoded as [UnixFS](https://github.com/ipfs/specs/blob/main/UNIXFS.md)
//! over DAG-PB (with or without raw leaves).

mod archive;
mod identifier;
mod multicodec;
mod stores;
mod unixfs;
mod v1;
mod v2;

pub use archive::{read_archive, ArchiveHeader};
pub use identifier::{parse_cid, verify};
// We need to re-expose this because `read_archive`, `CarBlockstore::get` and others take or return `Cid`s.
pub use ipld_core::cid::Cid;
pub use multicodec::{DAG_PB_CODE, IDENTITY_CODE, RAW_CODE, SHA_256_CODE, SHA_512_CODE};
pub use stores::{extract_file, BlockIndex, BlockLocation, CarBlockstore, Config, ExtractSummary};
pub use tokio_util::sync::CancellationToken;
pub use unixfs::{DagNode, Link, NodeType, Reconstructor};
pub use v2::{Characteristics, Header as CarV2Header};

/// Errors that can happen while reading an archive and extracting its contents.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    IoError(#[from] tokio::io::Error),

    /// The CARv1 header is not valid DAG-CBOR.
    #[error(transparent)]
    CodecError(#[from] serde_ipld_dagcbor::error::CodecError),

    /// A record did not start with a valid [`Cid`].
    #[error("malformed content identifier at offset {offset}: {reason}")]
    MalformedIdentifierError { offset: u64, reason: String },

    /// Only CARv1 and CARv2 are supported.
    #[error("unsupported archive version {0}, expected version 1 or 2")]
    UnsupportedVersionError(u64),

    /// The header declared version 2 but the bytes do not match the
    /// [CARv2 pragma](https://ipld.io/specs/transport/car/carv2/#pragma).
    #[error("invalid CARv2 pragma: {0:02x?}")]
    InvalidPragmaError(Vec<u8>),

    /// According to the [specification](https://ipld.io/specs/transport/car/carv1/#constraints)
    /// CAR files MUST have **one or more** CID roots.
    #[error("CAR file must have roots")]
    EmptyRootsError,

    /// The CARv2 payload starts inside the CARv2 pragma and header.
    #[error("CARv2 payload offset {0} overlaps the CARv2 header")]
    InvalidDataOffsetError(u64),

    /// A section declares more bytes than there are left in the source.
    #[error("record at offset {offset} declares {declared} bytes, but only {available} are available")]
    TruncatedRecordError {
        offset: u64,
        declared: u64,
        available: u64,
    },

    /// A link points to a block that is not in the archive.
    #[error("block {0} was not found in the archive")]
    BlockNotFoundError(Cid),

    /// The block contents do not hash to the digest in its [`Cid`].
    #[error("block {0} does not match its content identifier")]
    HashMismatchError(Cid),

    /// The block is addressed with a hash function we can't compute.
    #[error("block {cid} uses unsupported multihash code {code:#x}")]
    UnsupportedMultihashError { cid: Cid, code: u64 },

    #[error("block {cid} has a malformed payload: {reason}")]
    MalformedPayloadError { cid: Cid, reason: String },

    /// The archive root is not a file.
    #[error("root {cid} is a {node_type} node, only files can be extracted")]
    UnsupportedNodeTypeError { cid: Cid, node_type: NodeType },

    /// A node that is not part of a file was found while walking the file.
    #[error("node {cid} (linked from {parent}) is a {node_type} node, which cannot be part of a file")]
    UnsupportedFileShapeError {
        cid: Cid,
        parent: Cid,
        node_type: NodeType,
    },

    /// A subtree did not produce the amount of bytes its parent declared.
    #[error("subtree {cid} was expected to contain {expected} bytes, but contained {received}")]
    SizeMismatchError {
        cid: Cid,
        expected: u64,
        received: u64,
    },

    #[error("node {cid} is nested deeper than the maximum depth of {max_depth}")]
    MaxDepthExceededError { cid: Cid, max_depth: usize },

    /// Writing to the output failed.
    #[error("failed to write to the output: {0}")]
    SinkWriteError(#[source] tokio::io::Error),

    #[error("extraction was cancelled")]
    CancelledError,
}

#[cfg(test)]
pub(crate) mod test_utils;
