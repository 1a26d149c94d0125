//! Decoding of [UnixFS](https://github.com/ipfs/specs/blob/main/UNIXFS.md) file nodes
//! and the reconstruction of files out of them.

mod reconstruct;
pub(crate) mod unixfs_pb;

use std::fmt::Display;

use bytes::Bytes;
use ipld_core::{cid::Cid, codec::Codec};
use ipld_dagpb::{DagPbCodec, PbNode};
use quick_protobuf::{BytesReader, MessageRead};
pub use reconstruct::Reconstructor;

use crate::{
    multicodec::{DAG_PB_CODE, RAW_CODE},
    Error,
};

/// Field 1 (`Type`), varint encoded.
const UNIXFS_TYPE_TAG: u32 = 8;

/// The kind of a DAG node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    /// A block stored with the `raw` codec, or a UnixFS `Raw` node.
    Raw,
    File,
    Directory,
    Metadata,
    Symlink,
    /// A sharded directory.
    HamtShard,
    /// A block with a codec other than `raw` or `dag-pb`.
    Codec(u64),
}

impl NodeType {
    /// Whether nodes of this type can be part of a file.
    pub const fn is_file(&self) -> bool {
        matches!(self, NodeType::Raw | NodeType::File)
    }
}

impl Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeType::Raw => write!(f, "raw"),
            NodeType::File => write!(f, "file"),
            NodeType::Directory => write!(f, "directory"),
            NodeType::Metadata => write!(f, "metadata"),
            NodeType::Symlink => write!(f, "symlink"),
            NodeType::HamtShard => write!(f, "HAMT shard"),
            NodeType::Codec(code) => write!(f, "codec {code:#x}"),
        }
    }
}

impl From<unixfs_pb::mod_Data::DataType> for NodeType {
    fn from(value: unixfs_pb::mod_Data::DataType) -> Self {
        use unixfs_pb::mod_Data::DataType;
        match value {
            DataType::Raw => NodeType::Raw,
            DataType::Directory => NodeType::Directory,
            DataType::File => NodeType::File,
            DataType::Metadata => NodeType::Metadata,
            DataType::Symlink => NodeType::Symlink,
            DataType::HAMTShard => NodeType::HamtShard,
        }
    }
}

/// A link from an internal node to one of its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    pub cid: Cid,
    /// Size of the file data under the child, taken from the UnixFS `blocksizes`.
    pub size: Option<u64>,
    /// Cumulative size of the encoded blocks under the child (the DAG-PB `Tsize`).
    pub encoded_size: Option<u64>,
}

impl Link {
    /// Best known size of the child subtree.
    ///
    /// Falls back to the `Tsize` when the parent has no `blocksizes`,
    /// which overestimates the file data by the encoding overhead.
    pub fn subtree_size(&self) -> Option<u64> {
        self.size.or(self.encoded_size)
    }
}

/// A decoded DAG node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DagNode {
    /// File data without children.
    Leaf(Bytes),

    /// A file node with children.
    Internal {
        /// Data that comes before the data of the children.
        data: Option<Bytes>,
        /// Children, in file order.
        links: Vec<Link>,
        /// Total size of the file data under this node, as declared by the node.
        filesize: Option<u64>,
    },

    /// A node that is valid, but can't be part of a file.
    Unsupported(NodeType),
}

impl DagNode {
    /// Decode a block, using the codec in its [`Cid`].
    ///
    /// * `raw` blocks are always leaves.
    /// * `dag-pb` blocks must carry UnixFS data, `Raw` and `File` nodes are leaves
    ///   when they have no links and internal nodes otherwise. Other UnixFS types are unsupported.
    /// * Other codecs are unsupported.
    pub fn decode(cid: &Cid, block: Bytes) -> Result<Self, Error> {
        match cid.codec() {
            RAW_CODE => Ok(DagNode::Leaf(block)),
            DAG_PB_CODE => decode_dag_pb(cid, &block),
            code => Ok(DagNode::Unsupported(NodeType::Codec(code))),
        }
    }
}

fn malformed<E: Display>(cid: &Cid, reason: E) -> Error {
    Error::MalformedPayloadError {
        cid: *cid,
        reason: reason.to_string(),
    }
}

/// Read the UnixFS `Type` field as is.
///
/// The generated `DataType` conversion turns unknown values into `Raw`,
/// which would make any node with a bogus type a file leaf.
fn read_node_type(cid: &Cid, unixfs: &[u8]) -> Result<NodeType, Error> {
    let mut reader = BytesReader::from_bytes(unixfs);
    let mut data_type = None;
    while !reader.is_eof() {
        match reader.next_tag(unixfs).map_err(|err| malformed(cid, err))? {
            UNIXFS_TYPE_TAG => {
                data_type = Some(reader.read_int32(unixfs).map_err(|err| malformed(cid, err))?);
            }
            tag => reader
                .read_unknown(unixfs, tag)
                .map_err(|err| malformed(cid, err))?,
        }
    }

    match data_type {
        Some(value @ 0..=5) => Ok(NodeType::from(unixfs_pb::mod_Data::DataType::from(value))),
        Some(value) => Err(malformed(cid, format!("unknown UnixFS type {value}"))),
        None => Err(malformed(cid, "missing UnixFS type")),
    }
}

fn decode_dag_pb(cid: &Cid, block: &[u8]) -> Result<DagNode, Error> {
    let node: PbNode = DagPbCodec::decode_from_slice(block).map_err(|err| malformed(cid, err))?;
    let Some(pb_data) = node.data else {
        return Err(malformed(cid, "missing UnixFS data"));
    };

    let mut reader = BytesReader::from_bytes(&pb_data);
    let unixfs = unixfs_pb::Data::from_reader(&mut reader, &pb_data)
        .map_err(|err| malformed(cid, err))?;

    let node_type = read_node_type(cid, &pb_data)?;
    if !node_type.is_file() {
        return Ok(DagNode::Unsupported(node_type));
    }

    // The UnixFS data lives inside the PB data, slicing it avoids a copy
    let data = unixfs.Data.as_deref().map(|data| pb_data.slice_ref(data));

    if node.links.is_empty() {
        let data = data.unwrap_or_default();
        if let Some(filesize) = unixfs.filesize {
            if filesize != data.len() as u64 {
                return Err(malformed(
                    cid,
                    format!(
                        "leaf declares {filesize} bytes, but contains {}",
                        data.len()
                    ),
                ));
            }
        }
        return Ok(DagNode::Leaf(data));
    }

    if !unixfs.blocksizes.is_empty() && unixfs.blocksizes.len() != node.links.len() {
        return Err(malformed(
            cid,
            format!(
                "node has {} links but {} block sizes",
                node.links.len(),
                unixfs.blocksizes.len()
            ),
        ));
    }

    let links = node
        .links
        .into_iter()
        .enumerate()
        .map(|(i, link)| Link {
            cid: link.cid,
            size: unixfs.blocksizes.get(i).copied(),
            encoded_size: link.size,
        })
        .collect();

    Ok(DagNode::Internal {
        data: data.filter(|data| !data.is_empty()),
        links,
        filesize: unixfs.filesize,
    })
}
