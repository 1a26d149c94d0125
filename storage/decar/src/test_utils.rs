//! Builders for in-memory archives and DAGs.

use bytes::Bytes;
use integer_encoding::VarInt;
use ipld_core::{cid::Cid, codec::Codec};
use ipld_dagpb::{DagPbCodec, PbLink, PbNode};
use quick_protobuf::MessageWrite;
use serde_ipld_dagcbor::codec::DagCborCodec;
use sha2::Sha256;

use crate::{
    multicodec::{generate_multihash, DAG_PB_CODE, RAW_CODE},
    unixfs::unixfs_pb,
    v1, v2,
};

/// Create a raw block, addressed by its SHA-256.
pub(crate) fn raw_block(data: &[u8]) -> (Cid, Bytes) {
    let cid = Cid::new_v1(RAW_CODE, generate_multihash::<Sha256, _>(data));
    (cid, Bytes::copy_from_slice(data))
}

/// Append a varint length prefixed section to `buffer`.
pub(crate) fn encode_section(buffer: &mut Vec<u8>, section: &[u8]) {
    buffer.extend(section.len().encode_var_vec());
    buffer.extend_from_slice(section);
}

/// UnixFS data of the given type, without contents.
pub(crate) fn unixfs_data(data_type: unixfs_pb::mod_Data::DataType) -> unixfs_pb::Data<'static> {
    unixfs_pb::Data {
        Type: data_type,
        ..Default::default()
    }
}

/// Encode a DAG-PB block.
pub(crate) fn pb_block(data: unixfs_pb::Data, links: Vec<PbLink>) -> (Cid, Bytes) {
    let mut data_bytes = vec![];
    let mut writer = quick_protobuf::Writer::new(&mut data_bytes);
    data.write_message(&mut writer).unwrap();

    let node = PbNode {
        links,
        data: Some(data_bytes.into()),
    };
    let block = DagPbCodec::encode_to_vec(&node).unwrap();
    let cid = Cid::new_v1(DAG_PB_CODE, generate_multihash::<Sha256, _>(&block));
    (cid, block.into())
}

/// Encode a DAG-PB block without links, with `data` as its (already encoded) UnixFS data.
pub(crate) fn pb_block_with_raw_data(data: &'static [u8]) -> (Cid, Bytes) {
    let node = PbNode {
        links: vec![],
        data: Some(Bytes::from_static(data)),
    };
    let block = DagPbCodec::encode_to_vec(&node).unwrap();
    let cid = Cid::new_v1(DAG_PB_CODE, generate_multihash::<Sha256, _>(&block));
    (cid, block.into())
}

/// Create a UnixFS file node linking to `links`, each with its file data size.
///
/// The declared file size is the sum of the link sizes plus the inline data.
pub(crate) fn file_node(links: &[(Cid, u64)], inline: Option<&[u8]>) -> (Cid, Bytes) {
    let blocksizes: Vec<_> = links.iter().map(|(_, size)| *size).collect();
    let filesize = blocksizes.iter().sum::<u64>() + inline.map_or(0, |data| data.len() as u64);
    let data = unixfs_pb::Data {
        Type: unixfs_pb::mod_Data::DataType::File,
        Data: inline.map(Into::into),
        filesize: Some(filesize),
        blocksizes,
        ..Default::default()
    };
    let pb_links = links
        .iter()
        .map(|(cid, size)| PbLink {
            cid: *cid,
            name: Some("".to_string()),
            size: Some(*size),
        })
        .collect();
    pb_block(data, pb_links)
}

/// Chunk `data` into raw leaves and build a balanced tree over them,
/// with at most `width` links per node.
///
/// Returns the root and every block, root first.
pub(crate) fn build_balanced_file(
    data: &[u8],
    chunk_size: usize,
    width: usize,
) -> (Cid, Vec<(Cid, Bytes)>) {
    if data.is_empty() {
        let root = file_node(&[], None);
        return (root.0, vec![root]);
    }

    let mut blocks = vec![];
    let mut level: Vec<(Cid, u64)> = data
        .chunks(chunk_size)
        .map(|chunk| {
            let block = raw_block(chunk);
            let link = (block.0, chunk.len() as u64);
            blocks.push(block);
            link
        })
        .collect();

    while level.len() > 1 {
        level = level
            .chunks(width)
            .map(|links| {
                let node = file_node(links, None);
                let link = (node.0, links.iter().map(|(_, size)| size).sum());
                blocks.push(node);
                link
            })
            .collect();
    }

    blocks.reverse();
    (level[0].0, blocks)
}

/// Builds CAR archives in memory.
pub(crate) struct CarBuilder {
    roots: Vec<Cid>,
    blocks: Vec<(Cid, Bytes)>,
    padding: usize,
    trailer: Vec<u8>,
}

impl CarBuilder {
    pub(crate) fn new(roots: Vec<Cid>) -> Self {
        Self {
            roots,
            blocks: vec![],
            padding: 0,
            trailer: vec![],
        }
    }

    pub(crate) fn block(mut self, block: (Cid, Bytes)) -> Self {
        self.blocks.push(block);
        self
    }

    /// Zero bytes between the CARv2 header and the inner CARv1.
    pub(crate) fn padding(mut self, padding: usize) -> Self {
        self.padding = padding;
        self
    }

    /// Bytes after the inner CARv1, where the CARv2 index would be.
    pub(crate) fn trailer(mut self, trailer: Vec<u8>) -> Self {
        self.trailer = trailer;
        self
    }

    pub(crate) fn v1(&self) -> Vec<u8> {
        let mut buffer = vec![];
        let header = DagCborCodec::encode_to_vec(&v1::Header::new(self.roots.clone())).unwrap();
        encode_section(&mut buffer, &header);
        for (cid, data) in &self.blocks {
            let mut section = cid.to_bytes();
            section.extend_from_slice(data);
            encode_section(&mut buffer, &section);
        }
        buffer
    }

    pub(crate) fn v2(&self) -> Vec<u8> {
        let inner = self.v1();
        let data_offset = (v2::Header::SIZE + self.padding) as u64;
        let data_size = inner.len() as u64;
        let index_offset = if self.trailer.is_empty() {
            0
        } else {
            data_offset + data_size
        };

        let mut buffer = v2::PRAGMA.to_vec();
        buffer.extend(0u128.to_le_bytes());
        buffer.extend(data_offset.to_le_bytes());
        buffer.extend(data_size.to_le_bytes());
        buffer.extend(index_offset.to_le_bytes());
        buffer.extend(std::iter::repeat(0).take(self.padding));
        buffer.extend(inner);
        buffer.extend_from_slice(&self.trailer);
        buffer
    }
}

/// Compare two buffers, showing the surroundings of the first difference.
pub(crate) fn assert_buffer_eq(lhs: &[u8], rhs: &[u8]) {
    assert_eq!(lhs.len(), rhs.len());
    for (i, (l, r)) in lhs.iter().zip(rhs).enumerate() {
        let before = i.saturating_sub(5);
        let after = (i + 5).min(rhs.len() - 1);
        assert_eq!(
            l,
            r,
            "difference at index {}\n  left: {:02x?}\n right: {:02x?}",
            i,
            &lhs[before..=after],
            &rhs[before..=after],
        )
    }
}
