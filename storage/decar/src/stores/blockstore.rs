use std::{io::SeekFrom, sync::Arc};

use bytes::Bytes;
use ipld_core::cid::Cid;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};
use tracing::trace;

use crate::{
    archive::{read_archive, ArchiveHeader},
    identifier::verify,
    multicodec::IDENTITY_CODE,
    stores::BlockIndex,
    Config, Error,
};

/// A read-only block store, backed by a CAR file.
///
/// Opening the store scans the whole archive once to build a [`BlockIndex`],
/// blocks are only read (and verified against their [`Cid`]) when requested.
///
/// The index is immutable and shared, [`CarBlockstore::fork`] creates another
/// handle over a different reader of the same archive, without scanning it again.
pub struct CarBlockstore<R> {
    reader: R,
    header: Arc<ArchiveHeader>,
    index: Arc<BlockIndex>,
}

impl<R> CarBlockstore<R> {
    /// The archive header.
    pub fn header(&self) -> &ArchiveHeader {
        &self.header
    }

    /// The roots declared by the archive, never empty.
    pub fn roots(&self) -> &[Cid] {
        &self.header.roots
    }

    /// The block index.
    pub fn index(&self) -> &BlockIndex {
        &self.index
    }

    /// Number of unique blocks in the archive.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Iterate over the archive's block [`Cid`]s, in archive order.
    pub fn cids(&self) -> impl Iterator<Item = &Cid> {
        self.index.cids()
    }

    /// Check whether the store can provide the given block.
    ///
    /// Blocks addressed with an identity multihash are always available,
    /// their contents are part of the [`Cid`].
    pub fn has(&self, cid: &Cid) -> bool {
        cid.hash().code() == IDENTITY_CODE || self.index.contains(cid)
    }

    /// Create a new store over `reader`, sharing the header and index with this one.
    ///
    /// `reader` must read the same archive this store was opened with.
    pub fn fork<S>(&self, reader: S) -> CarBlockstore<S> {
        CarBlockstore {
            reader,
            header: self.header.clone(),
            index: self.index.clone(),
        }
    }

    /// Get the inner reader back.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R> CarBlockstore<R>
where
    R: AsyncRead + AsyncSeek + Unpin,
{
    /// Open an archive, reading its header and indexing its blocks.
    pub async fn open(mut reader: R, config: &Config) -> Result<Self, Error> {
        let (header, index) = read_archive(&mut reader, config).await?;
        Ok(Self {
            reader,
            header: Arc::new(header),
            index: Arc::new(index),
        })
    }

    /// Read a block from the archive.
    ///
    /// The returned data is guaranteed to match the [`Cid`].
    pub async fn get(&mut self, cid: &Cid) -> Result<Bytes, Error> {
        if cid.hash().code() == IDENTITY_CODE {
            return Ok(Bytes::copy_from_slice(cid.hash().digest()));
        }

        let location = self
            .index
            .get(cid)
            .ok_or(Error::BlockNotFoundError(*cid))?;

        self.reader.seek(SeekFrom::Start(location.offset)).await?;
        let mut data = vec![0; location.length as usize];
        self.reader.read_exact(&mut data).await?;

        if !verify(cid, &data)? {
            return Err(Error::HashMismatchError(*cid));
        }
        trace!(%cid, length = location.length, "read block");

        Ok(data.into())
    }
}
