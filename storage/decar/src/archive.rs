use std::io::SeekFrom;

use ipld_core::cid::Cid;
use tokio::io::{AsyncRead, AsyncSeek, AsyncSeekExt};
use tracing::debug;

use crate::{stores::BlockIndex, v1, v2, Config, Error};

/// Header information of an opened archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveHeader {
    /// The container version, either 1 or 2.
    pub version: u8,

    /// Root [`Cid`]s declared by the (inner) CARv1 header, never empty.
    pub roots: Vec<Cid>,

    /// The CARv2 header, if the archive is a CARv2.
    pub v2: Option<v2::Header>,
}

/// Read the archive header and index every block in it.
///
/// Accepts both CARv1 and CARv2, in the latter case the index embedded
/// in the file is not used, the inner CARv1 payload is scanned instead.
///
/// The block contents are not read, the returned [`BlockIndex`] only
/// keeps their location in the source.
pub async fn read_archive<R>(reader: &mut R, config: &Config) -> Result<(ArchiveHeader, BlockIndex), Error>
where
    R: AsyncRead + AsyncSeek + Unpin,
{
    let end = reader.seek(SeekFrom::End(0)).await?;

    let (outer, outer_end) = v1::read_header(reader, 0, end).await?;
    let (header, body_start, body_end) = match outer.version {
        1 => {
            let header = ArchiveHeader {
                version: 1,
                roots: outer.roots,
                v2: None,
            };
            (header, outer_end, end)
        }
        2 => {
            v2::read_pragma(reader).await?;
            let v2_header = v2::read_header(reader).await?;
            if v2_header.data_offset < v2::Header::SIZE as u64 {
                return Err(Error::InvalidDataOffsetError(v2_header.data_offset));
            }

            let data_end = v2_header
                .data_end()
                .filter(|data_end| *data_end <= end)
                .ok_or(Error::TruncatedRecordError {
                    offset: v2_header.data_offset,
                    declared: v2_header.data_size,
                    available: end.saturating_sub(v2_header.data_offset),
                })?;

            let (inner, inner_end) =
                v1::read_header(reader, v2_header.data_offset, data_end).await?;
            if inner.version != 1 {
                return Err(Error::UnsupportedVersionError(inner.version));
            }

            let header = ArchiveHeader {
                version: 2,
                roots: inner.roots,
                v2: Some(v2_header),
            };
            (header, inner_end, data_end)
        }
        version => return Err(Error::UnsupportedVersionError(version)),
    };

    // We need a root to know which file to extract
    if header.roots.is_empty() {
        return Err(Error::EmptyRootsError);
    }

    let mut index = BlockIndex::default();
    let sections = v1::scan_blocks(
        reader,
        body_start,
        body_end,
        config.zero_length_section_as_eof,
        &mut index,
    )
    .await?;

    debug!(
        version = header.version,
        roots = header.roots.len(),
        sections,
        blocks = index.len(),
        "indexed archive"
    );

    Ok((header, index))
}
