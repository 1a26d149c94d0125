use std::io::SeekFrom;

use integer_encoding::VarInt;
use ipld_core::codec::Codec;
use serde_ipld_dagcbor::codec::DagCborCodec;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};
use tracing::trace;

use crate::{
    identifier::read_cid,
    stores::{BlockIndex, BlockLocation},
    v1::Header,
    Error,
};

/// Maximum length of a varint encoded `u64`.
const MAX_VARINT_LENGTH: usize = 10;

/// Upper bound for the length of an encoded [`Cid`](ipld_core::cid::Cid):
/// version, codec, hash code and digest length varints, followed by a digest of at most 64 bytes.
const MAX_CID_LENGTH: usize = 4 * MAX_VARINT_LENGTH + 64;

/// How much of a section we read to frame it, without touching the payload.
const SECTION_PREFIX_LENGTH: usize = MAX_VARINT_LENGTH + MAX_CID_LENGTH;

/// Fill `buffer` from `reader`, only stopping short on EOF.
async fn read_up_to<R>(reader: &mut R, buffer: &mut [u8]) -> Result<usize, Error>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buffer.len() {
        let read = reader.read(&mut buffer[filled..]).await?;
        if read == 0 {
            break;
        }
        filled += read;
    }
    Ok(filled)
}

/// Decode the varint length prefix of the section starting at `offset`.
fn decode_section_length(prefix: &[u8], offset: u64) -> Result<(u64, usize), Error> {
    u64::decode_var(prefix).ok_or_else(|| {
        Error::IoError(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("unterminated section length at offset {offset}"),
        ))
    })
}

/// Read the CAR header section found at `offset`.
///
/// The section must end before `end`. Returns the header and the offset of the first byte after it.
///
/// No validation is performed on the version or roots, that is up to the caller
/// as CARv1 and CARv2 expect different things.
pub(crate) async fn read_header<R>(reader: &mut R, offset: u64, end: u64) -> Result<(Header, u64), Error>
where
    R: AsyncRead + AsyncSeek + Unpin,
{
    reader.seek(SeekFrom::Start(offset)).await?;
    let available = end.saturating_sub(offset);
    let mut prefix = [0u8; MAX_VARINT_LENGTH];
    let prefix_length = MAX_VARINT_LENGTH.min(available as usize);
    let read = read_up_to(reader, &mut prefix[..prefix_length]).await?;
    let (header_length, varint_length) = decode_section_length(&prefix[..read], offset)?;

    let header_start = offset + varint_length as u64;
    let available = end - header_start;
    if header_length > available {
        return Err(Error::TruncatedRecordError {
            offset,
            declared: header_length,
            available,
        });
    }

    reader.seek(SeekFrom::Start(header_start)).await?;
    let mut header_buffer = vec![0; header_length as usize];
    reader.read_exact(&mut header_buffer).await?;

    let header: Header = DagCborCodec::decode_from_slice(&header_buffer)?;
    Ok((header, header_start + header_length))
}

/// Scan the block sections in `start..end`, indexing them into `index`.
///
/// Each section is composed of a CID (either version 0 or 1) and data, it is prefixed with the section length.
/// ```text
/// ┌─────────────────────────┬─────┬────────────────────────┐
/// │ Section length (varint) │ CID │ Data block (raw bytes) │
/// └─────────────────────────┴─────┴────────────────────────┘
/// ```
///
/// Only the length and the CID are read, the data block is skipped over
/// and its absolute position is stored in the index.
///
/// If a [`Cid`](ipld_core::cid::Cid) appears more than once, the first occurrence is kept.
///
/// Returns the number of sections that were read, duplicates included.
pub(crate) async fn scan_blocks<R>(
    reader: &mut R,
    start: u64,
    end: u64,
    zero_length_section_as_eof: bool,
    index: &mut BlockIndex,
) -> Result<usize, Error>
where
    R: AsyncRead + AsyncSeek + Unpin,
{
    let mut prefix = [0u8; SECTION_PREFIX_LENGTH];
    let mut position = start;
    let mut sections = 0;

    while position < end {
        reader.seek(SeekFrom::Start(position)).await?;
        let prefix_length = SECTION_PREFIX_LENGTH.min((end - position) as usize);
        let read = read_up_to(reader, &mut prefix[..prefix_length]).await?;
        let (section_length, varint_length) = decode_section_length(&prefix[..read], position)?;

        if section_length == 0 {
            // go-car has the same option, some writers pad the end of the payload with zeroes
            if zero_length_section_as_eof {
                trace!(offset = position, "zero length section, stopping");
                break;
            }
            return Err(Error::MalformedIdentifierError {
                offset: position,
                reason: "empty section".to_string(),
            });
        }

        let section_start = position + varint_length as u64;
        let available = end - section_start;
        if section_length > available {
            return Err(Error::TruncatedRecordError {
                offset: position,
                declared: section_length,
                available,
            });
        }

        let cid_window_end = read.min(varint_length + section_length as usize);
        let (cid, cid_length) = read_cid(&prefix[varint_length..cid_window_end], section_start)?;
        let location = BlockLocation::new(
            section_start + cid_length as u64,
            section_length - cid_length as u64,
        );

        if index.insert(cid, location) {
            trace!(%cid, offset = location.offset, length = location.length, "indexed block");
        } else {
            trace!(%cid, offset = position, "duplicate block, keeping the first occurrence");
        }

        sections += 1;
        position = section_start + section_length;
    }

    Ok(sections)
}
