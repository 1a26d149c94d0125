use std::io::SeekFrom;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};
use tracing::warn;

use crate::{
    v2::{Characteristics, Header, PRAGMA},
    Error,
};

/// Read the CARv2 pragma, found at the very start of the source.
///
/// This function fails if the pragma does not match the one defined in the
/// [specification](https://ipld.io/specs/transport/car/carv2/#pragma).
pub(crate) async fn read_pragma<R>(reader: &mut R) -> Result<(), Error>
where
    R: AsyncRead + AsyncSeek + Unpin,
{
    reader.seek(SeekFrom::Start(0)).await?;
    let mut pragma_buffer = vec![0; PRAGMA.len()];
    reader.read_exact(&mut pragma_buffer).await?;
    if pragma_buffer != PRAGMA {
        return Err(Error::InvalidPragmaError(pragma_buffer));
    }
    // Since we validate the pragma, there's no point in returning it.
    Ok(())
}

/// Read the [`Header`], which immediately follows the pragma.
///
/// Characteristics we don't know about are dropped, they describe the
/// payload and index but don't change how blocks are framed.
///
/// For more information check the [header specification](https://ipld.io/specs/transport/car/carv2/#header).
pub(crate) async fn read_header<R>(reader: &mut R) -> Result<Header, Error>
where
    R: AsyncRead + AsyncSeek + Unpin,
{
    reader.seek(SeekFrom::Start(PRAGMA.len() as u64)).await?;

    // Even though the standard doesn't explicitly state endianness, go-car does
    // https://github.com/ipld/go-car/blob/45b81c1cc5117b3340dfdb025afeca90bfbe8d86/v2/car.go#L51-L69
    let characteristics_bitfield = reader.read_u128_le().await?;
    let characteristics = Characteristics::from_bits_truncate(characteristics_bitfield);
    if characteristics.bits() != characteristics_bitfield {
        warn!(
            characteristics = characteristics_bitfield,
            "ignoring unknown CARv2 characteristics"
        );
    }

    let data_offset = reader.read_u64_le().await?;
    let data_size = reader.read_u64_le().await?;
    let index_offset = reader.read_u64_le().await?;

    Ok(Header {
        characteristics,
        data_offset,
        data_size,
        index_offset,
    })
}
