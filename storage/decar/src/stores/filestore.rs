use ipld_core::cid::Cid;
use tokio::io::{AsyncRead, AsyncSeek, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{CarBlockstore, Config};
use crate::{unixfs::Reconstructor, Error};

/// The outcome of a successful extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractSummary {
    /// The root the file was extracted from.
    pub root: Cid,
    /// Size of the extracted file.
    pub bytes_written: u64,
}

/// Pick the root to extract, `config.root` takes precedence over the archive roots.
fn select_root<R>(store: &CarBlockstore<R>, config: &Config) -> Result<Cid, Error> {
    if let Some(root) = config.root {
        if !store.has(&root) {
            return Err(Error::BlockNotFoundError(root));
        }
        return Ok(root);
    }

    // The archive reader never returns an empty root list
    let roots = store.roots();
    let root = *roots.first().ok_or(Error::EmptyRootsError)?;
    if roots.len() > 1 {
        warn!(
            roots = roots.len(),
            %root,
            "archive declares multiple roots, only the first one is extracted"
        );
    }
    Ok(root)
}

/// Extract the file stored in the CAR `source` into `output`.
///
/// The output is flushed before returning. On failure, the output holds partial
/// contents and should be discarded by the caller.
pub async fn extract_file<Src, Out>(
    source: Src,
    mut output: Out,
    config: Config,
    cancellation: CancellationToken,
) -> Result<ExtractSummary, Error>
where
    Src: AsyncRead + AsyncSeek + Unpin,
    Out: AsyncWrite + Unpin,
{
    let mut store = CarBlockstore::open(source, &config).await?;
    let root = select_root(&store, &config)?;
    debug!(%root, blocks = store.index().len(), "extracting file");

    let bytes_written = Reconstructor::new(&mut store)
        .with_config(&config)
        .with_cancellation(cancellation)
        .reconstruct(root, &mut output)
        .await?;
    output.flush().await.map_err(Error::SinkWriteError)?;

    debug!(%root, bytes_written, "file extracted");
    Ok(ExtractSummary {
        root,
        bytes_written,
    })
}
