use bytes::Bytes;
use ipld_core::cid::Cid;
use tokio::io::{AsyncRead, AsyncSeek, AsyncWrite, AsyncWriteExt};
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::{DagNode, Link};
use crate::{stores::DEFAULT_MAX_DEPTH, CarBlockstore, Config, Error};

/// Rebuilds a file out of the DAG stored in a [`CarBlockstore`].
///
/// The DAG is walked depth-first, children in link order, keeping only the
/// path from the root to the current node in memory.
/// Every node's inline data comes before the data of its children.
pub struct Reconstructor<'s, R> {
    store: &'s mut CarBlockstore<R>,
    verify_sizes: bool,
    max_depth: usize,
    cancellation: CancellationToken,
}

impl<'s, R> Reconstructor<'s, R>
where
    R: AsyncRead + AsyncSeek + Unpin,
{
    pub fn new(store: &'s mut CarBlockstore<R>) -> Self {
        Self {
            store,
            verify_sizes: true,
            max_depth: DEFAULT_MAX_DEPTH,
            cancellation: CancellationToken::new(),
        }
    }

    /// Take the size checks and depth limit from `config`.
    pub fn with_config(mut self, config: &Config) -> Self {
        self.verify_sizes = config.verify_sizes;
        self.max_depth = config.max_depth;
        self
    }

    /// Abort the walk, before the next block is read, once `cancellation` is cancelled.
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Walk the file rooted at `root`, yielding its contents in order.
    ///
    /// The stream ends after the first error.
    pub fn stream(self, root: Cid) -> impl Stream<Item = Result<Bytes, Error>> + 's
    where
        R: 's,
    {
        let mut walker = Walker::new(self, root);
        async_stream::try_stream! {
            while let Some(chunk) = walker.next_chunk().await? {
                yield chunk;
            }
        }
    }

    /// Write the file rooted at `root` into `sink`, returning the number of bytes written.
    ///
    /// The sink is not flushed. On failure, whatever was written to the sink is incomplete.
    pub async fn reconstruct<W>(self, root: Cid, sink: &mut W) -> Result<u64, Error>
    where
        W: AsyncWrite + Unpin,
    {
        let mut walker = Walker::new(self, root);
        while let Some(chunk) = walker.next_chunk().await? {
            sink.write_all(&chunk)
                .await
                .map_err(Error::SinkWriteError)?;
        }
        Ok(walker.position)
    }
}

/// An internal node whose children are being walked.
struct Frame {
    cid: Cid,
    links: std::vec::IntoIter<Link>,
    /// Output position when the node was entered.
    start: u64,
    /// Amount of bytes the subtree must produce.
    expected: Option<u64>,
}

/// The next node to visit.
struct Visit {
    cid: Cid,
    parent: Option<Cid>,
    /// Size declared by the parent's `blocksizes`.
    expected: Option<u64>,
}

struct Walker<'s, R> {
    reconstructor: Reconstructor<'s, R>,
    stack: Vec<Frame>,
    root: Option<Visit>,
    position: u64,
}

impl<'s, R> Walker<'s, R>
where
    R: AsyncRead + AsyncSeek + Unpin,
{
    fn new(reconstructor: Reconstructor<'s, R>, root: Cid) -> Self {
        Self {
            reconstructor,
            stack: vec![],
            root: Some(Visit {
                cid: root,
                parent: None,
                expected: None,
            }),
            position: 0,
        }
    }

    fn check_size(&self, cid: Cid, expected: Option<u64>, received: u64) -> Result<(), Error> {
        match expected {
            Some(expected) if self.reconstructor.verify_sizes && expected != received => {
                Err(Error::SizeMismatchError {
                    cid,
                    expected,
                    received,
                })
            }
            _ => Ok(()),
        }
    }

    /// Returns the next non-empty chunk of the file, `None` once the walk is over.
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, Error> {
        loop {
            let visit = match self.root.take() {
                Some(root) => root,
                None => {
                    let Some(frame) = self.stack.last_mut() else {
                        return Ok(None);
                    };
                    match frame.links.next() {
                        Some(link) => Visit {
                            cid: link.cid,
                            parent: Some(frame.cid),
                            expected: link.size,
                        },
                        None => {
                            if let Some(frame) = self.stack.pop() {
                                self.check_size(
                                    frame.cid,
                                    frame.expected,
                                    self.position - frame.start,
                                )?;
                            }
                            continue;
                        }
                    }
                }
            };

            if self.stack.len() > self.reconstructor.max_depth {
                return Err(Error::MaxDepthExceededError {
                    cid: visit.cid,
                    max_depth: self.reconstructor.max_depth,
                });
            }
            if self.reconstructor.cancellation.is_cancelled() {
                return Err(Error::CancelledError);
            }

            let block = self.reconstructor.store.get(&visit.cid).await?;
            let node = DagNode::decode(&visit.cid, block)?;
            trace!(cid = %visit.cid, depth = self.stack.len(), "visiting node");

            match node {
                DagNode::Unsupported(node_type) => {
                    return Err(match visit.parent {
                        None => Error::UnsupportedNodeTypeError {
                            cid: visit.cid,
                            node_type,
                        },
                        Some(parent) => Error::UnsupportedFileShapeError {
                            cid: visit.cid,
                            parent,
                            node_type,
                        },
                    });
                }
                DagNode::Leaf(data) => {
                    self.check_size(visit.cid, visit.expected, data.len() as u64)?;
                    self.position += data.len() as u64;
                    if !data.is_empty() {
                        return Ok(Some(data));
                    }
                }
                DagNode::Internal {
                    data,
                    links,
                    filesize,
                } => {
                    if let (Some(expected), Some(filesize)) = (visit.expected, filesize) {
                        self.check_size(visit.cid, Some(expected), filesize)?;
                    }
                    self.stack.push(Frame {
                        cid: visit.cid,
                        links: links.into_iter(),
                        start: self.position,
                        expected: visit.expected.or(filesize),
                    });
                    if let Some(data) = data {
                        self.position += data.len() as u64;
                        return Ok(Some(data));
                    }
                }
            }
        }
    }
}
