use std::io;

use tracing_subscriber::filter::FromEnvError;

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error(transparent)]
    DecarError(#[from] decar::Error),
    #[error(transparent)]
    IoError(#[from] io::Error),
    #[error("output file {0} already exists, use --overwrite to replace it")]
    OutputExistsError(String),
    #[error("archive path {0} has no file name to derive the output name from")]
    InvalidArchivePathError(String),
    #[error(transparent)]
    EnvFilterError(#[from] FromEnvError),
}
