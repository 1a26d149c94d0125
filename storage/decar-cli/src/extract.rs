use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use decar::{extract_file, CancellationToken, Config, ExtractSummary};
use tokio::{
    fs::{File, OpenOptions},
    io::{BufReader, BufWriter},
};

use crate::error::Error;

/// Resolve the extracted file path.
///
/// An `output_path` without extension is a directory, the file inside it is named after
/// the archive without its last extension (`photo.jpg.car` is extracted to `photo.jpg`).
pub(crate) fn derive_output_path(input_path: &Path, output_path: &Path) -> Result<PathBuf, Error> {
    if output_path.extension().is_some() {
        return Ok(output_path.to_path_buf());
    }

    let file_stem = input_path
        .file_stem()
        .ok_or_else(|| Error::InvalidArchivePathError(input_path.display().to_string()))?;
    Ok(output_path.join(file_stem))
}

/// Extracts the file stored in the CAR file at `input_path` to `output_path`.
///
/// Missing parent directories are created. If the extraction fails,
/// the partially written output is removed.
pub(crate) async fn extract_file_from_car(
    input_path: &Path,
    output_path: &Path,
    overwrite: bool,
    config: Config,
    cancellation_token: CancellationToken,
) -> Result<ExtractSummary, Error> {
    let source_file = File::open(input_path).await?;

    if let Some(parent) = output_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let output_file = if overwrite {
        File::create(output_path).await?
    } else {
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(output_path)
            .await
            .map_err(|err| match err.kind() {
                ErrorKind::AlreadyExists => {
                    Error::OutputExistsError(output_path.display().to_string())
                }
                _ => Error::IoError(err),
            })?
    };

    let result = extract_file(
        BufReader::new(source_file),
        BufWriter::new(output_file),
        config,
        cancellation_token,
    )
    .await;

    match result {
        Ok(summary) => Ok(summary),
        Err(err) => {
            if let Err(remove_err) = tokio::fs::remove_file(output_path).await {
                tracing::warn!(
                    %remove_err,
                    output = %output_path.display(),
                    "failed to remove the partially extracted file"
                );
            }
            Err(err.into())
        }
    }
}
