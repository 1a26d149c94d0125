//! Extract the original file out of a CAR archive.
#![deny(clippy::unwrap_used)]

use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use decar::{CancellationToken, Cid, Config};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{
    error::Error,
    extract::{derive_output_path, extract_file_from_car},
};

mod error;
mod extract;

/// Extract the file stored in a CARv1 or CARv2 archive.
#[derive(Parser)]
#[command(name = "decar", version)]
struct DecarCli {
    /// Path to the CAR file
    archive_path: PathBuf,

    /// Path to the extracted file.
    /// If it has no extension, it is used as a directory and the file is named
    /// after the archive, without its last extension.
    output_path: PathBuf,

    /// Extract this root instead of the first one declared by the archive
    #[arg(long)]
    root: Option<Cid>,

    /// Replace the output file if it exists
    #[arg(long)]
    overwrite: bool,

    /// Do not check subtree sizes against the sizes declared by their parents
    #[arg(long)]
    no_verify_sizes: bool,

    /// Stop reading the archive at the first zero length section, instead of failing
    #[arg(long)]
    zero_length_as_eof: bool,
}

impl DecarCli {
    fn config(&self) -> Config {
        Config::default()
            .with_verify_sizes(!self.no_verify_sizes)
            .with_zero_length_section_as_eof(self.zero_length_as_eof)
            .with_root(self.root)
    }

    async fn run(self) -> Result<(), Error> {
        let output_path = derive_output_path(&self.archive_path, &self.output_path)?;

        let cancellation_token = CancellationToken::new();
        let signal_task = tokio::spawn({
            let cancellation_token = cancellation_token.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("interrupt received, cancelling extraction");
                    cancellation_token.cancel();
                }
            }
        });

        let result = extract_file_from_car(
            &self.archive_path,
            &output_path,
            self.overwrite,
            self.config(),
            cancellation_token,
        )
        .await;
        signal_task.abort();

        let summary = result?;
        tracing::info!(
            root = %summary.root,
            bytes_written = summary.bytes_written,
            output = %output_path.display(),
            "file extracted"
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = DecarCli::parse();

    // Logger initialization.
    let filter = match EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env()
    {
        Ok(filter) => filter,
        Err(err) => {
            eprintln!("invalid log filter: {}", Error::from(err));
            return ExitCode::FAILURE;
        }
    };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "extraction failed");
            ExitCode::FAILURE
        }
    }
}
