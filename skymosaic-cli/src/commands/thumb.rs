//! Thumb command - save a scene thumbnail.

use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use crate::error::CliError;
use crate::runner::{CliRunner, GlobalOptions};

/// Arguments for the thumb command.
pub struct ThumbArgs {
    pub id: String,
    pub output: Option<PathBuf>,
}

impl ThumbArgs {
    /// Defaults to `<id>.png` in the working directory.
    fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}.png", self.id)))
    }
}

/// Run the thumb command.
pub fn run(options: &GlobalOptions, args: ThumbArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(options)?;
    runner.log_startup("thumb");

    let service = runner.create_service()?;
    let bytes = runner
        .block_on(service.thumbnail(&args.id, &CancellationToken::new()))
        .map_err(CliError::Thumbnail)?;

    runner.write_output(&args.output_path(), &bytes)
}
