//! Search command - list recent scenes around a point as JSON.

use clap::ValueEnum;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use skymosaic::metadata::{GroupBy, SceneSummary};

use crate::error::CliError;
use crate::runner::{CliRunner, GlobalOptions};

/// Result grouping for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum GroupByArg {
    /// One entry per scene
    #[default]
    None,
    /// Merge scenes acquired on the same date
    Date,
    /// Merge scenes from the same satellite pass
    Satellite,
}

impl From<GroupByArg> for GroupBy {
    fn from(arg: GroupByArg) -> Self {
        match arg {
            GroupByArg::None => GroupBy::None,
            GroupByArg::Date => GroupBy::Date,
            GroupByArg::Satellite => GroupBy::Satellite,
        }
    }
}

/// Arguments for the search command.
pub struct SearchArgs {
    pub lat: f64,
    pub lng: f64,
    pub zoom: u8,
    pub group_by: GroupByArg,
    pub output: Option<PathBuf>,
}

/// Run the search command.
pub fn run(options: &GlobalOptions, args: SearchArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(options)?;
    runner.log_startup("search");

    let service = runner.create_service()?;
    let summaries = runner
        .block_on(service.search_scenes(
            args.lat,
            args.lng,
            args.zoom,
            args.group_by.into(),
            &CancellationToken::new(),
        ))
        .map_err(CliError::Search)?;

    let json = render(&summaries)?;
    match &args.output {
        Some(path) => runner.write_output(path, json.as_bytes()),
        None => {
            println!("{}", json);
            Ok(())
        }
    }
}

/// Renders summaries in the `{"results": [...]}` envelope.
fn render(summaries: &[SceneSummary]) -> Result<String, CliError> {
    serde_json::to_string_pretty(&serde_json::json!({ "results": summaries }))
        .map_err(|e| CliError::Output(e.to_string()))
}
