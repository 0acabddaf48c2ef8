//! Tile command - render a single tile to a PNG file.

use std::path::PathBuf;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use skymosaic::orchestrator::TileParams;

use crate::error::CliError;
use crate::runner::{CliRunner, GlobalOptions};

/// Arguments for the tile command.
pub struct TileArgs {
    pub z: String,
    pub x: String,
    pub y: String,
    pub id: Option<String>,
    pub date: Option<String>,
    pub satellite_id: Option<String>,
    pub ts: Option<String>,
    pub output: PathBuf,
}

impl TileArgs {
    fn params(&self) -> TileParams<'_> {
        TileParams {
            z: &self.z,
            x: &self.x,
            y: &self.y,
            id: self.id.as_deref(),
            date: self.date.as_deref(),
            satellite_id: self.satellite_id.as_deref(),
            ts: self.ts.as_deref(),
        }
    }
}

/// Run the tile command.
pub fn run(options: &GlobalOptions, args: TileArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(options)?;
    runner.log_startup("tile");

    let service = runner.create_service()?;
    let query = service
        .parse_tile_query(&args.params())
        .map_err(CliError::Tile)?;

    println!("Rendering tile {} ({})", query.tile, query.selector);
    let start = Instant::now();

    let png = runner
        .block_on(service.tile_png(&query, &CancellationToken::new()))
        .map_err(CliError::Tile)?;

    println!("Rendered in {:.2}s", start.elapsed().as_secs_f64());
    runner.write_output(&args.output, &png)
}
