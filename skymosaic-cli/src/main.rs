//! skymosaic CLI - Command-line interface
//!
//! Renders satellite mosaic tiles, lists recent scenes and saves scene
//! thumbnails using the skymosaic library.

mod commands;
mod error;
mod runner;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::search::{GroupByArg, SearchArgs};
use commands::thumb::ThumbArgs;
use commands::tile::TileArgs;
use runner::GlobalOptions;

#[derive(Parser)]
#[command(name = "skymosaic")]
#[command(version = skymosaic::VERSION)]
#[command(about = "Map tiles assembled from Planet satellite scenes", long_about = None)]
struct Cli {
    /// Planet API key (overrides PLANET_API_KEY and config.ini)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Config file (default: ~/.skymosaic/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging, mirrored to stdout
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one tile to a PNG file
    ///
    /// Pick the scenes with exactly one of --id, --date or
    /// --satellite-id plus --ts.
    Tile {
        /// Zoom level
        #[arg(short)]
        z: String,

        /// Tile column
        #[arg(short)]
        x: String,

        /// Tile row
        #[arg(short)]
        y: String,

        /// Render a single scene
        #[arg(long)]
        id: Option<String>,

        /// Mosaic of the scenes acquired on a date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,

        /// Mosaic of one satellite's pass (requires --ts)
        #[arg(long)]
        satellite_id: Option<String>,

        /// Unix timestamp of the satellite pass
        #[arg(long)]
        ts: Option<String>,

        /// Output PNG path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// List scenes from the last days around a point as JSON
    Search {
        /// Latitude in decimal degrees
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        /// Longitude in decimal degrees
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,

        /// Zoom level of the search region (raised to the configured floor)
        #[arg(long, default_value = "12")]
        zoom: u8,

        /// Merge results by date or satellite pass
        #[arg(long, value_enum, default_value = "none")]
        group_by: GroupByArg,

        /// Write JSON to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Save a scene thumbnail
    Thumb {
        /// Scene id
        id: String,

        /// Output PNG path (default: <id>.png)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    let options = GlobalOptions {
        api_key: cli.api_key,
        config: cli.config,
        verbose: cli.verbose,
    };

    let result = match cli.command {
        Commands::Tile {
            z,
            x,
            y,
            id,
            date,
            satellite_id,
            ts,
            output,
        } => commands::tile::run(
            &options,
            TileArgs {
                z,
                x,
                y,
                id,
                date,
                satellite_id,
                ts,
                output,
            },
        ),
        Commands::Search {
            lat,
            lng,
            zoom,
            group_by,
            output,
        } => commands::search::run(
            &options,
            SearchArgs {
                lat,
                lng,
                zoom,
                group_by,
                output,
            },
        ),
        Commands::Thumb { id, output } => {
            commands::thumb::run(&options, ThumbArgs { id, output })
        }
    };

    if let Err(e) = result {
        e.exit();
    }
}
