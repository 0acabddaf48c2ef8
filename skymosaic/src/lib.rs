//! skymosaic - map tiles assembled on demand from Planet satellite scenes
//!
//! Given a slippy-map tile and a selector (a scene id, a calendar date or a
//! satellite pass), the library searches the Planet Data API for scenes over
//! the tile, picks the fewest newest scenes that cover it, fetches their tiles
//! in parallel and composites them into one RGBA image.
//!
//! # High-Level API
//!
//! For most use cases, the [`service`] module provides a simplified facade:
//!
//! ```ignore
//! use skymosaic::service::{MosaicService, ServiceConfig};
//! use skymosaic::orchestrator::{Selector, TileQuery};
//! use skymosaic::coord::TileCoord;
//!
//! let service = MosaicService::new(ServiceConfig::builder().api_key(key).build())?;
//! let query = TileQuery::new(TileCoord::new(4093, 2723, 13)?, Selector::Date(date));
//! let image = service.tile(&query, &cancel).await?;
//! ```

pub mod cache;
pub mod config;
pub mod coord;
pub mod coverage;
pub mod error;
pub mod fetch;
pub mod geometry;
pub mod http;
pub mod logging;
pub mod metadata;
pub mod orchestrator;
pub mod search;
pub mod service;

pub use error::{ErrorKind, MosaicError, Result, ValidationError};

/// Version of the skymosaic library and CLI.
///
/// Synchronized across the workspace and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
