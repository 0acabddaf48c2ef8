//! High-level service facade for skymosaic operations.
//!
//! Wires the search client, tile fetcher, region caches and orchestrator
//! from one [`ServiceConfig`], following the Facade pattern.
//!
//! # Example
//!
//! ```ignore
//! use skymosaic::config::ConfigFile;
//! use skymosaic::metadata::GroupBy;
//! use skymosaic::service::{api_key_from_env, resolve_api_key, MosaicService, ServiceConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let file = ConfigFile::load()?;
//! let key = resolve_api_key(None, api_key_from_env(), file.planet.api_key.as_deref());
//! let service = MosaicService::new(ServiceConfig::from_config_file(&file).with_api_key(key))?;
//!
//! let scenes = service
//!     .search_scenes(37.7749, -122.4194, 13, GroupBy::Date, &CancellationToken::new())
//!     .await?;
//! ```

mod config;
mod error;
mod facade;

pub use config::{api_key_from_env, resolve_api_key, ServiceConfig, ServiceConfigBuilder};
pub use error::ServiceError;
pub use facade::MosaicService;
