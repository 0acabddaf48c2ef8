//! Configuration types for skymosaic components.
//!
//! Runtime components take small builder-style config structs
//! ([`SearchConfig`], [`FetchConfig`], [`CacheConfig`],
//! [`OrchestratorConfig`]). The user-editable INI file is loaded into a
//! [`ConfigFile`], which the service layer turns into those structs.
//!
//! # Example
//!
//! ```
//! use skymosaic::config::{CacheConfig, SearchConfig};
//! use std::time::Duration;
//!
//! let search = SearchConfig::default().with_max_concurrent(1);
//! let cache = CacheConfig::default().with_ttl(Duration::from_secs(60));
//! assert_eq!(search.max_concurrent(), 1);
//! assert_eq!(cache.ttl(), Duration::from_secs(60));
//! ```

pub mod defaults;
mod fetch;
mod file;
mod parser;
mod search;
mod settings;
mod tiles;

pub use defaults::*;
pub use fetch::FetchConfig;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use search::SearchConfig;
pub use settings::{
    CacheSettings, ConfigFile, FetchSettings, LoggingSettings, PlanetSettings, SearchSettings,
    TileSettings,
};
pub use tiles::{offset_from_minutes, CacheConfig, OrchestratorConfig};
