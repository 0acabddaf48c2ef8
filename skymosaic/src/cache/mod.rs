//! In-memory caching of search results.
//!
//! Results are grouped by a caller-defined key (a calendar date, a satellite
//! pass) through [`KeyedCacheRegistry`]; within a group, [`RegionCache`]
//! answers tiles whose bound is contained in a recently searched region and
//! coalesces concurrent searches for overlapping regions.
//!
//! The cache is per process and time-bounded only.

mod region;
mod registry;

pub use region::{CacheStats, Claim, InFlightSearch, RegionCache, Watcher};
pub use registry::KeyedCacheRegistry;
