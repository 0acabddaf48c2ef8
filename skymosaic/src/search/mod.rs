//! Upstream scene search.
//!
//! [`SearchRequest`] builds the filter tree sent to the quick-search
//! endpoint, [`SearchClient`] sends it under a shared [`AdmissionLimiter`]
//! with deadline-bounded retries, and [`SearchResponse`] carries the decoded
//! [`Feature`]s back, newest acquisition first.

mod backoff;
mod client;
mod filter;
mod limiter;
mod types;

pub use backoff::Backoff;
pub use client::SearchClient;
pub use filter::{
    Filter, SearchRequest, FIELD_ACQUIRED, FIELD_GEOMETRY, FIELD_SATELLITE_ID,
    SATELLITE_PASS_WINDOW_HOURS,
};
pub use limiter::{AdmissionLimiter, AdmissionPermit};
pub use types::{Feature, FeatureList, GeoJsonGeometry, Properties, SearchResponse};
