//! CLI command implementations.
//!
//! - [`tile`] - Render one tile to a PNG file
//! - [`search`] - List recent scenes around a point
//! - [`thumb`] - Save a scene thumbnail

pub mod search;
pub mod thumb;
pub mod tile;
