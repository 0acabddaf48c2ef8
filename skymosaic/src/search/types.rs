//! Search response types.
//!
//! Footprints arrive as GeoJSON and are decoded straight into planar
//! multipolygons so coverage and cache code never see the wire format.

use chrono::{DateTime, Utc};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::coord::Bound;

/// Shared, immutable list of decoded features.
pub type FeatureList = Arc<Vec<Feature>>;

/// GeoJSON geometry restricted to the areal types scenes are described with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum GeoJsonGeometry {
    Polygon(Vec<Vec<Vec<f64>>>),
    MultiPolygon(Vec<Vec<Vec<Vec<f64>>>>),
}

impl GeoJsonGeometry {
    /// Closed rectangular polygon covering the bound.
    pub fn from_bound(bound: &Bound) -> Self {
        Self::from_multi_polygon(&bound.to_multi_polygon())
    }

    /// Encodes a multipolygon, collapsing a single member to `Polygon`.
    pub fn from_multi_polygon(polygon: &MultiPolygon<f64>) -> Self {
        match polygon.0.as_slice() {
            [single] => Self::Polygon(encode_polygon(single)),
            many => Self::MultiPolygon(many.iter().map(encode_polygon).collect()),
        }
    }

    /// Decodes into a planar multipolygon.
    pub fn to_multi_polygon(&self) -> Result<MultiPolygon<f64>, String> {
        match self {
            Self::Polygon(rings) => Ok(MultiPolygon::new(vec![decode_polygon(rings)?])),
            Self::MultiPolygon(polygons) => polygons
                .iter()
                .map(|rings| decode_polygon(rings))
                .collect::<Result<Vec<_>, _>>()
                .map(MultiPolygon::new),
        }
    }
}

fn encode_polygon(polygon: &Polygon<f64>) -> Vec<Vec<Vec<f64>>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(|ring| ring.coords().map(|c| vec![c.x, c.y]).collect())
        .collect()
}

fn decode_polygon(rings: &[Vec<Vec<f64>>]) -> Result<Polygon<f64>, String> {
    let mut rings = rings.iter().map(|ring| decode_ring(ring));
    let exterior = rings
        .next()
        .ok_or_else(|| "polygon has no rings".to_string())??;
    let interiors = rings.collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn decode_ring(ring: &[Vec<f64>]) -> Result<LineString<f64>, String> {
    ring.iter()
        .map(|position| match position.as_slice() {
            [x, y, ..] => Ok(Coord { x: *x, y: *y }),
            _ => Err(format!("position has {} values", position.len())),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(LineString::new)
}

/// Scene metadata used for selection, grouping and display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Properties {
    pub acquired: DateTime<Utc>,
    #[serde(default)]
    pub published: Option<DateTime<Utc>>,
    #[serde(default)]
    pub clear_percent: f64,
    #[serde(default)]
    pub visible_percent: f64,
    #[serde(default)]
    pub cloud_percent: f64,
    #[serde(default)]
    pub satellite_id: String,
    #[serde(default)]
    pub pixel_resolution: f64,
}

/// One upstream scene with its decoded footprint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "WireFeature")]
pub struct Feature {
    pub id: String,
    pub footprint: MultiPolygon<f64>,
    pub properties: Properties,
}

#[derive(Deserialize)]
struct WireFeature {
    id: String,
    geometry: GeoJsonGeometry,
    properties: Properties,
}

impl TryFrom<WireFeature> for Feature {
    type Error = String;

    fn try_from(wire: WireFeature) -> Result<Self, Self::Error> {
        let footprint = wire
            .geometry
            .to_multi_polygon()
            .map_err(|e| format!("feature {}: {}", wire.id, e))?;
        Ok(Self {
            id: wire.id,
            footprint,
            properties: wire.properties,
        })
    }
}

/// Decoded quick-search response, features newest first.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub features: Vec<Feature>,
}
