//! Search filter tree and request builders.
//!
//! The upstream API accepts a nested JSON filter. Each variant serializes to
//! an object with a `type` tag; leaf filters also name the property they
//! apply to in `field_name`.

use chrono::{DateTime, Duration, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use super::types::GeoJsonGeometry;
use crate::coord::Bound;

/// Property holding the scene acquisition time.
pub const FIELD_ACQUIRED: &str = "acquired";
/// Property holding the scene footprint.
pub const FIELD_GEOMETRY: &str = "geometry";
/// Property holding the satellite identifier.
pub const FIELD_SATELLITE_ID: &str = "satellite_id";

/// Half-width, in hours, of the acquisition window used for satellite passes.
pub const SATELLITE_PASS_WINDOW_HOURS: i64 = 1;

/// A node in the upstream filter tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `gt < field <= lte`
    DateRange {
        field: String,
        gt: DateTime<Utc>,
        lte: DateTime<Utc>,
    },
    /// Field geometry intersects the bound
    GeometryIntersect { field: String, bound: Bound },
    /// Field equals one of the values
    FieldIn { field: String, values: Vec<String> },
    /// All children match
    And(Vec<Filter>),
}

#[derive(Serialize)]
struct DateRangeConfig<'a> {
    gt: &'a DateTime<Utc>,
    lte: &'a DateTime<Utc>,
}

impl Serialize for Filter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Filter::And(children) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "AndFilter")?;
                map.serialize_entry("config", children)?;
                map.end()
            }
            Filter::DateRange { field, gt, lte } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("type", "DateRangeFilter")?;
                map.serialize_entry("field_name", field)?;
                map.serialize_entry("config", &DateRangeConfig { gt, lte })?;
                map.end()
            }
            Filter::GeometryIntersect { field, bound } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("type", "GeometryFilter")?;
                map.serialize_entry("field_name", field)?;
                map.serialize_entry("config", &GeoJsonGeometry::from_bound(bound))?;
                map.end()
            }
            Filter::FieldIn { field, values } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("type", "StringInFilter")?;
                map.serialize_entry("field_name", field)?;
                map.serialize_entry("config", values)?;
                map.end()
            }
        }
    }
}

/// Body of a quick-search call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    pub filter: Filter,
    pub item_types: Vec<String>,
}

impl SearchRequest {
    /// Scenes intersecting `bound` acquired in `(start, end]`.
    pub fn region(
        bound: Bound,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        item_type: impl Into<String>,
    ) -> Self {
        Self {
            filter: Filter::And(vec![
                Filter::DateRange {
                    field: FIELD_ACQUIRED.to_string(),
                    gt: start,
                    lte: end,
                },
                Filter::GeometryIntersect {
                    field: FIELD_GEOMETRY.to_string(),
                    bound,
                },
            ]),
            item_types: vec![item_type.into()],
        }
    }

    /// Scenes intersecting `bound` acquired within the 24 hours from
    /// `day_start`.
    pub fn region_on_date(
        bound: Bound,
        day_start: DateTime<Utc>,
        item_type: impl Into<String>,
    ) -> Self {
        Self::region(bound, day_start, day_start + Duration::hours(24), item_type)
    }

    /// Scenes from one satellite intersecting `bound`, acquired within an
    /// hour either side of `timestamp`.
    pub fn satellite_pass(
        bound: Bound,
        satellite_id: &str,
        timestamp: DateTime<Utc>,
        item_type: impl Into<String>,
    ) -> Self {
        let window = Duration::hours(SATELLITE_PASS_WINDOW_HOURS);
        let mut request = Self::region(bound, timestamp - window, timestamp + window, item_type);
        if let Filter::And(children) = &mut request.filter {
            children.push(Filter::FieldIn {
                field: FIELD_SATELLITE_ID.to_string(),
                values: vec![satellite_id.to_string()],
            });
        }
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use geo::Coord;
    use serde_json::{json, Value};

    fn bound() -> Bound {
        Bound::new(Coord { x: -1.0, y: 50.0 }, Coord { x: 1.0, y: 52.0 })
    }

    fn day() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_region_on_date_shape() {
        let request = SearchRequest::region_on_date(bound(), day(), "PSScene4Band");
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["item_types"], json!(["PSScene4Band"]));
        assert_eq!(value["filter"]["type"], "AndFilter");

        let config = value["filter"]["config"].as_array().unwrap();
        assert_eq!(config.len(), 2);

        assert_eq!(config[0]["type"], "DateRangeFilter");
        assert_eq!(config[0]["field_name"], "acquired");
        assert_eq!(config[0]["config"]["gt"], "2024-03-01T00:00:00Z");
        assert_eq!(config[0]["config"]["lte"], "2024-03-02T00:00:00Z");

        assert_eq!(config[1]["type"], "GeometryFilter");
        assert_eq!(config[1]["field_name"], "geometry");
        assert_eq!(config[1]["config"]["type"], "Polygon");
    }

    #[test]
    fn test_geometry_filter_ring_is_closed() {
        let request = SearchRequest::region_on_date(bound(), day(), "PSScene4Band");
        let value = serde_json::to_value(&request).unwrap();
        let ring = &value["filter"]["config"][1]["config"]["coordinates"][0];
        let ring = ring.as_array().unwrap();

        assert_eq!(ring.len(), 5);
        assert_eq!(ring.first(), ring.last());
        assert!(ring.contains(&json!([-1.0, 50.0])));
        assert!(ring.contains(&json!([1.0, 52.0])));
    }

    #[test]
    fn test_satellite_pass_adds_field_filter() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap();
        let request = SearchRequest::satellite_pass(bound(), "0f2b", ts, "PSScene4Band");
        let value = serde_json::to_value(&request).unwrap();
        let config = value["filter"]["config"].as_array().unwrap();

        assert_eq!(config.len(), 3);
        assert_eq!(config[0]["config"]["gt"], "2024-03-01T09:30:00Z");
        assert_eq!(config[0]["config"]["lte"], "2024-03-01T11:30:00Z");
        assert_eq!(
            config[2],
            json!({
                "type": "StringInFilter",
                "field_name": "satellite_id",
                "config": ["0f2b"],
            })
        );
    }

    #[test]
    fn test_nested_and_serializes_recursively() {
        let filter = Filter::And(vec![Filter::And(vec![Filter::FieldIn {
            field: "x".into(),
            values: vec![],
        }])]);
        let value: Value = serde_json::to_value(&filter).unwrap();
        assert_eq!(value["config"][0]["config"][0]["type"], "StringInFilter");
    }
}
