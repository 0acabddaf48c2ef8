//! Scene summaries for a map region.
//!
//! A metadata search covers the tile under a point, padded by a few tiles,
//! over the last days. Results can be flattened so that scenes sharing a
//! calendar date, or a single satellite pass, are reported as one entry.

use chrono::{DateTime, Duration, FixedOffset, Utc};
use geo::MultiPolygon;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::config::OrchestratorConfig;
use crate::coord::{to_tile_coords, MAX_ZOOM};
use crate::error::ValidationError;
use crate::geometry;
use crate::search::{Feature, GeoJsonGeometry, SearchRequest, SATELLITE_PASS_WINDOW_HOURS};

/// How search results are flattened before they are reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GroupBy {
    /// One entry per scene
    #[default]
    None,
    /// One entry per local calendar date
    Date,
    /// One entry per satellite pass
    Satellite,
}

impl FromStr for GroupBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(GroupBy::None),
            "date" => Ok(GroupBy::Date),
            "satellite" => Ok(GroupBy::Satellite),
            other => Err(format!(
                "unknown grouping {:?} (expected none, date or satellite)",
                other
            )),
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GroupBy::None => "none",
            GroupBy::Date => "date",
            GroupBy::Satellite => "satellite",
        };
        f.write_str(name)
    }
}

/// One reported scene, or one group of merged scenes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneSummary {
    /// Id of the first scene of the group
    pub id: String,
    pub thumb: String,
    pub acquired: DateTime<Utc>,
    pub visible_percent: f64,
    pub clear_percent: f64,
    pub cloud_percent: f64,
    /// Dropped when scenes from different passes were merged
    pub geometry: Option<GeoJsonGeometry>,
    /// Empty when scenes from different passes were merged
    pub satellite_id: String,
    pub tile_name: String,
    pub tile_url: String,
}

/// Builds the search for scenes around a point.
///
/// The zoom is raised to the configured floor, the tile under the point is
/// padded like a mosaic search, and the window ends at `now`.
pub fn region_request(
    lat: f64,
    lng: f64,
    zoom: u8,
    now: DateTime<Utc>,
    config: &OrchestratorConfig,
    item_type: &str,
) -> Result<SearchRequest, ValidationError> {
    let zoom = zoom.max(config.min_search_zoom()).min(MAX_ZOOM);
    let tile = to_tile_coords(lat, lng, zoom).map_err(|_| ValidationError::InvalidCoordinates {
        lat: lat.to_string(),
        lng: lng.to_string(),
    })?;

    let bound = tile.padded_bound(config.bound_padding());
    let start = now - Duration::days(config.search_window_days());
    Ok(SearchRequest::region(bound, start, now, item_type))
}

/// Flattens `features` (newest first) per `group_by` and renders summaries.
///
/// Dates are calendar dates in `offset`.
pub fn summarize(features: &[Feature], group_by: GroupBy, offset: FixedOffset) -> Vec<SceneSummary> {
    let scenes = features.iter().map(Group::from);
    let groups = match group_by {
        GroupBy::None => scenes.collect(),
        GroupBy::Date => flatten(scenes, |a, b| a.date(offset) == b.date(offset)),
        GroupBy::Satellite => flatten(scenes, Group::same_pass),
    };

    groups
        .into_iter()
        .map(|group| group.into_summary(offset))
        .collect()
}

/// Running merge of one or more scenes.
#[derive(Debug, Clone)]
struct Group {
    id: String,
    acquired: DateTime<Utc>,
    visible_percent: f64,
    clear_percent: f64,
    cloud_percent: f64,
    footprint: Option<MultiPolygon<f64>>,
    satellite_id: String,
}

impl From<&Feature> for Group {
    fn from(feature: &Feature) -> Self {
        let p = &feature.properties;
        Self {
            id: feature.id.clone(),
            acquired: p.acquired,
            visible_percent: p.visible_percent,
            clear_percent: p.clear_percent,
            cloud_percent: p.cloud_percent,
            footprint: Some(feature.footprint.clone()),
            satellite_id: p.satellite_id.clone(),
        }
    }
}

impl Group {
    fn date(&self, offset: FixedOffset) -> String {
        self.acquired
            .with_timezone(&offset)
            .format("%Y-%m-%d")
            .to_string()
    }

    /// Same satellite and acquired less than the pass window apart.
    fn same_pass(&self, other: &Group) -> bool {
        let delta = (self.acquired - other.acquired).abs();
        self.satellite_id == other.satellite_id
            && delta < Duration::hours(SATELLITE_PASS_WINDOW_HOURS)
    }

    fn merge(&mut self, other: Group) {
        let same_pass = self.same_pass(&other);

        self.acquired = self.acquired.max(other.acquired);
        self.visible_percent = self.visible_percent.max(other.visible_percent);
        self.clear_percent = self.clear_percent.max(other.clear_percent);
        self.cloud_percent = self.cloud_percent.min(other.cloud_percent);

        if same_pass {
            self.footprint = match (self.footprint.take(), other.footprint) {
                (Some(a), Some(b)) => Some(geometry::union(&a, &b)),
                _ => None,
            };
        } else {
            self.footprint = None;
            self.satellite_id.clear();
        }
    }

    fn into_summary(self, offset: FixedOffset) -> SceneSummary {
        let date = self.date(offset);
        SceneSummary {
            thumb: format!("/api/thumb/{}.png", self.id),
            tile_name: format!("Planet {}", date),
            tile_url: format!("/api/tile/{{z}}/{{x}}/{{y}}.png?date={}", date),
            geometry: self
                .footprint
                .as_ref()
                .map(GeoJsonGeometry::from_multi_polygon),
            id: self.id,
            acquired: self.acquired,
            visible_percent: self.visible_percent,
            clear_percent: self.clear_percent,
            cloud_percent: self.cloud_percent,
            satellite_id: self.satellite_id,
        }
    }
}

/// Merges each scene into the most recent earlier group it matches, or
/// starts a new group.
fn flatten<I, F>(scenes: I, matches: F) -> Vec<Group>
where
    I: IntoIterator<Item = Group>,
    F: Fn(&Group, &Group) -> bool,
{
    let mut groups: Vec<Group> = Vec::new();
    for scene in scenes {
        match groups.iter_mut().rev().find(|group| matches(&scene, group)) {
            Some(group) => group.merge(scene),
            None => groups.push(scene),
        }
    }
    groups
}
