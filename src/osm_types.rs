use geo_types::Point;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Typed wrapper for OSM node IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OsmNodeId(pub i64);

impl fmt::Display for OsmNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Typed wrapper for OSM way IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OsmWayId(pub i64);

impl fmt::Display for OsmWayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// Typed wrapper for OSM relation IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OsmRelationId(pub i64);

impl fmt::Display for OsmRelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Fixed-point WGS84 location in units of 1e-7 degrees, the same
/// representation OSM PBF files use for node coordinates.
///
/// Ordering is lexicographic on (lon, lat), so sorting by location sorts by
/// the lower x-bound first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct Location {
    pub lon: i32,
    pub lat: i32,
}

impl Location {
    pub const COORDINATE_PRECISION: f64 = 10_000_000.0;

    pub fn new(decimicro_lon: i32, decimicro_lat: i32) -> Self {
        Self {
            lon: decimicro_lon,
            lat: decimicro_lat,
        }
    }

    /// Round degree coordinates onto the 1e-7 grid.
    pub fn from_degrees(lon: f64, lat: f64) -> Self {
        Self {
            lon: (lon * Self::COORDINATE_PRECISION).round() as i32,
            lat: (lat * Self::COORDINATE_PRECISION).round() as i32,
        }
    }

    pub fn lon(&self) -> f64 {
        self.lon as f64 / Self::COORDINATE_PRECISION
    }

    pub fn lat(&self) -> f64 {
        self.lat as f64 / Self::COORDINATE_PRECISION
    }

    pub fn to_point(self) -> Point<f64> {
        Point::new(self.lon(), self.lat())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.7}, {:.7})", self.lon(), self.lat())
    }
}

/// A node reference of a way, resolved to its location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRef {
    pub id: OsmNodeId,
    pub location: Location,
}

impl NodeRef {
    pub fn new(id: OsmNodeId, location: Location) -> Self {
        Self { id, location }
    }
}

/// Administrative level of a boundary (`admin_level=*`).
/// OSM uses 2 for countries up to 11 for the smallest subdivisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AdminLevel(pub u8);

impl AdminLevel {
    pub const MIN: AdminLevel = AdminLevel(2);
    pub const MAX: AdminLevel = AdminLevel(11);

    pub fn new(level: u8) -> Option<Self> {
        let level = AdminLevel(level);
        (Self::MIN..=Self::MAX).contains(&level).then_some(level)
    }

    /// Parse an `admin_level` tag value. Values outside 2..=11 are rejected.
    pub fn from_tag(value: &str) -> Option<Self> {
        Self::new(value.trim().parse::<u8>().ok()?)
    }
}

impl fmt::Display for AdminLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A boundary way with its node sequence resolved to locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundaryWay {
    pub id: OsmWayId,
    pub nodes: Vec<NodeRef>,
    /// Original tags, passed through to the output unchanged
    pub tags: BTreeMap<String, String>,
}

impl BoundaryWay {
    pub fn new(id: OsmWayId, nodes: Vec<NodeRef>) -> Self {
        Self {
            id,
            nodes,
            tags: BTreeMap::new(),
        }
    }

    pub fn with_tags(mut self, tags: BTreeMap<String, String>) -> Self {
        self.tags = tags;
        self
    }

    /// A way is closed if its first and last node share id or location.
    pub fn is_closed(&self) -> bool {
        match (self.nodes.first(), self.nodes.last()) {
            (Some(first), Some(last)) if self.nodes.len() > 1 => {
                first.id == last.id || first.location == last.location
            }
            _ => false,
        }
    }
}
