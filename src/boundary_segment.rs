use crate::osm_types::{Location, OsmWayId};
use std::cmp::Ordering;

/// A straight piece of a simplified way, spanning the original node offsets
/// `[start_offset, end_offset]`.
///
/// Endpoints are stored in canonical order (`first <= second`) so that the
/// same chord emitted in opposite directions compares equal. Offsets are
/// always reported in way order regardless of canonicalisation.
#[derive(Debug, Clone, Copy)]
pub struct BoundarySegment {
    first: Location,
    second: Location,
    way_id: OsmWayId,
    /// offset belonging to `first`
    first_offset: usize,
    /// offset belonging to `second`
    second_offset: usize,
    reversed: bool,
    active: bool,
}

impl BoundarySegment {
    /// Panics if `start_offset >= end_offset`.
    pub fn new(
        start: Location,
        end: Location,
        way_id: OsmWayId,
        start_offset: usize,
        end_offset: usize,
    ) -> Self {
        assert!(
            start_offset < end_offset,
            "segment of {way_id} must span forward, got [{start_offset}, {end_offset}]"
        );

        if end < start {
            Self {
                first: end,
                second: start,
                way_id,
                first_offset: end_offset,
                second_offset: start_offset,
                reversed: true,
                active: true,
            }
        } else {
            Self {
                first: start,
                second: end,
                way_id,
                first_offset: start_offset,
                second_offset: end_offset,
                reversed: false,
                active: true,
            }
        }
    }

    pub fn first(&self) -> Location {
        self.first
    }

    pub fn second(&self) -> Location {
        self.second
    }

    pub fn way_id(&self) -> OsmWayId {
        self.way_id
    }

    pub fn start_offset(&self) -> usize {
        self.first_offset.min(self.second_offset)
    }

    pub fn end_offset(&self) -> usize {
        self.first_offset.max(self.second_offset)
    }

    /// Number of original nodes this segment stands in for.
    /// Zero means the segment is an unsimplified edge of the way.
    pub fn omitted_count(&self) -> usize {
        self.end_offset() - self.start_offset() - 1
    }

    pub fn reversed(&self) -> bool {
        self.reversed
    }

    pub fn active(&self) -> bool {
        self.active
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Longitude interval in 1e-7 degrees.
    pub fn x_range(&self) -> (i32, i32) {
        // canonical order sorts by lon first
        (self.first.lon, self.second.lon)
    }

    /// Latitude interval in 1e-7 degrees.
    pub fn y_range(&self) -> (i32, i32) {
        (
            self.first.lat.min(self.second.lat),
            self.first.lat.max(self.second.lat),
        )
    }

    pub fn has_endpoint(&self, location: Location) -> bool {
        self.first == location || self.second == location
    }
}

impl PartialEq for BoundarySegment {
    fn eq(&self, other: &Self) -> bool {
        self.first == other.first && self.second == other.second
    }
}

impl Eq for BoundarySegment {}

impl PartialOrd for BoundarySegment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BoundarySegment {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.first, self.second).cmp(&(other.first, other.second))
    }
}
