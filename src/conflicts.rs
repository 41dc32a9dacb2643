//! Detection of crossings and overlaps between simplified segments, and the
//! state which carries detected conflicts from one pass to the next.

use crate::boundary_segment::BoundarySegment;
use crate::osm_types::{Location, OsmWayId};
use log::debug;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Parametric slack when deciding whether an intersection lies on both
/// segments. On a 100 km baseline this is about 1 cm.
pub const INTERSECTION_TOLERANCE: f64 = 1e-7;

/// A simplified span of a way which crosses or overlaps another segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConflictRecord {
    pub start_offset: usize,
    pub end_offset: usize,
    pub location: Location,
    pub processed: bool,
}

/// All conflict records of a run, grouped by way.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ConflictLog {
    records: BTreeMap<OsmWayId, Vec<ConflictRecord>>,
}

impl ConflictLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, segment: &BoundarySegment, location: Location) {
        self.records
            .entry(segment.way_id())
            .or_default()
            .push(ConflictRecord {
                start_offset: segment.start_offset(),
                end_offset: segment.end_offset(),
                location,
                processed: false,
            });
    }

    /// Total number of records, processed or not.
    pub fn len(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self, way_id: OsmWayId) -> &[ConflictRecord] {
        self.records.get(&way_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Ways with at least one unprocessed record.
    pub fn pending_ways(&self) -> Vec<OsmWayId> {
        self.records
            .iter()
            .filter(|(_, records)| records.iter().any(|r| !r.processed))
            .map(|(way_id, _)| *way_id)
            .collect()
    }

    /// Mark every unprocessed record of `way_id` as processed and return
    /// their distinct spans sorted by (start, end).
    pub fn take_pending(&mut self, way_id: OsmWayId) -> Vec<(usize, usize)> {
        let Some(records) = self.records.get_mut(&way_id) else {
            return Vec::new();
        };

        let mut spans = Vec::new();
        for record in records.iter_mut().filter(|r| !r.processed) {
            record.processed = true;
            spans.push((record.start_offset, record.end_offset));
        }
        spans.sort_unstable();
        spans.dedup();
        spans
    }
}

/// Node offsets per way which every later pass has to keep. Entries are
/// never removed.
#[derive(Debug, Default, Clone, Serialize)]
pub struct KeepSet {
    offsets: BTreeMap<OsmWayId, BTreeSet<usize>>,
}

impl KeepSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the offset was not kept before.
    pub fn insert(&mut self, way_id: OsmWayId, offset: usize) -> bool {
        self.offsets.entry(way_id).or_default().insert(offset)
    }

    pub fn contains(&self, way_id: OsmWayId, offset: usize) -> bool {
        self.offsets
            .get(&way_id)
            .is_some_and(|offsets| offsets.contains(&offset))
    }

    pub fn offsets(&self, way_id: OsmWayId) -> impl Iterator<Item = usize> + '_ {
        self.offsets.get(&way_id).into_iter().flatten().copied()
    }

    pub fn len_for(&self, way_id: OsmWayId) -> usize {
        self.offsets.get(&way_id).map_or(0, BTreeSet::len)
    }

    pub fn len(&self) -> usize {
        self.offsets.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn cross(ax: i128, ay: i128, bx: i128, by: i128) -> i128 {
    ax * by - ay * bx
}

/// Planar intersection of two segments in lon/lat space.
///
/// Segments sharing an endpoint never intersect. Parallel segments only
/// intersect if they are collinear and overlap, in which case the first
/// point of `s1` is reported.
pub fn intersection(s1: &BoundarySegment, s2: &BoundarySegment) -> Option<Location> {
    if s1.has_endpoint(s2.first()) || s1.has_endpoint(s2.second()) {
        return None;
    }

    let (p1, p2) = (s1.first(), s1.second());
    let (q1, q2) = (s2.first(), s2.second());

    let d1 = (p2.lon as i128 - p1.lon as i128, p2.lat as i128 - p1.lat as i128);
    let d2 = (q2.lon as i128 - q1.lon as i128, q2.lat as i128 - q1.lat as i128);
    let w = (q1.lon as i128 - p1.lon as i128, q1.lat as i128 - p1.lat as i128);

    // zero-length segments come from repeated node locations
    if d1 == (0, 0) || d2 == (0, 0) {
        return None;
    }

    let denominator = cross(d1.0, d1.1, d2.0, d2.1);
    if denominator == 0 {
        if cross(w.0, w.1, d1.0, d1.1) != 0 {
            return None;
        }
        // collinear, compare projections onto s1
        let length = d1.0 * d1.0 + d1.1 * d1.1;
        let t0 = w.0 * d1.0 + w.1 * d1.1;
        let t1 = (q2.lon as i128 - p1.lon as i128) * d1.0 + (q2.lat as i128 - p1.lat as i128) * d1.1;
        if t0.max(t1) >= 0 && t0.min(t1) <= length {
            return Some(p1);
        }
        return None;
    }

    let denominator = denominator as f64;
    let r = cross(w.0, w.1, d2.0, d2.1) as f64 / denominator;
    let s = cross(w.0, w.1, d1.0, d1.1) as f64 / denominator;

    let on_segment = |t: f64| (-INTERSECTION_TOLERANCE..=1.0 + INTERSECTION_TOLERANCE).contains(&t);
    if !on_segment(r) || !on_segment(s) {
        return None;
    }

    Some(Location::new(
        (p1.lon as f64 + r * d1.0 as f64).round() as i32,
        (p1.lat as f64 + r * d1.1 as f64).round() as i32,
    ))
}

fn y_ranges_overlap(s1: &BoundarySegment, s2: &BoundarySegment) -> bool {
    let (min1, max1) = s1.y_range();
    let (min2, max2) = s2.y_range();
    min1 <= max2 && min2 <= max1
}

/// Sort `segments` and record every simplified segment which duplicates or
/// crosses another one. Recorded segments are deactivated for the rest of
/// the scan.
///
/// Returns the number of records added to `log`.
pub fn detect_conflicts(segments: &mut [BoundarySegment], log: &mut ConflictLog) -> usize {
    segments.sort();
    let mut found = 0;

    for i in 0..segments.len() {
        if !segments[i].active() {
            continue;
        }

        for j in i + 1..segments.len() {
            let s2 = segments[j];
            if !s2.active() {
                continue;
            }
            let s1 = segments[i];

            if s1 == s2 {
                if s1.omitted_count() > 0 {
                    log.record(&s1, s1.first());
                    segments[i].deactivate();
                    found += 1;
                }
                if s2.omitted_count() > 0 {
                    log.record(&s2, s1.first());
                    segments[j].deactivate();
                    found += 1;
                }
                continue;
            }

            let (_, s1_max_x) = s1.x_range();
            let (s2_min_x, _) = s2.x_range();
            if s2_min_x > s1_max_x {
                break;
            }
            if !y_ranges_overlap(&s1, &s2) {
                continue;
            }

            let Some(location) = intersection(&s1, &s2) else {
                continue;
            };
            debug!(
                "{} [{}, {}] meets {} [{}, {}] at {}",
                s1.way_id(),
                s1.start_offset(),
                s1.end_offset(),
                s2.way_id(),
                s2.start_offset(),
                s2.end_offset(),
                location
            );

            if !s1.has_endpoint(location) && s1.omitted_count() > 0 {
                log.record(&s1, location);
                segments[i].deactivate();
                found += 1;
            }
            if !s2.has_endpoint(location) && s2.omitted_count() > 0 {
                log.record(&s2, location);
                segments[j].deactivate();
                found += 1;
            }
        }
    }

    found
}
