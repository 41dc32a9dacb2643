use crate::boundary_segment::BoundarySegment;
use crate::conflicts::{ConflictLog, KeepSet};
use crate::geo_distance::distance_from_line;
use crate::osm_types::BoundaryWay;
use log::debug;

/// What a repair of a single way changed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RepairSummary {
    pub keep_additions: usize,
    pub reemitted: usize,
}

/// Offset of the node in `(start, end)` farthest from the chord
/// `start`–`end`. On ties the later node wins.
pub fn farthest_offset(way: &BoundaryWay, start: usize, end: usize) -> Option<usize> {
    let chord_start = way.nodes[start].location;
    let chord_end = way.nodes[end].location;
    let mut farthest = None;
    let mut largest_distance = 0.0;

    for i in start + 1..end {
        let distance = distance_from_line(chord_start, chord_end, way.nodes[i].location);
        if distance >= largest_distance {
            largest_distance = distance;
            farthest = Some(i);
        }
    }

    farthest
}

/// Split every pending conflict span of `way` at its farthest node.
///
/// The split node is added to `keep_set` and both halves are appended to
/// `segments`; spans which are original edges are appended unchanged.
/// Nothing is done if the way has no pending conflicts, or if every edge of
/// the way is in conflict.
pub fn repair_way(
    way: &BoundaryWay,
    log: &mut ConflictLog,
    keep_set: &mut KeepSet,
    segments: &mut Vec<BoundarySegment>,
) -> RepairSummary {
    let spans = log.take_pending(way.id);
    let mut summary = RepairSummary::default();

    if spans.is_empty() || spans.len() == way.nodes.len().saturating_sub(1) {
        return summary;
    }

    let location = |offset: usize| way.nodes[offset].location;

    for (start, end) in spans {
        if end >= way.nodes.len() {
            continue;
        }

        match farthest_offset(way, start, end) {
            Some(split) => {
                segments.push(BoundarySegment::new(location(start), location(split), way.id, start, split));
                segments.push(BoundarySegment::new(location(split), location(end), way.id, split, end));
                summary.reemitted += 2;
                if keep_set.insert(way.id, split) {
                    summary.keep_additions += 1;
                }
                debug!("{} keeps node {} of span [{}, {}]", way.id, split, start, end);
            }
            None => {
                segments.push(BoundarySegment::new(location(start), location(end), way.id, start, end));
                summary.reemitted += 1;
            }
        }
    }

    summary
}
