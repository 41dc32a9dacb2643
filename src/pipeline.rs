//! Iterative simplification of a set of boundary ways.
//!
//! Every pass simplifies all ways, cuts the result into segments and looks
//! for segments which cross or duplicate each other. Conflicting spans are
//! split at their farthest node, which is then kept in every later pass.
//! The loop ends when a pass finds no new conflicts or the iteration budget
//! is spent.

use crate::boundary_segment::BoundarySegment;
use crate::conflicts::{ConflictLog, KeepSet, detect_conflicts};
use crate::error::SimplifyError;
use crate::osm_types::{BoundaryWay, OsmWayId};
use crate::repair::repair_way;
use crate::simplifier::{KeptMask, Simplifier};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

pub const DEFAULT_EPSILON: f64 = 75.0;
pub const DEFAULT_MAX_ITERATIONS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimplifyConfig {
    /// Maximum cross-track error in metres
    pub epsilon: f64,
    /// Upper bound on detection passes
    pub max_iterations: usize,
}

impl Default for SimplifyConfig {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl SimplifyConfig {
    pub fn validate(&self) -> Result<(), SimplifyError> {
        if !self.epsilon.is_finite() || self.epsilon <= 0.0 {
            return Err(SimplifyError::InvalidEpsilon(self.epsilon));
        }
        if self.max_iterations == 0 {
            return Err(SimplifyError::InvalidIterations);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub pass: usize,
    pub segments: usize,
    pub new_conflicts: usize,
    pub ways_repaired: usize,
    pub keep_additions: usize,
    pub keep_set_size: usize,
    pub reemitted: usize,
}

#[derive(Debug)]
pub struct SimplificationOutcome<'a> {
    /// Final mask of every way, keyed by way id
    pub masks: BTreeMap<OsmWayId, KeptMask<'a>>,
    pub converged: bool,
    /// New conflicts found by the last pass; zero if converged
    pub residual_conflicts: usize,
    pub passes: Vec<PassReport>,
    pub conflicts: ConflictLog,
    pub keep_set: KeepSet,
}

/// Simplify a single way, keeping every node the keep set names.
///
/// Ways with at most three nodes and closed ways with four nodes are
/// returned unchanged.
pub fn simplify_way<'a>(
    simplifier: &Simplifier,
    way: &'a BoundaryWay,
    force_ring: bool,
    keep_set: &KeepSet,
) -> Result<KeptMask<'a>, SimplifyError> {
    let closed = way.is_closed();
    let len = way.nodes.len();
    if len <= 3 || (closed && len == 4) {
        return Ok(KeptMask::all(&way.nodes));
    }

    let mut kept = KeptMask::with_endpoints(&way.nodes);
    for offset in keep_set.offsets(way.id) {
        if offset >= len {
            return Err(SimplifyError::InvalidSpan {
                start: offset,
                end: offset,
                len,
            });
        }
        kept.keep(&way.nodes, offset);
    }

    if closed || force_ring {
        simplifier.simplify_closed_ring(&way.nodes, &mut kept)?;
    } else {
        simplifier.simplify_node_list(&way.nodes, &mut kept, 0, len - 1)?;
    }
    Ok(kept)
}

/// One segment per pair of consecutive kept nodes.
pub fn segments_for(way: &BoundaryWay, mask: &KeptMask<'_>) -> Vec<BoundarySegment> {
    let kept: Vec<usize> = mask.kept_indices().collect();
    kept.windows(2)
        .map(|pair| {
            BoundarySegment::new(
                way.nodes[pair[0]].location,
                way.nodes[pair[1]].location,
                way.id,
                pair[0],
                pair[1],
            )
        })
        .collect()
}

fn simplify_all<'a>(
    simplifier: &Simplifier,
    ways: &'a [BoundaryWay],
    force_rings: &BTreeSet<OsmWayId>,
    keep_set: &KeepSet,
) -> Result<BTreeMap<OsmWayId, KeptMask<'a>>, SimplifyError> {
    ways.iter()
        .map(|way| {
            let mask = simplify_way(simplifier, way, force_rings.contains(&way.id), keep_set)?;
            Ok((way.id, mask))
        })
        .collect()
}

/// Run one detection pass over freshly simplified ways and repair the
/// conflicts it finds.
pub fn run_pass(
    pass: usize,
    ways: &[BoundaryWay],
    masks: &BTreeMap<OsmWayId, KeptMask<'_>>,
    log: &mut ConflictLog,
    keep_set: &mut KeepSet,
) -> PassReport {
    let mut segments: Vec<BoundarySegment> = ways
        .iter()
        .filter_map(|way| masks.get(&way.id).map(|mask| segments_for(way, mask)))
        .flatten()
        .collect();
    let segment_count = segments.len();

    let new_conflicts = detect_conflicts(&mut segments, log);
    debug!("Pass {} found {} new conflicts in {} segments", pass, new_conflicts, segment_count);

    let mut report = PassReport {
        pass,
        segments: segment_count,
        new_conflicts,
        ways_repaired: 0,
        keep_additions: 0,
        keep_set_size: keep_set.len(),
        reemitted: 0,
    };
    if new_conflicts == 0 {
        return report;
    }

    let ways_by_id: BTreeMap<OsmWayId, &BoundaryWay> = ways.iter().map(|way| (way.id, way)).collect();
    for way_id in log.pending_ways() {
        let Some(way) = ways_by_id.get(&way_id) else {
            continue;
        };
        let summary = repair_way(way, log, keep_set, &mut segments);
        if summary.reemitted > 0 {
            report.ways_repaired += 1;
        }
        report.keep_additions += summary.keep_additions;
        report.reemitted += summary.reemitted;
    }
    report.keep_set_size = keep_set.len();

    report
}

/// Simplify `ways` until no simplified segment crosses or duplicates
/// another one, or until `config.max_iterations` passes have run.
pub fn simplify_boundaries<'a>(
    ways: &'a [BoundaryWay],
    force_rings: &BTreeSet<OsmWayId>,
    config: &SimplifyConfig,
) -> Result<SimplificationOutcome<'a>, SimplifyError> {
    config.validate()?;
    let simplifier = Simplifier::new(config.epsilon)?;

    let mut log = ConflictLog::new();
    let mut keep_set = KeepSet::new();
    let mut passes = Vec::new();
    let mut converged = false;
    let mut residual_conflicts = 0;

    for pass in 1..=config.max_iterations {
        let masks = simplify_all(&simplifier, ways, force_rings, &keep_set)?;
        let report = run_pass(pass, ways, &masks, &mut log, &mut keep_set);
        info!(
            "Pass {}: {} segments, {} new conflicts, {} ways repaired, {} nodes added to keep set ({} total)",
            report.pass,
            report.segments,
            report.new_conflicts,
            report.ways_repaired,
            report.keep_additions,
            report.keep_set_size
        );
        residual_conflicts = report.new_conflicts;
        passes.push(report);

        if residual_conflicts == 0 {
            converged = true;
            break;
        }
    }

    if !converged {
        warn!(
            "No convergence after {} passes, {} conflicts remain",
            config.max_iterations, residual_conflicts
        );
    }

    let masks = simplify_all(&simplifier, ways, force_rings, &keep_set)?;
    let kept: usize = masks.values().map(KeptMask::kept_count).sum();
    let total: usize = ways.iter().map(|way| way.nodes.len()).sum();
    info!("Kept {} of {} nodes in {} ways", kept, total, ways.len());

    Ok(SimplificationOutcome {
        masks,
        converged,
        residual_conflicts,
        passes,
        conflicts: log,
        keep_set,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::osm_types::{Location, NodeRef, OsmNodeId};

    fn build_way(id: i64, coords: &[(f64, f64)]) -> BoundaryWay {
        let nodes = coords
            .iter()
            .enumerate()
            .map(|(i, &(lon, lat))| NodeRef::new(OsmNodeId(id * 100 + i as i64), Location::from_degrees(lon, lat)))
            .collect();
        BoundaryWay::new(OsmWayId(id), nodes)
    }

    #[test]
    fn test_default_config() {
        let config = SimplifyConfig::default();
        assert_eq!(config.epsilon, 75.0);
        assert_eq!(config.max_iterations, 6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let config = SimplifyConfig {
            epsilon: 0.0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(SimplifyError::InvalidEpsilon(0.0)));

        let config = SimplifyConfig {
            max_iterations: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(SimplifyError::InvalidIterations));
    }

    #[test]
    fn test_short_ways_pass_through() {
        let simplifier = Simplifier::new(75.0).unwrap();
        let keep_set = KeepSet::new();

        let open = build_way(1, &[(9.0, 50.0), (9.0, 50.1), (9.0, 50.10001)]);
        let mask = simplify_way(&simplifier, &open, false, &keep_set).unwrap();
        assert_eq!(mask.kept_count(), 3);

        let ring = build_way(2, &[(9.0, 50.0), (9.0, 50.00001), (9.00001, 50.0), (9.0, 50.0)]);
        let mask = simplify_way(&simplifier, &ring, false, &keep_set).unwrap();
        assert_eq!(mask.kept_count(), 4);
        assert_eq!(segments_for(&ring, &mask).len(), 3);
    }

    #[test]
    fn test_keep_set_is_honoured() {
        let simplifier = Simplifier::new(75.0).unwrap();
        let way = build_way(1, &[(9.0, 50.0), (9.0, 50.1), (9.0, 50.25), (9.0, 50.3)]);

        let mut keep_set = KeepSet::new();
        let mask = simplify_way(&simplifier, &way, false, &keep_set).unwrap();
        assert_eq!(mask.kept_count(), 2);

        keep_set.insert(way.id, 1);
        let mask = simplify_way(&simplifier, &way, false, &keep_set).unwrap();
        assert_eq!(mask.kept_indices().collect::<Vec<_>>(), vec![0, 1, 3]);

        let segments = segments_for(&way, &mask);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].omitted_count(), 1);
    }

    #[test]
    fn test_forced_ring_uses_ring_reduction() {
        let simplifier = Simplifier::new(75.0).unwrap();
        let keep_set = KeepSet::new();
        // open way whose nodes all lie within epsilon of each other
        let way = build_way(
            1,
            &[
                (9.0, 50.0),
                (9.0002, 50.0001),
                (9.0004, 50.0),
                (9.0003, 50.0003),
                (9.0001, 50.0002),
            ],
        );

        let mask = simplify_way(&simplifier, &way, false, &keep_set).unwrap();
        assert_eq!(mask.kept_count(), 2);

        let mask = simplify_way(&simplifier, &way, true, &keep_set).unwrap();
        assert!(mask.kept_count() >= 4);
    }

    #[test]
    fn test_out_of_range_keep_offset_is_rejected() {
        let simplifier = Simplifier::new(75.0).unwrap();
        let way = build_way(1, &[(9.0, 50.0), (9.0, 50.1), (9.0, 50.25), (9.0, 50.3)]);
        let mut keep_set = KeepSet::new();
        keep_set.insert(way.id, 9);
        assert!(matches!(
            simplify_way(&simplifier, &way, false, &keep_set),
            Err(SimplifyError::InvalidSpan { .. })
        ));
    }

    #[test]
    fn test_invalid_config_is_rejected_before_work() {
        let ways = vec![build_way(1, &[(9.0, 50.0), (9.0, 50.1)])];
        let config = SimplifyConfig {
            max_iterations: 0,
            ..Default::default()
        };
        assert!(simplify_boundaries(&ways, &BTreeSet::new(), &config).is_err());
    }
}
