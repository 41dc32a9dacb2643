//! Douglas-Peucker reduction of boundary ways.
//!
//! Both entry points work on index spans into the node slice of a way and
//! record their result in a [`KeptMask`]. Nodes which are already kept when
//! a reduction starts (e.g. nodes forced by the conflict repair) stay kept.

use crate::error::SimplifyError;
use crate::geo_distance::distance_from_line;
use crate::osm_types::NodeRef;

/// Slots parallel to the node list of a way. `Some` means the node survives
/// simplification.
#[derive(Debug, Clone, PartialEq)]
pub struct KeptMask<'a> {
    slots: Vec<Option<&'a NodeRef>>,
}

impl<'a> KeptMask<'a> {
    /// An empty mask with every slot dropped.
    pub fn new(len: usize) -> Self {
        Self {
            slots: vec![None; len],
        }
    }

    /// A mask with the first and last node of `nodes` already kept.
    pub fn with_endpoints(nodes: &'a [NodeRef]) -> Self {
        let mut mask = Self::new(nodes.len());
        if !nodes.is_empty() {
            mask.keep(nodes, 0);
            mask.keep(nodes, nodes.len() - 1);
        }
        mask
    }

    /// A mask keeping every node.
    pub fn all(nodes: &'a [NodeRef]) -> Self {
        Self {
            slots: nodes.iter().map(Some).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Keep the node at `index`. Panics if `index` is out of bounds.
    pub fn keep(&mut self, nodes: &'a [NodeRef], index: usize) {
        self.slots[index] = Some(&nodes[index]);
    }

    pub fn is_kept(&self, index: usize) -> bool {
        matches!(self.slots.get(index), Some(Some(_)))
    }

    pub fn get(&self, index: usize) -> Option<&'a NodeRef> {
        self.slots.get(index).copied().flatten()
    }

    pub fn kept_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn kept_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.map(|_| i))
    }

    /// Surviving nodes in their original order.
    pub fn kept_nodes(&self) -> impl Iterator<Item = &'a NodeRef> + '_ {
        self.slots.iter().filter_map(|slot| *slot)
    }

    pub fn endpoints_populated(&self) -> bool {
        match self.slots.len() {
            0 => false,
            n => self.slots[0].is_some() && self.slots[n - 1].is_some(),
        }
    }
}

/// Douglas-Peucker simplifier measuring errors as cross-track distances in
/// metres.
#[derive(Debug, Clone, Copy)]
pub struct Simplifier {
    epsilon: f64,
}

impl Simplifier {
    pub fn new(epsilon: f64) -> Result<Self, SimplifyError> {
        if !epsilon.is_finite() || epsilon <= 0.0 {
            return Err(SimplifyError::InvalidEpsilon(epsilon));
        }
        Ok(Self { epsilon })
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Simplify the open span `[start, end]` of `nodes`.
    ///
    /// Inner nodes whose distance from the chord `start`–`end` does not
    /// exceed epsilon are dropped; otherwise the most distant node is kept
    /// and both halves are simplified on their own. Ties keep the first
    /// node found.
    pub fn simplify_node_list<'a>(
        &self,
        nodes: &'a [NodeRef],
        kept: &mut KeptMask<'a>,
        start: usize,
        end: usize,
    ) -> Result<(), SimplifyError> {
        check_mask(nodes, kept)?;
        if start > end || end >= nodes.len() {
            return Err(SimplifyError::InvalidSpan {
                start,
                end,
                len: nodes.len(),
            });
        }

        self.reduce(nodes, kept, start, end);
        Ok(())
    }

    /// Simplify a closed ring.
    ///
    /// A ring reduced as a single span can collapse to its start node and
    /// the most distant node, which is no area at all. The ring is therefore
    /// cut at the most distant and the second most distant node and the
    /// three arcs are reduced independently. If even the most distant node
    /// is closer than epsilon to the start, the ring becomes the triangle
    /// start, first cut, second cut.
    pub fn simplify_closed_ring<'a>(
        &self,
        nodes: &'a [NodeRef],
        kept: &mut KeptMask<'a>,
    ) -> Result<(), SimplifyError> {
        check_mask(nodes, kept)?;
        if !kept.is_kept(0) {
            return Err(SimplifyError::UnpopulatedEndpoint { index: 0 });
        }
        let last = nodes.len() - 1;
        if !kept.is_kept(last) {
            return Err(SimplifyError::UnpopulatedEndpoint { index: last });
        }

        // fewer than two inner nodes, nothing can be dropped
        if nodes.len() < 4 {
            for i in 0..nodes.len() {
                kept.keep(nodes, i);
            }
            return Ok(());
        }

        let start = nodes[0].location;
        let end = nodes[last].location;
        let mut farthest: Option<(usize, f64)> = None;
        let mut second: Option<(usize, f64)> = None;

        for i in 1..last {
            let distance = distance_from_line(start, end, nodes[i].location);
            match farthest {
                None => farthest = Some((i, distance)),
                Some((_, max)) if distance > max => {
                    second = farthest;
                    farthest = Some((i, distance));
                }
                _ => {
                    if second.is_none_or(|(_, second_max)| distance > second_max) {
                        second = Some((i, distance));
                    }
                }
            }
        }

        let (Some((far_idx, largest_distance)), Some((second_idx, _))) = (farthest, second) else {
            return Ok(());
        };
        let (cut_a, cut_b) = if far_idx < second_idx {
            (far_idx, second_idx)
        } else {
            (second_idx, far_idx)
        };

        kept.keep(nodes, cut_a);
        kept.keep(nodes, cut_b);

        if largest_distance < self.epsilon {
            return Ok(());
        }

        self.reduce(nodes, kept, 0, cut_a);
        self.reduce(nodes, kept, cut_a, cut_b);
        self.reduce(nodes, kept, cut_b, last);
        Ok(())
    }

    fn reduce<'a>(&self, nodes: &'a [NodeRef], kept: &mut KeptMask<'a>, start: usize, end: usize) {
        let mut spans = vec![(start, end)];

        while let Some((start, end)) = spans.pop() {
            if end <= start + 1 {
                continue;
            }

            let chord_start = nodes[start].location;
            let chord_end = nodes[end].location;
            let mut farthest = None;
            let mut largest_distance = 0.0;

            for i in start + 1..end {
                let distance = distance_from_line(chord_start, chord_end, nodes[i].location);
                if distance > largest_distance && distance > self.epsilon {
                    largest_distance = distance;
                    farthest = Some(i);
                }
            }

            if let Some(split) = farthest {
                kept.keep(nodes, split);
                spans.push((split, end));
                spans.push((start, split));
            }
        }
    }
}

fn check_mask(nodes: &[NodeRef], kept: &KeptMask<'_>) -> Result<(), SimplifyError> {
    if kept.len() != nodes.len() {
        return Err(SimplifyError::MaskLengthMismatch {
            mask: kept.len(),
            nodes: nodes.len(),
        });
    }
    if nodes.is_empty() {
        return Err(SimplifyError::InvalidSpan {
            start: 0,
            end: 0,
            len: 0,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::osm_types::{Location, OsmNodeId};

    fn build_nodes(coords: &[(f64, f64)]) -> Vec<NodeRef> {
        coords
            .iter()
            .enumerate()
            .map(|(i, &(lon, lat))| NodeRef::new(OsmNodeId(i as i64 + 1), Location::from_degrees(lon, lat)))
            .collect()
    }

    fn simplify_open(nodes: &[NodeRef]) -> KeptMask<'_> {
        let simplifier = Simplifier::new(75.0).unwrap();
        let mut kept = KeptMask::with_endpoints(nodes);
        simplifier
            .simplify_node_list(nodes, &mut kept, 0, nodes.len() - 1)
            .unwrap();
        kept
    }

    fn simplify_ring(nodes: &[NodeRef]) -> KeptMask<'_> {
        let simplifier = Simplifier::new(75.0).unwrap();
        let mut kept = KeptMask::with_endpoints(nodes);
        simplifier.simplify_closed_ring(nodes, &mut kept).unwrap();
        kept
    }

    #[test]
    fn test_two_nodes_are_kept() {
        let nodes = build_nodes(&[(9.0, 50.0), (9.0, 50.1)]);
        let kept = simplify_open(&nodes);
        assert_eq!(kept.kept_count(), 2);
    }

    #[test]
    fn test_three_nodes_inner_within_epsilon() {
        let nodes = build_nodes(&[(9.0, 50.0), (9.0, 50.1), (9.0, 50.10001)]);
        let kept = simplify_open(&nodes);
        assert!(!kept.is_kept(1));
        assert_eq!(kept.kept_count(), 2);
    }

    #[test]
    fn test_three_nodes_inner_beyond_epsilon() {
        let nodes = build_nodes(&[(9.0, 50.0), (9.0, 50.1), (9.3, 50.10001)]);
        let kept = simplify_open(&nodes);
        assert_eq!(kept.kept_count(), 3);
    }

    #[test]
    fn test_collinear_four_nodes_collapse() {
        let nodes = build_nodes(&[(9.0, 50.0), (9.0, 50.1), (9.0, 50.25), (9.0, 50.3)]);
        let kept = simplify_open(&nodes);
        assert_eq!(kept.kept_count(), 2);
        assert!(!kept.is_kept(1));
        assert!(!kept.is_kept(2));
    }

    #[test]
    fn test_second_node_dropped() {
        for second in [(9.000331, 50.00089), (9.0013701, 50.0005847)] {
            let nodes = build_nodes(&[(9.0, 50.0), second, (9.1, 50.1), (9.0, 50.3)]);
            let kept = simplify_open(&nodes);
            assert_eq!(kept.kept_count(), 3);
            assert!(!kept.is_kept(1));
        }
    }

    #[test]
    fn test_inner_node_only_beyond_epsilon_after_split() {
        let nodes = build_nodes(&[(9.0, 50.0), (8.999172, 50.0004465), (9.1, 50.1), (9.0, 50.3)]);
        let kept = simplify_open(&nodes);
        assert_eq!(kept.kept_count(), 4);
    }

    #[test]
    fn test_pre_kept_nodes_survive() {
        let nodes = build_nodes(&[(9.0, 50.0), (9.0, 50.1), (9.0, 50.25), (9.0, 50.3)]);
        let simplifier = Simplifier::new(75.0).unwrap();
        let mut kept = KeptMask::with_endpoints(&nodes);
        kept.keep(&nodes, 2);
        simplifier
            .simplify_node_list(&nodes, &mut kept, 0, 3)
            .unwrap();
        assert_eq!(kept.kept_indices().collect::<Vec<_>>(), vec![0, 2, 3]);
    }

    #[test]
    fn test_ring_keeps_all_nodes() {
        let nodes = build_nodes(&[(9.0, 50.0), (8.8, 50.11), (9.0, 50.3), (9.14, 50.18), (9.0, 50.0)]);
        let kept = simplify_ring(&nodes);
        assert_eq!(kept.kept_count(), nodes.len());
    }

    #[test]
    fn test_ring_drops_node_close_to_arc() {
        let nodes = build_nodes(&[
            (9.0, 50.0),
            (8.99951, 50.124029),
            (9.0, 50.3),
            (9.14, 50.18),
            (9.0, 50.0),
        ]);
        let kept = simplify_ring(&nodes);
        assert_eq!(kept.kept_count(), 4);
        assert!(!kept.is_kept(1));

        let nodes = build_nodes(&[
            (9.0, 50.0),
            (8.99951, 50.124029),
            (9.0, 50.3),
            (9.080332, 50.2756495),
            (9.0785133, 50.2308827),
            (9.14, 50.18),
            (9.0, 50.0),
        ]);
        let kept = simplify_ring(&nodes);
        assert_eq!(kept.kept_count(), nodes.len() - 1);
        assert!(!kept.is_kept(1));
    }

    #[test]
    fn test_small_ring_degenerates_to_triangle() {
        // every inner node is less than 40 m away from the start
        let nodes = build_nodes(&[
            (9.0, 50.0),
            (9.0002, 50.0001),
            (9.0004, 50.0),
            (9.0003, 50.0003),
            (9.0001, 50.0002),
            (9.0, 50.0),
        ]);
        let kept = simplify_ring(&nodes);
        assert_eq!(kept.kept_indices().collect::<Vec<_>>(), vec![0, 2, 3, 5]);
    }

    #[test]
    fn test_ring_second_cut_kept_even_at_zero_distance() {
        let nodes = build_nodes(&[(9.0, 50.0), (9.0, 50.0), (9.0003, 50.0), (9.0, 50.0), (9.0, 50.0)]);
        let kept = simplify_ring(&nodes);
        // index 2 is the only node away from the start, index 1 is the first
        // zero-distance candidate
        assert_eq!(kept.kept_indices().collect::<Vec<_>>(), vec![0, 1, 2, 4]);
    }

    #[test]
    fn test_mask_length_mismatch_is_rejected() {
        let nodes = build_nodes(&[(9.0, 50.0), (9.0, 50.1), (9.0, 50.2)]);
        let simplifier = Simplifier::new(75.0).unwrap();
        let mut kept = KeptMask::new(2);
        assert_eq!(
            simplifier.simplify_node_list(&nodes, &mut kept, 0, 2),
            Err(SimplifyError::MaskLengthMismatch { mask: 2, nodes: 3 })
        );
        assert!(matches!(
            simplifier.simplify_closed_ring(&nodes, &mut kept),
            Err(SimplifyError::MaskLengthMismatch { .. })
        ));
    }

    #[test]
    fn test_invalid_span_is_rejected() {
        let nodes = build_nodes(&[(9.0, 50.0), (9.0, 50.1), (9.0, 50.2)]);
        let simplifier = Simplifier::new(75.0).unwrap();
        let mut kept = KeptMask::with_endpoints(&nodes);
        assert!(matches!(
            simplifier.simplify_node_list(&nodes, &mut kept, 0, 3),
            Err(SimplifyError::InvalidSpan { .. })
        ));
        assert!(matches!(
            simplifier.simplify_node_list(&nodes, &mut kept, 2, 1),
            Err(SimplifyError::InvalidSpan { .. })
        ));
    }

    #[test]
    fn test_ring_requires_endpoints() {
        let nodes = build_nodes(&[(9.0, 50.0), (9.1, 50.1), (9.2, 50.0), (9.0, 50.0)]);
        let simplifier = Simplifier::new(75.0).unwrap();
        let mut kept = KeptMask::new(nodes.len());
        assert_eq!(
            simplifier.simplify_closed_ring(&nodes, &mut kept),
            Err(SimplifyError::UnpopulatedEndpoint { index: 0 })
        );
    }

    #[test]
    fn test_epsilon_must_be_positive() {
        assert!(Simplifier::new(0.0).is_err());
        assert!(Simplifier::new(-3.0).is_err());
        assert!(Simplifier::new(f64::NAN).is_err());
    }
}
