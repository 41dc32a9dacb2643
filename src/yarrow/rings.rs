use crate::osm_loader::BoundaryRelation;
use boundaries::osm_types::{BoundaryWay, OsmNodeId, OsmWayId};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Way member of a ring, possibly traversed backwards
#[derive(Debug, Clone, Copy)]
struct RingMember {
    way_id: OsmWayId,
    first: OsmNodeId,
    last: OsmNodeId,
    reversed: bool,
}

impl RingMember {
    fn front(&self) -> OsmNodeId {
        if self.reversed { self.last } else { self.first }
    }

    fn back(&self) -> OsmNodeId {
        if self.reversed { self.first } else { self.last }
    }
}

#[derive(Debug)]
struct Ring {
    members: VecDeque<RingMember>,
}

impl Ring {
    fn new(member: RingMember) -> Self {
        Self {
            members: VecDeque::from([member]),
        }
    }

    fn front(&self) -> Option<OsmNodeId> {
        self.members.front().map(RingMember::front)
    }

    fn back(&self) -> Option<OsmNodeId> {
        self.members.back().map(RingMember::back)
    }

    /// Attach `member` at the matching end. Returns the member if it touches
    /// neither end.
    fn try_attach(&mut self, mut member: RingMember) -> Result<(), RingMember> {
        let (Some(front), Some(back)) = (self.front(), self.back()) else {
            return Err(member);
        };

        if front == member.front() {
            member.reversed = true;
            self.members.push_front(member);
        } else if front == member.back() {
            self.members.push_front(member);
        } else if back == member.front() {
            self.members.push_back(member);
        } else if back == member.back() {
            member.reversed = true;
            self.members.push_back(member);
        } else {
            return Err(member);
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.front().is_some() && self.front() == self.back()
    }
}

/// Ways which have to be simplified as rings although they are not closed
/// on their own.
///
/// `members` are the way members of one relation as
/// `(way, first node, last node)` in member order. Members are chained into
/// rings by shared end nodes; the ways of a closed ring made of one or two
/// members are returned in id order.
pub fn ring_ways(members: &[(OsmWayId, OsmNodeId, OsmNodeId)]) -> Vec<OsmWayId> {
    let mut rings: Vec<Ring> = Vec::new();

    for &(way_id, first, last) in members {
        let mut member = RingMember {
            way_id,
            first,
            last,
            reversed: false,
        };
        let mut attached = false;
        for ring in rings.iter_mut() {
            match ring.try_attach(member) {
                Ok(()) => {
                    attached = true;
                    break;
                }
                Err(rejected) => member = rejected,
            }
        }
        if !attached {
            rings.push(Ring::new(member));
        }
    }

    let mut ways: Vec<OsmWayId> = rings
        .iter()
        .filter(|ring| ring.members.len() <= 2 && ring.is_closed())
        .flat_map(|ring| ring.members.iter().map(|m| m.way_id))
        .collect();
    ways.sort_unstable();
    ways.dedup();
    ways
}

/// Force-ring set over all relations. Members missing from `ways` are
/// ignored.
pub fn collect_ring_ways(relations: &[BoundaryRelation], ways: &[BoundaryWay]) -> BTreeSet<OsmWayId> {
    let ends: BTreeMap<OsmWayId, (OsmNodeId, OsmNodeId)> = ways
        .iter()
        .filter_map(|way| {
            let first = way.nodes.first()?;
            let last = way.nodes.last()?;
            Some((way.id, (first.id, last.id)))
        })
        .collect();

    relations
        .iter()
        .flat_map(|relation| {
            let members: Vec<_> = relation
                .members
                .iter()
                .filter_map(|way_id| ends.get(way_id).map(|&(first, last)| (*way_id, first, last)))
                .collect();
            ring_ways(&members)
        })
        .collect()
}
