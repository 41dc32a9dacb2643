use crate::osm_loader::BoundaryRelation;
use boundaries::osm_types::{AdminLevel, OsmWayId};
use std::collections::BTreeMap;

/// Lowest administrative level of every way which is a member of an
/// administrative boundary relation.
#[derive(Debug, Default)]
pub struct AdminLevelIndex {
    levels: BTreeMap<OsmWayId, AdminLevel>,
}

impl AdminLevelIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every relation tagged `boundary=administrative` with an
    /// `admin_level` no higher than `max_level`.
    pub fn from_relations(relations: &[BoundaryRelation], max_level: AdminLevel) -> Self {
        let mut index = Self::new();
        for relation in relations {
            if let Some(level) = relation_level(relation, max_level) {
                for way_id in &relation.members {
                    index.store(*way_id, level);
                }
            }
        }
        index
    }

    pub fn store(&mut self, way_id: OsmWayId, level: AdminLevel) {
        self.levels
            .entry(way_id)
            .and_modify(|current| *current = (*current).min(level))
            .or_insert(level);
    }

    pub fn get(&self, way_id: OsmWayId) -> Option<AdminLevel> {
        self.levels.get(&way_id).copied()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }
}

fn relation_level(relation: &BoundaryRelation, max_level: AdminLevel) -> Option<AdminLevel> {
    if relation.tag("boundary") != Some("administrative") {
        return None;
    }
    let level = AdminLevel::from_tag(relation.tag("admin_level")?)?;
    (level <= max_level).then_some(level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use boundaries::osm_types::OsmRelationId;

    fn relation(id: i64, admin_level: &str, members: &[i64]) -> BoundaryRelation {
        BoundaryRelation {
            id: OsmRelationId(id),
            members: members.iter().map(|m| OsmWayId(*m)).collect(),
            tags: BTreeMap::from([
                ("type".to_string(), "boundary".to_string()),
                ("boundary".to_string(), "administrative".to_string()),
                ("admin_level".to_string(), admin_level.to_string()),
            ]),
        }
    }

    #[test]
    fn test_lowest_level_wins() {
        let relations = vec![relation(1, "8", &[10, 11]), relation(2, "4", &[11, 12])];
        let index = AdminLevelIndex::from_relations(&relations, AdminLevel::MAX);

        assert_eq!(index.get(OsmWayId(10)), Some(AdminLevel(8)));
        assert_eq!(index.get(OsmWayId(11)), Some(AdminLevel(4)));
        assert_eq!(index.get(OsmWayId(12)), Some(AdminLevel(4)));
        assert_eq!(index.get(OsmWayId(13)), None);
    }

    #[test]
    fn test_levels_above_maximum_are_ignored() {
        let relations = vec![relation(1, "10", &[10]), relation(2, "6", &[11])];
        let index = AdminLevelIndex::from_relations(&relations, AdminLevel(8));

        assert_eq!(index.get(OsmWayId(10)), None);
        assert_eq!(index.get(OsmWayId(11)), Some(AdminLevel(6)));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_non_administrative_relations_are_ignored() {
        let mut maritime = relation(1, "2", &[10]);
        maritime.tags.insert("boundary".to_string(), "maritime".to_string());
        let index = AdminLevelIndex::from_relations(&[maritime], AdminLevel::MAX);
        assert_eq!(index.get(OsmWayId(10)), None);
    }
}
