use ahash::{HashMap, HashMapExt, HashSet, HashSetExt};
use anyhow::Context;
use boundaries::osm_types::{BoundaryWay, Location, NodeRef, OsmNodeId, OsmRelationId, OsmWayId};
use log::{debug, info, warn};
use osmpbfreader::{OsmId, OsmObj, OsmPbfReader, Tags};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// A `type=boundary` or `type=multipolygon` relation with its way members
/// in member order.
#[derive(Debug, Clone)]
pub struct BoundaryRelation {
    pub id: OsmRelationId,
    pub members: Vec<OsmWayId>,
    pub tags: BTreeMap<String, String>,
}

impl BoundaryRelation {
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(|s| s.as_str())
    }
}

/// Boundary ways and relations read from a PBF file
pub struct BoundaryData {
    /// Ways with all node locations resolved, ordered by id
    pub ways: Vec<BoundaryWay>,
    pub relations: Vec<BoundaryRelation>,
}

/// Raw way before node locations are known
struct PendingWay {
    nodes: Vec<OsmNodeId>,
    tags: BTreeMap<String, String>,
}

fn is_boundary_relation(tags: &Tags) -> bool {
    matches!(
        tags.get("type").map(|s| s.as_str()),
        Some("boundary") | Some("multipolygon")
    )
}

fn tags_to_map(tags: &Tags) -> BTreeMap<String, String> {
    tags.iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn open_reader(path: &Path) -> anyhow::Result<OsmPbfReader<BufReader<File>>> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    Ok(OsmPbfReader::new(BufReader::new(file)))
}

/// Load boundary ways in three passes: relations, ways, nodes.
pub fn load_boundaries(path: &Path) -> anyhow::Result<BoundaryData> {
    info!("Loading boundaries from {:?}", path);

    let relations = pass1_relations(path)?;
    let member_ways: HashSet<OsmWayId> = relations
        .iter()
        .flat_map(|r| r.members.iter().copied())
        .collect();
    info!(
        "Pass 1 complete: {} relations with {} member ways",
        relations.len(),
        member_ways.len()
    );

    let (pending, node_ids) = pass2_ways(path, &member_ways)?;
    info!(
        "Pass 2 complete: {} ways, {} referenced nodes",
        pending.len(),
        node_ids.len()
    );

    let locations = pass3_nodes(path, &node_ids)?;
    info!("Pass 3 complete: {} node locations", locations.len());

    let ways = resolve_ways(pending, &locations);
    Ok(BoundaryData { ways, relations })
}

fn pass1_relations(path: &Path) -> anyhow::Result<Vec<BoundaryRelation>> {
    let mut reader = open_reader(path)?;
    let mut relations = Vec::new();

    for obj in reader.iter() {
        let obj = obj.with_context(|| format!("Failed to decode {:?}", path))?;
        if let OsmObj::Relation(relation) = obj {
            if !is_boundary_relation(&relation.tags) {
                continue;
            }
            let members = relation
                .refs
                .iter()
                .filter_map(|r| match r.member {
                    OsmId::Way(way_id) => Some(OsmWayId(way_id.0)),
                    _ => None,
                })
                .collect();
            relations.push(BoundaryRelation {
                id: OsmRelationId(relation.id.0),
                members,
                tags: tags_to_map(&relation.tags),
            });
        }
    }

    relations.sort_by_key(|r| r.id);
    Ok(relations)
}

fn pass2_ways(
    path: &Path,
    member_ways: &HashSet<OsmWayId>,
) -> anyhow::Result<(BTreeMap<OsmWayId, PendingWay>, HashSet<OsmNodeId>)> {
    let mut reader = open_reader(path)?;
    let mut ways = BTreeMap::new();
    let mut node_ids = HashSet::new();

    for obj in reader.iter() {
        let obj = obj.with_context(|| format!("Failed to decode {:?}", path))?;
        if let OsmObj::Way(way) = obj {
            let id = OsmWayId(way.id.0);
            if !member_ways.contains(&id) && way.tags.get("boundary").is_none() {
                continue;
            }
            let nodes: Vec<OsmNodeId> = way.nodes.iter().map(|n| OsmNodeId(n.0)).collect();
            node_ids.extend(nodes.iter().copied());
            ways.insert(
                id,
                PendingWay {
                    nodes,
                    tags: tags_to_map(&way.tags),
                },
            );
        }
    }

    Ok((ways, node_ids))
}

fn pass3_nodes(
    path: &Path,
    node_ids: &HashSet<OsmNodeId>,
) -> anyhow::Result<HashMap<OsmNodeId, Location>> {
    let mut reader = open_reader(path)?;
    let mut locations = HashMap::with_capacity(node_ids.len());

    for obj in reader.iter() {
        let obj = obj.with_context(|| format!("Failed to decode {:?}", path))?;
        if let OsmObj::Node(node) = obj {
            let id = OsmNodeId(node.id.0);
            if node_ids.contains(&id) {
                locations.insert(id, Location::new(node.decimicro_lon, node.decimicro_lat));
            }
        }
    }

    Ok(locations)
}

fn resolve_ways(
    pending: BTreeMap<OsmWayId, PendingWay>,
    locations: &HashMap<OsmNodeId, Location>,
) -> Vec<BoundaryWay> {
    let mut ways = Vec::with_capacity(pending.len());

    for (id, way) in pending {
        let nodes: Option<Vec<NodeRef>> = way
            .nodes
            .iter()
            .map(|node_id| locations.get(node_id).map(|loc| NodeRef::new(*node_id, *loc)))
            .collect();

        match nodes {
            Some(nodes) if nodes.len() >= 2 => {
                ways.push(BoundaryWay::new(id, nodes).with_tags(way.tags));
            }
            Some(_) => debug!("Skipping {} with fewer than two nodes", id),
            None => warn!("Skipping {}: node locations missing from input", id),
        }
    }

    ways
}
