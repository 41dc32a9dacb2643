use crate::admin_levels::AdminLevelIndex;
use anyhow::{Context, Result};
use boundaries::osm_types::{BoundaryWay, OsmWayId};
use boundaries::simplifier::KeptMask;
use geojson::{Feature, FeatureCollection, GeoJson, JsonValue};
use log::{info, warn};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// One `LineString` feature per way, made of the nodes its mask keeps.
pub fn build_feature_collection(
    ways: &[BoundaryWay],
    masks: &BTreeMap<OsmWayId, KeptMask<'_>>,
    admin_levels: &AdminLevelIndex,
) -> FeatureCollection {
    let features = ways
        .iter()
        .filter_map(|way| {
            let Some(mask) = masks.get(&way.id) else {
                warn!("No simplification result for {}", way.id);
                return None;
            };
            Some(way_feature(way, mask, admin_levels))
        })
        .collect::<Vec<Feature>>();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn way_feature(way: &BoundaryWay, mask: &KeptMask<'_>, admin_levels: &AdminLevelIndex) -> Feature {
    let line_string: geo_types::LineString<f64> = mask
        .kept_nodes()
        .map(|node| geo_types::Coord {
            x: node.location.lon(),
            y: node.location.lat(),
        })
        .collect();

    let mut properties: serde_json::Map<String, JsonValue> = way
        .tags
        .iter()
        .map(|(k, v)| (k.clone(), JsonValue::String(v.clone())))
        .collect();
    if let Some(level) = admin_levels.get(way.id) {
        properties.insert(
            String::from("admin_level"),
            JsonValue::String(level.to_string()),
        );
    }
    properties.insert(
        String::from("simplified_from"),
        JsonValue::from(way.nodes.len()),
    );
    properties.insert(
        String::from("simplified_to"),
        JsonValue::from(mask.kept_count()),
    );

    Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::from(&line_string)),
        id: Some(geojson::feature::Id::Number(serde_json::Number::from(
            way.id.0,
        ))),
        properties: Some(properties),
        foreign_members: None,
    }
}

pub fn write_geojson(path: &Path, collection: FeatureCollection) -> Result<()> {
    let count = collection.features.len();
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    let mut writer = BufWriter::new(file);
    writer.write_all(GeoJson::from(collection).to_string().as_bytes())?;
    writer.flush()?;
    info!("Wrote {} features to {:?}", count, path);
    Ok(())
}
