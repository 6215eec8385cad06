use std::io::Write;

use anyhow::Result;
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, Value};

use geom::Pt2D;
use road_network::{BlockKind, City};

/// Dump roads and blocks in map coordinates (meters, not WGS84), for a quick look in a GeoJSON
/// viewer.
pub fn write_geojson(path: &str, city: &City) -> Result<()> {
    let mut features = Vec::new();

    for edge in city.network.all_edges() {
        let line = city.network.edge_line(edge.id);
        let mut feature = feature(Value::LineString(vec![
            position(line.pt1()),
            position(line.pt2()),
        ]));
        feature.set_property("type", "road");
        feature.set_property("road", format!("{:?}", edge.connection_type));
        feature.set_property("id", edge.id.0);
        features.push(feature);
    }

    for (idx, block) in city.blocks.iter().enumerate() {
        let mut ring: Vec<Vec<f64>> = block.pts.iter().map(|pt| position(*pt)).collect();
        // GeoJSON rings are closed
        ring.push(position(block.pts[0]));
        let mut feature = feature(Value::Polygon(vec![ring]));
        feature.set_property("type", "block");
        feature.set_property("id", idx);
        feature.set_property("area", block.area());
        feature.set_property(
            "fill",
            match block.kind {
                BlockKind::Downtown => "#E74C3C",
                BlockKind::Arterial => "#F39C12",
                BlockKind::Residential => "#27AE60",
            },
        );
        features.push(feature);
    }

    let gj = GeoJson::from(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    });
    let mut file = fs_err::File::create(path)?;
    write!(file, "{}", serde_json::to_string_pretty(&gj)?)?;
    Ok(())
}

fn feature(value: Value) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: None,
        foreign_members: None,
    }
}

fn position(pt: Pt2D) -> Vec<f64> {
    vec![pt.x(), pt.y()]
}
