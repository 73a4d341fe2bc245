use anyhow::{anyhow, bail, Context, Result};
use geo::{Coord, Geometry, LineString, MultiPolygon, Point, Polygon};
use serde_json::{json, Map, Value};

use crate::geom::WGS84;
use crate::store::Layer;

/// A feature as found in a GeoJSON document; the geometry is parsed on demand.
#[derive(Debug, Clone)]
pub(crate) struct RawFeature {
    pub(crate) properties: Map<String, Value>,
    pub(crate) geometry: Value,
}

/// Write a layer as a FeatureCollection with feature ids and properties.
/// Layers outside WGS84 carry a named `crs` member.
pub(crate) fn layer_to_geojson_bytes(layer: &Layer) -> Result<Vec<u8>> {
    let features = layer.features.iter()
        .map(|feature| -> Result<Value> {
            let geometry = geometry_to_json(&feature.geometry)
                .with_context(|| format!("[io::geojson] feature {}", feature.id))?;
            Ok(json!({
                "type": "Feature",
                "id": feature.id,
                "geometry": geometry,
                "properties": feature.properties,
            }))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut collection = json!({
        "type": "FeatureCollection",
        "features": features,
    });
    if layer.epsg != WGS84 {
        collection["crs"] = json!({
            "type": "name",
            "properties": { "name": format!("urn:ogc:def:crs:EPSG::{}", layer.epsg) },
        });
    }

    serde_json::to_vec(&collection).context("[io::geojson] Failed to serialize GeoJSON to bytes")
}

fn ring_to_json(ring: &LineString<f64>) -> Vec<[f64; 2]> {
    ring.coords().map(|c| [c.x, c.y]).collect()
}

fn polygon_to_json(polygon: &Polygon<f64>) -> Vec<Vec<[f64; 2]>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(ring_to_json)
        .collect()
}

/// Standard GeoJSON geometry object for the supported kinds.
pub(crate) fn geometry_to_json(geometry: &Geometry<f64>) -> Result<Value> {
    Ok(match geometry {
        Geometry::Point(point) => json!({ "type": "Point", "coordinates": [point.x(), point.y()] }),
        Geometry::Polygon(polygon) => json!({ "type": "Polygon", "coordinates": polygon_to_json(polygon) }),
        Geometry::MultiPolygon(multi) => json!({
            "type": "MultiPolygon",
            "coordinates": multi.0.iter().map(polygon_to_json).collect::<Vec<_>>(),
        }),
        other => bail!("[io::geojson] Unsupported geometry type: {:?}", other),
    })
}

/// Read the features of a FeatureCollection (or a single Feature).
pub(crate) fn read_features(bytes: &[u8]) -> Result<Vec<RawFeature>> {
    let value: Value = serde_json::from_slice(bytes).context("[io::geojson] Failed to parse GeoJSON bytes")?;

    let features = match value["type"].as_str() {
        Some("FeatureCollection") => value["features"].as_array()
            .ok_or_else(|| anyhow!("[io::geojson] FeatureCollection without a features array"))?
            .clone(),
        Some("Feature") => vec![value],
        other => bail!("[io::geojson] Expected a FeatureCollection or Feature, found {:?}", other),
    };

    Ok(features.into_iter()
        .map(|mut feature| RawFeature {
            properties: feature["properties"].as_object().cloned().unwrap_or_default(),
            geometry: feature["geometry"].take(),
        })
        .collect())
}

/// Parse a Point, Polygon or MultiPolygon geometry object.
pub(crate) fn parse_geometry(value: &Value) -> Result<Geometry<f64>> {
    let coords = &value["coordinates"];
    match value["type"].as_str() {
        Some("Point") => Ok(Geometry::Point(Point(parse_coord(coords)?))),
        Some("Polygon") => Ok(Geometry::Polygon(parse_polygon(coords)?)),
        Some("MultiPolygon") => {
            let polygons = coords.as_array()
                .ok_or_else(|| anyhow!("[io::geojson] MultiPolygon coordinates must be an array"))?
                .iter()
                .map(parse_polygon)
                .collect::<Result<Vec<_>>>()?;
            Ok(Geometry::MultiPolygon(MultiPolygon(polygons)))
        }
        other => bail!("[io::geojson] Unsupported geometry type {:?}", other),
    }
}

/// Parse `[[exterior], [hole], ...]`.
fn parse_polygon(value: &Value) -> Result<Polygon<f64>> {
    let rings = value.as_array()
        .ok_or_else(|| anyhow!("[io::geojson] Polygon coordinates must be an array of rings"))?;
    let (exterior, interiors) = rings.split_first()
        .ok_or_else(|| anyhow!("[io::geojson] Polygon is missing its exterior ring"))?;

    Ok(Polygon::new(
        parse_ring(exterior)?,
        interiors.iter().map(parse_ring).collect::<Result<Vec<_>>>()?,
    ))
}

/// Parse `[[x, y], ...]`; the ring is closed if the document left it open.
fn parse_ring(value: &Value) -> Result<LineString<f64>> {
    let mut points = value.as_array()
        .ok_or_else(|| anyhow!("[io::geojson] Ring must be an array of positions"))?
        .iter()
        .map(parse_coord)
        .collect::<Result<Vec<_>>>()?;

    if let (Some(&first), Some(&last)) = (points.first(), points.last()) {
        if first != last { points.push(first) }
    }

    Ok(LineString(points))
}

fn parse_coord(value: &Value) -> Result<Coord<f64>> {
    match value.as_array().map(Vec::as_slice) {
        Some([x, y, ..]) => Ok(Coord {
            x: x.as_f64().ok_or_else(|| anyhow!("[io::geojson] Invalid coordinate: x must be a number"))?,
            y: y.as_f64().ok_or_else(|| anyhow!("[io::geojson] Invalid coordinate: y must be a number"))?,
        }),
        _ => bail!("[io::geojson] Position must have at least two numbers"),
    }
}

#[cfg(test)]
mod tests {
    use geo::{point, polygon};

    use super::*;
    use crate::store::Feature;

    #[test]
    fn exported_layer_is_standard_geojson() {
        let layer = Layer::new(4326, vec![
            Feature::new(3, point! { x: 30.5, y: 50.4 }).with("sector_id", 1),
            Feature::new(4, polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)]),
        ]);
        let value: Value = serde_json::from_slice(&layer_to_geojson_bytes(&layer).unwrap()).unwrap();

        assert_eq!(value["type"], "FeatureCollection");
        assert!(value.get("crs").is_none());
        assert_eq!(value["features"][0]["id"], 3);
        assert_eq!(value["features"][0]["geometry"], json!({ "type": "Point", "coordinates": [30.5, 50.4] }));
        assert_eq!(value["features"][0]["properties"]["sector_id"], 1);
        assert_eq!(value["features"][1]["geometry"]["coordinates"][0].as_array().unwrap().len(), 4);
    }

    #[test]
    fn projected_layer_names_its_crs() {
        let layer = Layer::new(32636, vec![]);
        let value: Value = serde_json::from_slice(&layer_to_geojson_bytes(&layer).unwrap()).unwrap();
        assert_eq!(value["crs"]["properties"]["name"], "urn:ogc:def:crs:EPSG::32636");
    }

    #[test]
    fn reads_polygons_and_multipolygons_with_properties() {
        let doc = br#"{
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "properties": { "ADMIN": "Atlantis" },
                  "geometry": { "type": "Polygon", "coordinates": [[[0, 0], [2, 0], [2, 2], [0, 2]]] } },
                { "type": "Feature", "properties": { "ADMIN": "Lemuria" },
                  "geometry": { "type": "MultiPolygon", "coordinates": [
                      [[[5, 5], [6, 5], [6, 6], [5, 5]]],
                      [[[7, 7], [8, 7], [8, 8], [7, 7]], [[7.2, 7.1], [7.8, 7.1], [7.8, 7.5], [7.2, 7.1]]]
                  ] } }
            ]
        }"#;
        let features = read_features(doc).unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].properties["ADMIN"], "Atlantis");

        // Open ring is closed on read.
        let Geometry::Polygon(first) = parse_geometry(&features[0].geometry).unwrap() else { panic!("not a polygon") };
        assert_eq!(first.exterior().0.len(), 5);

        let Geometry::MultiPolygon(second) = parse_geometry(&features[1].geometry).unwrap() else { panic!("not a multipolygon") };
        assert_eq!(second.0.len(), 2);
        assert_eq!(second.0[1].interiors().len(), 1);
    }

    #[test]
    fn malformed_documents_are_rejected() {
        assert!(read_features(b"not json").is_err());
        assert!(read_features(br#"{ "type": "Point", "coordinates": [0, 0] }"#).is_err());
        assert!(parse_geometry(&json!({ "type": "LineString", "coordinates": [[0, 0], [1, 1]] })).is_err());
        assert!(parse_geometry(&json!({ "type": "Point", "coordinates": ["a", 0] })).is_err());
        assert!(parse_geometry(&json!({ "type": "Polygon", "coordinates": [] })).is_err());
    }
}
