//! Conversions between pipeline values and stored layers.

use geo::{Geometry, MultiPolygon, Point, Polygon};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::geom::Border;
use crate::grid::{GridCell, Vertex};
use crate::intersect::Intersection;
use crate::sector::Sector;
use crate::store::{Feature, Layer};

fn expect_polygon(feature: &Feature) -> Result<Polygon<f64>> {
    match &feature.geometry {
        Geometry::Polygon(polygon) => Ok(polygon.clone()),
        other => Err(Error::Storage(format!("feature {}: expected Polygon, found {}", feature.id, kind(other)))),
    }
}

fn expect_point(feature: &Feature) -> Result<Point<f64>> {
    match &feature.geometry {
        Geometry::Point(point) => Ok(*point),
        other => Err(Error::Storage(format!("feature {}: expected Point, found {}", feature.id, kind(other)))),
    }
}

fn kind(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        _ => "unsupported geometry",
    }
}

fn property<'a>(feature: &'a Feature, key: &str) -> Result<&'a Value> {
    feature.properties.get(key)
        .ok_or_else(|| Error::Storage(format!("feature {}: missing property {key:?}", feature.id)))
}

fn property_f64(feature: &Feature, key: &str) -> Result<f64> {
    property(feature, key)?.as_f64()
        .ok_or_else(|| Error::Storage(format!("feature {}: property {key:?} is not a number", feature.id)))
}

fn property_usize(feature: &Feature, key: &str) -> Result<usize> {
    property(feature, key)?.as_u64()
        .map(|v| v as usize)
        .ok_or_else(|| Error::Storage(format!("feature {}: property {key:?} is not an integer", feature.id)))
}

/// The border as a single MultiPolygon feature.
pub fn border_to_layer(border: &Border) -> Layer {
    Layer::new(border.epsg(), vec![Feature::new(0, border.shape().clone())])
}

/// Rebuild a border from every polygonal feature of a layer.
pub fn border_from_layer(layer: &Layer) -> Result<Border> {
    let parts = layer.features.iter()
        .map(|feature| match &feature.geometry {
            Geometry::MultiPolygon(multi) => Ok(multi.clone()),
            Geometry::Polygon(polygon) => Ok(MultiPolygon(vec![polygon.clone()])),
            other => Err(Error::Storage(format!("border feature {}: unexpected {}", feature.id, kind(other)))),
        })
        .collect::<Result<Vec<_>>>()?;

    Border::from_parts(&parts, layer.epsg)
        .map_err(|e| Error::Storage(format!("stored border is unusable: {e}")))
}

pub fn cells_to_layer(cells: &[GridCell], epsg: u32) -> Layer {
    let features = cells.iter()
        .map(|cell| Feature::new(cell.id as u64, cell.polygon.clone()))
        .collect();
    Layer::new(epsg, features)
}

pub fn cells_from_layer(layer: &Layer) -> Result<Vec<GridCell>> {
    layer.features.iter()
        .map(|feature| Ok(GridCell { id: feature.id as usize, polygon: expect_polygon(feature)? }))
        .collect()
}

pub fn vertices_to_layer(vertices: &[Vertex], epsg: u32) -> Layer {
    let features = vertices.iter()
        .map(|vertex| Feature::new(vertex.id as u64, vertex.point))
        .collect();
    Layer::new(epsg, features)
}

pub fn vertices_from_layer(layer: &Layer) -> Result<Vec<Vertex>> {
    layer.features.iter()
        .map(|feature| Ok(Vertex { id: feature.id as usize, point: expect_point(feature)? }))
        .collect()
}

/// Sectors keep their apex, azimuth and radius as properties next to the polygon.
pub fn sectors_to_layer(sectors: &[Sector], epsg: u32) -> Layer {
    let features = sectors.iter()
        .map(|sector| {
            Feature::new(sector.id as u64, sector.polygon.clone())
                .with("source", sector.source)
                .with("azimuth", sector.azimuth)
                .with("radius_km", sector.radius_km)
                .with("apex", vec![sector.apex.x(), sector.apex.y()])
        })
        .collect();
    Layer::new(epsg, features)
}

pub fn sectors_from_layer(layer: &Layer) -> Result<Vec<Sector>> {
    layer.features.iter()
        .map(|feature| {
            let apex = property(feature, "apex")?.as_array()
                .and_then(|xy| Some(Point::new(xy.first()?.as_f64()?, xy.get(1)?.as_f64()?)))
                .ok_or_else(|| Error::Storage(format!("feature {}: apex is not an [x, y] pair", feature.id)))?;

            Ok(Sector {
                id: feature.id as usize,
                source: property_usize(feature, "source")?,
                apex,
                azimuth: property_f64(feature, "azimuth")?,
                radius_km: property_f64(feature, "radius_km")?,
                polygon: expect_polygon(feature)?,
            })
        })
        .collect()
}

/// Intersections are numbered by position; the pair of ids lives in the properties.
pub fn intersections_to_layer(intersections: &[Intersection], epsg: u32) -> Layer {
    let features = intersections.iter().enumerate()
        .map(|(row, hit)| {
            Feature::new(row as u64, hit.point)
                .with("sector_id", hit.sector_id)
                .with("point_id", hit.point_id)
        })
        .collect();
    Layer::new(epsg, features)
}

pub fn intersections_from_layer(layer: &Layer) -> Result<Vec<Intersection>> {
    layer.features.iter()
        .map(|feature| Ok(Intersection {
            sector_id: property_usize(feature, "sector_id")?,
            point_id: property_usize(feature, "point_id")?,
            point: expect_point(feature)?,
        }))
        .collect()
}
