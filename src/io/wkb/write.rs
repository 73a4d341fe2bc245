//! WKB writing operations.

use std::io::Write;

use anyhow::{bail, Result};
use geo::{Geometry, LineString, Polygon};

use super::{WKB_LE, WKB_MULTIPOLYGON, WKB_POINT, WKB_POLYGON};

/// Write the byte order and geometry type header.
fn write_header(wkb: &mut Vec<u8>, geom_type: u32) -> Result<()> {
    wkb.write_all(&[WKB_LE])?;
    wkb.write_all(&geom_type.to_le_bytes())?;
    Ok(())
}

/// Write a ring as point count followed by coordinates.
fn write_ring(wkb: &mut Vec<u8>, ring: &LineString<f64>) -> Result<()> {
    wkb.write_all(&(ring.0.len() as u32).to_le_bytes())?;
    for coord in ring.coords() {
        wkb.write_all(&coord.x.to_le_bytes())?;
        wkb.write_all(&coord.y.to_le_bytes())?;
    }
    Ok(())
}

/// Write the rings of a Polygon (no header).
fn write_polygon_body(wkb: &mut Vec<u8>, poly: &Polygon<f64>) -> Result<()> {
    // Number of rings (1 exterior + interiors)
    let num_rings = (1 + poly.interiors().len()) as u32;
    wkb.write_all(&num_rings.to_le_bytes())?;

    write_ring(wkb, poly.exterior())?;
    for interior in poly.interiors() {
        write_ring(wkb, interior)?;
    }
    Ok(())
}

/// Encode a Point, Polygon or MultiPolygon as little-endian WKB.
pub(crate) fn geometry_to_wkb(geometry: &Geometry<f64>) -> Result<Vec<u8>> {
    let mut wkb = Vec::new();

    match geometry {
        Geometry::Point(point) => {
            write_header(&mut wkb, WKB_POINT)?;
            wkb.write_all(&point.x().to_le_bytes())?;
            wkb.write_all(&point.y().to_le_bytes())?;
        }
        Geometry::Polygon(poly) => {
            write_header(&mut wkb, WKB_POLYGON)?;
            write_polygon_body(&mut wkb, poly)?;
        }
        Geometry::MultiPolygon(multi) => {
            write_header(&mut wkb, WKB_MULTIPOLYGON)?;
            wkb.write_all(&(multi.0.len() as u32).to_le_bytes())?;
            for poly in &multi.0 {
                // Every member carries its own header.
                write_header(&mut wkb, WKB_POLYGON)?;
                write_polygon_body(&mut wkb, poly)?;
            }
        }
        other => bail!("[io::wkb::write] Unsupported geometry type: {:?}", other),
    }

    Ok(wkb)
}
