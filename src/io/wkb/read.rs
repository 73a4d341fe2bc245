//! WKB reading operations.

use std::io::{Cursor, Read};

use anyhow::{bail, Context, Result};
use geo::{Coord, Geometry, LineString, MultiPolygon, Point, Polygon};

use super::{WKB_BE, WKB_LE, WKB_MULTIPOLYGON, WKB_POINT, WKB_POLYGON};

/// Cursor over WKB bytes that remembers the byte order of the current geometry.
struct WkbReader<'a> {
    cursor: Cursor<&'a [u8]>,
    is_le: bool,
}

impl<'a> WkbReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { cursor: Cursor::new(bytes), is_le: true }
    }

    /// Read a byte order marker and geometry type.
    fn read_header(&mut self) -> Result<u32> {
        let mut byte_order = [0u8; 1];
        self.cursor.read_exact(&mut byte_order)
            .context("[io::wkb::read] Failed to read byte order")?;
        self.is_le = match byte_order[0] {
            WKB_LE => true,
            WKB_BE => false,
            other => bail!("[io::wkb::read] Invalid byte order marker {other}"),
        };
        self.read_u32().context("[io::wkb::read] Failed to read geometry type")
    }

    fn read_u32(&mut self) -> Result<u32> {
        let mut bytes = [0u8; 4];
        self.cursor.read_exact(&mut bytes)?;
        Ok(if self.is_le { u32::from_le_bytes(bytes) } else { u32::from_be_bytes(bytes) })
    }

    fn read_f64(&mut self) -> Result<f64> {
        let mut bytes = [0u8; 8];
        self.cursor.read_exact(&mut bytes)?;
        Ok(if self.is_le { f64::from_le_bytes(bytes) } else { f64::from_be_bytes(bytes) })
    }

    fn read_coord(&mut self) -> Result<Coord<f64>> {
        let x = self.read_f64().context("[io::wkb::read] Failed to read x coordinate")?;
        let y = self.read_f64().context("[io::wkb::read] Failed to read y coordinate")?;
        Ok(Coord { x, y })
    }

    fn read_ring(&mut self) -> Result<LineString<f64>> {
        let len = self.read_u32().context("[io::wkb::read] Failed to read ring length")?;
        let coords = (0..len)
            .map(|_| self.read_coord())
            .collect::<Result<Vec<_>>>()?;
        Ok(LineString::from(coords))
    }

    fn read_polygon_body(&mut self) -> Result<Polygon<f64>> {
        let num_rings = self.read_u32().context("[io::wkb::read] Failed to read number of rings")?;
        if num_rings == 0 {
            bail!("[io::wkb::read] Polygon must have at least one ring");
        }

        let exterior = self.read_ring()?;
        let interiors = (1..num_rings)
            .map(|_| self.read_ring())
            .collect::<Result<Vec<_>>>()?;

        Ok(Polygon::new(exterior, interiors))
    }

    fn read_geometry(&mut self) -> Result<Geometry<f64>> {
        match self.read_header()? {
            WKB_POINT => Ok(Geometry::Point(Point(self.read_coord()?))),
            WKB_POLYGON => Ok(Geometry::Polygon(self.read_polygon_body()?)),
            WKB_MULTIPOLYGON => {
                let count = self.read_u32().context("[io::wkb::read] Failed to read polygon count")?;
                let mut polygons = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    match self.read_header()? {
                        WKB_POLYGON => polygons.push(self.read_polygon_body()?),
                        other => bail!("[io::wkb::read] Expected Polygon inside MultiPolygon, got {other}"),
                    }
                }
                Ok(Geometry::MultiPolygon(MultiPolygon(polygons)))
            }
            other => bail!("[io::wkb::read] Unsupported geometry type {other}"),
        }
    }
}

/// Decode a Point, Polygon or MultiPolygon from WKB in either byte order.
pub(crate) fn geometry_from_wkb(bytes: &[u8]) -> Result<Geometry<f64>> {
    WkbReader::new(bytes).read_geometry()
}
