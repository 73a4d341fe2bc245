//! Well-Known Binary encoding for stored geometries (Point, Polygon, MultiPolygon).

mod read;
mod write;

pub(crate) use read::geometry_from_wkb;
pub(crate) use write::geometry_to_wkb;

/// WKB geometry type codes
const WKB_POINT: u32 = 1;
const WKB_POLYGON: u32 = 3;
const WKB_MULTIPOLYGON: u32 = 6;
/// WKB byte order: little endian
const WKB_LE: u8 = 1;
/// WKB byte order: big endian
const WKB_BE: u8 = 0;
