mod algorithm;
mod bbox;
mod border;

use geo::{Area, CoordsIter, Polygon};

use crate::error::{Error, Result};

pub use algorithm::proj::{
    CoordinateProjector, DegreeProjector, IdentityProjector, ProjectionMode, UtmProjector,
    projector_for,
};
pub(crate) use bbox::PointEntry;
pub use border::Border;

/// EPSG code of WGS84 lon/lat, the storage CRS for every layer.
pub const WGS84: u32 = 4326;

/// Error unless every coordinate of the geometry is finite.
pub(crate) fn ensure_finite<G: CoordsIter<Scalar = f64>>(geometry: &G) -> Result<()> {
    if geometry.coords_iter().all(|c| c.x.is_finite() && c.y.is_finite()) { return Ok(()) }
    Err(Error::GeometryOp("geometry has non-finite coordinates".into()))
}

/// Error unless the polygon has a closed exterior ring with finite coordinates and a non-zero area.
pub(crate) fn ensure_polygon(polygon: &Polygon<f64>) -> Result<()> {
    if polygon.exterior().0.len() < 4 {
        return Err(Error::GeometryOp(format!(
            "polygon ring has {} coordinates, need at least 4",
            polygon.exterior().0.len()
        )));
    }
    ensure_finite(polygon)?;
    if polygon.unsigned_area() <= 0.0 {
        return Err(Error::GeometryOp("polygon has zero area".into()));
    }
    Ok(())
}
