mod build;
mod fan;
mod validate;

use geo::{Point, Polygon};

pub use build::{build_sector, DestinationFormula, SectorBuilder, SectorTask};
pub use fan::SectorFan;
pub use validate::keep_fully_contained;

/// A radial wedge of coverage anchored at a grid vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct Sector {
    pub id: usize,
    /// Id of the grid vertex the sector was built from.
    pub source: usize,
    pub apex: Point<f64>,
    /// Central bearing in degrees clockwise from north.
    pub azimuth: f64,
    pub radius_km: f64,
    pub polygon: Polygon<f64>,
}
