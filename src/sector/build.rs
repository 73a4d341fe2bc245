use geo::{coord, Coord, Destination, Geodesic, LineString, Point, Polygon};

use crate::error::{Error, Result};
use crate::geom::{CoordinateProjector, ProjectionMode};
use crate::grid::Vertex;
use crate::parallel::ParallelExecutor;
use crate::sector::{fan::validate_shape, Sector, SectorFan};

/// How arc points are placed at `radius` from the apex. Fixed for a whole run.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum DestinationFormula {
    /// WGS84 geodesic destination on lon/lat coordinates.
    Geodesic,
    /// Straight-line offset in a planar CRS.
    Planar { units_per_km: f64 },
}

impl DestinationFormula {
    /// The formula matching the run's projection mode.
    pub fn for_projector(projector: &dyn CoordinateProjector) -> Self {
        match projector.mode() {
            ProjectionMode::Metric | ProjectionMode::Degree => DestinationFormula::Geodesic,
            ProjectionMode::Identity => DestinationFormula::Planar { units_per_km: projector.units_per_km() },
        }
    }

    /// Point at `radius_km` from `origin` along `bearing` (degrees clockwise from north).
    fn destination(&self, origin: Point<f64>, bearing: f64, radius_km: f64) -> Coord<f64> {
        match *self {
            DestinationFormula::Geodesic => Geodesic.destination(origin, bearing, radius_km * 1000.0).0,
            DestinationFormula::Planar { units_per_km } => {
                let (sin, cos) = bearing.to_radians().sin_cos();
                let r = radius_km * units_per_km;
                coord! { x: origin.x() + r * sin, y: origin.y() + r * cos }
            }
        }
    }
}

/// Sample bearings `azimuth - span/2 ..= azimuth + span/2` every `step` degrees.
/// The end bearing is always included, even when `span` is not a multiple of `step`.
fn arc_bearings(azimuth: f64, span_deg: f64, step_deg: f64) -> Vec<f64> {
    let start = azimuth - span_deg / 2.0;
    let end = azimuth + span_deg / 2.0;
    let steps = (span_deg / step_deg + 1e-9).floor() as usize;

    let mut bearings = (0..=steps)
        .map(|i| start + i as f64 * step_deg)
        .collect::<Vec<_>>();
    if bearings.last().is_some_and(|&last| end - last > 1e-9) {
        bearings.push(end);
    }
    bearings
}

/// Build a pie-slice polygon: arc points from `azimuth - span/2` to `azimuth + span/2`,
/// followed by the apex. The ring closes from the apex back to the first arc point.
pub fn build_sector(
    point: Point<f64>,
    azimuth_deg: f64,
    radius_km: f64,
    span_deg: f64,
    step_deg: f64,
    formula: DestinationFormula,
) -> Result<Polygon<f64>> {
    validate_shape(radius_km, span_deg, step_deg)?;
    if !(azimuth_deg.is_finite() && point.x().is_finite() && point.y().is_finite()) {
        return Err(Error::InvalidSectorParams(format!(
            "non-finite sector origin ({}, {}) or azimuth {azimuth_deg}",
            point.x(), point.y()
        )))
    }

    let mut ring = arc_bearings(azimuth_deg, span_deg, step_deg).into_iter()
        .map(|bearing| formula.destination(point, bearing, radius_km))
        .collect::<Vec<_>>();
    if ring.iter().any(|c| !(c.x.is_finite() && c.y.is_finite())) {
        return Err(Error::GeometryOp(format!("sector arc at ({}, {}) has non-finite points", point.x(), point.y())))
    }
    ring.push(point.0);

    Ok(Polygon::new(LineString::from(ring), vec![]))
}

/// One unit of sector work: a vertex and one azimuth of the fan.
#[derive(Debug, Clone, Copy)]
pub struct SectorTask {
    pub id: usize,
    pub vertex: Vertex,
    pub azimuth: f64,
}

/// Builds the configured sector fan around grid vertices.
#[derive(Debug, Clone)]
pub struct SectorBuilder {
    fan: SectorFan,
    formula: DestinationFormula,
}

impl SectorBuilder {
    pub fn new(fan: SectorFan, formula: DestinationFormula) -> Result<Self> {
        fan.validate()?;
        Ok(Self { fan, formula })
    }

    #[inline] pub fn fan(&self) -> &SectorFan { &self.fan }

    #[inline] pub fn formula(&self) -> DestinationFormula { self.formula }

    /// Enumerate one task per (vertex, azimuth); the task index becomes the sector id.
    pub fn tasks(&self, vertices: &[Vertex]) -> Vec<SectorTask> {
        vertices.iter()
            .flat_map(|&vertex| self.fan.azimuths.iter().map(move |&azimuth| (vertex, azimuth)))
            .enumerate()
            .map(|(id, (vertex, azimuth))| SectorTask { id, vertex, azimuth })
            .collect()
    }

    /// Build the sector for a single task.
    pub fn build(&self, task: &SectorTask) -> Result<Sector> {
        let polygon = build_sector(
            task.vertex.point,
            task.azimuth,
            self.fan.radius_km,
            self.fan.span_deg,
            self.fan.step_deg,
            self.formula,
        )?;

        Ok(Sector {
            id: task.id,
            source: task.vertex.id,
            apex: task.vertex.point,
            azimuth: task.azimuth,
            radius_km: self.fan.radius_km,
            polygon,
        })
    }

    /// Build the fan around every vertex in parallel. Failed tasks are logged and excluded.
    pub fn build_all(&self, vertices: &[Vertex], executor: &ParallelExecutor) -> Vec<Sector> {
        let tasks = self.tasks(vertices);
        let results = executor.map_partitioned("sectors", &tasks, |task| self.build(task));

        tracing::info!(
            vertices = vertices.len(),
            built = results.completed.len(),
            failed = results.failed.len(),
            "generated sectors"
        );
        results.completed
    }
}
