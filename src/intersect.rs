use geo::{
    coordinate_position::{CoordPos, CoordinatePosition},
    BoundingRect, Point,
};
use rstar::{RTree, AABB};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geom::{ensure_polygon, PointEntry};
use crate::grid::Vertex;
use crate::parallel::ParallelExecutor;
use crate::sector::Sector;

/// Whether a point on a sector's outline counts as covered.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainmentPolicy {
    /// Points on the boundary are covered.
    #[default]
    Inclusive,
    /// Only points strictly inside are covered.
    Exclusive,
}

impl ContainmentPolicy {
    #[inline]
    fn admits(&self, position: CoordPos) -> bool {
        match self {
            ContainmentPolicy::Inclusive => position != CoordPos::Outside,
            ContainmentPolicy::Exclusive => position == CoordPos::Inside,
        }
    }
}

/// A grid point covered by a sector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    pub sector_id: usize,
    pub point_id: usize,
    pub point: Point<f64>,
}

/// Resolves which grid points each sector covers.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntersectionResolver {
    policy: ContainmentPolicy,
}

impl IntersectionResolver {
    pub fn new(policy: ContainmentPolicy) -> Self { Self { policy } }

    #[inline] pub fn policy(&self) -> ContainmentPolicy { self.policy }

    /// Points of `points` covered by a single sector, using the shared point index.
    fn covered(&self, sector: &Sector, points: &[Vertex], index: &RTree<PointEntry>) -> Result<Vec<Intersection>> {
        ensure_polygon(&sector.polygon)?;
        let rect = sector.polygon.bounding_rect()
            .ok_or_else(|| Error::GeometryOp(format!("sector {} has no extent", sector.id)))?;
        let envelope = AABB::from_corners(rect.min().into(), rect.max().into());

        let mut found = index.locate_in_envelope_intersecting(&envelope)
            .map(|entry| &points[entry.idx()])
            .filter(|vertex| self.policy.admits(sector.polygon.coordinate_position(&vertex.point.0)))
            .map(|vertex| Intersection { sector_id: sector.id, point_id: vertex.id, point: vertex.point })
            .collect::<Vec<_>>();
        found.sort_unstable_by_key(|i| i.point_id);
        Ok(found)
    }

    /// For every sector, emit one record per grid point it covers.
    /// One task per sector; a sector whose test fails is logged and contributes nothing.
    /// The result is sorted by `(sector_id, point_id)`; only set membership is meaningful.
    pub fn find_intersections(&self, sectors: &[Sector], points: &[Vertex], executor: &ParallelExecutor) -> Vec<Intersection> {
        let index = RTree::bulk_load(
            points.iter().enumerate()
                .map(|(i, vertex)| PointEntry::new(i, vertex.point))
                .collect()
        );

        let results = executor.map_partitioned("intersections", sectors, |sector| self.covered(sector, points, &index));

        let mut intersections = results.completed.into_iter().flatten().collect::<Vec<_>>();
        intersections.sort_unstable_by_key(|i| (i.sector_id, i.point_id));

        tracing::info!(
            sectors = sectors.len(),
            points = points.len(),
            intersections = intersections.len(),
            policy = ?self.policy,
            "resolved sector coverage"
        );
        intersections
    }
}
