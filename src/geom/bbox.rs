use geo::Point;
use rstar::{RTreeObject, AABB};

/// A grid point in an R-tree, associated with its position in the point slice.
#[derive(Debug, Clone)]
pub(crate) struct PointEntry {
    idx: usize, // Index of corresponding point in the slice the tree was built from
    point: Point<f64>,
}

impl PointEntry {
    pub(crate) fn new(idx: usize, point: Point<f64>) -> Self {
        Self { idx, point }
    }

    /// Get the index of the corresponding point.
    pub(crate) fn idx(&self) -> usize { self.idx }
}

impl RTreeObject for PointEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.point.x(), self.point.y()])
    }
}
