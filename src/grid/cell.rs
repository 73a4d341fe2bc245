use geo::{Coord, Point, Polygon};

/// Quantization scale: vertices are compared at 6 decimal places.
const Q_SCALE: f64 = 1e6;

/// Coordinates rounded to 6 decimals, used for vertex identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct VertexKey(pub i64, pub i64);

impl From<Coord<f64>> for VertexKey {
    #[inline]
    fn from(c: Coord<f64>) -> Self {
        VertexKey((c.x * Q_SCALE).round() as i64, (c.y * Q_SCALE).round() as i64)
    }
}

impl From<Point<f64>> for VertexKey {
    #[inline]
    fn from(p: Point<f64>) -> Self { VertexKey::from(p.0) }
}

/// One square tile of the grid, stored in the geographic CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct GridCell {
    pub id: usize,
    pub polygon: Polygon<f64>,
}

/// A grid corner retained inside the border.
#[derive(Debug, Clone, Copy)]
pub struct Vertex {
    pub id: usize,
    pub point: Point<f64>,
}

impl Vertex {
    #[inline] pub fn key(&self) -> VertexKey { VertexKey::from(self.point) }
}

/// Two vertices are the same grid point iff their rounded coordinates match.
impl PartialEq for Vertex {
    fn eq(&self, other: &Self) -> bool { self.key() == other.key() }
}

impl Eq for Vertex {}

impl std::hash::Hash for Vertex {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) { self.key().hash(state) }
}
