use ahash::AHashSet;
use geo::{Area, BooleanOps, BoundingRect, CoordsIter, MultiPolygon, Rect};

use crate::error::{Error, Result};
use crate::geom::ensure_finite;
use crate::grid::VertexKey;

/// The unified (dissolved) outline of the territory under analysis.
/// Every containment and intersection test runs against this single geometry.
#[derive(Debug, Clone)]
pub struct Border {
    shape: MultiPolygon<f64>,
    bounds: Rect<f64>,
    epsg: u32,
}

impl Border {
    /// Construct a border from an already-unified MultiPolygon.
    pub fn new(shape: MultiPolygon<f64>, epsg: u32) -> Result<Self> {
        if shape.0.is_empty() || shape.unsigned_area() <= 0.0 {
            return Err(Error::SourceUnavailable("border geometry is empty".into()))
        }
        ensure_finite(&shape)
            .map_err(|e| Error::SourceUnavailable(format!("border geometry is invalid: {e}")))?;

        let bounds = shape.bounding_rect()
            .ok_or_else(|| Error::SourceUnavailable("border has no bounding box".into()))?;

        Ok(Self { shape, bounds, epsg })
    }

    /// Dissolve every polygon of every part into one geometry, so edges shared
    /// between touching polygons become interior.
    /// This may be slow for large numbers of complex polygons.
    pub fn from_parts(parts: &[MultiPolygon<f64>], epsg: u32) -> Result<Self> {
        if parts.is_empty() {
            return Err(Error::SourceUnavailable("border has no parts".into()))
        }
        let shape = parts.iter()
            .flat_map(|part| part.0.iter())
            .fold(MultiPolygon(vec![]), |acc, polygon| acc.union(&MultiPolygon(vec![polygon.clone()])));
        Self::new(shape, epsg)
    }

    /// Get a reference to the unified geometry.
    #[inline] pub fn shape(&self) -> &MultiPolygon<f64> { &self.shape }

    /// Get the bounding rectangle of the border.
    #[inline] pub fn bounds(&self) -> Rect<f64> { self.bounds }

    /// Get the EPSG code of the border's CRS.
    #[inline] pub fn epsg(&self) -> u32 { self.epsg }

    /// Rounded keys of every ring vertex of the border (exteriors and holes).
    pub(crate) fn vertex_keys(&self) -> AHashSet<VertexKey> {
        self.shape.coords_iter().map(VertexKey::from).collect()
    }
}
