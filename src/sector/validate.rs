use geo::{BoundingRect, Contains};

use crate::geom::{ensure_polygon, Border};
use crate::sector::Sector;

/// Keep only the sectors that lie entirely inside the border.
/// Partially covered sectors are dropped rather than clipped, so every retained
/// sector keeps its regular shape. Invalid sector polygons are skipped with a warning.
pub fn keep_fully_contained(sectors: &[Sector], border: &Border) -> Vec<Sector> {
    let bounds = border.bounds();

    let retained = sectors.iter()
        .filter(|sector| {
            if let Err(e) = ensure_polygon(&sector.polygon) {
                tracing::warn!(sector = sector.id, error = %e, "skipping invalid sector");
                return false
            }
            // Cheap reject: anything poking out of the border's bounding box cannot be contained.
            match sector.polygon.bounding_rect() {
                Some(rect) if rect.min().x >= bounds.min().x && rect.min().y >= bounds.min().y
                    && rect.max().x <= bounds.max().x && rect.max().y <= bounds.max().y =>
                    border.shape().contains(&sector.polygon),
                _ => false,
            }
        })
        .cloned()
        .collect::<Vec<_>>();

    tracing::info!(total = sectors.len(), retained = retained.len(), "validated sector containment");
    retained
}
