use ahash::AHashSet;
use geo::{
    coordinate_position::{CoordPos, CoordinatePosition},
    Intersects,
};

use crate::geom::{ensure_polygon, Border};
use crate::grid::{GridCell, Vertex, VertexKey};

/// Keep every cell that touches or overlaps the border.
/// This is a coarse filter: retained cells may extend outside the border.
pub fn filter_cells_intersecting_border(cells: &[GridCell], border: &Border) -> Vec<GridCell> {
    let retained = cells.iter()
        .filter(|cell| match ensure_polygon(&cell.polygon) {
            Ok(()) => border.shape().intersects(&cell.polygon),
            Err(e) => {
                tracing::warn!(cell = cell.id, error = %e, "skipping invalid grid cell");
                false
            }
        })
        .cloned()
        .collect::<Vec<_>>();

    tracing::info!(total = cells.len(), retained = retained.len(), "filtered grid cells by border");
    retained
}

/// Collect the unique cell corners that lie strictly inside the border.
/// Corners are deduplicated by their 6-decimal key; the first occurrence wins
/// and ids are assigned in discovery order.
pub fn extract_interior_vertices(cells: &[GridCell], border: &Border) -> Vec<Vertex> {
    let mut seen = AHashSet::<VertexKey>::new();
    let mut vertices = Vec::new();

    for cell in cells {
        if let Err(e) = ensure_polygon(&cell.polygon) {
            tracing::warn!(cell = cell.id, error = %e, "skipping invalid grid cell");
            continue;
        }

        for &coord in cell.polygon.exterior().coords() {
            let key = VertexKey::from(coord);
            if seen.contains(&key) { continue }
            if border.shape().coordinate_position(&coord) != CoordPos::Inside { continue }

            seen.insert(key);
            vertices.push(Vertex { id: vertices.len(), point: coord.into() });
        }
    }

    tracing::info!(cells = cells.len(), vertices = vertices.len(), "extracted interior grid vertices");
    vertices
}

/// Drop vertices that coincide (at 6 decimals) with a vertex of the border rings.
/// A sector apex sitting on the border outline yields degenerate, boundary-straddling sectors.
/// Returns a new collection; ids are preserved.
pub fn remove_border_coincident_vertices(vertices: &[Vertex], border: &Border) -> Vec<Vertex> {
    let border_keys = border.vertex_keys();
    let kept = vertices.iter()
        .filter(|vertex| !border_keys.contains(&vertex.key()))
        .copied()
        .collect::<Vec<_>>();

    if kept.len() < vertices.len() {
        tracing::info!(removed = vertices.len() - kept.len(), "removed vertices shared with the border outline");
    }
    kept
}
