use geo::{coord, Coord, LineString, Polygon, Rect};

use crate::error::{Error, Result};
use crate::geom::CoordinateProjector;
use crate::grid::GridCell;

/// Samples per bounding-box edge when projecting it, so curved edges stay covered.
const EDGE_SAMPLES: usize = 16;

/// Refuse to allocate grids beyond this many cells.
const MAX_CELLS: usize = 50_000_000;

/// Project a lon/lat rectangle into the working plane and take the bounds of its densified outline.
fn planar_bounds(bounds: &Rect<f64>, projector: &dyn CoordinateProjector) -> Result<Rect<f64>> {
    let (min, max) = (bounds.min(), bounds.max());
    let corners = [min, coord! { x: max.x, y: min.y }, max, coord! { x: min.x, y: max.y }];

    let mut lo = coord! { x: f64::INFINITY, y: f64::INFINITY };
    let mut hi = coord! { x: f64::NEG_INFINITY, y: f64::NEG_INFINITY };
    for (i, &a) in corners.iter().enumerate() {
        let b = corners[(i + 1) % corners.len()];
        for k in 0..EDGE_SAMPLES {
            let t = k as f64 / EDGE_SAMPLES as f64;
            let p = projector.to_planar(a + (b - a) * t)?;
            lo = coord! { x: lo.x.min(p.x), y: lo.y.min(p.y) };
            hi = coord! { x: hi.x.max(p.x), y: hi.y.max(p.y) };
        }
    }

    Ok(Rect::new(lo, hi))
}

/// Build the axis-aligned square with lower-left corner `origin` and side `step`.
fn square(origin: Coord<f64>, step: f64) -> Polygon<f64> {
    let Coord { x, y } = origin;
    Polygon::new(
        LineString::from(vec![(x, y), (x + step, y), (x + step, y + step), (x, y + step), (x, y)]),
        vec![],
    )
}

/// Tile `bounds` (storage CRS) with squares of `step_km` in the projector's working plane.
/// Ranges are half-open, so the last row and column may extend past the bounds.
/// Cells are returned in the storage CRS with ids in x-major order.
pub fn generate_grid(bounds: &Rect<f64>, step_km: f64, projector: &dyn CoordinateProjector) -> Result<Vec<GridCell>> {
    if !(step_km.is_finite() && step_km > 0.0) {
        return Err(Error::InvalidBounds(format!("step must be positive, got {step_km} km")))
    }

    let planar = planar_bounds(bounds, projector)?;
    let (min, max) = (planar.min(), planar.max());
    if !(min.x < max.x && min.y < max.y) || !(max.x.is_finite() && max.y.is_finite()) {
        return Err(Error::InvalidBounds(format!(
            "bounding box ({}, {}) - ({}, {}) has no area",
            min.x, min.y, max.x, max.y
        )))
    }

    let step = step_km * projector.units_per_km();
    let cols = ((max.x - min.x) / step).ceil() as usize;
    let rows = ((max.y - min.y) / step).ceil() as usize;
    if cols.saturating_mul(rows) > MAX_CELLS {
        return Err(Error::InvalidBounds(format!(
            "{cols} x {rows} cells exceeds the limit of {MAX_CELLS}; increase the step"
        )))
    }

    tracing::debug!(cols, rows, step, mode = projector.mode().to_str(), "tiling bounding box");

    let mut cells = Vec::with_capacity(cols * rows);
    for i in 0..cols {
        for j in 0..rows {
            // Index-based origins avoid accumulating floating-point drift.
            let origin = coord! { x: min.x + i as f64 * step, y: min.y + j as f64 * step };
            let polygon = projector.unproject(&square(origin, step))?;
            cells.push(GridCell { id: cells.len(), polygon });
        }
    }

    Ok(cells)
}

#[cfg(test)]
mod tests {
    use ahash::AHashSet;
    use geo::{Area, CoordsIter};

    use super::*;
    use crate::geom::{DegreeProjector, IdentityProjector, UtmProjector};

    fn lower_left(cell: &GridCell) -> Coord<f64> { cell.polygon.exterior().0[0] }

    #[test]
    fn twenty_by_twenty_with_step_ten_gives_four_cells() {
        let bounds = Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 20.0, y: 20.0 });
        let cells = generate_grid(&bounds, 10.0, &IdentityProjector).unwrap();

        let corners = cells.iter().map(lower_left).map(|c| (c.x, c.y)).collect::<Vec<_>>();
        assert_eq!(corners, vec![(0.0, 0.0), (0.0, 10.0), (10.0, 0.0), (10.0, 10.0)]);
        assert_eq!(cells.iter().map(|c| c.id).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn cells_have_configured_side_and_tile_without_gaps() {
        let bounds = Rect::new(coord! { x: -3.0, y: 2.0 }, coord! { x: 24.5, y: 13.0 });
        let step = 2.5;
        let cells = generate_grid(&bounds, step, &IdentityProjector).unwrap();

        let (cols, rows) = (11, 5);
        assert_eq!(cells.len(), cols * rows);

        for cell in &cells {
            let ring = &cell.polygon.exterior().0;
            assert_eq!(ring.len(), 5);
            for w in ring.windows(2) {
                let side = ((w[1].x - w[0].x).powi(2) + (w[1].y - w[0].y).powi(2)).sqrt();
                assert!((side - step).abs() < 1e-9);
            }
            assert!(cell.polygon.unsigned_area() > 0.0);
        }

        // Every lattice position is used exactly once.
        let positions = cells.iter()
            .map(lower_left)
            .map(|c| (((c.x + 3.0) / step).round() as i64, ((c.y - 2.0) / step).round() as i64))
            .collect::<AHashSet<_>>();
        assert_eq!(positions.len(), cells.len());
        for i in 0..cols as i64 {
            for j in 0..rows as i64 {
                assert!(positions.contains(&(i, j)));
            }
        }
    }

    #[test]
    fn last_column_may_extend_past_bounds() {
        let bounds = Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 25.0, y: 10.0 });
        let cells = generate_grid(&bounds, 10.0, &IdentityProjector).unwrap();
        assert_eq!(cells.len(), 3);
        let max_x = cells.iter().flat_map(|c| c.polygon.coords_iter()).map(|c| c.x).fold(f64::MIN, f64::max);
        assert_eq!(max_x, 30.0);
    }

    #[test]
    fn degenerate_bounds_and_steps_are_rejected() {
        let flat = Rect::new(coord! { x: 0.0, y: 5.0 }, coord! { x: 20.0, y: 5.0 });
        assert!(matches!(generate_grid(&flat, 1.0, &IdentityProjector), Err(Error::InvalidBounds(_))));

        let bounds = Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 20.0, y: 20.0 });
        assert!(matches!(generate_grid(&bounds, 0.0, &IdentityProjector), Err(Error::InvalidBounds(_))));
        assert!(matches!(generate_grid(&bounds, -1.0, &IdentityProjector), Err(Error::InvalidBounds(_))));
        assert!(matches!(generate_grid(&bounds, f64::NAN, &IdentityProjector), Err(Error::InvalidBounds(_))));
    }

    #[test]
    fn degree_cells_are_step_over_111_degrees() {
        let bounds = Rect::new(coord! { x: 30.0, y: 50.0 }, coord! { x: 30.95, y: 50.45 });
        let cells = generate_grid(&bounds, 11.1, &DegreeProjector).unwrap();

        // 0.95° / 0.1° and 0.45° / 0.1°, rounded up.
        assert_eq!(cells.len(), 10 * 5);
        assert_eq!(lower_left(&cells[0]), coord! { x: 30.0, y: 50.0 });

        let side = 11.1 / 111.0;
        for cell in &cells {
            let ring = &cell.polygon.exterior().0;
            assert!((ring[1].x - ring[0].x - side).abs() < 1e-12);
            assert!((ring[2].y - ring[1].y - side).abs() < 1e-12);
        }
    }

    #[test]
    fn metric_cells_are_ten_kilometre_squares() {
        let bounds = Rect::new(coord! { x: 30.2, y: 50.2 }, coord! { x: 30.8, y: 50.6 });
        let projector = UtmProjector::for_center(bounds.center()).unwrap();
        let projector: &dyn CoordinateProjector = &projector;
        let cells = generate_grid(&bounds, 10.0, projector).unwrap();
        assert!(!cells.is_empty());

        for cell in &cells {
            // Geographic output, so coordinates are in degrees.
            assert!(cell.polygon.exterior().0.iter().all(|c| c.x > 29.0 && c.x < 32.0));
            let planar = projector.project(&cell.polygon).unwrap();
            assert!((planar.unsigned_area() - 1.0e8).abs() < 100.0, "area {}", planar.unsigned_area());
        }
    }
}
