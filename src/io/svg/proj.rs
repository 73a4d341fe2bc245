use std::io::Write;

use anyhow::Result;
use geo::{Coord, CoordsIter, Geometry, LineString, Polygon, Rect};

/// Projection function: data coordinates -> SVG coords (x, y)
pub(crate) type Projection = dyn Fn(&Coord<f64>) -> (f64, f64);

/// Page layout for a map of `bounds`.
///
/// Geographic data is drawn equirectangular with x shrunk by the cosine of the
/// middle latitude, so shapes keep roughly their true proportions.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SvgFrame {
    pub(crate) bounds: Rect<f64>,
    pub(crate) width: f64,
    pub(crate) height: f64,
    pub(crate) margin: f64,
    pub(crate) scale: f64,
    x_stretch: f64,
}

impl SvgFrame {
    pub(crate) fn new(bounds: Rect<f64>, width: f64, margin: f64, geographic: bool) -> Self {
        let x_stretch = if geographic {
            (bounds.center().y.to_radians().cos()).max(1e-3)
        } else {
            1.0
        };
        let data_width = (bounds.width() * x_stretch).max(f64::EPSILON);
        let scale = (width - 2.0 * margin) / data_width;
        let height = bounds.height() * scale + 2.0 * margin;
        Self { bounds, width, height, margin, scale, x_stretch }
    }

    /// Map data coordinates to SVG coordinates (Y down).
    pub(crate) fn project(&self, coord: &Coord<f64>) -> (f64, f64) {
        let x = self.margin + (coord.x - self.bounds.min().x) * self.x_stretch * self.scale;
        let y = self.margin + (self.bounds.max().y - coord.y) * self.scale;
        (x, y)
    }
}

/// Build a compact SVG path string for a ring.
fn ring_to_path(ring: &LineString<f64>, project: &Projection, out: &mut String) {
    let mut coords = ring.coords_iter().map(|coord| project(&coord));
    if let Some((x, y)) = coords.next() {
        out.push_str(&format!(" M{x:.3},{y:.3}"));
        for (x, y) in coords {
            out.push_str(&format!(" L{x:.3},{y:.3}"));
        }
        out.push('Z');
    }
}

/// Path string for a polygon including holes (drawn with even-odd fill).
fn polygon_to_path(polygon: &Polygon<f64>, project: &Projection, out: &mut String) {
    ring_to_path(polygon.exterior(), project, out);
    for interior in polygon.interiors() {
        ring_to_path(interior, project, out);
    }
}

/// Draw polygonal and point geometries with a CSS class. Points become circles of `radius`.
pub(crate) fn draw_geometries<'a>(
    writer: &mut impl Write,
    geometries: impl IntoIterator<Item = &'a Geometry<f64>>,
    class: &str,
    radius: f64,
    project: &Projection,
) -> Result<()> {
    for geometry in geometries {
        match geometry {
            Geometry::Point(point) => {
                let (cx, cy) = project(&point.0);
                writeln!(writer, r#"<circle class="{class}" cx="{cx:.3}" cy="{cy:.3}" r="{radius}"/>"#)?;
            }
            Geometry::Polygon(polygon) => {
                let mut d = String::new();
                polygon_to_path(polygon, project, &mut d);
                writeln!(writer, r#"<path class="{class}" fill-rule="evenodd" d="{d}"/>"#)?;
            }
            Geometry::MultiPolygon(multi) => {
                let mut d = String::new();
                for polygon in &multi.0 {
                    polygon_to_path(polygon, project, &mut d);
                }
                writeln!(writer, r#"<path class="{class}" fill-rule="evenodd" d="{d}"/>"#)?;
            }
            other => tracing::debug!(?other, "skipping geometry that cannot be drawn"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use geo::{coord, point, polygon};

    use super::*;

    #[test]
    fn geographic_frame_shrinks_longitude() {
        let bounds = Rect::new(coord! { x: 0.0, y: 59.0 }, coord! { x: 10.0, y: 61.0 });
        let frame = SvgFrame::new(bounds, 520.0, 10.0, true);
        // cos(60°) = 0.5, so 10° of longitude spans 5 "units" across 500 px.
        assert!((frame.scale - 100.0).abs() < 1e-9);
        assert!((frame.height - 220.0).abs() < 1e-9);

        let (x, y) = frame.project(&coord! { x: 10.0, y: 59.0 });
        assert!((x - 510.0).abs() < 1e-9);
        assert!((y - 210.0).abs() < 1e-9);
    }

    #[test]
    fn planar_frame_keeps_aspect() {
        let bounds = Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 20.0, y: 10.0 });
        let frame = SvgFrame::new(bounds, 200.0, 0.0, false);
        assert_eq!(frame.project(&coord! { x: 0.0, y: 10.0 }), (0.0, 0.0));
        assert_eq!(frame.project(&coord! { x: 20.0, y: 0.0 }), (200.0, 100.0));
    }

    #[test]
    fn draws_paths_and_circles() {
        let frame = SvgFrame::new(Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 1.0, y: 1.0 }), 100.0, 0.0, false);
        let geometries = vec![
            Geometry::Polygon(polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)]),
            Geometry::Point(point! { x: 0.5, y: 0.5 }),
        ];
        let mut out = Vec::new();
        draw_geometries(&mut out, &geometries, "cell", 2.0, &move |c: &Coord<f64>| frame.project(c)).unwrap();
        let svg = String::from_utf8(out).unwrap();

        assert!(svg.contains(r#"<path class="cell" fill-rule="evenodd" d=" M0.000,100.000 L100.000,100.000"#));
        assert!(svg.contains(r#"<circle class="cell" cx="50.000" cy="50.000" r="2"/>"#));
    }
}
