//! Layers prepared for display, with GeoJSON and SVG export.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use geo::{BoundingRect, Rect};

use crate::error::{Error, Result};
use crate::geom::WGS84;
use crate::io::{geojson::layer_to_geojson_bytes, svg::{draw_geometries, SvgFrame, SvgWriter}, write_bytes_atomic, PendingWrite};
use crate::pipeline::Generated;
use crate::store::{self, tables, GeometryStore, Layer};

/// The named layers of a finished run, all in the border's coordinate system.
#[derive(Debug, Clone)]
pub struct Presentation {
    border: Layer,
    grid: Layer,
    sectors: Layer,
    intersections: Option<Layer>,
}

impl Presentation {
    /// Fails unless every layer shares the border's EPSG code.
    pub fn new(border: Layer, grid: Layer, sectors: Layer, intersections: Option<Layer>) -> Result<Self> {
        let others = [("grid", Some(&grid)), ("sectors", Some(&sectors)), ("intersections", intersections.as_ref())];
        for (name, layer) in others {
            if let Some(layer) = layer.filter(|layer| layer.epsg != border.epsg) {
                return Err(Error::Projection(format!(
                    "{name} layer is EPSG:{}, border is EPSG:{}",
                    layer.epsg, border.epsg
                )))
            }
        }
        Ok(Self { border, grid, sectors, intersections })
    }

    /// Read the display layers from a store; intersections are optional.
    pub fn from_store<S: GeometryStore + ?Sized>(store: &S) -> Result<Self> {
        let intersections = store.has_data(tables::INTERSECTIONS)?
            .then(|| store.read_geometries(tables::INTERSECTIONS))
            .transpose()?;
        Self::new(
            store.read_geometries(tables::BORDER)?,
            store.read_geometries(tables::GRID_CELLS)?,
            store.read_geometries(tables::SECTORS)?,
            intersections,
        )
    }

    pub fn from_generated(generated: &Generated) -> Result<Self> {
        let epsg = generated.border.epsg();
        Self::new(
            store::border_to_layer(&generated.border),
            store::cells_to_layer(&generated.cells, epsg),
            store::sectors_to_layer(&generated.sectors, epsg),
            Some(store::intersections_to_layer(&generated.intersections, epsg)),
        )
    }

    /// Layers in drawing order.
    pub fn layers(&self) -> Vec<(&'static str, &Layer)> {
        let mut layers = vec![("border", &self.border), ("grid", &self.grid), ("sectors", &self.sectors)];
        if let Some(intersections) = &self.intersections {
            layers.push(("intersections", intersections));
        }
        layers
    }

    /// Write one `<layer>.geojson` per layer into `dir`.
    pub fn write_geojson(&self, dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
        self.layers().into_iter()
            .map(|(name, layer)| -> anyhow::Result<PathBuf> {
                let path = dir.join(format!("{name}.geojson"));
                write_bytes_atomic(&path, &layer_to_geojson_bytes(layer)?)
                    .with_context(|| format!("[presentation] write {name} layer"))?;
                Ok(path)
            })
            .collect()
    }

    /// Small wrapper with defaults.
    pub fn to_svg(&self, path: &Path) -> anyhow::Result<()> {
        self.to_svg_with_size(path, 1200, 10)
    }

    /// Draw border, grid, sectors and intersection points as a static map.
    pub fn to_svg_with_size(&self, path: &Path, width: i32, margin: i32) -> anyhow::Result<()> {
        let bounds = layer_bounds(&self.border)
            .ok_or_else(|| anyhow!("[to_svg] Could not determine bounds; nothing to draw."))?;
        let frame = SvgFrame::new(bounds, width as f64, margin as f64, self.border.epsg == WGS84);
        let project = move |coord: &geo::Coord<f64>| frame.project(coord);

        let mut writer = SvgWriter::new(PendingWrite::open(path)?);
        writer.write_header(frame.width, frame.height, frame.margin, frame.scale, &bounds)?;
        writer.write_styles()?;

        for (name, layer) in self.layers() {
            let (class, radius) = match name {
                "border" => ("border", 0.0),
                "grid" => ("cell", 0.0),
                "sectors" => ("sector", 0.0),
                _ => ("hit", 1.5),
            };
            writer.begin_group(name)?;
            draw_geometries(&mut writer, layer.features.iter().map(|f| &f.geometry), class, radius, &project)?;
            writer.end_group()?;
        }

        writer.finish()?.finalize()?;
        tracing::info!(path = %path.display(), "wrote map");
        Ok(())
    }
}

fn layer_bounds(layer: &Layer) -> Option<Rect<f64>> {
    layer.features.iter()
        .filter_map(|feature| feature.geometry.bounding_rect())
        .reduce(|a, b| Rect::new(
            geo::coord! { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
            geo::coord! { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
        ))
}
