//! Stage orchestration: border → grid cells → grid points → sectors → intersections.

use std::fmt;

use serde_json::{json, Value};

use crate::config::RunConfig;
use crate::error::{Error, Result};
use crate::geom::{projector_for, Border, CoordinateProjector};
use crate::grid::{
    extract_interior_vertices, filter_cells_intersecting_border, generate_grid, remove_border_coincident_vertices,
    GridCell, Vertex,
};
use crate::intersect::{Intersection, IntersectionResolver};
use crate::parallel::ParallelExecutor;
use crate::sector::{keep_fully_contained, DestinationFormula, Sector, SectorBuilder};
use crate::source::BorderSource;
use crate::store::{self, tables, GeometryStore, Layer, WriteMode};

/// Everything one generation pass produces.
#[derive(Debug, Clone)]
pub struct Generated {
    pub border: Border,
    pub cells: Vec<GridCell>,
    pub points: Vec<Vertex>,
    pub sectors: Vec<Sector>,
    pub intersections: Vec<Intersection>,
}

/// Row counts per stage, and which stages were served from the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub grid_cells: usize,
    pub grid_points: usize,
    pub sectors: usize,
    pub intersections: usize,
    pub reused: Vec<&'static str>,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} grid cells, {} grid points, {} sectors, {} intersections",
            self.grid_cells, self.grid_points, self.sectors, self.intersections
        )?;
        if !self.reused.is_empty() {
            write!(f, " (reused: {})", self.reused.join(", "))?;
        }
        Ok(())
    }
}

/// Tile the border's bounding box and keep the cells touching the border.
fn build_grid_cells(border: &Border, step_km: f64, projector: &dyn CoordinateProjector) -> Result<Vec<GridCell>> {
    let grid = generate_grid(&border.bounds(), step_km, projector)?;
    Ok(filter_cells_intersecting_border(&grid, border))
}

/// Interior cell corners that do not sit on the border outline.
fn build_grid_points(cells: &[GridCell], border: &Border) -> Vec<Vertex> {
    let interior = extract_interior_vertices(cells, border);
    remove_border_coincident_vertices(&interior, border)
}

/// Build the fan at every point and keep the sectors inside the border.
fn build_sectors(
    points: &[Vertex],
    border: &Border,
    config: &RunConfig,
    projector: &dyn CoordinateProjector,
    executor: &ParallelExecutor,
) -> Result<Vec<Sector>> {
    let builder = SectorBuilder::new(config.fan.clone(), DestinationFormula::for_projector(projector))?;
    let built = builder.build_all(points, executor);
    Ok(keep_fully_contained(&built, border))
}

/// Parameters a stored table depends on, including those of every upstream stage.
/// Worker count is left out since it never changes the output.
fn stage_params(config: &RunConfig, table: &str) -> String {
    let mut params = json!({ "mode": config.mode.to_str(), "step_km": config.step_km });
    if let Value::Object(map) = &mut params {
        if matches!(table, tables::SECTORS | tables::INTERSECTIONS) {
            map.insert("fan".into(), json!({
                "azimuths": config.fan.azimuths,
                "span_deg": config.fan.span_deg,
                "step_deg": config.fan.step_deg,
                "radius_km": config.fan.radius_km,
            }));
        }
        if table == tables::INTERSECTIONS {
            map.insert("containment".into(), json!(config.containment));
        }
    }
    params.to_string()
}

/// Run every stage in memory, without a store.
pub fn generate(border: &Border, config: &RunConfig, executor: &ParallelExecutor) -> Result<Generated> {
    config.validate()?;
    let projector = projector_for(config.mode, &border.bounds())?;

    let cells = build_grid_cells(border, config.step_km, projector.as_ref())?;
    let points = build_grid_points(&cells, border);
    let sectors = build_sectors(&points, border, config, projector.as_ref(), executor)?;
    let intersections = IntersectionResolver::new(config.containment)
        .find_intersections(&sectors, &points, executor);

    Ok(Generated { border: border.clone(), cells, points, sectors, intersections })
}

/// Runs the stages against a store, reusing any stage whose table already holds rows
/// generated with the current parameters.
pub struct Pipeline<S: GeometryStore> {
    config: RunConfig,
    store: S,
    executor: ParallelExecutor,
}

impl<S: GeometryStore> Pipeline<S> {
    /// Validates the configuration and builds the worker pool up front.
    pub fn new(config: RunConfig, store: S) -> Result<Self> {
        config.validate()?;
        let executor = ParallelExecutor::new(config.workers)?;
        tracing::debug!(workers = executor.workers(), "worker pool ready");
        Ok(Self { config, store, executor })
    }

    #[inline] pub fn config(&self) -> &RunConfig { &self.config }

    #[inline] pub fn store(&self) -> &S { &self.store }

    pub fn into_store(self) -> S { self.store }

    /// Execute a pass. With `force`, every stored table is dropped first.
    pub fn run(&mut self, source: &dyn BorderSource, force: bool) -> Result<RunSummary> {
        if force {
            for table in tables::ALL.iter().rev() {
                self.store.drop_table(table)?;
            }
            tracing::info!("dropped stored tables");
        }

        let mut summary = RunSummary::default();

        let border = if self.store.has_data(tables::BORDER)? {
            summary.reused.push(tables::BORDER);
            store::border_from_layer(&self.store.read_geometries(tables::BORDER)?)?
        } else {
            let border = source.load()?;
            self.store.write_geometries(tables::BORDER, &store::border_to_layer(&border), WriteMode::Replace)?;
            border
        };
        let epsg = border.epsg();
        let projector = projector_for(self.config.mode, &border.bounds())?;
        let config = self.config.clone();

        let cells = self.reuse_or_generate(
            tables::GRID_CELLS, epsg, &mut summary,
            store::cells_from_layer, store::cells_to_layer,
            |_| build_grid_cells(&border, config.step_km, projector.as_ref()),
        )?;

        let points = self.reuse_or_generate(
            tables::GRID_POINTS, epsg, &mut summary,
            store::vertices_from_layer, store::vertices_to_layer,
            |_| Ok(build_grid_points(&cells, &border)),
        )?;

        let sectors = self.reuse_or_generate(
            tables::SECTORS, epsg, &mut summary,
            store::sectors_from_layer, store::sectors_to_layer,
            |executor| build_sectors(&points, &border, &config, projector.as_ref(), executor),
        )?;

        let intersections = self.reuse_or_generate(
            tables::INTERSECTIONS, epsg, &mut summary,
            store::intersections_from_layer, store::intersections_to_layer,
            |executor| Ok(IntersectionResolver::new(config.containment).find_intersections(&sectors, &points, executor)),
        )?;

        summary.grid_cells = cells.len();
        summary.grid_points = points.len();
        summary.sectors = sectors.len();
        summary.intersections = intersections.len();
        tracing::info!(%summary, "run complete");
        Ok(summary)
    }

    fn reuse_or_generate<T>(
        &mut self,
        table: &'static str,
        epsg: u32,
        summary: &mut RunSummary,
        read: impl FnOnce(&Layer) -> Result<Vec<T>>,
        write: impl FnOnce(&[T], u32) -> Layer,
        generate: impl FnOnce(&ParallelExecutor) -> Result<Vec<T>>,
    ) -> Result<Vec<T>> {
        let params = stage_params(&self.config, table);

        if self.store.has_data(table)? {
            let recorded = self.store.table_params(table)?;
            if recorded.as_deref() == Some(params.as_str()) {
                let layer = self.store.read_geometries(table)?;
                if layer.epsg != epsg {
                    return Err(Error::Storage(format!(
                        "stored {table} is EPSG:{}, border is EPSG:{epsg}",
                        layer.epsg
                    )))
                }
                let values = read(&layer)?;
                tracing::info!(table, rows = values.len(), "reusing stored table");
                summary.reused.push(table);
                return Ok(values)
            }
            tracing::warn!(
                table,
                stored = recorded.as_deref().unwrap_or("none"),
                current = %params,
                "stored table was generated with other parameters, regenerating"
            );
        }

        let values = generate(&self.executor)?;
        self.store.write_geometries(table, &write(&values, epsg), WriteMode::Replace)?;
        self.store.set_table_params(table, &params)?;
        tracing::info!(table, rows = values.len(), "stored table");
        Ok(values)
    }
}
