#![doc = "sectorgrid public API: grid tiling, directional sectors and point coverage over a country border"]
mod config;
mod error;
mod geom;
mod grid;
mod intersect;
mod io;
mod parallel;
mod pipeline;
mod presentation;
mod sector;
mod source;

pub mod store;

#[doc(inline)]
pub use config::{BorderConfig, RunConfig, DEFAULT_BORDER_URL};

#[doc(inline)]
pub use error::{Error, Result};

#[doc(inline)]
pub use geom::{
    projector_for, Border, CoordinateProjector, DegreeProjector, IdentityProjector, ProjectionMode, UtmProjector, WGS84,
};

#[doc(inline)]
pub use grid::{
    extract_interior_vertices, filter_cells_intersecting_border, generate_grid, remove_border_coincident_vertices,
    GridCell, Vertex, VertexKey,
};

#[doc(inline)]
pub use sector::{build_sector, keep_fully_contained, DestinationFormula, Sector, SectorBuilder, SectorFan, SectorTask};

#[doc(inline)]
pub use intersect::{ContainmentPolicy, Intersection, IntersectionResolver};

#[doc(inline)]
pub use parallel::{ParallelExecutor, TaskFailure, TaskResult, TaskResults};

#[doc(inline)]
pub use source::{BorderSource, GeoJsonBorderSource, Location};

#[doc(inline)]
pub use pipeline::{generate, Generated, Pipeline, RunSummary};

#[doc(inline)]
pub use presentation::Presentation;
