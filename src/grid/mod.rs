mod cell;
mod clip;
mod tiler;

pub use cell::{GridCell, Vertex, VertexKey};
pub use clip::{extract_interior_vertices, filter_cells_intersecting_border, remove_border_coincident_vertices};
pub use tiler::generate_grid;
