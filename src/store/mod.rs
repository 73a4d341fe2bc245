//! Persistent layer storage.
//!
//! A store holds named layers of geometries, one table per pipeline stage.
//! Writing a layer drops every layer derived from it, so a stale derived
//! table is never reused after its input changed.

mod layer;
mod mem;
mod sqlite;

use geo::Geometry;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

pub use layer::{
    border_from_layer, border_to_layer, cells_from_layer, cells_to_layer, intersections_from_layer,
    intersections_to_layer, sectors_from_layer, sectors_to_layer, vertices_from_layer, vertices_to_layer,
};
pub use mem::MemStore;
pub use sqlite::SqliteStore;

/// Table names used by the pipeline, in stage order.
pub mod tables {
    pub const BORDER: &str = "border";
    pub const GRID_CELLS: &str = "grid_cells";
    pub const GRID_POINTS: &str = "grid_points";
    pub const SECTORS: &str = "sectors";
    pub const INTERSECTIONS: &str = "intersections";

    pub const ALL: [&str; 5] = [BORDER, GRID_CELLS, GRID_POINTS, SECTORS, INTERSECTIONS];

    /// Tables computed from `name` that must be dropped when `name` is rewritten.
    pub fn dependents(name: &str) -> &'static [&'static str] {
        match name {
            BORDER => &[GRID_CELLS, GRID_POINTS, SECTORS, INTERSECTIONS],
            GRID_POINTS => &[SECTORS, INTERSECTIONS],
            SECTORS => &[INTERSECTIONS],
            _ => &[],
        }
    }
}

/// A single stored geometry with its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: u64,
    pub geometry: Geometry<f64>,
    pub properties: Map<String, Value>,
}

impl Feature {
    pub fn new(id: u64, geometry: impl Into<Geometry<f64>>) -> Self {
        Self { id, geometry: geometry.into(), properties: Map::new() }
    }

    /// Builder-style attribute setter.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }
}

/// A named table's contents: features sharing one coordinate reference system.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub epsg: u32,
    pub features: Vec<Feature>,
}

impl Layer {
    pub fn new(epsg: u32, features: Vec<Feature>) -> Self { Self { epsg, features } }

    #[inline] pub fn len(&self) -> usize { self.features.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.features.is_empty() }

    /// Encode as a GeoJSON FeatureCollection (ids, properties, and a `crs` member outside WGS84).
    pub fn to_geojson(&self) -> anyhow::Result<Vec<u8>> {
        crate::io::geojson::layer_to_geojson_bytes(self)
    }
}

/// How a write treats an existing table.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum WriteMode {
    /// Swap the table's contents for the new layer in one step.
    #[default]
    Replace,
    /// Add features to the table, keeping existing ids.
    Append,
}

/// Named-table geometry storage.
pub trait GeometryStore {
    fn table_exists(&self, name: &str) -> Result<bool>;

    fn row_count(&self, name: &str) -> Result<usize>;

    /// Read a whole table. Missing tables are a `Storage` error.
    fn read_geometries(&self, name: &str) -> Result<Layer>;

    /// Write `layer` to `name`, dropping every dependent table first.
    fn write_geometries(&mut self, name: &str, layer: &Layer, mode: WriteMode) -> Result<()>;

    /// Drop a table if it exists.
    fn drop_table(&mut self, name: &str) -> Result<()>;

    /// Parameters recorded for a table, or `None` when the table is missing or has none.
    /// Replacing or dropping a table clears them; appending keeps them.
    fn table_params(&self, name: &str) -> Result<Option<String>>;

    /// Record the parameters a table was generated with. The table must exist.
    fn set_table_params(&mut self, name: &str, params: &str) -> Result<()>;

    /// A table is reusable when it exists and holds at least one row.
    fn has_data(&self, name: &str) -> Result<bool> {
        Ok(self.table_exists(name)? && self.row_count(name)? > 0)
    }
}

impl<S: GeometryStore + ?Sized> GeometryStore for &mut S {
    fn table_exists(&self, name: &str) -> Result<bool> { (**self).table_exists(name) }

    fn row_count(&self, name: &str) -> Result<usize> { (**self).row_count(name) }

    fn read_geometries(&self, name: &str) -> Result<Layer> { (**self).read_geometries(name) }

    fn write_geometries(&mut self, name: &str, layer: &Layer, mode: WriteMode) -> Result<()> {
        (**self).write_geometries(name, layer, mode)
    }

    fn drop_table(&mut self, name: &str) -> Result<()> { (**self).drop_table(name) }

    fn table_params(&self, name: &str) -> Result<Option<String>> { (**self).table_params(name) }

    fn set_table_params(&mut self, name: &str, params: &str) -> Result<()> {
        (**self).set_table_params(name, params)
    }
}

/// Table names are interpolated into SQL, so only `[A-Za-z0-9_]` is allowed.
pub(crate) fn validate_table_name(name: &str) -> Result<()> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::Storage(format!("invalid table name {name:?}")))
    }
    Ok(())
}

/// Reject an append that would break id uniqueness or mix coordinate systems.
pub(crate) fn check_append(name: &str, existing_epsg: u32, existing_ids: impl IntoIterator<Item = u64>, layer: &Layer) -> Result<()> {
    if existing_epsg != layer.epsg {
        return Err(Error::Storage(format!(
            "cannot append EPSG:{} features to {name} stored as EPSG:{existing_epsg}",
            layer.epsg
        )))
    }
    let mut ids = existing_ids.into_iter().collect::<ahash::AHashSet<_>>();
    if let Some(feature) = layer.features.iter().find(|f| !ids.insert(f.id)) {
        return Err(Error::Storage(format!("duplicate feature id {} in {name}", feature.id)))
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    //! Store behaviour shared by every backend.

    use geo::{point, polygon};

    use super::*;

    pub(crate) fn sample_layer(epsg: u32, ids: std::ops::Range<u64>) -> Layer {
        let features = ids
            .map(|id| {
                let x = id as f64;
                Feature::new(id, polygon![(x: x, y: 0.0), (x: x + 1.0, y: 0.0), (x: x + 1.0, y: 1.0), (x: x, y: 1.0)])
                    .with("name", format!("cell-{id}"))
            })
            .collect();
        Layer::new(epsg, features)
    }

    pub(crate) fn exercise_store(store: &mut dyn GeometryStore) {
        assert!(!store.table_exists(tables::SECTORS).unwrap());
        assert!(!store.has_data(tables::SECTORS).unwrap());
        assert!(matches!(store.read_geometries(tables::SECTORS), Err(Error::Storage(_))));

        // Replace then read back.
        let layer = sample_layer(4326, 0..3);
        store.write_geometries(tables::SECTORS, &layer, WriteMode::Replace).unwrap();
        assert!(store.has_data(tables::SECTORS).unwrap());
        assert_eq!(store.row_count(tables::SECTORS).unwrap(), 3);
        assert_eq!(store.read_geometries(tables::SECTORS).unwrap(), layer);

        // Append keeps existing ids.
        store.write_geometries(tables::SECTORS, &sample_layer(4326, 3..5), WriteMode::Append).unwrap();
        let ids = store.read_geometries(tables::SECTORS).unwrap()
            .features.iter().map(|f| f.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);

        // Colliding ids and mismatched CRS are rejected without touching the table.
        assert!(matches!(
            store.write_geometries(tables::SECTORS, &sample_layer(4326, 4..6), WriteMode::Append),
            Err(Error::Storage(_))
        ));
        assert!(matches!(
            store.write_geometries(tables::SECTORS, &sample_layer(3857, 10..11), WriteMode::Append),
            Err(Error::Storage(_))
        ));
        assert_eq!(store.row_count(tables::SECTORS).unwrap(), 5);

        // Parameters survive an append but not a replace.
        assert_eq!(store.table_params(tables::SECTORS).unwrap(), None);
        store.set_table_params(tables::SECTORS, r#"{"step_km":10.0}"#).unwrap();
        store.write_geometries(tables::SECTORS, &sample_layer(4326, 5..6), WriteMode::Append).unwrap();
        assert_eq!(store.table_params(tables::SECTORS).unwrap().as_deref(), Some(r#"{"step_km":10.0}"#));
        assert!(matches!(store.set_table_params(tables::GRID_CELLS, "{}"), Err(Error::Storage(_))));

        // Replace swaps the whole table.
        store.write_geometries(tables::SECTORS, &sample_layer(3857, 7..8), WriteMode::Replace).unwrap();
        assert_eq!(store.table_params(tables::SECTORS).unwrap(), None);
        let replaced = store.read_geometries(tables::SECTORS).unwrap();
        assert_eq!(replaced.epsg, 3857);
        assert_eq!(replaced.features.len(), 1);

        // An empty table exists but has no data.
        store.write_geometries(tables::INTERSECTIONS, &Layer::new(4326, vec![]), WriteMode::Replace).unwrap();
        assert!(store.table_exists(tables::INTERSECTIONS).unwrap());
        assert!(!store.has_data(tables::INTERSECTIONS).unwrap());

        // Points survive too.
        let points = Layer::new(4326, vec![Feature::new(9, point! { x: 30.5, y: 50.25 })]);
        store.write_geometries(tables::GRID_POINTS, &points, WriteMode::Replace).unwrap();
        assert_eq!(store.read_geometries(tables::GRID_POINTS).unwrap(), points);

        // Rewriting grid points invalidates sectors and intersections.
        store.write_geometries(tables::SECTORS, &sample_layer(4326, 0..2), WriteMode::Replace).unwrap();
        store.write_geometries(tables::GRID_POINTS, &points, WriteMode::Replace).unwrap();
        assert!(!store.table_exists(tables::SECTORS).unwrap());
        assert!(!store.table_exists(tables::INTERSECTIONS).unwrap());
        assert!(store.table_exists(tables::GRID_POINTS).unwrap());

        store.drop_table(tables::GRID_POINTS).unwrap();
        store.drop_table(tables::GRID_POINTS).unwrap();
        assert!(!store.table_exists(tables::GRID_POINTS).unwrap());

        // Every operation rejects the same malformed names.
        let bad = "bad name; drop";
        let rejected = |result: Result<()>| matches!(result, Err(Error::Storage(m)) if m.contains("invalid table name"));
        assert!(rejected(store.write_geometries(bad, &points, WriteMode::Replace)));
        assert!(rejected(store.table_exists(bad).map(|_| ())));
        assert!(rejected(store.row_count(bad).map(|_| ())));
        assert!(rejected(store.read_geometries(bad).map(|_| ())));
        assert!(rejected(store.drop_table(bad)));
        assert!(rejected(store.table_params(bad).map(|_| ())));
        assert!(rejected(store.set_table_params(bad, "{}")));
    }
}
