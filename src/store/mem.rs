use ahash::AHashMap;

use crate::error::{Error, Result};
use crate::store::{check_append, tables, validate_table_name, GeometryStore, Layer, WriteMode};

/// In-memory store with the same contract as [`SqliteStore`](super::SqliteStore).
#[derive(Debug, Clone, Default)]
pub struct MemStore {
    tables: AHashMap<String, Layer>,
    params: AHashMap<String, String>,
}

impl MemStore {
    pub fn new() -> Self { Self::default() }

    /// Names of the tables currently held.
    pub fn table_names(&self) -> Vec<&str> {
        let mut names = self.tables.keys().map(String::as_str).collect::<Vec<_>>();
        names.sort_unstable();
        names
    }
}

impl GeometryStore for MemStore {
    fn table_exists(&self, name: &str) -> Result<bool> {
        validate_table_name(name)?;
        Ok(self.tables.contains_key(name))
    }

    fn row_count(&self, name: &str) -> Result<usize> {
        validate_table_name(name)?;
        self.tables.get(name)
            .map(Layer::len)
            .ok_or_else(|| Error::Storage(format!("table {name} does not exist")))
    }

    fn read_geometries(&self, name: &str) -> Result<Layer> {
        validate_table_name(name)?;
        self.tables.get(name)
            .cloned()
            .ok_or_else(|| Error::Storage(format!("table {name} does not exist")))
    }

    fn write_geometries(&mut self, name: &str, layer: &Layer, mode: WriteMode) -> Result<()> {
        validate_table_name(name)?;

        if let (WriteMode::Append, Some(existing)) = (mode, self.tables.get(name)) {
            check_append(name, existing.epsg, existing.features.iter().map(|f| f.id), layer)?;
        } else {
            check_append(name, layer.epsg, std::iter::empty(), layer)?;
        }

        for dependent in tables::dependents(name) {
            self.tables.remove(*dependent);
            self.params.remove(*dependent);
        }

        match (mode, self.tables.get_mut(name)) {
            (WriteMode::Append, Some(existing)) => existing.features.extend(layer.features.iter().cloned()),
            _ => {
                self.tables.insert(name.to_string(), layer.clone());
                self.params.remove(name);
            }
        }

        tracing::debug!(table = name, rows = layer.len(), ?mode, "wrote layer");
        Ok(())
    }

    fn drop_table(&mut self, name: &str) -> Result<()> {
        validate_table_name(name)?;
        self.tables.remove(name);
        self.params.remove(name);
        Ok(())
    }

    fn table_params(&self, name: &str) -> Result<Option<String>> {
        validate_table_name(name)?;
        Ok(self.params.get(name).cloned())
    }

    fn set_table_params(&mut self, name: &str, params: &str) -> Result<()> {
        validate_table_name(name)?;
        if !self.tables.contains_key(name) {
            return Err(Error::Storage(format!("table {name} does not exist")))
        }
        self.params.insert(name.to_string(), params.to_string());
        Ok(())
    }
}
