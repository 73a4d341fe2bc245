use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension, Transaction};

use crate::error::{Error, Result};
use crate::io::wkb::{geometry_from_wkb, geometry_to_wkb};
use crate::store::{check_append, tables, validate_table_name, Feature, GeometryStore, Layer, WriteMode};

/// Metadata table recording each layer's EPSG code and generating parameters.
const LAYERS_TABLE: &str = "layers";

/// SQLite-backed layer store.
///
/// Each layer is a table `(id INTEGER PRIMARY KEY, geometry BLOB, properties TEXT)`
/// with the geometry encoded as WKB and the properties as a JSON object.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .map_err(|e| Error::Storage(format!("cannot open {}: {e}", path.display())))?;
        Self::with_connection(conn)
    }

    /// Create a throwaway in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            &format!("CREATE TABLE IF NOT EXISTS {LAYERS_TABLE} (
                name TEXT PRIMARY KEY,
                epsg INTEGER NOT NULL,
                params TEXT
            )"),
            [],
        )?;
        Ok(Self { conn })
    }

    fn check_name(name: &str) -> Result<()> {
        validate_table_name(name)?;
        if name == LAYERS_TABLE {
            return Err(Error::Storage(format!("{LAYERS_TABLE} is reserved for metadata")))
        }
        Ok(())
    }

    fn layer_epsg(conn: &Connection, name: &str) -> Result<Option<u32>> {
        let epsg = conn.query_row(
            &format!("SELECT epsg FROM {LAYERS_TABLE} WHERE name = ?1"),
            params![name],
            |row| row.get::<_, u32>(0),
        ).optional()?;
        Ok(epsg)
    }

    fn drop_in(tx: &Transaction<'_>, name: &str) -> Result<()> {
        tx.execute(&format!("DROP TABLE IF EXISTS \"{name}\""), [])?;
        tx.execute(&format!("DELETE FROM {LAYERS_TABLE} WHERE name = ?1"), params![name])?;
        Ok(())
    }

    fn create_in(tx: &Transaction<'_>, name: &str, epsg: u32) -> Result<()> {
        tx.execute(
            &format!("CREATE TABLE \"{name}\" (
                id INTEGER PRIMARY KEY,
                geometry BLOB NOT NULL,
                properties TEXT NOT NULL
            )"),
            [],
        )?;
        tx.execute(
            &format!("INSERT INTO {LAYERS_TABLE} (name, epsg) VALUES (?1, ?2)"),
            params![name, epsg],
        )?;
        Ok(())
    }

    fn existing_ids(tx: &Transaction<'_>, name: &str) -> Result<Vec<u64>> {
        let mut stmt = tx.prepare(&format!("SELECT id FROM \"{name}\""))?;
        let ids = stmt.query_map([], |row| row.get::<_, i64>(0))?
            .map(|id| Ok(id? as u64))
            .collect::<Result<Vec<_>>>()?;
        Ok(ids)
    }

    fn insert_in(tx: &Transaction<'_>, name: &str, layer: &Layer) -> Result<()> {
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO \"{name}\" (id, geometry, properties) VALUES (?1, ?2, ?3)"
        ))?;
        for feature in &layer.features {
            let wkb = geometry_to_wkb(&feature.geometry)
                .map_err(|e| Error::Storage(format!("feature {} of {name}: {e:#}", feature.id)))?;
            let properties = serde_json::to_string(&feature.properties)
                .map_err(|e| Error::Storage(format!("feature {} of {name}: {e}", feature.id)))?;
            stmt.execute(params![feature.id as i64, wkb, properties])?;
        }
        Ok(())
    }
}

impl GeometryStore for SqliteStore {
    fn table_exists(&self, name: &str) -> Result<bool> {
        Self::check_name(name)?;
        Ok(Self::layer_epsg(&self.conn, name)?.is_some())
    }

    fn row_count(&self, name: &str) -> Result<usize> {
        if !self.table_exists(name)? {
            return Err(Error::Storage(format!("table {name} does not exist")))
        }
        let count = self.conn.query_row(&format!("SELECT COUNT(*) FROM \"{name}\""), [], |row| row.get::<_, i64>(0))?;
        Ok(count as usize)
    }

    fn read_geometries(&self, name: &str) -> Result<Layer> {
        Self::check_name(name)?;
        let epsg = Self::layer_epsg(&self.conn, name)?
            .ok_or_else(|| Error::Storage(format!("table {name} does not exist")))?;

        let mut stmt = self.conn.prepare(&format!("SELECT id, geometry, properties FROM \"{name}\" ORDER BY id"))?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?, row.get::<_, String>(2)?))
        })?;

        let mut features = Vec::new();
        for row in rows {
            let (id, wkb, properties) = row?;
            let geometry = geometry_from_wkb(&wkb)
                .map_err(|e| Error::Storage(format!("row {id} of {name}: {e:#}")))?;
            let properties = serde_json::from_str(&properties)
                .map_err(|e| Error::Storage(format!("row {id} of {name}: bad properties: {e}")))?;
            features.push(Feature { id: id as u64, geometry, properties });
        }

        Ok(Layer { epsg, features })
    }

    fn write_geometries(&mut self, name: &str, layer: &Layer, mode: WriteMode) -> Result<()> {
        Self::check_name(name)?;
        let tx = self.conn.transaction()?;

        let existing = Self::layer_epsg(&tx, name)?;
        match (mode, existing) {
            (WriteMode::Append, Some(epsg)) => {
                check_append(name, epsg, Self::existing_ids(&tx, name)?, layer)?;
            }
            _ => {
                check_append(name, layer.epsg, std::iter::empty(), layer)?;
                Self::drop_in(&tx, name)?;
                Self::create_in(&tx, name, layer.epsg)?;
            }
        }
        for dependent in tables::dependents(name) {
            Self::drop_in(&tx, dependent)?;
        }
        Self::insert_in(&tx, name, layer)?;

        // Dropping `tx` without commit rolls everything back on any error above.
        tx.commit()?;
        tracing::debug!(table = name, rows = layer.len(), ?mode, "wrote layer");
        Ok(())
    }

    fn drop_table(&mut self, name: &str) -> Result<()> {
        Self::check_name(name)?;
        let tx = self.conn.transaction()?;
        Self::drop_in(&tx, name)?;
        tx.commit()?;
        Ok(())
    }

    fn table_params(&self, name: &str) -> Result<Option<String>> {
        Self::check_name(name)?;
        let params = self.conn.query_row(
            &format!("SELECT params FROM {LAYERS_TABLE} WHERE name = ?1"),
            params![name],
            |row| row.get::<_, Option<String>>(0),
        ).optional()?;
        Ok(params.flatten())
    }

    fn set_table_params(&mut self, name: &str, params: &str) -> Result<()> {
        Self::check_name(name)?;
        let updated = self.conn.execute(
            &format!("UPDATE {LAYERS_TABLE} SET params = ?2 WHERE name = ?1"),
            params![name, params],
        )?;
        if updated == 0 {
            return Err(Error::Storage(format!("table {name} does not exist")))
        }
        Ok(())
    }
}
