use std::path::PathBuf;

use geo::{Geometry, MultiPolygon};

use crate::config::BorderConfig;
use crate::error::{Error, Result};
use crate::geom::{Border, WGS84};
use crate::io::geojson::{parse_geometry, read_features};

/// Supplies the territory border for a run.
pub trait BorderSource {
    fn load(&self) -> Result<Border>;
}

/// An already-loaded border is its own source.
impl BorderSource for Border {
    fn load(&self) -> Result<Border> { Ok(self.clone()) }
}

/// Where a GeoJSON document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    File(PathBuf),
    Url(String),
}

/// Loads one named feature (or several sharing the name) from a GeoJSON
/// FeatureCollection in WGS84 and dissolves them into a border.
#[derive(Debug, Clone)]
pub struct GeoJsonBorderSource {
    location: Location,
    property: String,
    value: String,
}

impl GeoJsonBorderSource {
    pub fn new(location: Location, property: impl Into<String>, value: impl Into<String>) -> Self {
        Self { location, property: property.into(), value: value.into() }
    }

    /// A local file, when configured, wins over the URL.
    pub fn from_config(config: &BorderConfig) -> Self {
        let location = match &config.file {
            Some(path) => Location::File(path.clone()),
            None => Location::Url(config.url.clone()),
        };
        Self::new(location, config.property.clone(), config.value.clone())
    }

    #[inline] pub fn location(&self) -> &Location { &self.location }

    fn fetch(&self) -> Result<Vec<u8>> {
        match &self.location {
            Location::File(path) => std::fs::read(path)
                .map_err(|e| Error::SourceUnavailable(format!("cannot read {}: {e}", path.display()))),
            Location::Url(url) => fetch_url(url),
        }
    }

    /// Select the matching features of a GeoJSON document and dissolve them.
    pub fn parse(&self, bytes: &[u8]) -> Result<Border> {
        let features = read_features(bytes)
            .map_err(|e| Error::SourceUnavailable(format!("{e:#}")))?;

        let mut parts = Vec::new();
        for feature in features.iter().filter(|f| f.properties.get(&self.property).and_then(|v| v.as_str()) == Some(self.value.as_str())) {
            let part = match parse_geometry(&feature.geometry) {
                Ok(Geometry::Polygon(polygon)) => MultiPolygon(vec![polygon]),
                Ok(Geometry::MultiPolygon(multi)) => multi,
                Ok(_) => return Err(Error::SourceUnavailable(format!("{} is not polygonal", self.value))),
                Err(e) => return Err(Error::SourceUnavailable(format!("{}: {e:#}", self.value))),
            };
            parts.push(part);
        }

        if parts.is_empty() {
            return Err(Error::SourceUnavailable(format!(
                "no feature with {} = {:?} among {} features",
                self.property, self.value, features.len()
            )))
        }

        tracing::info!(feature = %self.value, parts = parts.len(), "selected border features");
        Border::from_parts(&parts, WGS84)
    }
}

impl BorderSource for GeoJsonBorderSource {
    fn load(&self) -> Result<Border> {
        tracing::info!(location = ?self.location, "loading border");
        self.parse(&self.fetch()?)
    }
}

#[cfg(feature = "download")]
fn fetch_url(url: &str) -> Result<Vec<u8>> {
    let response = reqwest::blocking::get(url)
        .and_then(|response| response.error_for_status())
        .map_err(|e| Error::SourceUnavailable(format!("GET {url}: {e}")))?;
    let bytes = response.bytes()
        .map_err(|e| Error::SourceUnavailable(format!("GET {url}: {e}")))?;
    Ok(bytes.to_vec())
}

#[cfg(not(feature = "download"))]
fn fetch_url(url: &str) -> Result<Vec<u8>> {
    Err(Error::SourceUnavailable(format!("cannot fetch {url}: built without the `download` feature")))
}
