use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geom::ProjectionMode;
use crate::intersect::ContainmentPolicy;
use crate::sector::SectorFan;

/// Country borders published by datahub.io (Natural Earth admin 0).
pub const DEFAULT_BORDER_URL: &str = "https://datahub.io/core/geo-countries/r/0.geojson";

/// Where the border comes from and which feature to keep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BorderConfig {
    pub url: String,
    /// Local GeoJSON file; takes precedence over `url` when set.
    pub file: Option<PathBuf>,
    /// Feature property compared against `value`.
    pub property: String,
    pub value: String,
}

impl Default for BorderConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_BORDER_URL.to_string(),
            file: None,
            property: "ADMIN".to_string(),
            value: "Ukraine".to_string(),
        }
    }
}

/// Parameters of a full generation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Grid cell side in kilometres.
    pub step_km: f64,
    pub mode: ProjectionMode,
    /// Worker threads; `None` uses every available core.
    pub workers: Option<usize>,
    pub containment: ContainmentPolicy,
    pub fan: SectorFan,
    pub border: BorderConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            step_km: 10.0,
            mode: ProjectionMode::default(),
            workers: None,
            containment: ContainmentPolicy::default(),
            fan: SectorFan::default(),
            border: BorderConfig::default(),
        }
    }
}

impl RunConfig {
    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Reject values that would make any stage degenerate.
    pub fn validate(&self) -> Result<()> {
        if !(self.step_km.is_finite() && self.step_km > 0.0) {
            return Err(Error::InvalidBounds(format!("grid step must be positive, got {} km", self.step_km)))
        }
        self.fan.validate()?;
        if self.border.property.is_empty() {
            return Err(Error::Config("border property name is empty".into()))
        }
        Ok(())
    }
}
