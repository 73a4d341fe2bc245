use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Refuse sector outlines with more arc samples than this.
pub(super) const MAX_ARC_SAMPLES: usize = 3600;

/// The set of sectors generated at every retained grid vertex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectorFan {
    /// Central bearings, degrees clockwise from north.
    pub azimuths: Vec<f64>,
    /// Angular width of each sector in degrees.
    pub span_deg: f64,
    /// Angular spacing of arc samples in degrees.
    pub step_deg: f64,
    pub radius_km: f64,
}

impl Default for SectorFan {
    fn default() -> Self {
        Self {
            azimuths: vec![0.0, 120.0, 240.0],
            span_deg: 60.0,
            step_deg: 1.0,
            radius_km: 10.0,
        }
    }
}

impl SectorFan {
    /// Check the fan before any work is dispatched.
    pub fn validate(&self) -> Result<()> {
        if self.azimuths.is_empty() {
            return Err(Error::InvalidSectorParams("sector fan has no azimuths".into()))
        }
        if let Some(azimuth) = self.azimuths.iter().find(|a| !a.is_finite()) {
            return Err(Error::InvalidSectorParams(format!("azimuth {azimuth} is not finite")))
        }
        validate_shape(self.radius_km, self.span_deg, self.step_deg)
    }
}

/// Validate radius, span and angular step of a single sector.
pub(super) fn validate_shape(radius_km: f64, span_deg: f64, step_deg: f64) -> Result<()> {
    if !(radius_km.is_finite() && radius_km > 0.0) {
        return Err(Error::InvalidSectorParams(format!("radius must be positive, got {radius_km} km")))
    }
    if !(span_deg.is_finite() && span_deg > 0.0 && span_deg < 360.0) {
        return Err(Error::InvalidSectorParams(format!("span must be in (0, 360), got {span_deg}°")))
    }
    if !(step_deg.is_finite() && step_deg > 0.0) {
        return Err(Error::InvalidSectorParams(format!("angular step must be positive, got {step_deg}°")))
    }
    // One sample per step plus the closing bearing.
    let samples = span_deg / step_deg + 1.0;
    if samples > MAX_ARC_SAMPLES as f64 {
        return Err(Error::InvalidSectorParams(format!(
            "{span_deg}° span at {step_deg}° steps needs {samples:.0} arc samples, limit is {MAX_ARC_SAMPLES}"
        )))
    }
    Ok(())
}
