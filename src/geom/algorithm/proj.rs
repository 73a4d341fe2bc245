use geo::{Coord, MapCoords, Rect};
use proj4rs::{proj::Proj as Proj4, transform::transform};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Kilometres per degree of latitude, used by the degree-based fallback.
const KM_PER_DEGREE: f64 = 111.0;

/// How a run converts between the storage CRS and the working plane.
/// Exactly one mode is used for every stage of a run.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionMode {
    /// Tile in UTM meters (zone picked from the region centre).
    #[default]
    Metric,
    /// Tile in raw degrees, step converted with km / 111. Lower precision.
    Degree,
    /// Coordinates are already planar; one kilometre is one working unit.
    Identity,
}

impl ProjectionMode {
    pub fn to_str(&self) -> &'static str {
        match self {
            ProjectionMode::Metric => "metric",
            ProjectionMode::Degree => "degree",
            ProjectionMode::Identity => "identity",
        }
    }
}

/// A matched pair of conversions between the storage CRS and the planar working system.
pub trait CoordinateProjector {
    fn mode(&self) -> ProjectionMode;

    /// Working units per kilometre of ground distance.
    fn units_per_km(&self) -> f64;

    fn to_planar(&self, coord: Coord<f64>) -> Result<Coord<f64>>;

    fn to_geographic(&self, coord: Coord<f64>) -> Result<Coord<f64>>;
}

impl dyn CoordinateProjector + '_ {
    /// Reproject any geometry into the working plane.
    pub fn project<G: MapCoords<f64, f64>>(&self, geometry: &G) -> Result<G::Output> {
        geometry.try_map_coords(|coord| self.to_planar(coord))
    }

    /// Reproject any geometry from the working plane back to the storage CRS.
    pub fn unproject<G: MapCoords<f64, f64>>(&self, geometry: &G) -> Result<G::Output> {
        geometry.try_map_coords(|coord| self.to_geographic(coord))
    }
}

/// Build the projector for `mode`, sized for a region with the given lon/lat bounds.
pub fn projector_for(mode: ProjectionMode, bounds: &Rect<f64>) -> Result<Box<dyn CoordinateProjector>> {
    Ok(match mode {
        ProjectionMode::Metric => Box::new(UtmProjector::for_center(bounds.center())?),
        ProjectionMode::Degree => {
            tracing::warn!("degree tiling selected: step is approximated as km / {KM_PER_DEGREE}, cells are not metric squares");
            Box::new(DegreeProjector)
        }
        ProjectionMode::Identity => Box::new(IdentityProjector),
    })
}

/// WGS84 lon/lat ⇄ UTM meters.
pub struct UtmProjector {
    geographic: Proj4,
    planar: Proj4,
    zone: u32,
    south: bool,
}

impl UtmProjector {
    /// Build a UTM projector for the zone containing the given lon/lat centre.
    pub fn for_center(center: Coord<f64>) -> Result<Self> {
        let zone = (((center.x + 180.0) / 6.0).floor() as i32 + 1).clamp(1, 60) as u32;
        Self::new(zone, center.y < 0.0)
    }

    pub fn new(zone: u32, south: bool) -> Result<Self> {
        let geographic = {
            let proj_string = "+proj=longlat +datum=WGS84 +no_defs +type=crs";
            Proj4::from_proj_string(proj_string)
                .map_err(|e| Error::Projection(format!("failed to build source PROJ.4 {proj_string}: {e}")))?
        };

        let planar = {
            let south_flag = if south { " +south" } else { "" };
            let proj_string = format!("+proj=utm +zone={zone}{south_flag} +datum=WGS84 +units=m +no_defs +type=crs");
            Proj4::from_proj_string(&proj_string)
                .map_err(|e| Error::Projection(format!("failed to build target PROJ.4 {proj_string}: {e}")))?
        };

        Ok(Self { geographic, planar, zone, south })
    }

    #[inline] pub fn zone(&self) -> u32 { self.zone }

    #[inline] pub fn is_south(&self) -> bool { self.south }
}

impl CoordinateProjector for UtmProjector {
    fn mode(&self) -> ProjectionMode { ProjectionMode::Metric }

    fn units_per_km(&self) -> f64 { 1000.0 }

    fn to_planar(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        // Map coords → radians in, meters out.
        let mut point = (coord.x.to_radians(), coord.y.to_radians(), 0.0);
        transform(&self.geographic, &self.planar, &mut point)
            .map_err(|e| Error::Projection(format!("({}, {}) -> UTM {}: {e}", coord.x, coord.y, self.zone)))?;
        Ok(Coord { x: point.0, y: point.1 })
    }

    fn to_geographic(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        let mut point = (coord.x, coord.y, 0.0);
        transform(&self.planar, &self.geographic, &mut point)
            .map_err(|e| Error::Projection(format!("UTM {} ({}, {}) -> lon/lat: {e}", self.zone, coord.x, coord.y)))?;
        Ok(Coord { x: point.0.to_degrees(), y: point.1.to_degrees() })
    }
}

/// Degree-based fallback: the working plane is lon/lat itself.
pub struct DegreeProjector;

impl CoordinateProjector for DegreeProjector {
    fn mode(&self) -> ProjectionMode { ProjectionMode::Degree }

    fn units_per_km(&self) -> f64 { 1.0 / KM_PER_DEGREE }

    fn to_planar(&self, coord: Coord<f64>) -> Result<Coord<f64>> { Ok(coord) }

    fn to_geographic(&self, coord: Coord<f64>) -> Result<Coord<f64>> { Ok(coord) }
}

/// Pass-through for inputs that are already planar.
pub struct IdentityProjector;

impl CoordinateProjector for IdentityProjector {
    fn mode(&self) -> ProjectionMode { ProjectionMode::Identity }

    fn units_per_km(&self) -> f64 { 1.0 }

    fn to_planar(&self, coord: Coord<f64>) -> Result<Coord<f64>> { Ok(coord) }

    fn to_geographic(&self, coord: Coord<f64>) -> Result<Coord<f64>> { Ok(coord) }
}

#[cfg(test)]
mod tests {
    use geo::{coord, polygon, CoordsIter};

    use super::*;

    #[test]
    fn utm_zone_follows_center_longitude() {
        let kyiv = UtmProjector::for_center(coord! { x: 30.52, y: 50.45 }).unwrap();
        assert_eq!(kyiv.zone(), 36);
        assert!(!kyiv.is_south());

        let lima = UtmProjector::for_center(coord! { x: -77.04, y: -12.05 }).unwrap();
        assert_eq!(lima.zone(), 18);
        assert!(lima.is_south());
    }

    #[test]
    fn utm_round_trip_is_sub_meter() {
        let projector: Box<dyn CoordinateProjector> =
            Box::new(UtmProjector::for_center(coord! { x: 31.0, y: 49.0 }).unwrap());

        let shape = polygon![
            (x: 29.1, y: 48.2), (x: 35.2, y: 48.9), (x: 34.0, y: 52.3), (x: 30.0, y: 51.6),
        ];
        let planar = projector.project(&shape).unwrap();
        let back = projector.unproject(&planar).unwrap();

        for (a, b) in shape.coords_iter().zip(back.coords_iter()) {
            assert!((a.x - b.x).abs() < 1e-6, "lon {} vs {}", a.x, b.x);
            assert!((a.y - b.y).abs() < 1e-6, "lat {} vs {}", a.y, b.y);
        }
    }

    #[test]
    fn utm_units_are_meters() {
        let projector = UtmProjector::for_center(coord! { x: 33.0, y: 0.0 }).unwrap();
        // Central meridian of zone 36 maps to the 500 km false easting.
        let p = projector.to_planar(coord! { x: 33.0, y: 0.0 }).unwrap();
        assert!((p.x - 500_000.0).abs() < 1e-3);
        assert!(p.y.abs() < 1e-3);

        // One degree of meridian arc (110.574 km) scaled by the UTM factor 0.9996.
        let q = projector.to_planar(coord! { x: 33.0, y: 1.0 }).unwrap();
        assert!((q.y - 110_530.0).abs() < 50.0, "got {}", q.y);
    }

    #[test]
    fn degree_and_identity_modes_pass_coordinates_through() {
        let c = coord! { x: 12.5, y: -3.25 };
        assert_eq!(DegreeProjector.to_planar(c).unwrap(), c);
        assert_eq!(IdentityProjector.to_geographic(c).unwrap(), c);
        assert!((DegreeProjector.units_per_km() - 1.0 / 111.0).abs() < 1e-15);
        assert_eq!(IdentityProjector.units_per_km(), 1.0);
    }

    #[test]
    fn projector_for_respects_mode() {
        let bounds = Rect::new(coord! { x: 22.0, y: 44.0 }, coord! { x: 40.0, y: 52.0 });
        for mode in [ProjectionMode::Metric, ProjectionMode::Degree, ProjectionMode::Identity] {
            assert_eq!(projector_for(mode, &bounds).unwrap().mode(), mode);
        }
    }
}
