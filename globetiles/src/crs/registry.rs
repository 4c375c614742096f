//! CRS definitions, projection table and the conversion entry point.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, trace};

use super::coordinates::Coordinates;
use super::ellipsoid::{Cartographic, Ellipsoid};
use super::projection::{Projection, ProjectionFactory, WebMercatorForward, WebMercatorInverse};
use super::convert_value;
use super::types::{CrsError, CrsId, Unit, EPSG_3857, EPSG_4326, EPSG_4978};

type ProjectionKey = (CrsId, CrsId);

/// Registry of known coordinate reference systems.
///
/// Owns the unit table for non-built-in systems, the table of projection
/// factories and the memo of constructed projections. Create one at startup
/// and pass it by reference; registration needs `&mut self`, conversion only
/// needs `&self` and is safe to share across threads.
pub struct CrsRegistry {
    definitions: HashMap<CrsId, Unit>,
    factories: HashMap<ProjectionKey, ProjectionFactory>,
    projections: DashMap<ProjectionKey, Arc<dyn Projection>>,
    ellipsoid: Ellipsoid,
}

impl Default for CrsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CrsRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrsRegistry")
            .field("definitions", &self.definitions)
            .field("projection_pairs", &self.factories.len())
            .field("memoized", &self.projections.len())
            .field("ellipsoid", &self.ellipsoid)
            .finish()
    }
}

impl CrsRegistry {
    /// Registry with the WGS84 systems and Web Mercator (`EPSG:3857`).
    pub fn new() -> Self {
        let mut registry = Self::empty(Ellipsoid::WGS84);
        registry.register_definition(EPSG_3857, Unit::Meter);
        registry.register_projection(
            EPSG_4326,
            EPSG_3857,
            Arc::new(|| Arc::new(WebMercatorForward) as Arc<dyn Projection>),
        );
        registry.register_projection(
            EPSG_3857,
            EPSG_4326,
            Arc::new(|| Arc::new(WebMercatorInverse) as Arc<dyn Projection>),
        );
        registry
    }

    /// Registry that only knows `EPSG:4326` and `EPSG:4978` on `ellipsoid`.
    pub fn empty(ellipsoid: Ellipsoid) -> Self {
        Self {
            definitions: HashMap::new(),
            factories: HashMap::new(),
            projections: DashMap::new(),
            ellipsoid,
        }
    }

    pub fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    /// Declare a CRS and the unit its values are stored in.
    pub fn register_definition(&mut self, crs: impl Into<CrsId>, unit: Unit) {
        let crs = crs.into();
        debug!(crs = %crs, unit = %unit, "Registered CRS definition");
        self.definitions.insert(crs, unit);
    }

    /// Register the factory for the `from → to` projection.
    ///
    /// Replaces any previous factory and drops a memoized instance for the
    /// same pair.
    pub fn register_projection(
        &mut self,
        from: impl Into<CrsId>,
        to: impl Into<CrsId>,
        factory: ProjectionFactory,
    ) {
        let key = (from.into(), to.into());
        self.projections.remove(&key);
        self.factories.insert(key, factory);
    }

    /// Reference unit of `crs`.
    ///
    /// # Errors
    ///
    /// [`CrsError::InvalidCrs`] when the identifier is neither built in nor
    /// registered.
    pub fn unit_of(&self, crs: &str) -> Result<Unit, CrsError> {
        match crs {
            EPSG_4326 => Ok(Unit::Degree),
            EPSG_4978 => Ok(Unit::Meter),
            other => self
                .definitions
                .get(other)
                .copied()
                .ok_or_else(|| CrsError::InvalidCrs(other.to_string())),
        }
    }

    pub fn is_geographic(&self, crs: &str) -> Result<bool, CrsError> {
        Ok(self.unit_of(crs)?.is_angular())
    }

    pub fn is_geocentric(&self, crs: &str) -> Result<bool, CrsError> {
        self.unit_of(crs)?;
        Ok(crs == EPSG_4978)
    }

    /// Fail with [`CrsError::InvalidCrs`] unless `crs` is known.
    pub fn assert_valid(&self, crs: &str) -> Result<(), CrsError> {
        self.unit_of(crs).map(|_| ())
    }

    /// Memoized projection for the `from → to` pair.
    ///
    /// The factory runs at most once per pair; later calls return the same
    /// instance.
    pub fn projection(&self, from: &str, to: &str) -> Result<Arc<dyn Projection>, CrsError> {
        let key = (CrsId::new(from), CrsId::new(to));
        if let Some(projection) = self.projections.get(&key) {
            return Ok(Arc::clone(projection.value()));
        }

        let factory = self
            .factories
            .get(&key)
            .ok_or_else(|| CrsError::UnsupportedCrsConversion {
                from: from.to_string(),
                to: to.to_string(),
            })?;

        let projection = self
            .projections
            .entry(key)
            .or_insert_with(|| {
                trace!(from, to, "Constructing projection");
                (**factory)()
            })
            .value()
            .clone();
        Ok(projection)
    }

    /// Number of memoized projection instances.
    pub fn memoized_projections(&self) -> usize {
        self.projections.len()
    }

    /// Convert `coordinates` to `target`.
    ///
    /// - Same CRS: an equal value, or a longitude/latitude unit change when the
    ///   storage unit differs from the CRS's reference unit.
    /// - `EPSG:4326 ⇄ EPSG:4978`: ellipsoidal transform.
    /// - Anything else: the registered projection for the pair, routed through
    ///   `EPSG:4326` when one side is geocentric. Heights pass through.
    ///
    /// # Errors
    ///
    /// `InvalidCrs` for an unknown target, `UnsupportedCrsConversion` when no
    /// projection is registered for the pair.
    pub fn convert(&self, coordinates: &Coordinates, target: &str) -> Result<Coordinates, CrsError> {
        let target_unit = self.unit_of(target)?;
        let source = coordinates.crs().as_str();

        if source == target {
            return self.convert_unit(coordinates, target_unit);
        }

        match (source, target) {
            (EPSG_4326, EPSG_4978) => self.geographic_to_geocentric(coordinates),
            (EPSG_4978, EPSG_4326) => self.geocentric_to_geographic(coordinates, target_unit),
            (EPSG_4978, _) => {
                let geographic = self.geocentric_to_geographic(coordinates, Unit::Degree)?;
                self.project(&geographic, target, target_unit)
            }
            (_, EPSG_4978) => {
                let geographic = self.project(coordinates, EPSG_4326, Unit::Degree)?;
                self.geographic_to_geocentric(&geographic)
            }
            _ => self.project(coordinates, target, target_unit),
        }
    }

    fn convert_unit(&self, coordinates: &Coordinates, unit: Unit) -> Result<Coordinates, CrsError> {
        if coordinates.unit() == unit {
            return Ok(coordinates.clone());
        }
        let [x, y, z] = coordinates.values();
        let from = coordinates.unit();
        Ok(Coordinates::from_parts(
            coordinates.crs().clone(),
            [convert_value(from, unit, x)?, convert_value(from, unit, y)?, z],
            unit,
        ))
    }

    fn geographic_to_geocentric(&self, coordinates: &Coordinates) -> Result<Coordinates, CrsError> {
        let cartographic = Cartographic::new(
            coordinates.longitude_in(Unit::Radian)?,
            coordinates.latitude_in(Unit::Radian)?,
            coordinates.altitude()?,
        );
        let position = self.ellipsoid.cartographic_to_cartesian(&cartographic);
        Ok(Coordinates::geocentric(position.x, position.y, position.z))
    }

    fn geocentric_to_geographic(
        &self,
        coordinates: &Coordinates,
        unit: Unit,
    ) -> Result<Coordinates, CrsError> {
        let cartographic = self.ellipsoid.cartesian_to_cartographic(coordinates.xyz()?);
        Ok(Coordinates::from_parts(
            CrsId::new(EPSG_4326),
            [
                convert_value(Unit::Radian, unit, cartographic.longitude)?,
                convert_value(Unit::Radian, unit, cartographic.latitude)?,
                cartographic.height,
            ],
            unit,
        ))
    }

    fn project(
        &self,
        coordinates: &Coordinates,
        target: &str,
        target_unit: Unit,
    ) -> Result<Coordinates, CrsError> {
        let source = coordinates.crs().as_str();
        let projection = self.projection(source, target)?;

        // Projections see geographic values in degrees.
        let [x, y, z] = coordinates.values();
        let (x, y) = if coordinates.is_geographic() {
            (
                convert_value(coordinates.unit(), Unit::Degree, x)?,
                convert_value(coordinates.unit(), Unit::Degree, y)?,
            )
        } else {
            (x, y)
        };

        let (px, py) = projection.forward(x, y);
        let (px, py) = if target_unit.is_angular() {
            (
                convert_value(Unit::Degree, target_unit, px)?,
                convert_value(Unit::Degree, target_unit, py)?,
            )
        } else {
            (px, py)
        };

        Ok(Coordinates::from_parts(CrsId::new(target), [px, py, z], target_unit))
    }
}
