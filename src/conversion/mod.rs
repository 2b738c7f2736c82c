//! Conversion driver
//!
//! Runs the phases of a conversion in order and reports each phase to the
//! registered progress listeners.
//!
//! # Submodules
//! - `log` - Append-only conversion log

mod log;

use std::time::Instant;

use crate::config::{ConversionConfig, FeatureRules};
use crate::elevation::EleConstraintEnforcer;
use crate::error::{ConstraintUnsatisfiableError, ConversionError};
use crate::map_data::{create_map_data, LocalProjection, MapData, MapMetadata, MapProjection};
use crate::mesh::processing::TriangulateGeometry;
use crate::mesh::{steps_from_config, Materials, MeshStore, MeshTarget};
use crate::osm::OsmData;
use crate::overlap::detect_overlaps;
use crate::world::{create_world, World, WorldInputs};

pub use self::log::{ConversionLog, LogEntry, LogLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    MapData,
    Representation,
    Elevation,
    Target,
    Finished,
}

/// Notified when a phase starts. Listeners cannot influence the conversion.
pub trait ProgressListener {
    fn phase_started(&self, phase: Phase);
}

/// Everything a conversion produced
pub struct ConversionResult {
    pub map_data: MapData,
    pub world: World,
    pub enforcer: EleConstraintEnforcer,
    /// Processed meshes, all triangle geometry
    pub meshes: MeshStore,
    /// Set when some elevation constraints were contradictory.
    /// The scene is still complete with best-effort elevations.
    pub elevation_error: Option<ConstraintUnsatisfiableError>,
}

pub struct Converter {
    config: ConversionConfig,
    rules: FeatureRules,
    materials: Materials,
    listeners: Vec<Box<dyn ProgressListener>>,
}

impl Converter {
    pub fn new(config: ConversionConfig) -> Self {
        Self {
            config,
            rules: FeatureRules::standard(),
            materials: Materials::standard(),
            listeners: Vec::new(),
        }
    }

    pub fn with_rules(mut self, rules: FeatureRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_materials(mut self, materials: Materials) -> Self {
        self.materials = materials;
        self
    }

    pub fn add_listener(&mut self, listener: Box<dyn ProgressListener>) {
        self.listeners.push(listener);
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    fn phase(&self, phase: Phase) {
        for listener in &self.listeners {
            listener.phase_started(phase);
        }
    }

    /// Convert with a local projection centered on the input bounds
    pub fn convert(&self, osm: &OsmData, log: &ConversionLog) -> Result<ConversionResult, ConversionError> {
        let (lat, lon) = osm.effective_bounds().map(|b| b.center()).unwrap_or((0.0, 0.0));
        self.convert_with_projection(osm, &LocalProjection::new(lat, lon), log)
    }

    pub fn convert_with_projection(
        &self,
        osm: &OsmData,
        projection: &dyn MapProjection,
        log: &ConversionLog,
    ) -> Result<ConversionResult, ConversionError> {
        self.config.validate()?;
        let start = Instant::now();

        self.phase(Phase::MapData);
        let metadata = MapMetadata {
            generator: osm.generator.clone(),
            source: None,
        };
        let mut map_data = create_map_data(osm, metadata, projection, &self.config, &self.rules, log)?;
        detect_overlaps(&mut map_data, self.config.overlap_grid_divisor, log);

        self.phase(Phase::Representation);
        let mut world = create_world(&map_data, &self.rules, log);

        self.phase(Phase::Elevation);
        let mut enforcer = EleConstraintEnforcer::new();
        let inputs = WorldInputs {
            data: &map_data,
            config: &self.config,
            materials: &self.materials,
            log,
        };
        world.create_connectors(inputs, &mut enforcer);
        world.define_constraints(inputs, &mut enforcer);
        // flat terrain; constraints only lift or lower connectors relative to it
        let elevation_error = enforcer.enforce(&|_| 0.0, log).err();

        self.phase(Phase::Target);
        let mut target = MeshTarget::new();
        world.render(inputs, &enforcer, &mut target);
        let store = target.finish();

        let boundary = map_data.boundary().and_then(|b| b.to_polygon());
        let mut steps = steps_from_config(&self.config, boundary.as_ref())?;
        steps.push(Box::new(TriangulateGeometry));
        let meshes = store.process(&steps);

        self.phase(Phase::Finished);
        ::log::info!(
            "[Conversion] {} elements, {} objects, {} meshes in {:?} ({} log entries)",
            map_data.nodes.len() + map_data.segments.len() + map_data.areas.len(),
            world.len(),
            meshes.len(),
            start.elapsed(),
            log.len()
        );

        Ok(ConversionResult {
            map_data,
            world,
            enforcer,
            meshes,
            elevation_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Recorder(Arc<Mutex<Vec<Phase>>>);

    impl ProgressListener for Recorder {
        fn phase_started(&self, phase: Phase) {
            self.0.lock().unwrap().push(phase);
        }
    }

    #[test]
    fn test_phases_in_order() {
        let phases = Arc::new(Mutex::new(Vec::new()));
        let mut converter = Converter::new(ConversionConfig::default());
        converter.add_listener(Box::new(Recorder(phases.clone())));
        let log = ConversionLog::new();
        converter.convert(&OsmData::default(), &log).unwrap();
        assert_eq!(
            *phases.lock().unwrap(),
            vec![Phase::MapData, Phase::Representation, Phase::Elevation, Phase::Target, Phase::Finished]
        );
    }

    #[test]
    fn test_invalid_config_fails_early() {
        let config = ConversionConfig {
            overlap_grid_divisor: 0,
            ..ConversionConfig::default()
        };
        let log = ConversionLog::new();
        let result = Converter::new(config).convert(&OsmData::default(), &log);
        assert!(matches!(result, Err(ConversionError::InvalidConfig(_))));
    }
}
