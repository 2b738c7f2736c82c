//! World objects: 3D representations of map elements
//!
//! Each object registers elevation connectors, adds vertical constraints
//! between its own connectors and those of overlapping objects, and renders
//! meshes once elevations are known.
//!
//! # Submodules
//! - `surface` - Surface areas and empty terrain
//! - `building` - Buildings with floors above passages
//! - `way` - Roads, railways and waterways, including bridges and tunnels
//! - `tree` - Trees on nodes and in forests
//! - `creation` - Choosing representations for map elements

mod surface;
mod building;
mod way;
mod tree;
mod creation;

use std::collections::HashMap;
use std::time::Instant;

use crate::config::ConversionConfig;
use crate::conversion::ConversionLog;
use crate::elevation::{EleConnectorGroup, EleConstraintEnforcer, GroundState};
use crate::map_data::{ElementRef, MapData, NodeIdx};
use crate::math::{xyz, DVec2, DVec3, PolygonWithHoles};
use crate::mesh::{Materials, MeshMetadata, MeshTarget};

pub use building::Building;
pub use creation::create_world;
pub use surface::SurfaceArea;
pub use tree::{Tree, TreeVariation};
pub use way::WaySegmentObject;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectIdx(pub usize);

/// Connector an object needs, before it is registered with the enforcer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectorSpec {
    pub pos: DVec2,
    pub ground_state: GroundState,
    pub reference: Option<NodeIdx>,
}

impl ConnectorSpec {
    pub fn new(pos: DVec2, ground_state: GroundState, reference: Option<NodeIdx>) -> Self {
        Self { pos, ground_state, reference }
    }
}

/// Read-only inputs shared by all world object operations
#[derive(Clone, Copy)]
pub struct WorldInputs<'a> {
    pub data: &'a MapData,
    pub config: &'a ConversionConfig,
    pub materials: &'a Materials,
    pub log: &'a ConversionLog,
}

impl<'a> WorldInputs<'a> {
    pub fn with_world(self, world: &'a World) -> WorldContext<'a> {
        WorldContext {
            data: self.data,
            world,
            config: self.config,
            materials: self.materials,
            log: self.log,
        }
    }
}

/// `WorldInputs` plus the world itself, for objects that look at their neighbours
#[derive(Clone, Copy)]
pub struct WorldContext<'a> {
    pub data: &'a MapData,
    pub world: &'a World,
    pub config: &'a ConversionConfig,
    pub materials: &'a Materials,
    pub log: &'a ConversionLog,
}

/// Resolved elevations of one object's connectors
pub struct Elevations<'a> {
    connectors: &'a EleConnectorGroup,
    enforcer: &'a EleConstraintEnforcer,
}

impl<'a> Elevations<'a> {
    pub fn new(connectors: &'a EleConnectorGroup, enforcer: &'a EleConstraintEnforcer) -> Self {
        Self { connectors, enforcer }
    }

    /// Elevation at a connector position, 0 where the object has no connector
    pub fn at(&self, pos: DVec2) -> f64 {
        self.connectors
            .get(pos)
            .map(|id| self.enforcer.elevation(id))
            .unwrap_or(0.0)
    }

    pub fn xyz(&self, pos: DVec2) -> DVec3 {
        xyz(pos, self.at(pos))
    }

    /// Lowest elevation of all connectors, 0 without connectors
    pub fn min(&self) -> f64 {
        self.connectors
            .ids()
            .iter()
            .map(|&id| self.enforcer.elevation(id))
            .reduce(f64::min)
            .unwrap_or(0.0)
    }
}

pub trait WorldObject: Send + Sync {
    fn element(&self) -> ElementRef;

    fn object_type(&self) -> &'static str;

    fn ground_state(&self) -> GroundState;

    fn connector_specs(&self, ctx: &WorldContext) -> Vec<ConnectorSpec>;

    fn define_constraints(
        &self,
        _ctx: &WorldContext,
        _own: &EleConnectorGroup,
        _enforcer: &mut EleConstraintEnforcer,
    ) {
    }

    /// Ground-plane polygons this object removes from terrain below it
    fn terrain_boundaries(&self, _data: &MapData) -> Vec<PolygonWithHoles> {
        Vec::new()
    }

    fn outline(&self, _data: &MapData) -> Option<PolygonWithHoles> {
        None
    }

    fn is_surface(&self) -> bool {
        false
    }

    fn is_empty_terrain(&self) -> bool {
        false
    }

    fn render(&self, ctx: &WorldContext, elevations: &Elevations, target: &mut MeshTarget);
}

/// Arena of world objects with their connectors
#[derive(Default)]
pub struct World {
    objects: Vec<Box<dyn WorldObject>>,
    by_element: HashMap<ElementRef, Vec<ObjectIdx>>,
    connectors: Vec<EleConnectorGroup>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, object: Box<dyn WorldObject>) -> ObjectIdx {
        let idx = ObjectIdx(self.objects.len());
        self.by_element.entry(object.element()).or_default().push(idx);
        self.objects.push(object);
        self.connectors.push(EleConnectorGroup::new());
        idx
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn object(&self, idx: ObjectIdx) -> &dyn WorldObject {
        self.objects[idx.0].as_ref()
    }

    pub fn objects(&self) -> impl Iterator<Item = (ObjectIdx, &dyn WorldObject)> + '_ {
        self.objects.iter().enumerate().map(|(i, o)| (ObjectIdx(i), o.as_ref()))
    }

    /// Objects created for a map element, in creation order
    pub fn representations(&self, element: ElementRef) -> impl Iterator<Item = (ObjectIdx, &dyn WorldObject)> + '_ {
        self.by_element
            .get(&element)
            .into_iter()
            .flatten()
            .map(|&idx| (idx, self.object(idx)))
    }

    /// Connectors of an object. Empty before `create_connectors`.
    pub fn connectors(&self, idx: ObjectIdx) -> &EleConnectorGroup {
        &self.connectors[idx.0]
    }

    /// Registers every object's connectors. Objects at the same position with
    /// the same ground state share one connector.
    pub fn create_connectors(&mut self, inputs: WorldInputs, enforcer: &mut EleConstraintEnforcer) {
        let start = Instant::now();
        let groups: Vec<EleConnectorGroup> = {
            let ctx = inputs.with_world(self);
            self.objects
                .iter()
                .map(|object| {
                    let mut group = EleConnectorGroup::new();
                    for spec in object.connector_specs(&ctx) {
                        let id = enforcer.shared_connector(spec.pos, spec.ground_state, spec.reference);
                        group.add(id, spec.pos);
                    }
                    group
                })
                .collect()
        };
        self.connectors = groups;
        log::info!(
            "[Elevation] {} connectors for {} objects in {:?}",
            enforcer.connectors().len(),
            self.objects.len(),
            start.elapsed()
        );
    }

    pub fn define_constraints(&self, inputs: WorldInputs, enforcer: &mut EleConstraintEnforcer) {
        let ctx = inputs.with_world(self);
        for (idx, object) in self.objects() {
            object.define_constraints(&ctx, self.connectors(idx), enforcer);
        }
        log::debug!("[Elevation] {} constraints defined", enforcer.constraints().len());
    }

    pub fn render(&self, inputs: WorldInputs, enforcer: &EleConstraintEnforcer, target: &mut MeshTarget) {
        let start = Instant::now();
        let ctx = inputs.with_world(self);
        for (idx, object) in self.objects() {
            let element = ctx.data.element_id(object.element());
            target.begin_object(MeshMetadata::new(element, object.object_type()));
            object.render(&ctx, &Elevations::new(self.connectors(idx), enforcer), target);
        }
        log::info!(
            "[Target] {} objects rendered into {} meshes in {:?}",
            self.objects.len(),
            target.len(),
            start.elapsed()
        );
    }
}
