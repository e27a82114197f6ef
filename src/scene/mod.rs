//! Scene Collaborator
//!
//! The minimal scene view the baking subsystem consumes: an ordered set of
//! probe-bearing objects plus the world probe. Hosts with their own scene
//! graph mirror their probe objects into a [`ProbeScene`] each frame (or keep
//! one alive and update transforms in place).

pub mod probe;
pub mod world;

use slotmap::{SlotMap, new_key_type};

pub use probe::{LightProbe, ProbeFlags, ProbeKind, ProbeObject, ProbeShape};
pub use world::{WORLD_ERROR_COLOR, WorldMaterialId, WorldProbe};

new_key_type! {
    pub struct ProbeObjectId;
}

/// Probe objects in registration order, plus the world.
#[derive(Debug, Default)]
pub struct ProbeScene {
    objects: SlotMap<ProbeObjectId, ProbeObject>,
    pub world: WorldProbe,
}

impl ProbeScene {
    #[must_use]
    pub fn new(world: WorldProbe) -> Self {
        Self {
            objects: SlotMap::with_key(),
            world,
        }
    }

    pub fn add(&mut self, object: ProbeObject) -> ProbeObjectId {
        self.objects.insert(object)
    }

    pub fn remove(&mut self, id: ProbeObjectId) -> Option<ProbeObject> {
        self.objects.remove(id)
    }

    #[must_use]
    pub fn get(&self, id: ProbeObjectId) -> Option<&ProbeObject> {
        self.objects.get(id)
    }

    pub fn get_mut(&mut self, id: ProbeObjectId) -> Option<&mut ProbeObject> {
        self.objects.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProbeObjectId, &ProbeObject)> {
        self.objects.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ProbeObjectId, &mut ProbeObject)> {
        self.objects.iter_mut()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
