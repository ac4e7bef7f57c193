use std::collections::{BTreeMap, BTreeSet};

use glam::Vec2;
use smallvec::SmallVec;

use crate::catalog::RoomData;
use crate::config::PhysicsConfig;
use crate::events::ContactEvent;
use crate::overworld::object::{ObjectMut, WorldObject};
use crate::overworld::physics::RoomPhysics;
use crate::scripting::bridge::Handle;
use crate::scripting::implementable::CallbackTable;

#[derive(Debug, Clone, PartialEq)]
pub struct Entrypoint {
    pub name: String,
    pub target_room: Option<String>,
    pub position: Vec2,
    /// Degrees.
    pub orientation: Option<f32>,
}

/// Pairs of collision layers whose contacts are dropped. Every pair collides by default.
#[derive(Debug, Clone, Default)]
pub struct CollisionMatrix {
    disabled: BTreeSet<(u8, u8)>,
}

impl CollisionMatrix {
    fn key(a: u8, b: u8) -> (u8, u8) {
        (a.min(b), a.max(b))
    }

    pub fn allows(&self, a: u8, b: u8) -> bool {
        !self.disabled.contains(&Self::key(a, b))
    }

    pub fn set(&mut self, a: u8, b: u8, enabled: bool) {
        if enabled {
            self.disabled.remove(&Self::key(a, b));
        } else {
            self.disabled.insert(Self::key(a, b));
        }
    }
}

/// One `onCollide` call: `receiver.onCollide(other)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionDispatch {
    pub receiver: Handle,
    pub other: Handle,
}

pub struct WorldRoom {
    id: Handle,
    name: String,
    data: RoomData,
    objects: BTreeMap<Handle, WorldObject>,
    physics: RoomPhysics,
    entrypoints: BTreeMap<String, Entrypoint>,
    layers: CollisionMatrix,
    callbacks: CallbackTable,
    pending_removal: BTreeSet<Handle>,
    paused: bool,
}

impl WorldRoom {
    pub fn new(id: Handle, name: impl Into<String>, data: RoomData, physics: &PhysicsConfig, callbacks: CallbackTable) -> Self {
        let entrypoints = data
            .entrypoints
            .iter()
            .map(|(name, entry)| {
                let entrypoint = Entrypoint {
                    name: name.clone(),
                    target_room: entry.room.clone(),
                    position: Vec2::new(entry.x, entry.y),
                    orientation: entry.orientation,
                };
                (name.clone(), entrypoint)
            })
            .collect();
        Self {
            id,
            name: name.into(),
            data,
            objects: BTreeMap::new(),
            physics: RoomPhysics::new(physics),
            entrypoints,
            layers: CollisionMatrix::default(),
            callbacks,
            pending_removal: BTreeSet::new(),
            paused: false,
        }
    }

    pub fn id(&self) -> Handle {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &RoomData {
        &self.data
    }

    pub fn callbacks(&self) -> &CallbackTable {
        &self.callbacks
    }

    pub fn callbacks_mut(&mut self) -> &mut CallbackTable {
        &mut self.callbacks
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub(crate) fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn physics(&self) -> &RoomPhysics {
        &self.physics
    }

    pub fn layers_mut(&mut self) -> &mut CollisionMatrix {
        &mut self.layers
    }

    pub fn layers(&self) -> &CollisionMatrix {
        &self.layers
    }

    pub fn entrypoint(&self, name: &str) -> Option<&Entrypoint> {
        self.entrypoints.get(name)
    }

    pub fn entrypoints(&self) -> impl Iterator<Item = &Entrypoint> {
        self.entrypoints.values()
    }

    pub fn register_entrypoint(&mut self, entrypoint: Entrypoint) {
        self.entrypoints.insert(entrypoint.name.clone(), entrypoint);
    }

    pub fn contains(&self, id: Handle) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn object(&self, id: Handle) -> Option<&WorldObject> {
        self.objects.get(&id)
    }

    pub fn object_mut(&mut self, id: Handle) -> Option<ObjectMut<'_>> {
        let physics = &mut self.physics;
        self.objects.get_mut(&id).map(|object| object.with_physics(Some(physics)))
    }

    pub fn objects(&self) -> impl Iterator<Item = &WorldObject> {
        self.objects.values()
    }

    pub fn object_ids(&self) -> Vec<Handle> {
        self.objects.keys().copied().collect()
    }

    /// Takes ownership of `object`, building its body and fixtures.
    pub fn adopt(&mut self, mut object: WorldObject) {
        object.attach(self.id, &mut self.physics);
        tracing::debug!(tag = "room", room = %self.name, object = %object.id(), "adopted object");
        self.objects.insert(object.id(), object);
    }

    /// Gives up `id`, destroying its body and fixtures. Other objects forget any contact with it.
    pub fn release(&mut self, id: Handle) -> Option<WorldObject> {
        let mut object = self.objects.remove(&id)?;
        object.detach(&mut self.physics);
        for other in self.objects.values_mut() {
            other.remove_contact(id);
        }
        self.pending_removal.remove(&id);
        tracing::debug!(tag = "room", room = %self.name, object = %id, "released object");
        Some(object)
    }

    pub fn schedule_removal(&mut self, id: Handle) -> bool {
        if self.objects.contains_key(&id) {
            self.pending_removal.insert(id)
        } else {
            false
        }
    }

    pub fn is_pending_removal(&self, id: Handle) -> bool {
        self.pending_removal.contains(&id)
    }

    /// Releases every object scheduled with [`schedule_removal`](Self::schedule_removal).
    pub fn flush_removals(&mut self) -> Vec<WorldObject> {
        let pending: Vec<Handle> = std::mem::take(&mut self.pending_removal).into_iter().collect();
        pending.into_iter().filter_map(|id| self.release(id)).collect()
    }

    pub fn step(&mut self, delta: f32) -> Vec<ContactEvent> {
        self.physics.step(delta);
        for object in self.objects.values_mut() {
            object.sync_rotation(&self.physics);
        }
        self.physics.drain_contacts()
    }

    /// Applies one contact event to the contact sets and returns the `onCollide` calls it
    /// produces. Suppressed pairs leave contact sets untouched.
    pub fn resolve_contact(&mut self, event: ContactEvent) -> SmallVec<[CollisionDispatch; 2]> {
        let mut dispatch = SmallVec::new();
        let (a, b) = event.pair();
        if let ContactEvent::Ended { .. } = event {
            if let Some(object) = self.objects.get_mut(&a) {
                object.remove_contact(b);
            }
            if let Some(object) = self.objects.get_mut(&b) {
                object.remove_contact(a);
            }
            return dispatch;
        }

        if self.pending_removal.contains(&a) || self.pending_removal.contains(&b) {
            return dispatch;
        }
        let (Some(first), Some(second)) = (self.objects.get(&a), self.objects.get(&b)) else {
            return dispatch;
        };
        let suppressed = first.is_ignoring(b)
            || second.is_ignoring(a)
            || !first.can_collide()
            || !second.can_collide()
            || !self.layers.allows(first.layer(), second.layer());
        if suppressed {
            return dispatch;
        }
        let (a_one_sided, b_one_sided) = (first.is_one_sided(), second.is_one_sided());

        if let Some(object) = self.objects.get_mut(&a) {
            object.add_contact(b);
        }
        if let Some(object) = self.objects.get_mut(&b) {
            object.add_contact(a);
        }
        if !b_one_sided {
            dispatch.push(CollisionDispatch { receiver: a, other: b });
        }
        if !a_one_sided {
            dispatch.push(CollisionDispatch { receiver: b, other: a });
        }
        dispatch
    }

    /// Drops ignore entries that point at objects no longer alive anywhere.
    pub fn purge_ignored(&mut self, is_alive: impl Fn(Handle) -> bool) {
        for object in self.objects.values_mut() {
            let stale: Vec<Handle> = object.ignored_handles().filter(|other| !is_alive(*other)).collect();
            for other in stale {
                object.forget_ignored(other);
            }
        }
    }

    /// Releases every object. Used when the room itself is torn down.
    pub fn drain_objects(&mut self) -> Vec<WorldObject> {
        let ids = self.object_ids();
        ids.into_iter().filter_map(|id| self.release(id)).collect()
    }
}
