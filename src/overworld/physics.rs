use std::collections::HashMap;
use std::f32::consts::{PI, TAU};
use std::sync::Mutex;

use glam::Vec2;
use rapier2d::geometry::CollisionEvent;
use rapier2d::pipeline::{ActiveEvents, EventHandler};
use rapier2d::prelude::{
    ActiveCollisionTypes, CCDSolver, ColliderBuilder, ColliderHandle, ColliderSet, ContactPair, DefaultBroadPhase,
    ImpulseJointSet, IntegrationParameters, IslandManager, Isometry, MultibodyJointSet, NarrowPhase,
    PhysicsPipeline, Real, RigidBody, RigidBodyBuilder, RigidBodyHandle, RigidBodySet, RigidBodyType, Vector,
};

use crate::config::PhysicsConfig;
use crate::events::ContactEvent;
use crate::overworld::bounds::BoundingShape;
use crate::scripting::bridge::Handle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Dynamic,
    Kinematic,
    Static,
}

impl BodyKind {
    pub fn code(self) -> i64 {
        match self {
            BodyKind::Dynamic => 0,
            BodyKind::Kinematic => 1,
            BodyKind::Static => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(BodyKind::Dynamic),
            1 => Some(BodyKind::Kinematic),
            2 => Some(BodyKind::Static),
            _ => None,
        }
    }

    fn to_rapier(self) -> RigidBodyType {
        match self {
            BodyKind::Dynamic => RigidBodyType::Dynamic,
            BodyKind::Kinematic => RigidBodyType::KinematicVelocityBased,
            BodyKind::Static => RigidBodyType::Fixed,
        }
    }

    fn from_rapier(body_type: RigidBodyType) -> Self {
        match body_type {
            RigidBodyType::Dynamic => BodyKind::Dynamic,
            RigidBodyType::Fixed => BodyKind::Static,
            _ => BodyKind::Kinematic,
        }
    }
}

/// Body state of an object that is not in a room. Adoption consumes it to build the physics
/// body; removal writes the body state back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDef {
    pub position: Vec2,
    pub angle: f32,
    pub kind: BodyKind,
    pub active: bool,
}

impl Default for BodyDef {
    fn default() -> Self {
        Self { position: Vec2::ZERO, angle: 0.0, kind: BodyKind::Dynamic, active: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VelocityMode {
    Direct,
    Impulse,
    Force,
}

impl VelocityMode {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(VelocityMode::Direct),
            1 => Some(VelocityMode::Impulse),
            2 => Some(VelocityMode::Force),
            _ => None,
        }
    }
}

struct ContactCollector {
    events: Mutex<Vec<CollisionEvent>>,
}

impl ContactCollector {
    fn new() -> Self {
        Self { events: Mutex::new(Vec::new()) }
    }

    fn drain(&self) -> Vec<CollisionEvent> {
        if let Ok(mut events) = self.events.lock() {
            std::mem::take(&mut *events)
        } else {
            Vec::new()
        }
    }
}

impl EventHandler for ContactCollector {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
    }
}

/// One room's physics world. Colliders are tagged with the object that owns them so contact
/// events come out keyed by object handle.
pub struct RoomPhysics {
    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    linear_damping: f32,
    integration_parameters: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    collider_owners: HashMap<ColliderHandle, Handle>,
    collector: ContactCollector,
}

impl RoomPhysics {
    pub fn new(config: &PhysicsConfig) -> Self {
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: Vector::new(config.gravity[0], config.gravity[1]),
            linear_damping: config.linear_damping.max(0.0),
            integration_parameters: IntegrationParameters::default(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            collider_owners: HashMap::new(),
            collector: ContactCollector::new(),
        }
    }

    pub fn create_body(&mut self, def: &BodyDef) -> RigidBodyHandle {
        let body = RigidBodyBuilder::new(def.kind.to_rapier())
            .translation(vec_to_rapier(def.position))
            .rotation(def.angle)
            .linear_damping(self.linear_damping)
            .enabled(def.active)
            .build();
        self.bodies.insert(body)
    }

    /// Removes the body and every collider on it, returning the final state as a definition.
    pub fn remove_body(&mut self, handle: RigidBodyHandle) -> Option<BodyDef> {
        let def = self.body(handle).map(body_to_def)?;
        let collider_handles: Vec<ColliderHandle> =
            self.bodies.get(handle).map(|body| body.colliders().to_vec()).unwrap_or_default();
        for collider in collider_handles {
            self.collider_owners.remove(&collider);
        }
        let _ = self.bodies.remove(
            handle,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
        Some(def)
    }

    pub fn attach_shape(&mut self, body: RigidBodyHandle, shape: &BoundingShape, owner: Handle) -> ColliderHandle {
        let collider = ColliderBuilder::new(shape.physics_shape())
            .translation(vec_to_rapier(shape.scaled_offset()))
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .active_collision_types(ActiveCollisionTypes::all())
            .build();
        let handle = self.colliders.insert_with_parent(collider, body, &mut self.bodies);
        self.collider_owners.insert(handle, owner);
        handle
    }

    pub fn detach_shape(&mut self, collider: ColliderHandle) {
        self.collider_owners.remove(&collider);
        let _ = self.colliders.remove(collider, &mut self.island_manager, &mut self.bodies, true);
    }

    pub fn sync_shape(&mut self, collider: ColliderHandle, shape: &BoundingShape) {
        if let Some(collider) = self.colliders.get_mut(collider) {
            collider.set_shape(shape.physics_shape());
            collider.set_translation_wrt_parent(vec_to_rapier(shape.scaled_offset()));
        }
    }

    pub fn body(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    pub fn body_mut(&mut self, handle: RigidBodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle)
    }

    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn step(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        self.integration_parameters.dt = dt;
        let hooks = ();
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &hooks,
            &self.collector,
        );
        for (_, body) in self.bodies.iter_mut() {
            body.reset_forces(false);
        }
    }

    /// Contact transitions since the last drain, mapped to owning objects. Contacts between two
    /// colliders of the same object are dropped.
    pub fn drain_contacts(&mut self) -> Vec<ContactEvent> {
        let mut out = Vec::new();
        for event in self.collector.drain() {
            let (a, b, began) = match event {
                CollisionEvent::Started(a, b, _) => (a, b, true),
                CollisionEvent::Stopped(a, b, _) => (a, b, false),
            };
            let (Some(owner_a), Some(owner_b)) = (self.collider_owners.get(&a), self.collider_owners.get(&b)) else {
                continue;
            };
            if owner_a == owner_b {
                continue;
            }
            let contact = if began {
                ContactEvent::began(*owner_a, *owner_b)
            } else {
                ContactEvent::ended(*owner_a, *owner_b)
            };
            if !out.contains(&contact) {
                out.push(contact);
            }
        }
        out
    }
}

pub fn body_to_def(body: &RigidBody) -> BodyDef {
    let translation = body.translation();
    BodyDef {
        position: Vec2::new(translation.x, translation.y),
        angle: body.rotation().angle(),
        kind: BodyKind::from_rapier(body.body_type()),
        active: body.is_enabled(),
    }
}

/// Signed turn in `(-π, π]` that takes angle `from` to angle `to`.
pub fn shortest_turn(from: f32, to: f32) -> f32 {
    let turn = (to - from).rem_euclid(TAU);
    if turn > PI {
        turn - TAU
    } else {
        turn
    }
}

pub fn set_body_position(body: &mut RigidBody, position: Vec2, angle: f32) {
    body.set_position(Isometry::new(vec_to_rapier(position), angle), true);
}

pub fn set_body_kind(body: &mut RigidBody, kind: BodyKind) {
    body.set_body_type(kind.to_rapier(), true);
}

pub fn vec_to_rapier(v: Vec2) -> Vector<Real> {
    Vector::new(v.x, v.y)
}

pub fn vec_from_rapier(v: &Vector<Real>) -> Vec2 {
    Vec2::new(v.x, v.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(raw: u64) -> Handle {
        Handle::from_raw(raw)
    }

    #[test]
    fn overlapping_bodies_report_one_contact() {
        let mut physics = RoomPhysics::new(&PhysicsConfig::default());
        let a = physics.create_body(&BodyDef::default());
        let b = physics.create_body(&BodyDef { position: Vec2::new(0.5, 0.0), ..BodyDef::default() });
        physics.attach_shape(a, &BoundingShape::rectangle(2.0, 2.0), handle(1));
        physics.attach_shape(a, &BoundingShape::circle(0.5), handle(1));
        physics.attach_shape(b, &BoundingShape::rectangle(2.0, 2.0), handle(2));
        physics.step(1.0 / 60.0);
        let contacts = physics.drain_contacts();
        assert_eq!(contacts, vec![ContactEvent::began(handle(2), handle(1))]);
    }

    #[test]
    fn removing_a_body_drops_its_colliders() {
        let mut physics = RoomPhysics::new(&PhysicsConfig::default());
        let def = BodyDef { position: Vec2::new(3.0, -4.0), angle: 0.5, kind: BodyKind::Kinematic, active: true };
        let body = physics.create_body(&def);
        physics.attach_shape(body, &BoundingShape::circle(1.0), handle(7));
        assert_eq!(physics.collider_count(), 1);
        let back = physics.remove_body(body).expect("body state");
        assert_eq!(physics.collider_count(), 0);
        assert_eq!(physics.body_count(), 0);
        assert_eq!(back.kind, BodyKind::Kinematic);
        assert!((back.position - def.position).length() < 1e-5);
        assert!((back.angle - def.angle).abs() < 1e-5);
    }

    #[test]
    fn shortest_turn_crosses_the_seam() {
        assert!((shortest_turn(3.0, -3.0) - (TAU - 6.0)).abs() < 1e-5);
        assert!((shortest_turn(-3.0, 3.0) + (TAU - 6.0)).abs() < 1e-5);
        assert!((shortest_turn(0.5, 0.25) + 0.25).abs() < 1e-6);
        assert_eq!(shortest_turn(1.0, 1.0), 0.0);
    }
}
