use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use bitflags::bitflags;
use glam::Vec2;
use rapier2d::prelude::RigidBodyHandle;

use crate::animation::AnimationData;
use crate::overworld::bounds::BoundingShape;
use crate::overworld::physics::{self, BodyDef, BodyKind, RoomPhysics, VelocityMode};
use crate::scripting::bridge::Handle;
use crate::scripting::implementable::CallbackTable;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ObjectFlags: u8 {
        const VISIBLE = 1;
        const CAN_COLLIDE = 1 << 1;
        const ONE_SIDED = 1 << 2;
        const PERSISTS = 1 << 3;
        const PAUSED = 1 << 4;
    }
}

/// Where an object's transform lives. Exactly one of the two is authoritative.
///
/// Physics bodies only keep a wrapped angle, so an attached object carries its own unwrapped
/// `angle` and the body angle it last saw; turns the solver makes are added to `angle`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    Detached(BodyDef),
    Attached { body: RigidBodyHandle, angle: f32, body_angle: f32 },
}

#[derive(Debug)]
pub struct WorldObject {
    id: Handle,
    name: String,
    z: i32,
    priority: i32,
    scale: f32,
    height: f32,
    flags: ObjectFlags,
    layer: u8,
    placement: Placement,
    animations: BTreeMap<String, Rc<AnimationData>>,
    bounding_boxes: BTreeMap<String, BoundingShape>,
    ignored: BTreeSet<Handle>,
    contacts: BTreeSet<Handle>,
    room: Option<Handle>,
    callbacks: CallbackTable,
}

impl WorldObject {
    pub fn new(id: Handle, name: impl Into<String>, callbacks: CallbackTable) -> Self {
        Self {
            id,
            name: name.into(),
            z: 0,
            priority: 0,
            scale: 1.0,
            height: 0.0,
            flags: ObjectFlags::VISIBLE | ObjectFlags::CAN_COLLIDE,
            layer: 0,
            placement: Placement::Detached(BodyDef::default()),
            animations: BTreeMap::new(),
            bounding_boxes: BTreeMap::new(),
            ignored: BTreeSet::new(),
            contacts: BTreeSet::new(),
            room: None,
            callbacks,
        }
    }

    pub fn id(&self) -> Handle {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn z(&self) -> i32 {
        self.z
    }

    pub fn set_z(&mut self, z: i32) {
        self.z = z;
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn set_priority(&mut self, priority: i32) {
        self.priority = priority;
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn set_height(&mut self, height: f32) {
        self.height = height;
    }

    pub fn layer(&self) -> u8 {
        self.layer
    }

    pub fn set_layer(&mut self, layer: u8) {
        self.layer = layer;
    }

    pub fn flag(&self, flag: ObjectFlags) -> bool {
        self.flags.contains(flag)
    }

    /// Plain flag write. `CAN_COLLIDE` goes through [`ObjectMut::set_can_collide`] instead so the
    /// body stays in step.
    pub fn set_flag(&mut self, flag: ObjectFlags, value: bool) {
        self.flags.set(flag, value);
    }

    pub fn is_visible(&self) -> bool {
        self.flag(ObjectFlags::VISIBLE)
    }

    pub fn can_collide(&self) -> bool {
        self.flag(ObjectFlags::CAN_COLLIDE)
    }

    pub fn is_one_sided(&self) -> bool {
        self.flag(ObjectFlags::ONE_SIDED)
    }

    pub fn persists(&self) -> bool {
        self.flag(ObjectFlags::PERSISTS)
    }

    pub fn is_paused(&self) -> bool {
        self.flag(ObjectFlags::PAUSED)
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub fn room(&self) -> Option<Handle> {
        self.room
    }

    pub fn animation(&self, id: &str) -> Option<Rc<AnimationData>> {
        self.animations.get(id).cloned()
    }

    pub fn set_animation(&mut self, id: impl Into<String>, animation: Option<Rc<AnimationData>>) {
        let id = id.into();
        match animation {
            Some(animation) => {
                self.animations.insert(id, animation);
            }
            None => {
                self.animations.remove(&id);
            }
        }
    }

    pub fn animations(&self) -> impl Iterator<Item = (&str, &Rc<AnimationData>)> {
        self.animations.iter().map(|(id, anim)| (id.as_str(), anim))
    }

    pub fn bounding_box(&self, id: &str) -> Option<&BoundingShape> {
        self.bounding_boxes.get(id)
    }

    pub fn bounding_boxes(&self) -> impl Iterator<Item = (&str, &BoundingShape)> {
        self.bounding_boxes.iter().map(|(id, shape)| (id.as_str(), shape))
    }

    pub fn is_ignoring(&self, other: Handle) -> bool {
        self.ignored.contains(&other)
    }

    pub fn set_ignoring(&mut self, other: Handle, ignore: bool) {
        if ignore {
            self.ignored.insert(other);
        } else {
            self.ignored.remove(&other);
        }
    }

    pub fn ignored_handles(&self) -> impl Iterator<Item = Handle> + '_ {
        self.ignored.iter().copied()
    }

    pub fn forget_ignored(&mut self, other: Handle) {
        self.ignored.remove(&other);
    }

    pub fn contacts(&self) -> impl Iterator<Item = Handle> + '_ {
        self.contacts.iter().copied()
    }

    pub fn is_touching(&self, other: Handle) -> bool {
        self.contacts.contains(&other)
    }

    pub(crate) fn add_contact(&mut self, other: Handle) {
        self.contacts.insert(other);
    }

    pub(crate) fn remove_contact(&mut self, other: Handle) {
        self.contacts.remove(&other);
    }

    pub fn callbacks(&self) -> &CallbackTable {
        &self.callbacks
    }

    pub fn callbacks_mut(&mut self) -> &mut CallbackTable {
        &mut self.callbacks
    }

    /// Consumes the body definition into a physics body and attaches every bounding box.
    pub(crate) fn attach(&mut self, room: Handle, physics: &mut RoomPhysics) {
        let def = match self.placement {
            Placement::Detached(def) => def,
            Placement::Attached { .. } => return,
        };
        let body = physics.create_body(&BodyDef { active: self.can_collide(), ..def });
        for shape in self.bounding_boxes.values_mut() {
            let collider = physics.attach_shape(body, shape, self.id);
            shape.set_collider(Some(collider));
        }
        let body_angle = physics.body(body).map_or(def.angle, |rigid| rigid.rotation().angle());
        self.placement = Placement::Attached { body, angle: def.angle, body_angle };
        self.room = Some(room);
    }

    /// Destroys the body and its colliders, writing the final body state back into a definition.
    pub(crate) fn detach(&mut self, physics: &mut RoomPhysics) {
        if let Placement::Attached { body, angle, .. } = self.placement {
            let def = physics.remove_body(body).unwrap_or_default();
            self.placement = Placement::Detached(BodyDef { angle, ..def });
        }
        for shape in self.bounding_boxes.values_mut() {
            shape.set_collider(None);
        }
        self.contacts.clear();
        self.room = None;
    }

    /// Folds any turn the solver gave the body since the last sync into the unwrapped angle.
    pub(crate) fn sync_rotation(&mut self, physics: &RoomPhysics) {
        let Placement::Attached { body, angle, body_angle } = &mut self.placement else {
            return;
        };
        let Some(current) = physics.body(*body).map(|rigid| rigid.rotation().angle()) else {
            return;
        };
        if current != *body_angle {
            *angle += physics::shortest_turn(*body_angle, current);
            *body_angle = current;
        }
    }

    pub fn with_physics<'a>(&'a mut self, physics: Option<&'a mut RoomPhysics>) -> ObjectMut<'a> {
        ObjectMut { object: self, physics }
    }
}

/// Mutable view that routes transform and collision writes to the body definition or to the
/// physics body, whichever currently holds the object's state.
pub struct ObjectMut<'a> {
    object: &'a mut WorldObject,
    physics: Option<&'a mut RoomPhysics>,
}

impl<'a> ObjectMut<'a> {
    pub fn object(&self) -> &WorldObject {
        self.object
    }

    pub fn object_mut(&mut self) -> &mut WorldObject {
        self.object
    }

    pub fn into_object(self) -> &'a mut WorldObject {
        self.object
    }

    fn def(&self) -> BodyDef {
        match self.object.placement {
            Placement::Detached(def) => def,
            Placement::Attached { body, angle, .. } => self
                .physics
                .as_deref()
                .and_then(|physics| physics.body(body))
                .map(|rigid| BodyDef { angle, ..physics::body_to_def(rigid) })
                .unwrap_or_default(),
        }
    }

    fn update_def(&mut self, apply: impl FnOnce(&mut BodyDef)) {
        match &mut self.object.placement {
            Placement::Detached(def) => apply(def),
            Placement::Attached { body, angle, body_angle } => {
                if let Some(rigid) = self.physics.as_deref_mut().and_then(|physics| physics.body_mut(*body)) {
                    let before = physics::body_to_def(rigid);
                    let mut def = BodyDef { angle: *angle, ..before };
                    apply(&mut def);
                    physics::set_body_position(rigid, def.position, def.angle);
                    if before.kind != def.kind {
                        physics::set_body_kind(rigid, def.kind);
                    }
                    rigid.set_enabled(def.active);
                    *angle = def.angle;
                    *body_angle = rigid.rotation().angle();
                }
            }
        }
    }

    pub fn position(&self) -> Vec2 {
        self.def().position
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.update_def(|def| def.position = position);
    }

    /// Rotation in radians.
    pub fn rotation(&self) -> f32 {
        self.def().angle
    }

    pub fn set_rotation(&mut self, angle: f32) {
        self.update_def(|def| def.angle = angle);
    }

    pub fn body_kind(&self) -> BodyKind {
        self.def().kind
    }

    pub fn set_body_kind(&mut self, kind: BodyKind) {
        self.update_def(|def| def.kind = kind);
    }

    /// Linear velocity, or `None` while the object has no body.
    pub fn velocity(&self) -> Option<Vec2> {
        let Placement::Attached { body, .. } = self.object.placement else {
            return None;
        };
        self.physics.as_deref().and_then(|physics| physics.body(body)).map(|body| physics::vec_from_rapier(body.linvel()))
    }

    /// Returns false when there is no body to act on.
    pub fn set_velocity(&mut self, velocity: Vec2, mode: VelocityMode) -> bool {
        let Placement::Attached { body, .. } = self.object.placement else {
            return false;
        };
        let Some(rigid) = self.physics.as_deref_mut().and_then(|physics| physics.body_mut(body)) else {
            return false;
        };
        let value = physics::vec_to_rapier(velocity);
        match mode {
            VelocityMode::Direct => rigid.set_linvel(value, true),
            VelocityMode::Impulse => rigid.apply_impulse(value, true),
            VelocityMode::Force => rigid.add_force(value, true),
        }
        true
    }

    pub fn set_can_collide(&mut self, value: bool) {
        self.object.flags.set(ObjectFlags::CAN_COLLIDE, value);
        if let Placement::Detached(def) = &mut self.object.placement {
            def.active = value;
        }
    }

    /// Brings the body's enabled state in line with `canCollide`.
    pub fn reconcile_collision(&mut self) {
        let can_collide = self.object.can_collide();
        if let Placement::Attached { body, .. } = self.object.placement {
            if let Some(rigid) = self.physics.as_deref_mut().and_then(|physics| physics.body_mut(body)) {
                if rigid.is_enabled() != can_collide {
                    rigid.set_enabled(can_collide);
                }
            }
        }
    }

    pub fn set_scale(&mut self, scale: f32) {
        let scale = scale.max(0.0);
        self.object.scale = scale;
        for shape in self.object.bounding_boxes.values_mut() {
            shape.set_scale(scale);
        }
        self.update_collision();
    }

    /// Inserts or replaces a bounding box. `None` removes it along with its collider.
    pub fn set_bounding_box(&mut self, id: impl Into<String>, shape: Option<BoundingShape>) {
        let id = id.into();
        if let Some(previous) = self.object.bounding_boxes.remove(&id) {
            if let (Some(collider), Some(physics)) = (previous.collider(), self.physics.as_deref_mut()) {
                physics.detach_shape(collider);
            }
        }
        let Some(mut shape) = shape else {
            return;
        };
        shape.set_scale(self.object.scale);
        shape.set_collider(None);
        if let (Placement::Attached { body, .. }, Some(physics)) = (self.object.placement, self.physics.as_deref_mut()) {
            shape.set_collider(Some(physics.attach_shape(body, &shape, self.object.id)));
        }
        self.object.bounding_boxes.insert(id, shape);
    }

    /// Applies `edit` to a bounding box and resyncs its collider. Returns `None` if the box is gone.
    pub fn edit_bounding_box<R>(&mut self, id: &str, edit: impl FnOnce(&mut BoundingShape) -> R) -> Option<R> {
        let shape = self.object.bounding_boxes.get_mut(id)?;
        let result = edit(shape);
        if let (Some(collider), Some(physics)) = (shape.collider(), self.physics.as_deref_mut()) {
            physics.sync_shape(collider, shape);
        }
        Some(result)
    }

    /// Rebuilds every collider from the current bounding-box geometry.
    pub fn update_collision(&mut self) {
        let Some(physics) = self.physics.as_deref_mut() else {
            return;
        };
        for shape in self.object.bounding_boxes.values() {
            if let Some(collider) = shape.collider() {
                physics.sync_shape(collider, shape);
            }
        }
    }
}
