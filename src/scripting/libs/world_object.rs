//! Methods behind `tailor-worldobj` values and the bounding-box values they hand out.

use glam::Vec2;
use mlua::{Lua, MultiValue, UserData, UserDataMethods, Value};

use crate::error::EngineError;
use crate::overworld::bounds::BoundingShape;
use crate::overworld::object::{ObjectFlags, ObjectMut};
use crate::overworld::physics::{BodyKind, VelocityMode};
use crate::scripting::args::{self, multi, register, Args};
use crate::scripting::bridge::{self, Handle, TypeName, ANIMATION_TYPENAME, BOUNDING_BOX_TYPENAME};
use crate::scripting::implementable::ON_INTERACT;
use crate::scripting::libs::animation::AnimationValue;
use crate::scripting::libs::{entity_value, id_value, optional_entity};
use crate::scripting::with_state;

const MAX_COLLISION_LAYER: i64 = 15;

fn receiver(args: &Args) -> Result<Handle, EngineError> {
    args.handle(1, TypeName::WorldObject)
}

fn with_object<R>(lua: &Lua, id: Handle, f: impl FnOnce(&mut ObjectMut<'_>) -> Result<R, EngineError>) -> mlua::Result<R> {
    with_state(lua, |state| f(&mut state.object_mut(id)?))
}

fn pair(v: Vec2) -> MultiValue {
    multi(vec![Value::Number(v.x as f64), Value::Number(v.y as f64)])
}

fn clamp_i32(value: i64) -> i32 {
    value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

fn flag_getter(lua: &Lua, methods: &mlua::Table, name: &'static str, flag: ObjectFlags) -> mlua::Result<()> {
    register(lua, methods, name, 1, 1, move |lua, args| {
        let id = receiver(&args)?;
        with_state(lua, |state| Ok(state.object(id)?.flag(flag)))
    })
}

fn flag_setter(lua: &Lua, methods: &mlua::Table, name: &'static str, flag: ObjectFlags) -> mlua::Result<()> {
    register(lua, methods, name, 2, 2, move |lua, args| {
        let id = receiver(&args)?;
        let value = args.boolean(2)?;
        with_object(lua, id, |object| {
            object.object_mut().set_flag(flag, value);
            Ok(())
        })
    })
}

pub fn install(lua: &Lua) -> mlua::Result<()> {
    let methods = lua.create_table()?;

    register(lua, &methods, "getID", 1, 1, |_, args| Ok(id_value(receiver(&args)?)))?;
    register(lua, &methods, "getObjectName", 1, 1, |lua, args| {
        let id = receiver(&args)?;
        with_state(lua, |state| Ok(state.object(id)?.name().to_string()))
    })?;
    register(lua, &methods, "updateCollision", 1, 1, |lua, args| {
        with_object(lua, receiver(&args)?, |object| {
            object.update_collision();
            Ok(())
        })
    })?;

    register(lua, &methods, "getHeight", 1, 1, |lua, args| {
        let id = receiver(&args)?;
        with_state(lua, |state| Ok(state.object(id)?.height()))
    })?;
    register(lua, &methods, "setHeight", 2, 2, |lua, args| {
        let height = args.number(2)?;
        with_object(lua, receiver(&args)?, |object| {
            object.object_mut().set_height(height);
            Ok(())
        })
    })?;

    register(lua, &methods, "getRotation", 1, 1, |lua, args| {
        with_object(lua, receiver(&args)?, |object| Ok(object.rotation().to_degrees()))
    })?;
    register(lua, &methods, "setRotation", 2, 2, |lua, args| {
        let degrees = args.number(2)?;
        with_object(lua, receiver(&args)?, |object| {
            object.set_rotation(degrees.to_radians());
            Ok(())
        })
    })?;

    register(lua, &methods, "isIgnoringCollisionWith", 2, 2, |lua, args| {
        let id = receiver(&args)?;
        let other = args.handle(2, TypeName::WorldObject)?;
        with_state(lua, |state| Ok(state.object(id)?.is_ignoring(other)))
    })?;
    register(lua, &methods, "setIgnoringCollisionWith", 3, 3, |lua, args| {
        let other = args.handle(2, TypeName::WorldObject)?;
        let ignore = args.boolean(3)?;
        with_object(lua, receiver(&args)?, |object| {
            object.object_mut().set_ignoring(other, ignore);
            Ok(())
        })
    })?;

    flag_getter(lua, &methods, "isOneSidedReaction", ObjectFlags::ONE_SIDED)?;
    flag_setter(lua, &methods, "setOneSidedReaction", ObjectFlags::ONE_SIDED)?;
    flag_getter(lua, &methods, "isVisible", ObjectFlags::VISIBLE)?;
    flag_setter(lua, &methods, "setVisible", ObjectFlags::VISIBLE)?;
    flag_getter(lua, &methods, "isPersisting", ObjectFlags::PERSISTS)?;
    flag_setter(lua, &methods, "setPersisting", ObjectFlags::PERSISTS)?;
    flag_getter(lua, &methods, "canCollide", ObjectFlags::CAN_COLLIDE)?;
    register(lua, &methods, "setCanCollide", 2, 2, |lua, args| {
        let value = args.boolean(2)?;
        with_object(lua, receiver(&args)?, |object| {
            object.set_can_collide(value);
            Ok(())
        })
    })?;

    register(lua, &methods, "getBodyType", 1, 1, |lua, args| {
        with_object(lua, receiver(&args)?, |object| Ok(object.body_kind().code()))
    })?;
    register(lua, &methods, "setBodyType", 2, 2, |lua, args| {
        let code = args.integer(2)?;
        let kind = BodyKind::from_code(code).ok_or_else(|| args.bad(2, format!("unknown body type {code}")))?;
        with_object(lua, receiver(&args)?, |object| {
            object.set_body_kind(kind);
            Ok(())
        })
    })?;

    register(lua, &methods, "getZ", 1, 1, |lua, args| {
        let id = receiver(&args)?;
        with_state(lua, |state| Ok(state.object(id)?.z()))
    })?;
    register(lua, &methods, "setZ", 2, 2, |lua, args| {
        let z = clamp_i32(args.integer(2)?);
        with_object(lua, receiver(&args)?, |object| {
            object.object_mut().set_z(z);
            Ok(())
        })
    })?;
    register(lua, &methods, "getPriority", 1, 1, |lua, args| {
        let id = receiver(&args)?;
        with_state(lua, |state| Ok(state.object(id)?.priority()))
    })?;
    register(lua, &methods, "setPriority", 2, 2, |lua, args| {
        let priority = clamp_i32(args.integer(2)?);
        with_object(lua, receiver(&args)?, |object| {
            object.object_mut().set_priority(priority);
            Ok(())
        })
    })?;
    register(lua, &methods, "getCollisionLayer", 1, 1, |lua, args| {
        let id = receiver(&args)?;
        with_state(lua, |state| Ok(state.object(id)?.layer()))
    })?;
    register(lua, &methods, "setCollisionLayer", 2, 2, |lua, args| {
        let layer = args.integer(2)?;
        if !(0..=MAX_COLLISION_LAYER).contains(&layer) {
            return Err(args.bad(2, format!("collision layer must be 0-{MAX_COLLISION_LAYER}, got {layer}")).into());
        }
        with_object(lua, receiver(&args)?, |object| {
            object.object_mut().set_layer(layer as u8);
            Ok(())
        })
    })?;

    register(lua, &methods, "getVelocity", 1, 1, |lua, args| {
        let velocity = with_object(lua, receiver(&args)?, |object| Ok(object.velocity()))?;
        Ok(match velocity {
            Some(velocity) => pair(velocity),
            None => multi(vec![Value::Nil]),
        })
    })?;
    register(lua, &methods, "setVelocity", 1, 4, |lua, args| {
        let (x, y) = (args.opt_number(2)?, args.opt_number(3)?);
        let code = args.opt_integer(4)?.unwrap_or(0);
        let mode = VelocityMode::from_code(code).ok_or_else(|| args.bad(4, format!("unknown velocity mode {code}")))?;
        let id = receiver(&args)?;
        with_object(lua, id, |object| {
            let Some(current) = object.velocity() else {
                tracing::debug!(tag = "overworld", object = %id, "setVelocity ignored on an object without a body");
                return Ok(());
            };
            let value = match mode {
                VelocityMode::Direct => Vec2::new(x.unwrap_or(current.x), y.unwrap_or(current.y)),
                VelocityMode::Impulse | VelocityMode::Force => Vec2::new(x.unwrap_or(0.0), y.unwrap_or(0.0)),
            };
            object.set_velocity(value, mode);
            Ok(())
        })
    })?;

    register(lua, &methods, "getPosition", 1, 1, |lua, args| {
        with_object(lua, receiver(&args)?, |object| Ok(pair(object.position())))
    })?;
    register(lua, &methods, "setPosition", 3, 3, |lua, args| {
        let position = Vec2::new(args.number(2)?, args.number(3)?);
        with_object(lua, receiver(&args)?, |object| {
            object.set_position(position);
            Ok(())
        })
    })?;

    register(lua, &methods, "getAnimation", 2, 2, |lua, args| {
        let id = receiver(&args)?;
        let slot = args.string(2)?;
        let animation = with_state(lua, |state| Ok(state.object(id)?.animation(&slot)))?;
        match animation {
            Some(animation) => lua.create_userdata(AnimationValue(animation)).map(Value::UserData),
            None => Ok(Value::Nil),
        }
    })?;
    register(lua, &methods, "setAnimation", 2, 3, |lua, args| {
        let slot = args.string(2)?;
        let animation = if args.is_nil(3) {
            None
        } else {
            Some(args.userdata::<AnimationValue>(3, ANIMATION_TYPENAME)?.0)
        };
        with_object(lua, receiver(&args)?, |object| {
            object.object_mut().set_animation(slot, animation);
            Ok(())
        })
    })?;

    register(lua, &methods, "createBoundingBox", 2, 3, |lua, args| {
        let id = receiver(&args)?;
        let name = args.string(2)?;
        let shape = BoundingShape::from_code(args.opt_integer(3)?.unwrap_or(1));
        with_object(lua, id, |object| {
            object.set_bounding_box(name.clone(), Some(shape));
            Ok(())
        })?;
        Ok(BoundingBoxValue { object: id, id: name })
    })?;
    register(lua, &methods, "removeBoundingBox", 2, 2, |lua, args| {
        let name = args.string(2)?;
        with_object(lua, receiver(&args)?, |object| {
            let existed = object.object().bounding_box(&name).is_some();
            object.set_bounding_box(name.clone(), None);
            Ok(existed)
        })
    })?;
    register(lua, &methods, "getBoundingBox", 2, 2, |lua, args| {
        let id = receiver(&args)?;
        let name = args.string(2)?;
        let exists = with_state(lua, |state| Ok(state.object(id)?.bounding_box(&name).is_some()))?;
        if exists {
            lua.create_userdata(BoundingBoxValue { object: id, id: name }).map(Value::UserData)
        } else {
            Ok(Value::Nil)
        }
    })?;

    register(lua, &methods, "getScale", 1, 1, |lua, args| {
        let id = receiver(&args)?;
        with_state(lua, |state| Ok(state.object(id)?.scale()))
    })?;
    register(lua, &methods, "setScale", 2, 2, |lua, args| {
        let scale = args.number(2)?;
        with_object(lua, receiver(&args)?, |object| {
            object.set_scale(scale);
            Ok(())
        })
    })?;

    register(lua, &methods, "getRoom", 1, 1, |lua, args| {
        let id = receiver(&args)?;
        let room = with_state(lua, |state| Ok(state.object(id)?.room()))?;
        optional_entity(lua, room, TypeName::WorldRoom)
    })?;
    register(lua, &methods, "destroy", 1, 1, |lua, args| {
        let id = receiver(&args)?;
        if with_state(lua, |state| state.destroy_object(id))? {
            bridge::forget(lua, id)?;
            tracing::debug!(tag = "overworld", object = %id, "object destroyed");
        }
        Ok(())
    })?;
    register(lua, &methods, "getContacts", 1, 1, |lua, args| {
        let id = receiver(&args)?;
        let contacts: Vec<Handle> = with_state(lua, |state| Ok(state.object(id)?.contacts().collect()))?;
        let list = lua.create_table()?;
        for (index, other) in contacts.into_iter().enumerate() {
            list.raw_set(index + 1, entity_value(lua, other, TypeName::WorldObject)?)?;
        }
        Ok(list)
    })?;
    register(lua, &methods, "interact", 2, 2, |lua, args| {
        let id = receiver(&args)?;
        args.handle(2, TypeName::WorldObject)?;
        let on_interact = with_state(lua, |state| Ok(state.object(id)?.callbacks().get(ON_INTERACT)))?;
        match on_interact {
            Some(on_interact) => on_interact.call::<MultiValue>(args.value(2)),
            None => Ok(MultiValue::new()),
        }
    })?;

    bridge::install_methods(lua, TypeName::WorldObject, methods)
}

/// Script view of one named bounding box. Resolves through the owning object on every call, so
/// a removed box or destroyed object surfaces as a stale reference.
#[derive(Debug, Clone)]
pub struct BoundingBoxValue {
    pub object: Handle,
    pub id: String,
}

impl BoundingBoxValue {
    fn stale(&self) -> EngineError {
        EngineError::StaleReference { typename: BOUNDING_BOX_TYPENAME, handle: self.object }
    }

    fn read<R>(&self, lua: &Lua, f: impl FnOnce(&BoundingShape) -> R) -> mlua::Result<R> {
        with_state(lua, |state| state.object(self.object)?.bounding_box(&self.id).map(f).ok_or_else(|| self.stale()))
    }

    fn edit<R>(&self, lua: &Lua, f: impl FnOnce(&mut BoundingShape) -> R) -> mlua::Result<R> {
        with_state(lua, |state| state.object_mut(self.object)?.edit_bounding_box(&self.id, f).ok_or_else(|| self.stale()))
    }
}

impl UserData for BoundingBoxValue {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        args::add_method(methods, "getID", 0, 0, |_, this: &Self, _| Ok(this.id.clone()));
        args::add_method(methods, "getObject", 0, 0, |lua, this: &Self, _| {
            entity_value(lua, this.object, TypeName::WorldObject)
        });
        args::add_method(methods, "getShapeType", 0, 0, |lua, this: &Self, _| this.read(lua, BoundingShape::type_code));
        args::add_method(methods, "getDimensions", 0, 0, |lua, this: &Self, _| {
            this.read(lua, |shape| pair(shape.dimensions()))
        });
        args::add_method(methods, "setDimensions", 2, 2, |lua, this: &Self, args| {
            let (width, height) = (args.number(1)?, args.number(2)?);
            let applied = this.edit(lua, |shape| shape.set_dimensions(width, height))?;
            if !applied {
                tracing::warn!(tag = "overworld", bounding_box = %this.id, "setDimensions ignored on a circle");
            }
            Ok(applied)
        });
        args::add_method(methods, "getRadius", 0, 0, |lua, this: &Self, _| this.read(lua, BoundingShape::radius));
        args::add_method(methods, "setRadius", 1, 1, |lua, this: &Self, args| {
            let radius = args.number(1)?;
            let applied = this.edit(lua, |shape| shape.set_radius(radius))?;
            if !applied {
                tracing::warn!(tag = "overworld", bounding_box = %this.id, "setRadius ignored on a rectangle");
            }
            Ok(applied)
        });
        args::add_method(methods, "getOffset", 0, 0, |lua, this: &Self, _| this.read(lua, |shape| pair(shape.offset())));
        args::add_method(methods, "setOffset", 2, 2, |lua, this: &Self, args| {
            let offset = Vec2::new(args.number(1)?, args.number(2)?);
            this.edit(lua, |shape| shape.set_offset(offset))
        });
        args::add_method(methods, "getScale", 0, 0, |lua, this: &Self, _| this.read(lua, BoundingShape::scale));
    }
}
