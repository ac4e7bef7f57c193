use glam::Vec2;
use mlua::{Lua, UserData, UserDataMethods, Value};

use crate::error::EngineError;
use crate::overworld::room::Entrypoint;
use crate::scripting::args::{self, multi, register, Args};
use crate::scripting::bridge::{self, Handle, TypeName};
use crate::scripting::libs::{entity_value, id_value};
use crate::scripting::with_state;

fn receiver(args: &Args) -> Result<Handle, EngineError> {
    args.handle(1, TypeName::WorldRoom)
}

fn layer(args: &Args, position: usize) -> Result<u8, EngineError> {
    let layer = args.integer(position)?;
    u8::try_from(layer)
        .ok()
        .filter(|layer| *layer <= 15)
        .ok_or_else(|| args.bad(position, format!("collision layer must be 0-15, got {layer}")))
}

pub fn install(lua: &Lua) -> mlua::Result<()> {
    let methods = lua.create_table()?;

    register(lua, &methods, "getID", 1, 1, |_, args| Ok(id_value(receiver(&args)?)))?;
    register(lua, &methods, "getRoomName", 1, 1, |lua, args| {
        let id = receiver(&args)?;
        with_state(lua, |state| Ok(state.room(id)?.name().to_string()))
    })?;
    register(lua, &methods, "isPaused", 1, 1, |lua, args| {
        let id = receiver(&args)?;
        with_state(lua, |state| Ok(state.room(id)?.is_paused()))
    })?;

    register(lua, &methods, "registerObject", 2, 2, |lua, args| {
        let room = receiver(&args)?;
        let object = args.handle(2, TypeName::WorldObject)?;
        with_state(lua, |state| state.adopt_object(room, object))
    })?;
    register(lua, &methods, "removeObject", 2, 2, |lua, args| {
        let room = receiver(&args)?;
        let object = args.handle(2, TypeName::WorldObject)?;
        with_state(lua, |state| state.release_object(room, object))
    })?;
    register(lua, &methods, "getObject", 2, 2, |lua, args| {
        let room = receiver(&args)?;
        let object = Handle::from_raw(args.integer(2)?.max(0) as u64);
        if with_state(lua, |state| Ok(state.room(room)?.contains(object)))? {
            entity_value(lua, object, TypeName::WorldObject)
        } else {
            Ok(Value::Nil)
        }
    })?;
    register(lua, &methods, "getObjects", 1, 1, |lua, args| {
        let room = receiver(&args)?;
        let ids = with_state(lua, |state| Ok(state.room(room)?.object_ids()))?;
        let list = lua.create_table()?;
        for (index, id) in ids.into_iter().enumerate() {
            list.raw_set(index + 1, entity_value(lua, id, TypeName::WorldObject)?)?;
        }
        Ok(list)
    })?;

    register(lua, &methods, "getEntrypoint", 2, 2, |lua, args| {
        let room = receiver(&args)?;
        let name = args.string(2)?;
        let entrypoint = with_state(lua, |state| Ok(state.room(room)?.entrypoint(&name).cloned()))?;
        entrypoint_value(lua, entrypoint)
    })?;
    register(lua, &methods, "registerEntrypoint", 4, 6, |lua, args| {
        let room = receiver(&args)?;
        let entrypoint = Entrypoint {
            name: args.string(2)?,
            position: Vec2::new(args.number(3)?, args.number(4)?),
            target_room: args.opt_string(5)?,
            orientation: args.opt_number(6)?,
        };
        with_state(lua, |state| {
            state.room_mut(room)?.register_entrypoint(entrypoint);
            Ok(())
        })
    })?;

    register(lua, &methods, "setCollisionLayerEnabled", 4, 4, |lua, args| {
        let room = receiver(&args)?;
        let (a, b) = (layer(&args, 2)?, layer(&args, 3)?);
        let enabled = args.boolean(4)?;
        with_state(lua, |state| {
            state.room_mut(room)?.layers_mut().set(a, b, enabled);
            Ok(())
        })
    })?;
    register(lua, &methods, "isCollisionLayerEnabled", 3, 3, |lua, args| {
        let room = receiver(&args)?;
        let (a, b) = (layer(&args, 2)?, layer(&args, 3)?);
        with_state(lua, |state| Ok(state.room(room)?.layers().allows(a, b)))
    })?;

    bridge::install_methods(lua, TypeName::WorldRoom, methods)
}

/// Copy of a room entrypoint handed to scripts.
#[derive(Debug, Clone)]
pub struct EntrypointValue(pub Entrypoint);

impl UserData for EntrypointValue {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        args::add_method(methods, "getName", 0, 0, |_, this: &Self, _| Ok(this.0.name.clone()));
        args::add_method(methods, "getPosition", 0, 0, |_, this: &Self, _| {
            Ok(multi(vec![Value::Number(this.0.position.x as f64), Value::Number(this.0.position.y as f64)]))
        });
        args::add_method(methods, "getOrientation", 0, 0, |_, this: &Self, _| Ok(this.0.orientation));
        args::add_method(methods, "getTargetRoom", 0, 0, |_, this: &Self, _| Ok(this.0.target_room.clone()));
    }
}

pub fn entrypoint_value(lua: &Lua, entrypoint: Option<Entrypoint>) -> mlua::Result<Value> {
    match entrypoint {
        Some(entrypoint) => lua.create_userdata(EntrypointValue(entrypoint)).map(Value::UserData),
        None => Ok(Value::Nil),
    }
}
