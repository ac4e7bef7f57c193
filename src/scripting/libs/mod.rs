//! Engine libraries registered as Lua globals, plus the method tables behind entity values.

pub mod animation;
pub mod input;
pub mod log;
pub mod overworld;
pub mod scheduler;
pub mod ui;
pub mod world_object;
pub mod world_room;

use mlua::{Lua, Value};

use crate::scripting::bridge::{self, Handle, TypeName};

pub fn register_all(lua: &Lua) -> mlua::Result<()> {
    let globals = lua.globals();
    globals.set("overworld", overworld::module(lua)?)?;
    globals.set("ui", ui::module(lua)?)?;
    globals.set("scheduler", scheduler::module(lua)?)?;
    globals.set("animation", animation::module(lua)?)?;
    globals.set("input", input::module(lua)?)?;
    globals.set("log", log::module(lua)?)?;
    world_object::install(lua)?;
    world_room::install(lua)?;
    ui::install(lua)?;
    Ok(())
}

pub(crate) fn entity_value(lua: &Lua, handle: Handle, typename: TypeName) -> mlua::Result<Value> {
    bridge::of(lua, handle, typename).map(Value::UserData)
}

pub(crate) fn optional_entity(lua: &Lua, handle: Option<Handle>, typename: TypeName) -> mlua::Result<Value> {
    match handle {
        Some(handle) => entity_value(lua, handle, typename),
        None => Ok(Value::Nil),
    }
}

pub(crate) fn id_value(handle: Handle) -> i64 {
    handle.raw() as i64
}
