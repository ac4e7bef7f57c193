use mlua::{Lua, Table};

use crate::error::EngineError;
use crate::overworld::loader;
use crate::scripting::args::{register, Args};
use crate::scripting::bridge::{self, Handle, TypeName};
use crate::scripting::libs::{entity_value, id_value};
use crate::scripting::with_state;
use crate::ui;

fn component(args: &Args, position: usize) -> Result<Handle, EngineError> {
    args.handle(position, TypeName::UiComponent)
}

fn stale(handle: Handle) -> EngineError {
    EngineError::StaleReference { typename: TypeName::UiComponent.as_str(), handle }
}

pub fn module(lua: &Lua) -> mlua::Result<Table> {
    let module = lua.create_table()?;
    register(lua, &module, "newComponent", 1, usize::MAX, |lua, args| {
        let name = args.string(1)?;
        let id = loader::new_ui_component(lua, &name, args.rest(2))?;
        entity_value(lua, id, TypeName::UiComponent)
    })?;
    register(lua, &module, "register", 1, 1, |lua, args| {
        let id = component(&args, 1)?;
        with_state(lua, |state| if state.ui.set_registered(id, true) { Ok(()) } else { Err(stale(id)) })
    })?;
    register(lua, &module, "remove", 1, 1, |lua, args| {
        let id = component(&args, 1)?;
        with_state(lua, |state| Ok(state.ui.set_registered(id, false)))
    })?;
    register(lua, &module, "getComponents", 0, 0, |lua, _| {
        let ids = with_state(lua, |state| Ok(state.ui.stack()))?;
        let list = lua.create_table()?;
        for (index, id) in ids.into_iter().enumerate() {
            list.raw_set(index + 1, entity_value(lua, id, TypeName::UiComponent)?)?;
        }
        Ok(list)
    })?;
    Ok(module)
}

/// Methods behind `tailor-uicomp` values.
pub fn install(lua: &Lua) -> mlua::Result<()> {
    let methods = lua.create_table()?;
    register(lua, &methods, "getID", 1, 1, |_, args| Ok(id_value(component(&args, 1)?)))?;
    register(lua, &methods, "getComponentName", 1, 1, |lua, args| {
        let id = component(&args, 1)?;
        with_state(lua, |state| state.ui.get(id).map(|c| c.name().to_string()).ok_or_else(|| stale(id)))
    })?;
    register(lua, &methods, "getZ", 1, 1, |lua, args| {
        let id = component(&args, 1)?;
        with_state(lua, |state| state.ui.get(id).map(|c| c.z()).ok_or_else(|| stale(id)))
    })?;
    register(lua, &methods, "setZ", 2, 2, |lua, args| {
        let id = component(&args, 1)?;
        let z = args.integer(2)?.clamp(i32::MIN as i64, i32::MAX as i64) as i32;
        with_state(lua, |state| state.ui.get_mut(id).map(|c| c.set_z(z)).ok_or_else(|| stale(id)))
    })?;
    register(lua, &methods, "isVisible", 1, 1, |lua, args| {
        let id = component(&args, 1)?;
        with_state(lua, |state| state.ui.get(id).map(|c| c.is_visible()).ok_or_else(|| stale(id)))
    })?;
    register(lua, &methods, "setVisible", 2, 2, |lua, args| {
        let id = component(&args, 1)?;
        let visible = args.boolean(2)?;
        with_state(lua, |state| state.ui.get_mut(id).map(|c| c.set_visible(visible)).ok_or_else(|| stale(id)))
    })?;
    register(lua, &methods, "isRegistered", 1, 1, |lua, args| {
        let id = component(&args, 1)?;
        with_state(lua, |state| state.ui.get(id).map(|c| c.is_registered()).ok_or_else(|| stale(id)))
    })?;
    register(lua, &methods, "destroy", 1, 1, |lua, args| ui::destroy(lua, component(&args, 1)?))?;
    bridge::install_methods(lua, TypeName::UiComponent, methods)
}
