//! Builds scripted entities from catalog entries: load the script against its implementable,
//! register the entity, expose it to Lua, then run `create`.

use mlua::{AnyUserData, Function, Lua, MultiValue, Value};

use crate::catalog::ScriptSource;
use crate::environment::EnvironmentState;
use crate::error::EngineError;
use crate::overworld::{WorldObject, WorldRoom};
use crate::scripting::bridge::{self, Handle, TypeName};
use crate::scripting::implementable::{CallbackTable, CREATE, UI_COMPONENT, WORLD_OBJECT, WORLD_ROOM};
use crate::scripting::with_engine;
use crate::ui::UiComponent;

pub fn new_world_object(lua: &Lua, name: &str, args: Vec<Value>) -> Result<Handle, EngineError> {
    let (source, id) = with_engine(lua, |state| Ok((state.catalogs.objects.get(name)?.clone(), state.allocate_handle())))?;
    let callbacks = WORLD_OBJECT.load(lua, &source)?;
    let create = callbacks.get(CREATE);
    let seeded = callbacks.entries();
    with_engine(lua, |state| {
        state.loose_objects.insert(id, WorldObject::new(id, source.stem(), callbacks));
        Ok(())
    })?;
    finish(lua, &source, id, TypeName::WorldObject, &seeded, create, args, |state| {
        let _ = state.take_object(id);
    })?;
    tracing::debug!(tag = "loader", script = %source.name(), id = %id, "world object created");
    Ok(id)
}

pub fn new_world_room(lua: &Lua, name: &str) -> Result<Handle, EngineError> {
    let (source, data, physics, id) = with_engine(lua, |state| {
        let source = state.catalogs.rooms.scripts().get(name)?.clone();
        let data = state.catalogs.rooms.data(name);
        Ok((source, data, state.config.physics.clone(), state.allocate_handle()))
    })?;
    let callbacks = WORLD_ROOM.load(lua, &source)?;
    let create = callbacks.get(CREATE);
    let seeded = callbacks.entries();
    with_engine(lua, |state| {
        state.rooms.insert(id, WorldRoom::new(id, source.name(), data, &physics, callbacks));
        Ok(())
    })?;
    finish(lua, &source, id, TypeName::WorldRoom, &seeded, create, Vec::new(), |state| {
        if let Some(mut room) = state.rooms.remove(&id) {
            room.drain_objects();
        }
    })?;
    tracing::debug!(tag = "loader", script = %source.name(), id = %id, "world room created");
    Ok(id)
}

pub fn new_ui_component(lua: &Lua, name: &str, args: Vec<Value>) -> Result<Handle, EngineError> {
    let (source, id) = with_engine(lua, |state| Ok((state.catalogs.ui.get(name)?.clone(), state.allocate_handle())))?;
    let callbacks: CallbackTable = UI_COMPONENT.load(lua, &source)?;
    let create = callbacks.get(CREATE);
    let seeded = callbacks.entries();
    with_engine(lua, |state| {
        state.ui.insert(UiComponent::new(id, source.stem(), callbacks));
        Ok(())
    })?;
    finish(lua, &source, id, TypeName::UiComponent, &seeded, create, args, |state| {
        state.ui.remove(id);
    })?;
    tracing::debug!(tag = "loader", script = %source.name(), id = %id, "ui component created");
    Ok(id)
}

/// Exposes the entity and runs `create(value, ...)`. On failure the entity is discarded with
/// `discard` and the error comes back as a script-runtime error.
#[allow(clippy::too_many_arguments)]
fn finish(
    lua: &Lua,
    source: &ScriptSource,
    id: Handle,
    typename: TypeName,
    seeded: &[(&'static str, Function)],
    create: Option<Function>,
    args: Vec<Value>,
    discard: impl FnOnce(&mut EnvironmentState),
) -> Result<(), EngineError> {
    let runtime = |err: mlua::Error| EngineError::ScriptRuntime { script: source.name().to_string(), message: err.to_string() };
    let result = expose(lua, id, typename, seeded).map_err(runtime).and_then(|value| {
        let Some(create) = create else {
            return Ok(());
        };
        let mut call = vec![Value::UserData(value)];
        call.extend(args);
        create.call::<()>(MultiValue::from_vec(call)).map_err(runtime)
    });
    if let Err(err) = result {
        let _ = with_engine(lua, |state| {
            discard(state);
            Ok(())
        });
        let _ = bridge::forget(lua, id);
        tracing::error!(tag = "loader", script = %source.name(), "{err}");
        return Err(err);
    }
    Ok(())
}

fn expose(lua: &Lua, id: Handle, typename: TypeName, seeded: &[(&'static str, Function)]) -> mlua::Result<AnyUserData> {
    let value = bridge::of(lua, id, typename)?;
    bridge::seed_fields(&value, seeded)?;
    Ok(value)
}
