use mlua::{Lua, Table, Value};

use crate::overworld::{self, loader, OverworldController, TransitionPhase};
use crate::scripting::args::{multi, register};
use crate::scripting::bridge::{self, Handle, TypeName};
use crate::scripting::libs::{entity_value, id_value, optional_entity};
use crate::scripting::with_state;

fn toggle(
    lua: &Lua,
    module: &Table,
    getter: &'static str,
    setter: &'static str,
    get: fn(&OverworldController) -> bool,
    set: fn(&mut OverworldController, bool),
) -> mlua::Result<()> {
    register(lua, module, getter, 0, 0, move |lua, _| with_state(lua, |state| Ok(get(&state.overworld))))?;
    register(lua, module, setter, 1, 1, move |lua, args| {
        let value = args.boolean(1)?;
        with_state(lua, |state| {
            set(&mut state.overworld, value);
            Ok(())
        })
    })
}

pub fn module(lua: &Lua) -> mlua::Result<Table> {
    let module = lua.create_table()?;

    register(lua, &module, "newWorldRoom", 1, 1, |lua, args| {
        let id = loader::new_world_room(lua, &args.string(1)?)?;
        entity_value(lua, id, TypeName::WorldRoom)
    })?;
    register(lua, &module, "newWorldObject", 1, usize::MAX, |lua, args| {
        let id = loader::new_world_object(lua, &args.string(1)?, args.rest(2))?;
        entity_value(lua, id, TypeName::WorldObject)
    })?;

    toggle(lua, &module, "isRendering", "setRendering", OverworldController::is_rendering, OverworldController::set_rendering)?;
    toggle(lua, &module, "isProcessing", "setProcessing", OverworldController::is_processing, OverworldController::set_processing)?;
    toggle(
        lua,
        &module,
        "isRenderingHitboxes",
        "setRenderingHitboxes",
        OverworldController::is_rendering_hitboxes,
        OverworldController::set_rendering_hitboxes,
    )?;
    toggle(
        lua,
        &module,
        "isCameraFixing",
        "setCameraFixing",
        OverworldController::is_camera_fixing,
        OverworldController::set_camera_fixing,
    )?;

    register(lua, &module, "getCameraPosition", 0, 0, |lua, _| {
        let position = with_state(lua, |state| Ok(state.overworld.camera.position))?;
        Ok(multi(vec![Value::Number(position.x as f64), Value::Number(position.y as f64)]))
    })?;
    register(lua, &module, "setCameraPosition", 0, 2, |lua, args| {
        let (x, y) = (args.opt_number(1)?, args.opt_number(2)?);
        with_state(lua, |state| {
            state.overworld.camera.set_position(x, y);
            Ok(())
        })
    })?;
    register(lua, &module, "getCameraZoom", 0, 0, |lua, _| with_state(lua, |state| Ok(state.overworld.camera.zoom())))?;
    register(lua, &module, "setCameraZoom", 1, 1, |lua, args| {
        let zoom = args.number(1)?;
        with_state(lua, |state| {
            state.overworld.camera.set_zoom(zoom);
            Ok(())
        })
    })?;

    register(lua, &module, "getCurrentRoom", 0, 0, |lua, _| {
        let room = with_state(lua, |state| Ok(state.overworld.current_room()))?;
        optional_entity(lua, room, TypeName::WorldRoom)
    })?;
    register(lua, &module, "setCurrentRoom", 1, 4, |lua, args| {
        let room = args.handle(1, TypeName::WorldRoom)?;
        let transitions = args.opt_boolean(2)?.unwrap_or(true);
        let exitpoint = args.opt_string(3)?;
        let entrypoint = args.opt_string(4)?;
        overworld::set_current_room(lua, room, transitions, exitpoint, entrypoint)?;
        Ok(())
    })?;
    register(lua, &module, "isTransitioning", 0, 0, |lua, _| {
        with_state(lua, |state| Ok(state.overworld.phase() != TransitionPhase::Stable))
    })?;

    register(lua, &module, "getCharacterID", 0, 0, |lua, _| {
        with_state(lua, |state| Ok(state.overworld.character().map(id_value)))
    })?;
    register(lua, &module, "setCharacterID", 1, 1, |lua, args| {
        let character = match args.value(1) {
            Value::Nil => None,
            Value::UserData(_) => Some(bridge::check(&args.value(1), TypeName::WorldObject)?),
            _ => Some(Handle::from_raw(args.integer(1)?.max(0) as u64)),
        };
        with_state(lua, |state| {
            state.overworld.set_character(character);
            Ok(())
        })
    })?;

    register(lua, &module, "setEntryTransition", 1, 1, |lua, args| {
        let task = args.opt_table(1)?;
        with_state(lua, |state| {
            state.overworld.set_entry_transition(task);
            Ok(())
        })
    })?;
    register(lua, &module, "setExitTransition", 1, 1, |lua, args| {
        let task = args.opt_table(1)?;
        with_state(lua, |state| {
            state.overworld.set_exit_transition(task);
            Ok(())
        })
    })?;

    Ok(module)
}
