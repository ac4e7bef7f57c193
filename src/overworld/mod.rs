//! The in-world simulation: rooms, their objects, and the controller that moves between rooms.

pub mod bounds;
pub mod controller;
pub mod loader;
pub mod object;
pub mod physics;
pub mod room;

use glam::Vec2;
use mlua::{Function, Lua, Value};

pub use controller::{OverworldController, PendingSwap, TransitionPhase, TransitionPlan};
pub use object::WorldObject;
pub use room::WorldRoom;

use crate::error::EngineError;
use crate::render::{RenderLayer, RenderSink};
use crate::scheduler::{Task, TaskHook};
use crate::scripting::bridge::{self, Handle, TypeName};
use crate::scripting::implementable::{ON_COLLIDE, ON_ENTER, ON_EXIT, ON_PAUSE, ON_PERSIST, ON_RENDER, ON_RESUME, PROCESS};
use crate::scripting::libs::world_room::entrypoint_value;
use crate::scripting::{invoke_logged, log_engine_error, with_engine};
use object::ObjectFlags;
use room::Entrypoint;

/// One overworld tick: room `process`, physics step, collision dispatch, object `process`,
/// deferred removals, camera fixing. Removals and camera fixing run even while the current
/// room is paused or processing is off.
pub fn process(lua: &Lua, delta: f32, input: &Value) {
    step_current_room(lua, delta, input);
    flush_removals(lua);
    fix_camera(lua);
}

fn step_current_room(lua: &Lua, delta: f32, input: &Value) {
    let found = with_engine(lua, |state| {
        let overworld = &state.overworld;
        if !overworld.is_processing() {
            return Ok(None);
        }
        let Some(room_id) = overworld.current_room() else {
            return Ok(None);
        };
        let room = state.room(room_id)?;
        if room.is_paused() {
            return Ok(None);
        }
        Ok(Some((room_id, room.name().to_string(), room.callbacks().get(PROCESS))))
    });
    let (room_id, room_name, room_process) = match found {
        Ok(Some(found)) => found,
        Ok(None) => return,
        Err(err) => return log_engine_error("overworld", &err),
    };

    if let Some(room_process) = room_process {
        invoke_logged::<()>(&room_name, PROCESS, &room_process, (delta, input.clone()));
    }
    if !still_current(lua, room_id) {
        return;
    }

    let dispatch = with_engine(lua, |state| {
        let alive = state.object_ids();
        let room = state.room_mut(room_id)?;
        let events = room.step(delta);
        room.purge_ignored(|id| alive.contains(&id));
        let mut calls = Vec::new();
        for event in events {
            tracing::trace!(tag = "room", room = %room.name(), "{event}");
            calls.extend(room.resolve_contact(event));
        }
        Ok(calls)
    });
    let dispatch = match dispatch {
        Ok(dispatch) => dispatch,
        Err(err) => return log_engine_error("overworld", &err),
    };
    for call in dispatch {
        let found = with_engine(lua, |state| {
            let room = state.room(room_id)?;
            if room.is_pending_removal(call.receiver) || room.is_pending_removal(call.other) {
                return Ok(None);
            }
            Ok(room
                .object(call.receiver)
                .and_then(|object| object.callbacks().get(ON_COLLIDE).map(|f| (object.name().to_string(), f))))
        });
        if let Ok(Some((name, on_collide))) = found {
            match bridge::of(lua, call.other, TypeName::WorldObject) {
                Ok(other) => {
                    invoke_logged::<()>(&name, ON_COLLIDE, &on_collide, other);
                }
                Err(err) => tracing::error!(tag = "overworld", "{err}"),
            }
        }
    }

    let ids = match with_engine(lua, |state| Ok(state.room(room_id)?.object_ids())) {
        Ok(ids) => ids,
        Err(err) => return log_engine_error("overworld", &err),
    };
    for id in ids {
        let found = with_engine(lua, |state| {
            let room = state.room_mut(room_id)?;
            if room.is_pending_removal(id) {
                return Ok(None);
            }
            let Some(mut object) = room.object_mut(id) else {
                return Ok(None);
            };
            object.reconcile_collision();
            let object = object.object();
            if object.is_paused() {
                return Ok(None);
            }
            Ok(object.callbacks().get(PROCESS).map(|f| (object.name().to_string(), f)))
        });
        if let Ok(Some((name, object_process))) = found {
            invoke_logged::<()>(&name, PROCESS, &object_process, (delta, input.clone()));
        }
    }
}

fn fix_camera(lua: &Lua) {
    if let Err(err) = with_engine(lua, |state| {
        if !state.overworld.is_camera_fixing() {
            return Ok(());
        }
        let Some(character) = state.overworld.character() else {
            return Ok(());
        };
        if let Ok(object) = state.object_mut(character) {
            let position = object.position();
            state.overworld.camera.position = position;
        }
        Ok(())
    }) {
        log_engine_error("overworld", &err);
    }
}

fn still_current(lua: &Lua, room: Handle) -> bool {
    with_engine(lua, |state| Ok(state.overworld.current_room() == Some(room) && !state.room(room)?.is_paused()))
        .unwrap_or(false)
}

/// Releases every object destroyed during the tick and drops its script value.
fn flush_removals(lua: &Lua) {
    let removed = with_engine(lua, |state| {
        let mut removed = Vec::new();
        for room in state.rooms.values_mut() {
            removed.extend(room.flush_removals().into_iter().map(|object| object.id()));
        }
        if let Some(character) = state.overworld.character() {
            if removed.contains(&character) {
                state.overworld.set_character(None);
            }
        }
        Ok(removed)
    });
    match removed {
        Ok(removed) => {
            for id in removed {
                tracing::debug!(tag = "overworld", object = %id, "object destroyed");
                if let Err(err) = bridge::forget(lua, id) {
                    tracing::error!(tag = "overworld", "{err}");
                }
            }
        }
        Err(err) => log_engine_error("overworld", &err),
    }
}

/// Draws the current room: objects in ascending (z, priority), each one's `onRender` first,
/// then its animation slots when visible, then hitboxes when the overlay is on.
pub fn render(lua: &Lua, sink: &mut dyn RenderSink) {
    let found = with_engine(lua, |state| {
        let overworld = &state.overworld;
        if !overworld.is_rendering() {
            return Ok(None);
        }
        let Some(room_id) = overworld.current_room() else {
            return Ok(None);
        };
        let mut order: Vec<(i32, i32, Handle)> =
            state.room(room_id)?.objects().map(|object| (object.z(), object.priority(), object.id())).collect();
        order.sort();
        let camera = (overworld.camera.position, overworld.camera.zoom());
        Ok(Some((room_id, order, camera)))
    });
    let (room_id, order, (camera, zoom)) = match found {
        Ok(Some(found)) => found,
        Ok(None) => return,
        Err(err) => return log_engine_error("overworld", &err),
    };
    sink.begin_layer(RenderLayer::Overworld, camera, zoom);

    for (_, _, id) in order {
        let on_render = with_engine(lua, |state| {
            Ok(state
                .room(room_id)?
                .object(id)
                .and_then(|object| object.callbacks().get(ON_RENDER).map(|f| (object.name().to_string(), f))))
        });
        if let Ok(Some((name, on_render))) = on_render {
            invoke_logged::<()>(&name, ON_RENDER, &on_render, ());
        }

        let drawn = with_engine(lua, |state| {
            let clock = state.clock;
            let hitboxes = state.overworld.is_rendering_hitboxes();
            let Some(view) = state.room_mut(room_id)?.object_mut(id) else {
                return Ok(());
            };
            let (position, angle) = (view.position(), view.rotation());
            let object = view.object();
            if object.is_visible() {
                let anchor = position + Vec2::new(0.0, object.height());
                for (_, animation) in object.animations() {
                    sink.draw_animation(animation, animation.frame_at(clock), anchor, object.scale(), angle.to_degrees());
                }
            }
            if hitboxes {
                for (_, shape) in object.bounding_boxes() {
                    let offset = Vec2::from_angle(angle).rotate(shape.scaled_offset());
                    sink.draw_hitbox(shape.scaled_kind(), position + offset, angle.to_degrees());
                }
            }
            Ok(())
        });
        if let Err(err) = drawn {
            log_engine_error("overworld", &err);
        }
    }
}

/// Requests a room change. With transitions on and an exit task set, the current room pauses and
/// the swap waits for the task; otherwise the swap happens before this returns.
pub fn set_current_room(
    lua: &Lua,
    room: Handle,
    transitions: bool,
    exitpoint: Option<String>,
    entrypoint: Option<String>,
) -> Result<(), EngineError> {
    let plan = with_engine(lua, |state| {
        state.room(room)?;
        state.overworld.begin(PendingSwap { target: room, exitpoint, entrypoint, transitions })
    })?;
    match plan {
        TransitionPlan::Exit { task, from } => {
            tracing::debug!(tag = "overworld", from = %from, to = %room, "exit transition started");
            pause_room(lua, from);
            with_engine(lua, |state| {
                let id = state.allocate_handle();
                state.scheduler.push(Task::new(id, task, Some(TaskHook::ExitTransition)));
                Ok(())
            })
        }
        TransitionPlan::Swap(swap) => swap_rooms(lua, swap),
    }
}

fn swap_rooms(lua: &Lua, swap: PendingSwap) -> Result<(), EngineError> {
    let result = perform_swap(lua, &swap);
    if result.is_err() {
        let _ = with_engine(lua, |state| {
            state.overworld.abort();
            Ok(())
        });
    }
    result
}

fn perform_swap(lua: &Lua, swap: &PendingSwap) -> Result<(), EngineError> {
    let target = swap.target;
    let (previous, exit) = with_engine(lua, |state| {
        state.room(target)?;
        let previous = state.overworld.current_room().filter(|previous| *previous != target);
        let exit = match previous {
            Some(previous) => {
                let room = state.room(previous)?;
                let exitpoint = swap.exitpoint.as_deref().and_then(|name| room.entrypoint(name)).cloned();
                Some((room.name().to_string(), room.callbacks().get(ON_EXIT), exitpoint))
            }
            None => None,
        };
        Ok((previous, exit))
    })?;

    if let Some((name, Some(on_exit), exitpoint)) = exit {
        call_with_entrypoint(lua, &name, ON_EXIT, &on_exit, exitpoint);
    }

    let (moved, entry, room_name, on_enter) = with_engine(lua, |state| {
        let entry = swap.entrypoint.as_deref().and_then(|name| state.room(target).ok()?.entrypoint(name)).cloned();
        if let (Some(name), None) = (&swap.entrypoint, &entry) {
            tracing::warn!(tag = "overworld", room = %target, entrypoint = %name, "entrypoint not found");
        }
        let persisting: Vec<Handle> = match previous {
            Some(previous) => {
                let room = state.room(previous)?;
                room.objects()
                    .filter(|object| object.persists() && !room.is_pending_removal(object.id()))
                    .map(WorldObject::id)
                    .collect()
            }
            None => Vec::new(),
        };
        for id in &persisting {
            let mut object = state.take_object(*id)?;
            {
                let mut view = object.with_physics(None);
                if let Some(entry) = &entry {
                    view.set_position(entry.position);
                    if let Some(orientation) = entry.orientation {
                        view.set_rotation(orientation.to_radians());
                    }
                }
            }
            state.room_mut(target)?.adopt(object);
        }

        state.overworld.set_current(target);
        if let Some(entry) = &entry {
            state.overworld.camera.position = entry.position;
        }
        let room = state.room(target)?;
        Ok((persisting, entry, room.name().to_string(), room.callbacks().get(ON_ENTER)))
    })?;
    tracing::info!(tag = "overworld", room = %room_name, persisted = moved.len(), "entered room");

    if !moved.is_empty() {
        let room_value = bridge::of(lua, target, TypeName::WorldRoom).map_err(|err| EngineError::script_runtime(&room_name, &err))?;
        for id in moved {
            let found = with_engine(lua, |state| {
                let object = state.object(id)?;
                Ok(object.callbacks().get(ON_PERSIST).map(|f| (object.name().to_string(), f)))
            });
            if let Ok(Some((name, on_persist))) = found {
                match entrypoint_value(lua, entry.clone()) {
                    Ok(entry) => {
                        invoke_logged::<()>(&name, ON_PERSIST, &on_persist, (room_value.clone(), entry));
                    }
                    Err(err) => tracing::error!(tag = "overworld", "{err}"),
                }
            }
        }
    }

    if let Some(on_enter) = on_enter {
        call_with_entrypoint(lua, &room_name, ON_ENTER, &on_enter, entry);
    }

    let entry_task = with_engine(lua, |state| Ok(state.overworld.after_swap(swap.transitions)))?;
    match entry_task {
        Some(task) => {
            pause_room(lua, target);
            with_engine(lua, |state| {
                let id = state.allocate_handle();
                state.scheduler.push(Task::new(id, task, Some(TaskHook::EntryTransition)));
                Ok(())
            })
        }
        None => {
            resume_room(lua, target);
            Ok(())
        }
    }
}

fn call_with_entrypoint(lua: &Lua, owner: &str, hook: &'static str, function: &Function, entry: Option<Entrypoint>) {
    match entrypoint_value(lua, entry) {
        Ok(entry) => {
            invoke_logged::<()>(owner, hook, function, entry);
        }
        Err(err) => tracing::error!(tag = "overworld", "{err}"),
    }
}

/// Pauses a room and its objects. `onPause` only fires on objects that were running.
pub fn pause_room(lua: &Lua, room: Handle) {
    set_room_paused(lua, room, true);
}

pub fn resume_room(lua: &Lua, room: Handle) {
    set_room_paused(lua, room, false);
}

fn set_room_paused(lua: &Lua, room_id: Handle, paused: bool) {
    let hook = if paused { ON_PAUSE } else { ON_RESUME };
    let calls = with_engine(lua, |state| {
        let room = state.room_mut(room_id)?;
        let mut calls = Vec::new();
        if room.is_paused() != paused {
            room.set_paused(paused);
            if let Some(f) = room.callbacks().get(hook) {
                calls.push((room.name().to_string(), f));
            }
        }
        for id in room.object_ids() {
            let Some(mut view) = room.object_mut(id) else {
                continue;
            };
            let object = view.object_mut();
            if object.is_paused() == paused {
                continue;
            }
            object.set_flag(ObjectFlags::PAUSED, paused);
            if let Some(f) = object.callbacks().get(hook) {
                calls.push((object.name().to_string(), f));
            }
        }
        Ok(calls)
    });
    match calls {
        Ok(calls) => {
            for (name, f) in calls {
                invoke_logged::<()>(&name, hook, &f, ());
            }
        }
        Err(err) => log_engine_error("overworld", &err),
    }
}

/// Scheduler continuation for a finished exit task.
pub fn finish_exit_transition(lua: &Lua) {
    let pending = match with_engine(lua, |state| Ok(state.overworld.finish_exit())) {
        Ok(pending) => pending,
        Err(err) => return log_engine_error("overworld", &err),
    };
    if let Some(swap) = pending {
        if let Err(err) = swap_rooms(lua, swap) {
            log_engine_error("overworld", &err);
        }
    }
}

/// Scheduler continuation for a finished entry task.
pub fn finish_entry_transition(lua: &Lua) {
    let room = with_engine(lua, |state| {
        Ok(if state.overworld.finish_entry() { state.overworld.current_room() } else { None })
    });
    match room {
        Ok(Some(room)) => resume_room(lua, room),
        Ok(None) => {}
        Err(err) => log_engine_error("overworld", &err),
    }
}
