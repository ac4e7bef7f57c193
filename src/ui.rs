use std::collections::BTreeMap;

use mlua::{Lua, Value};

use crate::render::{RenderLayer, RenderSink};
use crate::scripting::bridge::{self, Handle};
use crate::scripting::implementable::{CallbackTable, ON_DESTROY, PROCESS, RENDER};
use crate::scripting::{invoke_logged, log_engine_error, with_engine};

#[derive(Debug)]
pub struct UiComponent {
    id: Handle,
    name: String,
    z: i32,
    visible: bool,
    registered: bool,
    callbacks: CallbackTable,
}

impl UiComponent {
    pub fn new(id: Handle, name: impl Into<String>, callbacks: CallbackTable) -> Self {
        Self { id, name: name.into(), z: 0, visible: true, registered: false, callbacks }
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

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    pub fn callbacks(&self) -> &CallbackTable {
        &self.callbacks
    }

    pub fn callbacks_mut(&mut self) -> &mut CallbackTable {
        &mut self.callbacks
    }
}

/// Every live UI component. Only registered components take part in the tick and render passes.
#[derive(Debug, Default)]
pub struct UiController {
    components: BTreeMap<Handle, UiComponent>,
}

impl UiController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, component: UiComponent) {
        self.components.insert(component.id, component);
    }

    pub fn get(&self, id: Handle) -> Option<&UiComponent> {
        self.components.get(&id)
    }

    pub fn get_mut(&mut self, id: Handle) -> Option<&mut UiComponent> {
        self.components.get_mut(&id)
    }

    pub fn remove(&mut self, id: Handle) -> Option<UiComponent> {
        self.components.remove(&id)
    }

    pub fn set_registered(&mut self, id: Handle, registered: bool) -> bool {
        match self.components.get_mut(&id) {
            Some(component) => {
                component.registered = registered;
                true
            }
            None => false,
        }
    }

    /// Registered component ids sorted by ascending z. Ties keep creation order.
    pub fn stack(&self) -> Vec<Handle> {
        let mut ids: Vec<(i32, Handle)> = self
            .components
            .values()
            .filter(|component| component.registered)
            .map(|component| (component.z, component.id))
            .collect();
        ids.sort();
        ids.into_iter().map(|(_, id)| id).collect()
    }

    pub fn drain(&mut self) -> Vec<UiComponent> {
        std::mem::take(&mut self.components).into_values().collect()
    }
}

/// Delivers input from the top of the stack down. Once a component returns true, the ones
/// below it see `blank` instead of `input`.
pub fn process(lua: &Lua, delta: f32, input: &Value, blank: &Value) {
    let order = match with_engine(lua, |state| Ok(state.ui.stack())) {
        Ok(mut order) => {
            order.reverse();
            order
        }
        Err(err) => return log_engine_error("ui", &err),
    };

    let mut consumed = false;
    for id in order {
        let found = with_engine(lua, |state| {
            Ok(state
                .ui
                .get(id)
                .filter(|component| component.registered)
                .map(|component| (component.name.clone(), component.callbacks.get(PROCESS))))
        });
        let (name, process) = match found {
            Ok(Some((name, Some(process)))) => (name, process),
            Ok(_) => continue,
            Err(err) => {
                log_engine_error("ui", &err);
                continue;
            }
        };
        let delivered = if consumed { blank.clone() } else { input.clone() };
        if let Some(result) = invoke_logged::<Value>(&name, PROCESS, &process, (delta, delivered)) {
            if matches!(result, Value::Boolean(true)) {
                consumed = true;
            }
        }
    }
}

pub fn render(lua: &Lua, sink: &mut dyn RenderSink) {
    let (order, camera, zoom) = match with_engine(lua, |state| {
        Ok((state.ui.stack(), state.overworld.camera.position, state.overworld.camera.zoom()))
    }) {
        Ok(found) => found,
        Err(err) => return log_engine_error("ui", &err),
    };
    sink.begin_layer(RenderLayer::Ui, camera, zoom);
    for id in order {
        let found = with_engine(lua, |state| {
            Ok(state
                .ui
                .get(id)
                .filter(|component| component.visible)
                .and_then(|component| component.callbacks.get(RENDER).map(|render| (component.name.clone(), render))))
        });
        if let Ok(Some((name, render))) = found {
            invoke_logged::<()>(&name, RENDER, &render, ());
        }
    }
}

/// Removes a component for good, running its `onDestroy` first.
pub fn destroy(lua: &Lua, id: Handle) -> mlua::Result<bool> {
    let removed = with_engine(lua, |state| Ok(state.ui.remove(id)))?;
    let Some(component) = removed else {
        return Ok(false);
    };
    if let Some(on_destroy) = component.callbacks.get(ON_DESTROY) {
        invoke_logged::<()>(&component.name, ON_DESTROY, &on_destroy, ());
    }
    bridge::forget(lua, id)?;
    tracing::debug!(tag = "ui", component = %component.name, id = %id, "component destroyed");
    Ok(true)
}
