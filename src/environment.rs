use std::cell::{Ref, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::rc::Rc;

use anyhow::{anyhow, Context, Result};
use mlua::Lua;

use crate::camera::Camera2D;
use crate::catalog::{Catalogs, RoomData};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::input::InputData;
use crate::overworld::{self, OverworldController, WorldObject, WorldRoom};
use crate::overworld::object::ObjectMut;
use crate::render::RenderSink;
use crate::scheduler::{self, Scheduler};
use crate::scripting::bridge::{Handle, TypeName};
use crate::scripting::implementable::CallbackTable;
use crate::scripting::libs::input::input_value;
use crate::scripting::{with_engine, ScriptHost};
use crate::ui::{self, UiController};

pub type SharedState = Rc<RefCell<EnvironmentState>>;

/// Everything one simulation owns. Reached from Lua through the script host's app data.
pub struct EnvironmentState {
    next_handle: u64,
    pub config: EngineConfig,
    pub catalogs: Catalogs,
    pub overworld: OverworldController,
    pub rooms: BTreeMap<Handle, WorldRoom>,
    /// Objects that exist but belong to no room.
    pub loose_objects: BTreeMap<Handle, WorldObject>,
    pub ui: UiController,
    pub scheduler: Scheduler,
    pub clock: f64,
    pub ticks: u64,
    /// Snapshot for the tick in progress, served by `input.current()`.
    pub input: Rc<InputData>,
}

impl EnvironmentState {
    pub fn new(config: EngineConfig) -> Self {
        let camera = Camera2D::new(config.camera.zoom_min, config.camera.zoom_max);
        let mut overworld = OverworldController::new(camera);
        overworld.set_rendering_hitboxes(config.runtime.render_hitboxes);
        Self {
            next_handle: 0,
            config,
            catalogs: Catalogs::new(),
            overworld,
            rooms: BTreeMap::new(),
            loose_objects: BTreeMap::new(),
            ui: UiController::new(),
            scheduler: Scheduler::new(),
            clock: 0.0,
            ticks: 0,
            input: Rc::new(InputData::default()),
        }
    }

    pub fn allocate_handle(&mut self) -> Handle {
        self.next_handle += 1;
        Handle::from_raw(self.next_handle)
    }

    /// `Some(None)` for a loose object, `Some(Some(room))` for an owned one.
    pub fn locate_object(&self, id: Handle) -> Option<Option<Handle>> {
        if self.loose_objects.contains_key(&id) {
            return Some(None);
        }
        self.rooms.values().find(|room| room.contains(id)).map(|room| Some(room.id()))
    }

    pub fn is_object_alive(&self, id: Handle) -> bool {
        self.locate_object(id).is_some()
    }

    pub fn object_ids(&self) -> BTreeSet<Handle> {
        let mut ids: BTreeSet<Handle> = self.loose_objects.keys().copied().collect();
        for room in self.rooms.values() {
            ids.extend(room.object_ids());
        }
        ids
    }

    pub fn object(&self, id: Handle) -> Result<&WorldObject, EngineError> {
        let found = match self.locate_object(id) {
            Some(None) => self.loose_objects.get(&id),
            Some(Some(room)) => self.rooms.get(&room).and_then(|room| room.object(id)),
            None => None,
        };
        found.ok_or(EngineError::StaleReference { typename: TypeName::WorldObject.as_str(), handle: id })
    }

    pub fn object_mut(&mut self, id: Handle) -> Result<ObjectMut<'_>, EngineError> {
        let stale = EngineError::StaleReference { typename: TypeName::WorldObject.as_str(), handle: id };
        match self.locate_object(id) {
            Some(None) => self.loose_objects.get_mut(&id).map(|object| object.with_physics(None)).ok_or(stale),
            Some(Some(room)) => self.rooms.get_mut(&room).and_then(|room| room.object_mut(id)).ok_or(stale),
            None => Err(stale),
        }
    }

    pub fn room(&self, id: Handle) -> Result<&WorldRoom, EngineError> {
        self.rooms.get(&id).ok_or(EngineError::StaleReference { typename: TypeName::WorldRoom.as_str(), handle: id })
    }

    pub fn room_mut(&mut self, id: Handle) -> Result<&mut WorldRoom, EngineError> {
        self.rooms.get_mut(&id).ok_or(EngineError::StaleReference { typename: TypeName::WorldRoom.as_str(), handle: id })
    }

    /// Pulls an object out of wherever it lives, leaving it detached.
    /// Destroyed objects waiting for the end-of-tick flush cannot be taken.
    pub fn take_object(&mut self, id: Handle) -> Result<WorldObject, EngineError> {
        match self.locate_object(id) {
            Some(None) => self.loose_objects.remove(&id),
            Some(Some(room)) => self
                .rooms
                .get_mut(&room)
                .filter(|room| !room.is_pending_removal(id))
                .and_then(|room| room.release(id)),
            None => None,
        }
        .ok_or(EngineError::StaleReference { typename: TypeName::WorldObject.as_str(), handle: id })
    }

    pub fn adopt_object(&mut self, room: Handle, object: Handle) -> Result<(), EngineError> {
        self.room(room)?;
        if self.locate_object(object) == Some(Some(room)) {
            return Ok(());
        }
        let taken = self.take_object(object)?;
        self.room_mut(room)?.adopt(taken);
        Ok(())
    }

    /// Moves an owned object back into the loose pool.
    pub fn release_object(&mut self, room: Handle, object: Handle) -> Result<bool, EngineError> {
        let room = self.room_mut(room)?;
        if room.is_pending_removal(object) {
            return Ok(false);
        }
        let Some(released) = room.release(object) else {
            return Ok(false);
        };
        self.loose_objects.insert(object, released);
        Ok(true)
    }

    /// Owned objects are flagged for removal at the end of the room's object pass; loose ones
    /// are dropped now. Returns true when the object is already gone.
    pub fn destroy_object(&mut self, id: Handle) -> Result<bool, EngineError> {
        match self.locate_object(id) {
            Some(None) => {
                self.loose_objects.remove(&id);
                Ok(true)
            }
            Some(Some(room)) => {
                self.room_mut(room)?.schedule_removal(id);
                Ok(false)
            }
            None => Err(EngineError::StaleReference { typename: TypeName::WorldObject.as_str(), handle: id }),
        }
    }

    pub fn callbacks_mut(&mut self, typename: TypeName, handle: Handle) -> Result<&mut CallbackTable, EngineError> {
        match typename {
            TypeName::WorldObject => Ok(self.object_mut(handle)?.into_object().callbacks_mut()),
            TypeName::WorldRoom => Ok(self.room_mut(handle)?.callbacks_mut()),
            TypeName::UiComponent => self
                .ui
                .get_mut(handle)
                .map(|component| component.callbacks_mut())
                .ok_or(EngineError::StaleReference { typename: typename.as_str(), handle }),
        }
    }

    fn teardown(&mut self) {
        for (_, mut room) in std::mem::take(&mut self.rooms) {
            room.drain_objects();
        }
        self.loose_objects.clear();
        self.ui.drain();
        self.scheduler.clear();
        self.overworld.set_entry_transition(None);
        self.overworld.set_exit_transition(None);
    }
}

/// One running game simulation: the shared state plus the Lua host that scripts it.
pub struct Environment {
    name: String,
    host: ScriptHost,
    state: SharedState,
}

impl Environment {
    pub fn new(name: impl Into<String>, config: EngineConfig) -> Result<Self> {
        let name = name.into();
        let state = Rc::new(RefCell::new(EnvironmentState::new(config)));
        let host = ScriptHost::new(state.clone()).map_err(|err| anyhow!("Failed to start script host: {err}"))?;
        tracing::info!(tag = "environment", name = %name, "environment created");
        Ok(Self { name, host, state })
    }

    /// Builds an environment and fills its catalogs from the configured asset directories.
    pub fn from_config(name: impl Into<String>, config: EngineConfig) -> Result<Self> {
        let env = Self::new(name, config)?;
        {
            let mut state = env.state.borrow_mut();
            let assets = state.config.assets.clone();
            state.catalogs.scan(&assets).context("Failed to scan script catalogs")?;
        }
        Ok(env)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lua(&self) -> &Lua {
        self.host.lua()
    }

    pub fn state(&self) -> Ref<'_, EnvironmentState> {
        self.state.borrow()
    }

    pub fn register_object_source(&self, name: &str, code: &str) {
        self.state.borrow_mut().catalogs.objects.register_source(name, code);
    }

    pub fn register_room_source(&self, name: &str, code: &str, data: Option<RoomData>) {
        self.state.borrow_mut().catalogs.rooms.register_source(name, code, data);
    }

    pub fn register_ui_source(&self, name: &str, code: &str) {
        self.state.borrow_mut().catalogs.ui.register_source(name, code);
    }

    pub fn exec(&self, name: &str, source: &str) -> Result<(), EngineError> {
        self.host.exec(name, source)
    }

    /// Runs the configured entry script, if there is one on disk.
    pub fn run_main(&self) -> Result<bool> {
        let path = self.state.borrow().config.assets.main_script();
        let Some(path) = path.filter(|path| path.is_file()) else {
            tracing::warn!(tag = "environment", "no main script found; nothing to run");
            return Ok(false);
        };
        let source =
            fs::read_to_string(&path).with_context(|| format!("Failed to read main script {}", path.display()))?;
        self.exec(&path.display().to_string(), &source)?;
        Ok(true)
    }

    /// One tick: scheduler, then UI, then overworld. Script failures are logged, never returned.
    pub fn process(&self, delta: f32, input: &InputData) {
        let lua = self.host.lua();
        let current = Rc::new(input.clone());
        if let Err(err) = with_engine(lua, |state| {
            state.clock += delta as f64;
            state.ticks += 1;
            state.input = current.clone();
            Ok(())
        }) {
            tracing::error!(tag = "environment", "{err}");
            return;
        }
        let (input, blank) = match (input_value(lua, current), input_value(lua, Rc::new(InputData::default()))) {
            (Ok(input), Ok(blank)) => (input, blank),
            (Err(err), _) | (_, Err(err)) => {
                tracing::error!(tag = "environment", "failed to build input value: {err}");
                return;
            }
        };
        scheduler::process(lua, delta, &input);
        ui::process(lua, delta, &input, &blank);
        overworld::process(lua, delta, &input);
    }

    pub fn render(&self, sink: &mut dyn RenderSink) {
        let lua = self.host.lua();
        overworld::render(lua, sink);
        ui::render(lua, sink);
    }
}

impl Drop for Environment {
    fn drop(&mut self) {
        self.host.detach_state();
        if let Ok(mut state) = self.state.try_borrow_mut() {
            state.teardown();
        }
        tracing::info!(tag = "environment", name = %self.name, "environment disposed");
    }
}
