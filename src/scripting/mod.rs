pub mod args;
pub mod bridge;
pub mod implementable;
pub mod libs;

use mlua::{FromLuaMulti, Function, IntoLuaMulti, Lua};

use crate::environment::{EnvironmentState, SharedState};
use crate::error::EngineError;

/// Owns the Lua state and the engine libraries registered into it.
pub struct ScriptHost {
    lua: Lua,
}

impl ScriptHost {
    pub fn new(state: SharedState) -> mlua::Result<Self> {
        let lua = Lua::new();
        lua.set_app_data(state);
        libs::register_all(&lua)?;
        Ok(Self { lua })
    }

    pub fn lua(&self) -> &Lua {
        &self.lua
    }

    /// Runs a chunk against the shared globals.
    pub fn exec(&self, name: &str, source: &str) -> Result<(), EngineError> {
        self.lua
            .load(source)
            .set_name(format!("={name}"))
            .exec()
            .map_err(|err| EngineError::script_runtime(name, &err))
    }

    pub(crate) fn detach_state(&self) {
        let _ = self.lua.remove_app_data::<SharedState>();
    }
}

pub(crate) fn shared_state(lua: &Lua) -> Result<SharedState, EngineError> {
    lua.app_data_ref::<SharedState>()
        .map(|state| state.clone())
        .ok_or_else(|| EngineError::StateConflict("no environment is attached to this script host".to_string()))
}

/// Runs `f` with the environment state borrowed. The borrow is released before returning, so
/// `f` must not call back into Lua.
pub(crate) fn with_engine<R>(
    lua: &Lua,
    f: impl FnOnce(&mut EnvironmentState) -> Result<R, EngineError>,
) -> Result<R, EngineError> {
    let shared = shared_state(lua)?;
    let mut state = shared
        .try_borrow_mut()
        .map_err(|_| EngineError::StateConflict("environment state is already borrowed".to_string()))?;
    f(&mut state)
}

pub(crate) fn with_state<R>(
    lua: &Lua,
    f: impl FnOnce(&mut EnvironmentState) -> Result<R, EngineError>,
) -> mlua::Result<R> {
    with_engine(lua, f).map_err(Into::into)
}

/// Calls a per-tick hook. Script errors are logged and swallowed so one misbehaving entity
/// cannot stop the tick.
pub(crate) fn invoke_logged<R: FromLuaMulti>(
    owner: &str,
    hook: &'static str,
    function: &Function,
    args: impl IntoLuaMulti,
) -> Option<R> {
    match function.call::<R>(args) {
        Ok(value) => Some(value),
        Err(err) => {
            let err = EngineError::script_runtime(owner, &err);
            tracing::error!(tag = "script", owner, hook, "{err}");
            None
        }
    }
}

pub(crate) fn log_engine_error(context: &'static str, err: &EngineError) {
    tracing::error!(tag = "engine", context, "{err}");
}
