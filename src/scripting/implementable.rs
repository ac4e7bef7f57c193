use std::collections::BTreeMap;

use mlua::{Function, Lua, Table, Value};

use crate::catalog::ScriptSource;
use crate::error::EngineError;
use crate::scripting::bridge::TypeName;

pub const CREATE: &str = "create";
pub const PROCESS: &str = "process";
pub const ON_RENDER: &str = "onRender";
pub const ON_COLLIDE: &str = "onCollide";
pub const ON_INTERACT: &str = "onInteract";
pub const ON_PERSIST: &str = "onPersist";
pub const ON_PAUSE: &str = "onPause";
pub const ON_RESUME: &str = "onResume";
pub const ON_ENTER: &str = "onEnter";
pub const ON_EXIT: &str = "onExit";
pub const RENDER: &str = "render";
pub const ON_DESTROY: &str = "onDestroy";

/// Callback contract for one scriptable entity kind.
#[derive(Debug)]
pub struct Implementable {
    pub typename: TypeName,
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
}

pub static WORLD_OBJECT: Implementable = Implementable {
    typename: TypeName::WorldObject,
    required: &[CREATE],
    optional: &[PROCESS, ON_RENDER, ON_COLLIDE, ON_INTERACT, ON_PERSIST, ON_PAUSE, ON_RESUME],
};

pub static WORLD_ROOM: Implementable = Implementable {
    typename: TypeName::WorldRoom,
    required: &[CREATE],
    optional: &[PROCESS, ON_ENTER, ON_EXIT, ON_PAUSE, ON_RESUME],
};

pub static UI_COMPONENT: Implementable = Implementable {
    typename: TypeName::UiComponent,
    required: &[CREATE],
    optional: &[PROCESS, RENDER, ON_DESTROY],
};

impl Implementable {
    pub fn for_typename(typename: TypeName) -> &'static Implementable {
        match typename {
            TypeName::WorldObject => &WORLD_OBJECT,
            TypeName::WorldRoom => &WORLD_ROOM,
            TypeName::UiComponent => &UI_COMPONENT,
        }
    }

    pub fn callback_name(&self, name: &str) -> Option<&'static str> {
        self.required.iter().chain(self.optional.iter()).copied().find(|candidate| *candidate == name)
    }

    /// Executes `source` in a fresh environment and collects the callbacks it defines. Missing
    /// required callbacks are reported together.
    pub fn load(&self, lua: &Lua, source: &ScriptSource) -> Result<CallbackTable, EngineError> {
        let code = source.read()?;
        let script = source.name().to_string();
        let runtime = |err: mlua::Error| EngineError::script_runtime(script.clone(), &err);

        let env = sandbox(lua).map_err(runtime)?;
        lua.load(code.as_str())
            .set_name(source.chunk_name())
            .set_environment(env.clone())
            .exec()
            .map_err(runtime)?;

        let mut callbacks = CallbackTable::default();
        let mut missing = Vec::new();
        for name in self.required {
            match env.raw_get::<Value>(*name).map_err(runtime)? {
                Value::Function(function) => callbacks.set(*name, Some(function)),
                _ => missing.push(name.to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(EngineError::ScriptContract { script: script.clone(), missing });
        }
        for name in self.optional {
            if let Value::Function(function) = env.raw_get::<Value>(*name).map_err(runtime)? {
                callbacks.set(*name, Some(function));
            }
        }
        tracing::debug!(
            tag = "scripting",
            script = %source.name(),
            kind = %self.typename,
            callbacks = callbacks.len(),
            "loaded script"
        );
        Ok(callbacks)
    }
}

/// Globals table for one script instance. Reads fall through to the shared globals, writes
/// stay local so two instances of the same script never see each other's callbacks.
fn sandbox(lua: &Lua) -> mlua::Result<Table> {
    let env = lua.create_table()?;
    let meta = lua.create_table()?;
    meta.raw_set("__index", lua.globals())?;
    env.set_metatable(Some(meta));
    Ok(env)
}

#[derive(Debug, Clone, Default)]
pub struct CallbackTable {
    functions: BTreeMap<&'static str, Function>,
}

impl CallbackTable {
    pub fn get(&self, name: &str) -> Option<Function> {
        self.functions.get(name).cloned()
    }

    pub fn set(&mut self, name: &'static str, function: Option<Function>) {
        match function {
            Some(function) => {
                self.functions.insert(name, function);
            }
            None => {
                self.functions.remove(name);
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn entries(&self) -> Vec<(&'static str, Function)> {
        self.functions.iter().map(|(name, function)| (*name, function.clone())).collect()
    }
}
