//! Identity-preserving script values for engine entities.
//!
//! Every world object, room and UI component is exposed to Lua as one [`ScriptObject`] userdata
//! per handle. The userdata carries a user-value table that scripts can write arbitrary fields
//! into; reads fall back to the per-type method table registered by the bindings.

use std::fmt;

use mlua::{AnyUserData, Lua, MetaMethod, Table, UserData, UserDataMethods, Value};

use crate::error::EngineError;
use crate::scripting::implementable::Implementable;
use crate::scripting::libs::animation::AnimationValue;
use crate::scripting::libs::input::InputValue;
use crate::scripting::libs::world_object::BoundingBoxValue;
use crate::scripting::libs::world_room::EntrypointValue;
use crate::scripting::with_state;

const VALUE_CACHE_KEY: &str = "tailor.bridge.values";

pub const ANIMATION_TYPENAME: &str = "tailor-animation";
pub const BOUNDING_BOX_TYPENAME: &str = "tailor-boundingbox";
pub const ENTRYPOINT_TYPENAME: &str = "tailor-entrypoint";
pub const INPUT_TYPENAME: &str = "tailor-inputdata";

/// Engine-wide entity id. Allocated from a single counter and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u64);

impl Handle {
    pub const fn from_raw(raw: u64) -> Self {
        Handle(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeName {
    WorldObject,
    WorldRoom,
    UiComponent,
}

impl TypeName {
    pub const fn as_str(self) -> &'static str {
        match self {
            TypeName::WorldObject => "tailor-worldobj",
            TypeName::WorldRoom => "tailor-worldroom",
            TypeName::UiComponent => "tailor-uicomp",
        }
    }

    fn methods_key(self) -> String {
        format!("tailor.methods.{}", self.as_str())
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScriptObject {
    handle: Handle,
    typename: TypeName,
}

impl ScriptObject {
    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn typename(&self) -> TypeName {
        self.typename
    }
}

impl UserData for ScriptObject {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_function(MetaMethod::Index, |lua, (value, key): (AnyUserData, Value)| {
            index(lua, &value, key)
        });
        methods.add_meta_function(
            MetaMethod::NewIndex,
            |lua, (value, key, assigned): (AnyUserData, Value, Value)| new_index(lua, &value, key, assigned),
        );
        methods.add_meta_method(MetaMethod::Eq, |_, this, other: AnyUserData| {
            Ok(other.borrow::<ScriptObject>().map(|other| other.handle == this.handle).unwrap_or(false))
        });
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("{}: {}", this.typename, this.handle))
        });
    }
}

fn index(lua: &Lua, value: &AnyUserData, key: Value) -> mlua::Result<Value> {
    if let Ok(fields) = value.user_value::<Table>() {
        let stored: Value = fields.raw_get(key.clone())?;
        if !stored.is_nil() {
            return Ok(stored);
        }
    }
    let typename = value.borrow::<ScriptObject>()?.typename;
    match lua.named_registry_value::<Option<Table>>(&typename.methods_key())? {
        Some(methods) => methods.raw_get(key),
        None => Ok(Value::Nil),
    }
}

fn new_index(lua: &Lua, value: &AnyUserData, key: Value, assigned: Value) -> mlua::Result<()> {
    let (handle, typename) = {
        let this = value.borrow::<ScriptObject>()?;
        (this.handle, this.typename)
    };
    if let Value::String(name) = &key {
        let name = name.to_str()?.to_string();
        if let Some(callback) = Implementable::for_typename(typename).callback_name(&name) {
            let function = match &assigned {
                Value::Function(function) => Some(function.clone()),
                Value::Nil => None,
                other => return Err(EngineError::type_mismatch("function", typename_of(other)).into()),
            };
            with_state(lua, |state| {
                state.callbacks_mut(typename, handle)?.set(callback, function);
                Ok(())
            })?;
        }
    }
    let fields = match value.user_value::<Option<Table>>()? {
        Some(fields) => fields,
        None => {
            let fields = lua.create_table()?;
            value.set_user_value(fields.clone())?;
            fields
        }
    };
    fields.raw_set(key, assigned)
}

fn value_cache(lua: &Lua) -> mlua::Result<Table> {
    if let Some(cache) = lua.named_registry_value::<Option<Table>>(VALUE_CACHE_KEY)? {
        return Ok(cache);
    }
    let cache = lua.create_table()?;
    lua.set_named_registry_value(VALUE_CACHE_KEY, cache.clone())?;
    Ok(cache)
}

/// Returns the script value for `handle`, creating it on first use. Repeated calls hand back
/// the same userdata so scripts can compare entities with `==`.
pub fn of(lua: &Lua, handle: Handle, typename: TypeName) -> mlua::Result<AnyUserData> {
    let cache = value_cache(lua)?;
    if let Some(existing) = cache.raw_get::<Option<AnyUserData>>(handle.raw())? {
        return Ok(existing);
    }
    let value = lua.create_userdata(ScriptObject { handle, typename })?;
    value.set_user_value(lua.create_table()?)?;
    cache.raw_set(handle.raw(), value.clone())?;
    Ok(value)
}

/// Drops the cached value for a destroyed entity. Scripts still holding it get stale-reference
/// errors from every bound method.
pub fn forget(lua: &Lua, handle: Handle) -> mlua::Result<()> {
    value_cache(lua)?.raw_set(handle.raw(), Value::Nil)
}

pub fn check(value: &Value, typename: TypeName) -> Result<Handle, EngineError> {
    if let Value::UserData(data) = value {
        if let Ok(object) = data.borrow::<ScriptObject>() {
            if object.typename == typename {
                return Ok(object.handle);
            }
        }
    }
    Err(EngineError::type_mismatch(typename.as_str(), typename_of(value)))
}

/// Copies a userdata payload of type `T` out of `value`.
pub fn check_userdata<T: Clone + 'static>(value: &Value, typename: &'static str) -> Result<T, EngineError> {
    if let Value::UserData(data) = value {
        if let Ok(inner) = data.borrow::<T>() {
            return Ok(inner.clone());
        }
    }
    Err(EngineError::type_mismatch(typename, typename_of(value)))
}

/// Installs the method table consulted by `__index` for values of `typename`.
pub fn install_methods(lua: &Lua, typename: TypeName, methods: Table) -> mlua::Result<()> {
    let name = typename.as_str();
    methods.raw_set("typename", lua.create_function(move |_, _: mlua::MultiValue| Ok(name))?)?;
    lua.set_named_registry_value(&typename.methods_key(), methods)
}

/// Seeds a freshly loaded entity's field table with its callbacks so `obj.process` reads back
/// the function the script defined.
pub fn seed_fields(value: &AnyUserData, callbacks: &[(&'static str, mlua::Function)]) -> mlua::Result<()> {
    let fields: Table = value.user_value()?;
    for (name, function) in callbacks {
        fields.raw_set(*name, function.clone())?;
    }
    Ok(())
}

pub fn typename_of(value: &Value) -> String {
    match value {
        Value::UserData(data) => {
            if let Ok(object) = data.borrow::<ScriptObject>() {
                return object.typename.as_str().to_string();
            }
            let name = if data.is::<AnimationValue>() {
                ANIMATION_TYPENAME
            } else if data.is::<BoundingBoxValue>() {
                BOUNDING_BOX_TYPENAME
            } else if data.is::<EntrypointValue>() {
                ENTRYPOINT_TYPENAME
            } else if data.is::<InputValue>() {
                INPUT_TYPENAME
            } else {
                "userdata"
            };
            name.to_string()
        }
        other => other.type_name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_order_by_allocation() {
        let first = Handle::from_raw(3);
        let second = Handle::from_raw(11);
        assert!(first < second);
        assert_eq!(second.to_string(), "11");
    }

    #[test]
    fn check_rejects_plain_values() {
        let err = check(&Value::Boolean(true), TypeName::WorldRoom).unwrap_err();
        assert_eq!(err.to_string(), "bad argument: expected tailor-worldroom, got boolean");
    }
}
