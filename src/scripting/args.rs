use mlua::{IntoLuaMulti, Lua, MultiValue, Table, UserDataMethods, Value, Variadic};

use crate::error::EngineError;
use crate::scripting::bridge::{self, Handle, TypeName};

/// Positional arguments of a bound function, validated up front for arity and checked per
/// position for type. Positions are 1-based like Lua's.
pub struct Args {
    function: &'static str,
    values: Vec<Value>,
}

impl Args {
    pub fn new(function: &'static str, values: Vec<Value>, min: usize, max: usize) -> Result<Self, EngineError> {
        let got = values.len();
        if got < min || got > max {
            return Err(EngineError::ArgumentArity { function: function.to_string(), min, max, got });
        }
        Ok(Self { function, values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value(&self, position: usize) -> Value {
        self.values.get(position.wrapping_sub(1)).cloned().unwrap_or(Value::Nil)
    }

    pub fn is_nil(&self, position: usize) -> bool {
        self.value(position).is_nil()
    }

    /// Values from `position` onwards, for forwarding varargs.
    pub fn rest(&self, position: usize) -> Vec<Value> {
        self.values.iter().skip(position.saturating_sub(1)).cloned().collect()
    }

    pub fn bad(&self, position: usize, message: impl Into<String>) -> EngineError {
        EngineError::BadArgument { function: self.function.to_string(), position, message: message.into() }
    }

    fn expected(&self, position: usize, expected: &str) -> EngineError {
        let actual = bridge::typename_of(&self.value(position));
        self.bad(position, format!("expected {expected}, got {actual}"))
    }

    pub fn handle(&self, position: usize, typename: TypeName) -> Result<Handle, EngineError> {
        bridge::check(&self.value(position), typename)
    }

    pub fn userdata<T: Clone + 'static>(&self, position: usize, typename: &'static str) -> Result<T, EngineError> {
        bridge::check_userdata(&self.value(position), typename)
    }

    pub fn number(&self, position: usize) -> Result<f32, EngineError> {
        match self.value(position) {
            Value::Integer(i) => Ok(i as f32),
            Value::Number(n) => Ok(n as f32),
            _ => Err(self.expected(position, "number")),
        }
    }

    pub fn opt_number(&self, position: usize) -> Result<Option<f32>, EngineError> {
        if self.is_nil(position) {
            return Ok(None);
        }
        self.number(position).map(Some)
    }

    pub fn integer(&self, position: usize) -> Result<i64, EngineError> {
        match self.value(position) {
            Value::Integer(i) => Ok(i as i64),
            Value::Number(n) if n.fract() == 0.0 => Ok(n as i64),
            Value::Number(_) => Err(self.bad(position, "number has no integer representation")),
            _ => Err(self.expected(position, "number")),
        }
    }

    pub fn opt_integer(&self, position: usize) -> Result<Option<i64>, EngineError> {
        if self.is_nil(position) {
            return Ok(None);
        }
        self.integer(position).map(Some)
    }

    pub fn boolean(&self, position: usize) -> Result<bool, EngineError> {
        match self.value(position) {
            Value::Boolean(b) => Ok(b),
            _ => Err(self.expected(position, "boolean")),
        }
    }

    pub fn opt_boolean(&self, position: usize) -> Result<Option<bool>, EngineError> {
        if self.is_nil(position) {
            return Ok(None);
        }
        self.boolean(position).map(Some)
    }

    pub fn string(&self, position: usize) -> Result<String, EngineError> {
        match self.value(position) {
            Value::String(s) => Ok(s.to_string_lossy().to_string()),
            _ => Err(self.expected(position, "string")),
        }
    }

    pub fn opt_string(&self, position: usize) -> Result<Option<String>, EngineError> {
        if self.is_nil(position) {
            return Ok(None);
        }
        self.string(position).map(Some)
    }

    pub fn table(&self, position: usize) -> Result<Table, EngineError> {
        match self.value(position) {
            Value::Table(t) => Ok(t),
            _ => Err(self.expected(position, "table")),
        }
    }

    pub fn opt_table(&self, position: usize) -> Result<Option<Table>, EngineError> {
        if self.is_nil(position) {
            return Ok(None);
        }
        self.table(position).map(Some)
    }
}

/// Registers `name` on `table` as a function whose arguments are arity-checked before `body`
/// runs.
pub fn register<R, F>(lua: &Lua, table: &Table, name: &'static str, min: usize, max: usize, body: F) -> mlua::Result<()>
where
    R: IntoLuaMulti,
    F: Fn(&Lua, Args) -> mlua::Result<R> + 'static,
{
    let function = lua.create_function(move |lua, values: Variadic<Value>| {
        let args = Args::new(name, values.iter().cloned().collect(), min, max)?;
        body(lua, args)
    })?;
    table.raw_set(name, function)
}

/// Userdata counterpart of [`register`]. The receiver is not counted in `min`/`max`.
pub fn add_method<T, M, R, F>(methods: &mut M, name: &'static str, min: usize, max: usize, body: F)
where
    T: 'static,
    M: UserDataMethods<T>,
    R: IntoLuaMulti,
    F: Fn(&Lua, &T, Args) -> mlua::Result<R> + 'static,
{
    methods.add_method(name, move |lua, this, values: Variadic<Value>| {
        let args = Args::new(name, values.iter().cloned().collect(), min, max)?;
        body(lua, this, args)
    });
}

pub fn multi(values: Vec<Value>) -> MultiValue {
    MultiValue::from_vec(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: Vec<Value>) -> Args {
        Args::new("probe", values, 0, 4).expect("arity")
    }

    #[test]
    fn arity_bounds_are_enforced() {
        let err = Args::new("setScale", vec![], 2, 2).err().expect("too few");
        assert!(matches!(err, EngineError::ArgumentArity { min: 2, max: 2, got: 0, .. }));
        assert!(Args::new("setScale", vec![Value::Nil; 3], 2, 2).is_err());
    }

    #[test]
    fn numbers_accept_both_lua_representations() {
        let a = args(vec![Value::Integer(4), Value::Number(2.5)]);
        assert_eq!(a.number(1).unwrap(), 4.0);
        assert_eq!(a.number(2).unwrap(), 2.5);
        assert_eq!(a.opt_number(3).unwrap(), None);
        assert!(a.integer(2).is_err());
    }

    #[test]
    fn type_errors_name_position_and_types() {
        let a = args(vec![Value::Boolean(false)]);
        let err = a.number(1).unwrap_err();
        assert_eq!(err.to_string(), "bad argument #1 to 'probe': expected number, got boolean");
    }
}
