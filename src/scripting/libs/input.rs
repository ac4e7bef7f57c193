use std::rc::Rc;

use mlua::{Lua, Table, UserData, UserDataMethods, Value};

use crate::input::InputData;
use crate::scripting::args::{self, register};
use crate::scripting::with_state;

#[derive(Debug, Clone)]
pub struct InputValue(pub Rc<InputData>);

impl UserData for InputValue {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        args::add_method(methods, "isPressed", 1, 1, |_, this: &Self, args| Ok(this.0.is_pressed(&args.string(1)?)));
        args::add_method(methods, "isJustPressed", 1, 1, |_, this: &Self, args| {
            Ok(this.0.is_just_pressed(&args.string(1)?))
        });
        args::add_method(methods, "isJustReleased", 1, 1, |_, this: &Self, args| {
            Ok(this.0.is_just_released(&args.string(1)?))
        });
        args::add_method(methods, "getHoldTime", 1, 1, |_, this: &Self, args| Ok(this.0.hold_time(&args.string(1)?)));
        args::add_method(methods, "isEmpty", 0, 0, |_, this: &Self, _| Ok(this.0.is_empty()));
    }
}

pub fn input_value(lua: &Lua, input: Rc<InputData>) -> mlua::Result<Value> {
    lua.create_userdata(InputValue(input)).map(Value::UserData)
}

pub fn module(lua: &Lua) -> mlua::Result<Table> {
    let module = lua.create_table()?;
    register(lua, &module, "current", 0, 0, |lua, _| {
        let current = with_state(lua, |state| Ok(state.input.clone()))?;
        input_value(lua, current)
    })?;
    Ok(module)
}
