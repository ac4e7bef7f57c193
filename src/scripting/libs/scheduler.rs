use mlua::{Lua, Table};

use crate::scheduler::Task;
use crate::scripting::args::register;
use crate::scripting::bridge::Handle;
use crate::scripting::libs::id_value;
use crate::scripting::with_state;

pub fn module(lua: &Lua) -> mlua::Result<Table> {
    let module = lua.create_table()?;
    register(lua, &module, "push", 1, 1, |lua, args| {
        let table = args.table(1)?;
        let id = with_state(lua, |state| {
            let id = state.allocate_handle();
            state.scheduler.push(Task::new(id, table, None));
            Ok(id)
        })?;
        Ok(id_value(id))
    })?;
    register(lua, &module, "hasTask", 1, 1, |lua, args| {
        let id = Handle::from_raw(args.integer(1)?.max(0) as u64);
        with_state(lua, |state| Ok(state.scheduler.contains(id)))
    })?;
    register(lua, &module, "getTaskCount", 0, 0, |lua, _| with_state(lua, |state| Ok(state.scheduler.len())))?;
    Ok(module)
}
