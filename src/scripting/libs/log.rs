use mlua::{Lua, Table};

use crate::scripting::args::register;

/// `log.<level>(tag, message)`, forwarded to `tracing` with the script's tag.
pub fn module(lua: &Lua) -> mlua::Result<Table> {
    let module = lua.create_table()?;
    register(lua, &module, "debug", 2, 2, |_, args| {
        let (tag, message) = (args.string(1)?, args.string(2)?);
        tracing::debug!(tag = tag.as_str(), "{message}");
        Ok(())
    })?;
    for level in ["info", "log"] {
        register(lua, &module, level, 2, 2, |_, args| {
            let (tag, message) = (args.string(1)?, args.string(2)?);
            tracing::info!(tag = tag.as_str(), "{message}");
            Ok(())
        })?;
    }
    register(lua, &module, "warn", 2, 2, |_, args| {
        let (tag, message) = (args.string(1)?, args.string(2)?);
        tracing::warn!(tag = tag.as_str(), "{message}");
        Ok(())
    })?;
    register(lua, &module, "error", 2, 2, |_, args| {
        let (tag, message) = (args.string(1)?, args.string(2)?);
        tracing::error!(tag = tag.as_str(), "{message}");
        Ok(())
    })?;
    Ok(module)
}
