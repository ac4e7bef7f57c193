use std::rc::Rc;

use mlua::{Lua, Table, UserData, UserDataMethods};

use crate::animation::AnimationData;
use crate::scripting::args::{self, register};
use crate::scripting::with_state;

/// Script handle to shared animation data. Slots on several objects may hold the same data.
#[derive(Debug, Clone)]
pub struct AnimationValue(pub Rc<AnimationData>);

impl UserData for AnimationValue {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        args::add_method(methods, "getName", 0, 0, |_, this: &Self, _| Ok(this.0.name().to_string()));
        args::add_method(methods, "getSet", 0, 0, |_, this: &Self, _| Ok(this.0.set().to_string()));
        args::add_method(methods, "getFrameCount", 0, 0, |_, this: &Self, _| Ok(this.0.frame_count()));
        args::add_method(methods, "getFrameTime", 0, 0, |_, this: &Self, _| Ok(this.0.frame_time()));
        args::add_method(methods, "isLooping", 0, 0, |_, this: &Self, _| Ok(this.0.is_looping()));
        args::add_method(methods, "getFrame", 0, 0, |lua, this: &Self, _| {
            let clock = with_state(lua, |state| Ok(state.clock))?;
            Ok(this.0.frame_at(clock))
        });
    }
}

pub fn module(lua: &Lua) -> mlua::Result<Table> {
    let module = lua.create_table()?;
    register(lua, &module, "new", 2, 5, |lua, args| {
        let set = args.string(1)?;
        let name = args.string(2)?;
        let frame_count = args.opt_integer(3)?.unwrap_or(1).clamp(1, u32::MAX as i64) as u32;
        let frame_time = args.opt_number(4)?.unwrap_or(0.1);
        let looping = args.opt_boolean(5)?.unwrap_or(true);
        let clock = with_state(lua, |state| Ok(state.clock))?;
        let data = AnimationData::new(set, name).with_frames(frame_count, frame_time).looping(looping).started_at(clock);
        Ok(AnimationValue(Rc::new(data)))
    })?;
    Ok(module)
}
