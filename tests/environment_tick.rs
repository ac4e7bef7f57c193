use tailor_engine::config::EngineConfig;
use tailor_engine::input::InputData;
use tailor_engine::Environment;

const DT: f32 = 1.0 / 60.0;

const ORDERED_OBJECT: &str = r#"
function create(obj) end
function process(delta, input) order[#order + 1] = "object" end
"#;

const ORDERED_ROOM: &str = r#"
function create(room) end
function process(delta, input) order[#order + 1] = "room" end
"#;

const ORDERED_PANEL: &str = r#"
function create(comp) ui.register(comp) end
function process(delta, input) order[#order + 1] = "ui" end
"#;

const DRIFTER: &str = r#"
function create(obj, x, y)
    obj:setPosition(x, y)
    obj:createBoundingBox("body")
end
"#;

fn environment() -> Environment {
    let env = Environment::new("tick", EngineConfig::default()).expect("environment");
    env.register_object_source("ordered", ORDERED_OBJECT);
    env.register_object_source("drifter", DRIFTER);
    env.register_room_source("ordered", ORDERED_ROOM, None);
    env.register_ui_source("ordered", ORDERED_PANEL);
    env
}

fn run(env: &Environment, code: &str) {
    env.exec("test", code).expect("script should run");
}

fn global<T: mlua::FromLua>(env: &Environment, name: &str) -> T {
    env.lua().globals().get::<T>(name).expect("global")
}

fn tick(env: &Environment) {
    env.process(DT, &InputData::default());
}

#[test]
fn scheduler_then_ui_then_overworld() {
    let env = environment();
    run(
        &env,
        r#"
        order = {}
        scheduler.push({ process = function() order[#order + 1] = "scheduler" end })
        ui.newComponent("ordered")
        room = overworld.newWorldRoom("ordered")
        overworld.setCurrentRoom(room, false)
        room:registerObject(overworld.newWorldObject("ordered"))
        "#,
    );
    tick(&env);
    run(&env, "joined = table.concat(order, ',')");
    assert_eq!(global::<String>(&env, "joined"), "scheduler,ui,room,object");
    assert_eq!(env.state().ticks, 1);
}

#[test]
fn processing_switch_freezes_the_overworld() {
    let env = environment();
    run(
        &env,
        r#"
        order = {}
        room = overworld.newWorldRoom("ordered")
        overworld.setCurrentRoom(room, false)
        room:registerObject(overworld.newWorldObject("ordered"))
        overworld.setProcessing(false)
        "#,
    );
    tick(&env);
    tick(&env);
    run(&env, "count = #order");
    assert_eq!(global::<i64>(&env, "count"), 0);
}

#[test]
fn objects_outside_the_current_room_stay_idle() {
    let env = environment();
    run(
        &env,
        r#"
        order = {}
        current = overworld.newWorldRoom("ordered")
        elsewhere = overworld.newWorldRoom("ordered")
        overworld.setCurrentRoom(current, false)
        elsewhere:registerObject(overworld.newWorldObject("ordered"))
        overworld.newWorldObject("ordered")
        "#,
    );
    tick(&env);
    run(&env, "joined = table.concat(order, ',')");
    assert_eq!(global::<String>(&env, "joined"), "room");
}

#[test]
fn failing_callbacks_do_not_stop_the_tick() {
    let env = environment();
    env.register_object_source(
        "faulty",
        "function create(obj) end\nfunction process(delta, input) error('broken process') end",
    );
    run(
        &env,
        r#"
        order = {}
        room = overworld.newWorldRoom("ordered")
        overworld.setCurrentRoom(room, false)
        room:registerObject(overworld.newWorldObject("faulty"))
        room:registerObject(overworld.newWorldObject("ordered"))
        "#,
    );
    for _ in 0..3 {
        tick(&env);
    }
    run(&env, "count = #order");
    assert_eq!(global::<i64>(&env, "count"), 6);
}

#[test]
fn scripts_see_the_tick_input() {
    let env = environment();
    run(
        &env,
        r#"
        room = overworld.newWorldRoom("ordered")
        overworld.setCurrentRoom(room, false)
        order = {}
        scheduler.push({
            process = function(delta, data)
                from_argument = data:isPressed("right")
                from_module = input.current():isJustPressed("right")
                held = input.current():getHoldTime("right")
                return true
            end,
        })
        "#,
    );
    env.process(DT, &InputData::new().with_pressed("right"));
    assert!(global::<bool>(&env, "from_argument"));
    assert!(global::<bool>(&env, "from_module"));
    assert_eq!(global::<f64>(&env, "held"), 0.0);
}

#[test]
fn camera_follows_the_character() {
    let env = environment();
    run(
        &env,
        r#"
        order = {}
        room = overworld.newWorldRoom("ordered")
        overworld.setCurrentRoom(room, false)
        hero = overworld.newWorldObject("drifter", 7, 8)
        room:registerObject(hero)
        overworld.setCharacterID(hero)
        character = overworld.getCharacterID() == hero:getID()
        overworld.setCameraFixing(true)
        "#,
    );
    tick(&env);
    run(&env, "cam_x, cam_y = overworld.getCameraPosition()");
    assert!(global::<bool>(&env, "character"));
    assert!((global::<f64>(&env, "cam_x") - 7.0).abs() < 1e-4);
    assert!((global::<f64>(&env, "cam_y") - 8.0).abs() < 1e-4);

    run(&env, "hero:destroy()");
    tick(&env);
    run(&env, "character_after = overworld.getCharacterID()");
    assert!(matches!(global::<mlua::Value>(&env, "character_after"), mlua::Value::Nil));
}

fn simulate() -> Vec<(f64, f64)> {
    let env = environment();
    run(
        &env,
        r#"
        order = {}
        room = overworld.newWorldRoom("ordered")
        overworld.setCurrentRoom(room, false)
        movers = {}
        for i = 1, 3 do
            local mover = overworld.newWorldObject("drifter", i * 1.5, 0)
            room:registerObject(mover)
            mover:setVelocity(2 - i, 1)
            movers[i] = mover
        end
        "#,
    );
    for _ in 0..90 {
        tick(&env);
    }
    (1..=3)
        .map(|index| {
            run(&env, &format!("px, py = movers[{index}]:getPosition()"));
            (global::<f64>(&env, "px"), global::<f64>(&env, "py"))
        })
        .collect()
}

#[test]
fn identical_runs_end_identically() {
    let first = simulate();
    let second = simulate();
    assert_eq!(first, second);
    assert!(first.iter().all(|(_, y)| *y > 0.5), "{first:?}");
}

#[test]
fn dropping_the_environment_releases_everything() {
    let env = environment();
    run(
        &env,
        r#"
        order = {}
        room = overworld.newWorldRoom("ordered")
        overworld.setCurrentRoom(room, false)
        room:registerObject(overworld.newWorldObject("ordered"))
        ui.newComponent("ordered")
        scheduler.push({ process = function() return false end })
        "#,
    );
    tick(&env);
    drop(env);
}

#[test]
fn scripts_log_through_every_level() {
    let env = environment();
    run(
        &env,
        r#"
        for _, level in ipairs({ "debug", "info", "log", "warn", "error" }) do
            log[level]("script", "level " .. level)
        end
        ok = pcall(log.info, "script")
        "#,
    );
    assert!(!global::<bool>(&env, "ok"));
}
