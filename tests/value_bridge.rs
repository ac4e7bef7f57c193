use tailor_engine::config::EngineConfig;
use tailor_engine::input::InputData;
use tailor_engine::{EngineError, Environment};

const DT: f32 = 1.0 / 60.0;

const GUARD: &str = r#"
function create(obj, tag)
    mytag = tag
    created[#created + 1] = obj
end

function process(delta, input)
    calls.original = calls.original + 1
end
"#;

fn environment() -> Environment {
    let env = Environment::new("bridge", EngineConfig::default()).expect("environment");
    env.register_object_source("npcs.guard", GUARD);
    env.register_room_source("field", "function create(room) end", None);
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
fn object_name_is_the_script_stem() {
    let env = environment();
    run(
        &env,
        r#"
        created = {}
        calls = { original = 0 }
        obj = overworld.newWorldObject("npcs.guard", "first")
        name = obj:getObjectName()
        described = tostring(obj)
        typename = obj:typename()
        "#,
    );
    assert_eq!(global::<String>(&env, "name"), "guard");
    assert_eq!(global::<String>(&env, "typename"), "tailor-worldobj");
    assert!(global::<String>(&env, "described").starts_with("tailor-worldobj"));
}

#[test]
fn every_exposure_yields_the_same_value() {
    let env = environment();
    run(
        &env,
        r#"
        created = {}
        calls = { original = 0 }
        room = overworld.newWorldRoom("field")
        obj = overworld.newWorldObject("npcs.guard")
        room:registerObject(obj)
        same_as_create = created[1] == obj
        same_as_lookup = room:getObject(obj:getID()) == obj
        same_as_list = room:getObjects()[1] == obj
        "#,
    );
    assert!(global::<bool>(&env, "same_as_create"));
    assert!(global::<bool>(&env, "same_as_lookup"));
    assert!(global::<bool>(&env, "same_as_list"));
}

#[test]
fn rebinding_process_replaces_the_callback() {
    let env = environment();
    run(
        &env,
        r#"
        created = {}
        calls = { original = 0, replacement = 0 }
        room = overworld.newWorldRoom("field")
        overworld.setCurrentRoom(room, false)
        obj = overworld.newWorldObject("npcs.guard")
        room:registerObject(obj)
        "#,
    );
    tick(&env);
    run(
        &env,
        r#"
        replacement = function(delta, input) calls.replacement = calls.replacement + 1 end
        obj.process = replacement
        reads_back = obj.process == replacement
        "#,
    );
    tick(&env);
    let calls: mlua::Table = global(&env, "calls");
    assert_eq!(calls.get::<i64>("original").expect("original"), 1);
    assert_eq!(calls.get::<i64>("replacement").expect("replacement"), 1);
    assert!(global::<bool>(&env, "reads_back"));

    run(&env, "obj.process = nil");
    tick(&env);
    let calls: mlua::Table = global(&env, "calls");
    assert_eq!(calls.get::<i64>("replacement").expect("replacement"), 1);
}

#[test]
fn callback_slots_only_accept_functions() {
    let env = environment();
    run(
        &env,
        r#"
        created = {}
        calls = { original = 0 }
        obj = overworld.newWorldObject("npcs.guard")
        ok, err = pcall(function() obj.process = 5 end)
        message = tostring(err)
        "#,
    );
    assert!(!global::<bool>(&env, "ok"));
    let message: String = global(&env, "message");
    assert!(message.contains("expected function, got number"), "{message}");
}

#[test]
fn custom_fields_live_on_the_value() {
    let env = environment();
    run(
        &env,
        r#"
        created = {}
        calls = { original = 0 }
        obj = overworld.newWorldObject("npcs.guard")
        obj.health = 3
        health = obj.health
        other = overworld.newWorldObject("npcs.guard")
        other_health = other.health
        "#,
    );
    assert_eq!(global::<i64>(&env, "health"), 3);
    assert!(matches!(global::<mlua::Value>(&env, "other_health"), mlua::Value::Nil));
}

#[test]
fn wrong_argument_kinds_are_reported() {
    let env = environment();
    run(
        &env,
        r#"
        created = {}
        calls = { original = 0 }
        room = overworld.newWorldRoom("field")
        obj = overworld.newWorldObject("npcs.guard")
        ok_number, err_number = pcall(room.registerObject, room, 5)
        ok_room, err_room = pcall(room.registerObject, room, room)
        ok_arity, err_arity = pcall(obj.setScale, obj)
        number_message = tostring(err_number)
        room_message = tostring(err_room)
        arity_message = tostring(err_arity)
        "#,
    );
    assert!(!global::<bool>(&env, "ok_number"));
    assert!(!global::<bool>(&env, "ok_room"));
    assert!(!global::<bool>(&env, "ok_arity"));
    let number: String = global(&env, "number_message");
    assert!(number.contains("expected tailor-worldobj, got number"), "{number}");
    let room: String = global(&env, "room_message");
    assert!(room.contains("expected tailor-worldobj, got tailor-worldroom"), "{room}");
    let arity: String = global(&env, "arity_message");
    assert!(arity.contains("bad argument count to 'setScale'"), "{arity}");
}

#[test]
fn engine_errors_survive_the_lua_boundary() {
    let env = environment();
    let err = env.exec("test", "overworld.setCameraZoom('far')").expect_err("zoom takes a number");
    assert!(matches!(err, EngineError::BadArgument { position: 1, .. }), "{err}");

    let err = env.exec("test", "overworld.newWorldObject('ghost')").expect_err("ghost is not registered");
    assert!(matches!(err, EngineError::MissingScript { .. }), "{err}");
}

#[test]
fn scripts_without_create_are_rejected() {
    let env = environment();
    env.register_object_source("broken", "function process(delta, input) end");
    let err = env.exec("test", "overworld.newWorldObject('broken')").expect_err("create is required");
    match err {
        EngineError::ScriptContract { missing, .. } => assert_eq!(missing, vec!["create".to_string()]),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn failing_create_discards_the_object() {
    let env = environment();
    env.register_object_source("fragile", "function create(obj) error('boom') end");
    let err = env.exec("test", "overworld.newWorldObject('fragile')").expect_err("create raises");
    match err {
        EngineError::ScriptRuntime { message, .. } => assert!(message.contains("boom"), "{message}"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(env.state().loose_objects.is_empty());
}

#[test]
fn destroyed_objects_become_stale() {
    let env = environment();
    run(
        &env,
        r#"
        created = {}
        calls = { original = 0 }
        obj = overworld.newWorldObject("npcs.guard")
        obj:destroy()
        listed = #overworld.newWorldRoom("field"):getObjects()
        ok, err = pcall(obj.getPosition, obj)
        message = tostring(err)
        "#,
    );
    assert_eq!(global::<i64>(&env, "listed"), 0);
    assert!(env.state().loose_objects.is_empty());
    assert!(!global::<bool>(&env, "ok"));
    let message: String = global(&env, "message");
    assert!(message.contains("stale reference"), "{message}");
}
