use tailor_engine::catalog::RoomData;
use tailor_engine::config::EngineConfig;
use tailor_engine::input::InputData;
use tailor_engine::scripting::bridge::Handle;
use tailor_engine::Environment;

const DT: f32 = 1.0 / 60.0;

const PROBE: &str = r#"
function create(obj, tag, x)
    obj.tag = tag
    tag_of_self = tag
    obj:setPosition(x, 0)
    obj:createBoundingBox("body"):setDimensions(2, 2)
end

function onCollide(other)
    hits[#hits + 1] = tag_of_self .. "<-" .. other.tag
end
"#;

fn environment() -> Environment {
    let env = Environment::new("rooms", EngineConfig::default()).expect("environment");
    env.register_object_source("probe", PROBE);
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

fn hits(env: &Environment) -> Vec<String> {
    let hits: mlua::Table = global(env, "hits");
    hits.sequence_values::<String>().map(|hit| hit.expect("hit")).collect()
}

const PAIR: &str = r#"
hits = {}
room = overworld.newWorldRoom("field")
overworld.setCurrentRoom(room, false)
a = overworld.newWorldObject("probe", "a", 0)
b = overworld.newWorldObject("probe", "b", 0.5)
"#;

#[test]
fn one_sided_contact_reaches_only_the_flagged_object() {
    let env = environment();
    run(&env, PAIR);
    run(
        &env,
        r#"
        a:setOneSidedReaction(true)
        room:registerObject(a)
        room:registerObject(b)
        "#,
    );
    tick(&env);
    assert_eq!(hits(&env), vec!["a<-b".to_string()]);

    run(
        &env,
        r#"
        a_contact = a:getContacts()[1] == b
        b_contact = b:getContacts()[1] == a
        "#,
    );
    assert!(global::<bool>(&env, "a_contact"));
    assert!(global::<bool>(&env, "b_contact"));
}

#[test]
fn plain_contact_reaches_both_objects() {
    let env = environment();
    run(&env, PAIR);
    run(&env, "room:registerObject(a) room:registerObject(b)");
    tick(&env);
    let mut seen = hits(&env);
    seen.sort();
    assert_eq!(seen, vec!["a<-b".to_string(), "b<-a".to_string()]);
}

#[test]
fn ignored_pairs_never_touch() {
    let env = environment();
    run(&env, PAIR);
    run(
        &env,
        r#"
        a:setIgnoringCollisionWith(b, true)
        room:registerObject(a)
        room:registerObject(b)
        "#,
    );
    tick(&env);
    tick(&env);
    assert!(hits(&env).is_empty());
    run(&env, "contacts = #a:getContacts()");
    assert_eq!(global::<i64>(&env, "contacts"), 0);
}

#[test]
fn destroying_an_ignored_object_is_harmless() {
    let env = environment();
    run(&env, PAIR);
    run(
        &env,
        r#"
        a:setIgnoringCollisionWith(b, true)
        room:registerObject(a)
        room:registerObject(b)
        "#,
    );
    tick(&env);
    run(&env, "b:destroy() still_listed = #room:getObjects()");
    assert_eq!(global::<i64>(&env, "still_listed"), 2);
    tick(&env);
    tick(&env);
    run(
        &env,
        r#"
        remaining = #room:getObjects()
        still_ignoring = a:isIgnoringCollisionWith(b)
        ok = pcall(b.getPosition, b)
        "#,
    );
    assert_eq!(global::<i64>(&env, "remaining"), 1);
    assert!(!global::<bool>(&env, "still_ignoring"));
    assert!(!global::<bool>(&env, "ok"));
    assert!(hits(&env).is_empty());
}

#[test]
fn disabled_layer_pairs_are_filtered() {
    let env = environment();
    run(&env, PAIR);
    run(
        &env,
        r#"
        a:setCollisionLayer(3)
        room:setCollisionLayerEnabled(0, 3, false)
        mirrored = room:isCollisionLayerEnabled(3, 0)
        room:registerObject(a)
        room:registerObject(b)
        "#,
    );
    tick(&env);
    assert!(!global::<bool>(&env, "mirrored"));
    assert!(hits(&env).is_empty());
}

#[test]
fn removed_objects_leave_the_physics_world() {
    let env = environment();
    run(&env, PAIR);
    run(
        &env,
        r#"
        room:registerObject(a)
        room:registerObject(b)
        room_id = room:getID()
        "#,
    );
    let room = Handle::from_raw(global::<i64>(&env, "room_id") as u64);
    assert_eq!(env.state().room(room).expect("room").physics().collider_count(), 2);

    run(
        &env,
        r#"
        removed = room:removeObject(a)
        removed_twice = room:removeObject(a)
        owner = a:getRoom()
        velocity = a:getVelocity()
        "#,
    );
    assert!(global::<bool>(&env, "removed"));
    assert!(!global::<bool>(&env, "removed_twice"));
    assert!(matches!(global::<mlua::Value>(&env, "owner"), mlua::Value::Nil));
    assert!(matches!(global::<mlua::Value>(&env, "velocity"), mlua::Value::Nil));
    assert_eq!(env.state().room(room).expect("room").physics().collider_count(), 1);
    assert_eq!(env.state().loose_objects.len(), 1);
}

#[test]
fn every_object_is_owned_by_at_most_one_room() {
    let env = environment();
    run(&env, PAIR);
    run(
        &env,
        r#"
        other = overworld.newWorldRoom("field")
        room:registerObject(a)
        other:registerObject(b)
        other:registerObject(a)
        "#,
    );
    let state = env.state();
    let mut owned = 0;
    for (id, room) in &state.rooms {
        for object in room.objects() {
            assert_eq!(object.room(), Some(*id));
            owned += 1;
        }
    }
    assert_eq!(owned, 2);
    for object in state.loose_objects.values() {
        assert_eq!(object.room(), None);
    }
}

#[test]
fn entrypoints_come_from_data_and_scripts() {
    let env = environment();
    let data = RoomData::from_json(r#"{ "entrypoints": { "door": { "x": 4, "y": 5 } } }"#).expect("room data");
    env.register_room_source(
        "hall",
        r#"function create(room) room:registerEntrypoint("spawn", 1, 2, "town", 90) end"#,
        Some(data),
    );
    run(
        &env,
        r#"
        hall = overworld.newWorldRoom("hall")
        name = hall:getRoomName()
        door_x, door_y = hall:getEntrypoint("door"):getPosition()
        spawn = hall:getEntrypoint("spawn")
        target = spawn:getTargetRoom()
        orientation = spawn:getOrientation()
        missing = hall:getEntrypoint("window")
        "#,
    );
    assert_eq!(global::<String>(&env, "name"), "hall");
    assert_eq!(global::<f64>(&env, "door_x"), 4.0);
    assert_eq!(global::<f64>(&env, "door_y"), 5.0);
    assert_eq!(global::<String>(&env, "target"), "town");
    assert_eq!(global::<f64>(&env, "orientation"), 90.0);
    assert!(matches!(global::<mlua::Value>(&env, "missing"), mlua::Value::Nil));
}
