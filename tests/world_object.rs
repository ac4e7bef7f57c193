use glam::Vec2;
use tailor_engine::config::EngineConfig;
use tailor_engine::input::InputData;
use tailor_engine::render::{DrawCommand, DrawList};
use tailor_engine::Environment;

const DT: f32 = 1.0 / 60.0;

const CRATE_SCRIPT: &str = r#"
function create(obj, name, z, priority)
    if name then
        obj:setAnimation("idle", animation.new("props", name, 4, 0.25))
        obj:setZ(z)
        obj:setPriority(priority)
    end
end

function onRender()
    rendered[#rendered + 1] = true
end
"#;

fn environment() -> Environment {
    let env = Environment::new("objects", EngineConfig::default()).expect("environment");
    env.register_object_source("crate", CRATE_SCRIPT);
    env.register_room_source("field", "function create(room) end", None);
    env
}

fn run(env: &Environment, code: &str) {
    env.exec("test", code).expect("script should run");
}

fn global<T: mlua::FromLua>(env: &Environment, name: &str) -> T {
    env.lua().globals().get::<T>(name).expect("global")
}

fn assert_near(actual: f64, expected: f64, label: &str) {
    assert!((actual - expected).abs() < 1e-3, "{label}: expected {expected}, got {actual}");
}

#[test]
fn position_survives_adoption_and_release() {
    let env = environment();
    run(
        &env,
        r#"
        obj = overworld.newWorldObject("crate")
        obj:setPosition(10, 20)
        x0, y0 = obj:getPosition()
        room = overworld.newWorldRoom("field")
        room:registerObject(obj)
        x1, y1 = obj:getPosition()
        obj:setPosition(-3, 4.5)
        x2, y2 = obj:getPosition()
        room:removeObject(obj)
        x3, y3 = obj:getPosition()
        "#,
    );
    for (x, y, expected) in [("x0", "y0", (10.0, 20.0)), ("x1", "y1", (10.0, 20.0)), ("x2", "y2", (-3.0, 4.5)), ("x3", "y3", (-3.0, 4.5))] {
        assert_near(global(&env, x), expected.0, x);
        assert_near(global(&env, y), expected.1, y);
    }
}

#[test]
fn rotation_reads_back_in_degrees() {
    let env = environment();
    run(
        &env,
        r#"
        obj = overworld.newWorldObject("crate")
        obj:setRotation(90)
        loose = obj:getRotation()
        room = overworld.newWorldRoom("field")
        room:registerObject(obj)
        adopted = obj:getRotation()
        obj:setRotation(-45)
        turned = obj:getRotation()
        obj:setRotation(270)
        three_quarters = obj:getRotation()
        obj:setRotation(720)
        two_turns = obj:getRotation()
        overworld.setCurrentRoom(room, false)
        "#,
    );
    assert_near(global(&env, "loose"), 90.0, "loose");
    assert_near(global(&env, "adopted"), 90.0, "adopted");
    assert_near(global(&env, "turned"), -45.0, "turned");
    assert_near(global(&env, "three_quarters"), 270.0, "three_quarters");
    assert_near(global(&env, "two_turns"), 720.0, "two_turns");

    env.process(DT, &InputData::default());
    run(&env, "stepped = obj:getRotation() room:removeObject(obj) released = obj:getRotation()");
    assert_near(global(&env, "stepped"), 720.0, "stepped");
    assert_near(global(&env, "released"), 720.0, "released");
}

#[test]
fn negative_scale_clamps_to_zero_everywhere() {
    let env = environment();
    run(
        &env,
        r#"
        obj = overworld.newWorldObject("crate")
        obj:createBoundingBox("body")
        obj:createBoundingBox("feet", 2)
        obj:setScale(-1)
        scale = obj:getScale()
        body_scale = obj:getBoundingBox("body"):getScale()
        feet_scale = obj:getBoundingBox("feet"):getScale()
        "#,
    );
    assert_near(global(&env, "scale"), 0.0, "scale");
    assert_near(global(&env, "body_scale"), 0.0, "body");
    assert_near(global(&env, "feet_scale"), 0.0, "feet");
}

#[test]
fn bounding_box_kinds_follow_their_codes() {
    let env = environment();
    run(
        &env,
        r#"
        obj = overworld.newWorldObject("crate")
        rect = obj:createBoundingBox("body"):getShapeType()
        circle = obj:createBoundingBox("feet", 2):getShapeType()
        odd = obj:createBoundingBox("odd", 7):getShapeType()
        circle_resized = obj:getBoundingBox("feet"):setRadius(3)
        rect_as_circle = obj:getBoundingBox("body"):setRadius(3)
        removed = obj:removeBoundingBox("odd")
        removed_again = obj:removeBoundingBox("odd")
        missing = obj:getBoundingBox("odd")
        "#,
    );
    assert_eq!(global::<i64>(&env, "rect"), 1);
    assert_eq!(global::<i64>(&env, "circle"), 2);
    assert_eq!(global::<i64>(&env, "odd"), 2);
    assert!(global::<bool>(&env, "circle_resized"));
    assert!(!global::<bool>(&env, "rect_as_circle"));
    assert!(global::<bool>(&env, "removed"));
    assert!(!global::<bool>(&env, "removed_again"));
    assert!(matches!(global::<mlua::Value>(&env, "missing"), mlua::Value::Nil));
}

#[test]
fn velocity_needs_a_body() {
    let env = environment();
    run(
        &env,
        r#"
        obj = overworld.newWorldObject("crate")
        loose_velocity = obj:getVelocity()
        obj:setVelocity(1, 2)
        room = overworld.newWorldRoom("field")
        room:registerObject(obj)
        obj:setVelocity(3, 0)
        vx, vy = obj:getVelocity()
        obj:setVelocity(nil, 5)
        kept_x, new_y = obj:getVelocity()
        "#,
    );
    assert!(matches!(global::<mlua::Value>(&env, "loose_velocity"), mlua::Value::Nil));
    assert_near(global(&env, "vx"), 3.0, "vx");
    assert_near(global(&env, "vy"), 0.0, "vy");
    assert_near(global(&env, "kept_x"), 3.0, "kept_x");
    assert_near(global(&env, "new_y"), 5.0, "new_y");
}

#[test]
fn body_types_reject_unknown_codes() {
    let env = environment();
    run(
        &env,
        r#"
        obj = overworld.newWorldObject("crate")
        obj:setBodyType(2)
        loose_type = obj:getBodyType()
        room = overworld.newWorldRoom("field")
        room:registerObject(obj)
        adopted_type = obj:getBodyType()
        ok, err = pcall(obj.setBodyType, obj, 9)
        message = tostring(err)
        ok_layer = pcall(obj.setCollisionLayer, obj, 16)
        "#,
    );
    assert_eq!(global::<i64>(&env, "loose_type"), 2);
    assert_eq!(global::<i64>(&env, "adopted_type"), 2);
    assert!(!global::<bool>(&env, "ok"));
    assert!(global::<String>(&env, "message").contains("unknown body type 9"));
    assert!(!global::<bool>(&env, "ok_layer"));
}

#[test]
fn animation_slots_store_and_clear() {
    let env = environment();
    run(
        &env,
        r#"
        obj = overworld.newWorldObject("crate")
        obj:setAnimation("walk", animation.new("kris", "walk_down", 4, 0.25))
        walk = obj:getAnimation("walk")
        walk_name = walk:getName()
        walk_set = walk:getSet()
        walk_frames = walk:getFrameCount()
        obj:setAnimation("walk", nil)
        cleared = obj:getAnimation("walk")
        "#,
    );
    assert_eq!(global::<String>(&env, "walk_name"), "walk_down");
    assert_eq!(global::<String>(&env, "walk_set"), "kris");
    assert_eq!(global::<i64>(&env, "walk_frames"), 4);
    assert!(matches!(global::<mlua::Value>(&env, "cleared"), mlua::Value::Nil));
}

#[test]
fn render_orders_by_z_then_priority() {
    let env = environment();
    run(
        &env,
        r#"
        rendered = {}
        room = overworld.newWorldRoom("field")
        overworld.setCurrentRoom(room, false)
        room:registerObject(overworld.newWorldObject("crate", "front", 2, 0))
        room:registerObject(overworld.newWorldObject("crate", "back", 0, 5))
        room:registerObject(overworld.newWorldObject("crate", "middle", 1, 0))
        room:registerObject(overworld.newWorldObject("crate", "middle_top", 1, 3))
        hidden = overworld.newWorldObject("crate", "hidden", 3, 0)
        hidden:setVisible(false)
        room:registerObject(hidden)
        "#,
    );
    let mut draws = DrawList::new();
    env.render(&mut draws);
    assert_eq!(draws.animation_names(), vec!["back", "middle", "middle_top", "front"]);
    let rendered: mlua::Table = global(&env, "rendered");
    assert_eq!(rendered.raw_len(), 5);
}

#[test]
fn draws_lift_by_height_and_show_hitboxes_on_request() {
    let env = environment();
    run(
        &env,
        r#"
        rendered = {}
        room = overworld.newWorldRoom("field")
        overworld.setCurrentRoom(room, false)
        obj = overworld.newWorldObject("crate", "lifted", 0, 0)
        obj:setPosition(1, 2)
        obj:setHeight(3)
        obj:createBoundingBox("body")
        obj:createBoundingBox("feet", 2)
        room:registerObject(obj)
        "#,
    );
    let mut draws = DrawList::new();
    env.render(&mut draws);
    assert_eq!(draws.hitbox_count(), 0);
    let position = draws
        .commands()
        .iter()
        .find_map(|command| match command {
            DrawCommand::Animation { position, .. } => Some(*position),
            _ => None,
        })
        .expect("animation drawn");
    assert!((position - Vec2::new(1.0, 5.0)).length() < 1e-4, "{position:?}");

    run(&env, "overworld.setRenderingHitboxes(true)");
    env.process(DT, &InputData::default());
    let mut draws = DrawList::new();
    env.render(&mut draws);
    assert_eq!(draws.hitbox_count(), 2);
}
