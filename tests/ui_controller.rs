use tailor_engine::config::EngineConfig;
use tailor_engine::input::InputData;
use tailor_engine::render::{DrawCommand, DrawList, RenderLayer};
use tailor_engine::Environment;

const DT: f32 = 1.0 / 60.0;

const PANEL: &str = r#"
function create(comp, tag, z, swallow)
    mytag = tag
    consume = swallow
    comp.tag = tag
    comp:setZ(z)
    ui.register(comp)
end

function process(delta, input)
    seen[#seen + 1] = mytag .. ":" .. tostring(input:isEmpty())
    return consume
end

function render()
    drawn[#drawn + 1] = mytag
end

function onDestroy()
    destroyed[#destroyed + 1] = mytag
end
"#;

const STACK: &str = r#"
seen = {}
drawn = {}
destroyed = {}
low = ui.newComponent("widgets.panel", "low", 1, false)
top = ui.newComponent("widgets.panel", "top", 10, true)
mid = ui.newComponent("widgets.panel", "mid", 5, false)
hidden = ui.newComponent("widgets.panel", "hidden", 7, false)
hidden:setVisible(false)
"#;

fn environment() -> Environment {
    let env = Environment::new("ui", EngineConfig::default()).expect("environment");
    env.register_ui_source("widgets.panel", PANEL);
    env.exec("setup", STACK).expect("setup");
    env
}

fn run(env: &Environment, code: &str) {
    env.exec("test", code).expect("script should run");
}

fn strings(env: &Environment, name: &str) -> Vec<String> {
    let table: mlua::Table = env.lua().globals().get(name).expect("global");
    table.sequence_values::<String>().map(|value| value.expect("string")).collect()
}

fn global<T: mlua::FromLua>(env: &Environment, name: &str) -> T {
    env.lua().globals().get::<T>(name).expect("global")
}

#[test]
fn input_flows_down_until_consumed() {
    let env = environment();
    env.process(DT, &InputData::new().with_pressed("confirm"));
    assert_eq!(strings(&env, "seen"), vec!["top:false", "hidden:true", "mid:true", "low:true"]);
}

#[test]
fn render_runs_bottom_up_over_visible_components() {
    let env = environment();
    let mut draws = DrawList::new();
    env.render(&mut draws);
    assert_eq!(strings(&env, "drawn"), vec!["low", "mid", "top"]);
    assert!(draws
        .commands()
        .iter()
        .any(|command| matches!(command, DrawCommand::Layer { layer: RenderLayer::Ui, .. })));
}

#[test]
fn unregistered_components_sit_out() {
    let env = environment();
    run(
        &env,
        r#"
        removed = ui.remove(mid)
        registered = mid:isRegistered()
        listed = #ui.getComponents()
        bottom = ui.getComponents()[1] == low
        "#,
    );
    assert!(global::<bool>(&env, "removed"));
    assert!(!global::<bool>(&env, "registered"));
    assert_eq!(global::<i64>(&env, "listed"), 3);
    assert!(global::<bool>(&env, "bottom"));

    env.process(DT, &InputData::new().with_pressed("confirm"));
    assert_eq!(strings(&env, "seen"), vec!["top:false", "hidden:true", "low:true"]);

    run(&env, "ui.register(mid) name = mid:getComponentName()");
    assert_eq!(global::<String>(&env, "name"), "panel");
}

#[test]
fn raising_z_moves_a_component_up_the_stack() {
    let env = environment();
    run(&env, "low:setZ(20) low_z = low:getZ()");
    assert_eq!(global::<i64>(&env, "low_z"), 20);
    env.process(DT, &InputData::default());
    assert_eq!(strings(&env, "seen"), vec!["low:true", "top:true", "hidden:true", "mid:true"]);
}

#[test]
fn destroy_runs_on_destroy_and_invalidates_the_value() {
    let env = environment();
    run(
        &env,
        r#"
        first = top:destroy()
        ok, err = pcall(top.getZ, top)
        message = tostring(err)
        second = ui.remove(top)
        "#,
    );
    assert!(global::<bool>(&env, "first"));
    assert_eq!(strings(&env, "destroyed"), vec!["top"]);
    assert!(!global::<bool>(&env, "ok"));
    assert!(global::<String>(&env, "message").contains("stale reference"));
    assert!(!global::<bool>(&env, "second"));
    assert_eq!(env.state().ui.stack().len(), 3);
}
