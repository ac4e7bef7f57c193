use mlua::{Function, Lua, Table, Value};

use crate::overworld;
use crate::scripting::bridge::Handle;
use crate::scripting::{invoke_logged, log_engine_error, with_engine};

/// Engine continuation run when a task finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskHook {
    ExitTransition,
    EntryTransition,
}

#[derive(Debug)]
pub struct Task {
    id: Handle,
    name: String,
    table: Table,
    hook: Option<TaskHook>,
}

impl Task {
    pub fn new(id: Handle, table: Table, hook: Option<TaskHook>) -> Self {
        let name = match table.raw_get::<Value>("name") {
            Ok(Value::String(name)) => name.to_string_lossy().to_string(),
            _ => format!("task#{id}"),
        };
        Self { id, name, table, hook }
    }

    pub fn id(&self) -> Handle {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Cooperative tasks advanced once per tick in insertion order. Tasks pushed during a pass
/// wait in `incoming` until the next one.
#[derive(Debug, Default)]
pub struct Scheduler {
    active: Vec<Task>,
    incoming: Vec<Task>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, task: Task) {
        tracing::debug!(tag = "scheduler", task = %task.name, id = %task.id, "task queued");
        self.incoming.push(task);
    }

    pub fn contains(&self, id: Handle) -> bool {
        self.active.iter().chain(self.incoming.iter()).any(|task| task.id == id)
    }

    pub fn len(&self) -> usize {
        self.active.len() + self.incoming.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Promotes queued tasks and returns the roster for this pass.
    fn begin_pass(&mut self) -> Vec<(Handle, String, Table)> {
        self.active.append(&mut self.incoming);
        self.active.iter().map(|task| (task.id, task.name.clone(), task.table.clone())).collect()
    }

    fn finish(&mut self, done: &[Handle]) -> Vec<Task> {
        let (finished, remaining): (Vec<Task>, Vec<Task>) =
            std::mem::take(&mut self.active).into_iter().partition(|task| done.contains(&task.id));
        self.active = remaining;
        finished
    }

    pub fn clear(&mut self) {
        self.active.clear();
        self.incoming.clear();
    }
}

/// One scheduler pass: every task's `process(delta, input)` runs once; tasks that return true or
/// raise are removed afterwards, then their `onFinish` and engine hook run.
pub fn process(lua: &Lua, delta: f32, input: &Value) {
    let roster = match with_engine(lua, |state| Ok(state.scheduler.begin_pass())) {
        Ok(roster) => roster,
        Err(err) => return log_engine_error("scheduler", &err),
    };

    let mut done = Vec::new();
    for (id, name, table) in roster {
        let finished = match table.get::<Option<Function>>("process") {
            Ok(Some(process)) => match invoke_logged::<Value>(&name, "process", &process, (delta, input.clone())) {
                Some(result) => !matches!(result, Value::Nil | Value::Boolean(false)),
                None => true,
            },
            _ => {
                tracing::warn!(tag = "scheduler", task = %name, "task has no process function");
                true
            }
        };
        if finished {
            done.push(id);
        }
    }
    if done.is_empty() {
        return;
    }

    let finished = match with_engine(lua, |state| Ok(state.scheduler.finish(&done))) {
        Ok(finished) => finished,
        Err(err) => return log_engine_error("scheduler", &err),
    };
    for task in finished {
        tracing::debug!(tag = "scheduler", task = %task.name, "task finished");
        if let Ok(Some(on_finish)) = task.table.get::<Option<Function>>("onFinish") {
            invoke_logged::<()>(&task.name, "onFinish", &on_finish, ());
        }
        match task.hook {
            Some(TaskHook::ExitTransition) => overworld::finish_exit_transition(lua),
            Some(TaskHook::EntryTransition) => overworld::finish_entry_transition(lua),
            None => {}
        }
    }
}
