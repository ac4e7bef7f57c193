use thiserror::Error;

use crate::scripting::bridge::Handle;

#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("bad argument: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("bad argument count to '{function}': expected {}, got {got}", arity_label(.min, .max))]
    ArgumentArity { function: String, min: usize, max: usize, got: usize },

    #[error("bad argument #{position} to '{function}': {message}")]
    BadArgument { function: String, position: usize, message: String },

    #[error("script {script} is missing required callback(s): {}", .missing.join(", "))]
    ScriptContract { script: String, missing: Vec<String> },

    #[error("script {script} raised an error: {message}")]
    ScriptRuntime { script: String, message: String },

    #[error("state conflict: {0}")]
    StateConflict(String),

    #[error("stale reference: {typename} #{handle} no longer exists")]
    StaleReference { typename: &'static str, handle: Handle },

    #[error("no {kind} named '{name}' is registered")]
    MissingScript { kind: &'static str, name: String },

    #[error("{context}: {message}")]
    Io { context: String, message: String },
}

fn arity_label(min: &usize, max: &usize) -> String {
    if min == max {
        min.to_string()
    } else {
        format!("{min} to {max}")
    }
}

impl EngineError {
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        EngineError::TypeMismatch { expected: expected.into(), actual: actual.into() }
    }

    pub fn script_runtime(script: impl Into<String>, err: &mlua::Error) -> Self {
        if let Some(engine) = Self::from_lua(err) {
            return engine.clone();
        }
        EngineError::ScriptRuntime { script: script.into(), message: err.to_string() }
    }

    /// Walks a Lua error chain looking for an engine error raised by a bound function.
    pub fn from_lua(err: &mlua::Error) -> Option<&EngineError> {
        match err {
            mlua::Error::ExternalError(inner) => inner.downcast_ref::<EngineError>(),
            mlua::Error::CallbackError { cause, .. } => Self::from_lua(cause),
            mlua::Error::WithContext { cause, .. } => Self::from_lua(cause),
            _ => None,
        }
    }

    pub fn into_lua(self) -> mlua::Error {
        mlua::Error::external(self)
    }
}

impl From<EngineError> for mlua::Error {
    fn from(err: EngineError) -> Self {
        err.into_lua()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn arity_message_names_range() {
        let err = EngineError::ArgumentArity { function: "setPosition".into(), min: 2, max: 3, got: 5 };
        assert_eq!(err.to_string(), "bad argument count to 'setPosition': expected 2 to 3, got 5");
    }

    #[test]
    fn engine_errors_survive_a_lua_round_trip() {
        let lua_err: mlua::Error = EngineError::StateConflict("busy".into()).into();
        let wrapped = mlua::Error::CallbackError { traceback: String::new(), cause: Arc::new(lua_err) };
        let recovered = EngineError::from_lua(&wrapped).expect("engine error in chain");
        assert!(matches!(recovered, EngineError::StateConflict(msg) if msg == "busy"));
    }
}
