pub mod animation;
pub mod camera;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod environment;
pub mod error;
pub mod events;
pub mod input;
pub mod overworld;
pub mod render;
pub mod runner;
pub mod scheduler;
pub mod scripting;
pub mod ui;

pub use environment::{Environment, EnvironmentState};
pub use error::EngineError;
pub use runner::{run, RunSummary};
