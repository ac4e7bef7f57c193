//! Headless driver: load configuration, build an environment, run the main script, then tick
//! at a fixed delta while recording each frame into a [`DrawList`].

use std::path::Path;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::cli::CliOverrides;
use crate::config::EngineConfig;
use crate::environment::Environment;
use crate::input::InputTracker;
use crate::render::DrawList;

const DEFAULT_CONFIG_PATH: &str = "config/tailor.json";
pub const DEFAULT_TICKS: u64 = 600;

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    pub ran_main: bool,
    pub last_frame_commands: usize,
}

pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).compact().try_init();
}

/// Resolves the configuration file (explicit `--config`, else the default path when present)
/// and applies the remaining command-line overrides on top.
pub fn load_config(cli: CliOverrides) -> Result<EngineConfig> {
    let mut config = match cli.config_path() {
        Some(path) => EngineConfig::load(path)?,
        None if Path::new(DEFAULT_CONFIG_PATH).is_file() => EngineConfig::load_or_default(DEFAULT_CONFIG_PATH),
        None => EngineConfig::default(),
    };
    let overrides = cli.into_config_overrides();
    if !overrides.is_empty() {
        tracing::info!(tag = "config", fields = ?overrides.applied_fields(), "applied command-line overrides");
    }
    config.apply_overrides(&overrides);
    Ok(config)
}

pub fn run(config: EngineConfig) -> Result<RunSummary> {
    let ticks = config.runtime.max_ticks.unwrap_or(DEFAULT_TICKS);
    let delta = config.runtime.fixed_delta;
    let env = Environment::from_config("main", config).context("Failed to build the environment")?;
    let ran_main = env.run_main()?;

    let mut input = InputTracker::new();
    let mut frame = DrawList::new();
    for _ in 0..ticks {
        let snapshot = input.snapshot(delta);
        env.process(delta, &snapshot);
        frame.clear();
        env.render(&mut frame);
    }
    Ok(RunSummary { ticks, ran_main, last_frame_commands: frame.commands().len() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_win_over_defaults() {
        let cli = CliOverrides::parse(["tailor", "--ticks", "3", "--delta", "0.5"]).expect("parse");
        let config = load_config(cli).expect("config");
        assert_eq!(config.runtime.max_ticks, Some(3));
        assert_eq!(config.runtime.fixed_delta, 0.5);
    }

    #[test]
    fn empty_asset_tree_runs_to_completion() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = EngineConfig::default();
        config.assets.root = dir.path().to_path_buf();
        config.runtime.max_ticks = Some(5);
        let summary = run(config).expect("run");
        assert_eq!(summary, RunSummary { ticks: 5, ran_main: false, last_frame_commands: 1 });
        assert!(dir.path().join("objects").is_dir(), "missing catalog directories are created");
    }
}
