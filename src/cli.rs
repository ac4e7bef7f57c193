use crate::config::EngineConfigOverrides;
use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CliOverrides {
    config: Option<PathBuf>,
    assets: Option<PathBuf>,
    main: Option<String>,
    ticks: Option<u64>,
    delta: Option<f32>,
    hitboxes: Option<bool>,
}

impl CliOverrides {
    pub fn parse_from_env() -> Result<Self> {
        Self::parse(env::args())
    }

    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut overrides = CliOverrides::default();
        let mut iter = args.into_iter();
        let _ = iter.next(); // skip program name if present
        while let Some(raw_flag) = iter.next() {
            let flag = raw_flag.as_ref();
            if !flag.starts_with("--") {
                bail!("Unexpected argument '{flag}'. Flags take the form --name value.");
            }
            let key = &flag[2..];
            let value =
                iter.next().ok_or_else(|| anyhow!("Expected a value after '{flag}'"))?.as_ref().to_string();
            match key {
                "config" => overrides.config = Some(PathBuf::from(value)),
                "assets" => overrides.assets = Some(PathBuf::from(value)),
                "main" => overrides.main = Some(value),
                "ticks" => {
                    overrides.ticks =
                        Some(value.parse::<u64>().with_context(|| format!("Invalid tick count '{value}'"))?);
                }
                "delta" => {
                    let delta = value.parse::<f32>().with_context(|| format!("Invalid delta '{value}'"))?;
                    if !(delta > 0.0) {
                        bail!("Invalid delta '{value}'. The fixed delta must be positive.");
                    }
                    overrides.delta = Some(delta);
                }
                "hitboxes" => overrides.hitboxes = Some(parse_bool_flag("hitboxes", &value)?),
                _ => bail!(
                    "Unknown flag '{flag}'. Supported flags: --config, --assets, --main, --ticks, --delta, --hitboxes."
                ),
            }
        }
        Ok(overrides)
    }

    pub fn config_path(&self) -> Option<&PathBuf> {
        self.config.as_ref()
    }

    pub fn into_config_overrides(self) -> EngineConfigOverrides {
        EngineConfigOverrides {
            assets_root: self.assets,
            main: self.main,
            ticks: self.ticks,
            delta: self.delta,
            hitboxes: self.hitboxes,
        }
    }
}

fn parse_bool_flag(flag: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        other => bail!("Invalid {flag} value '{other}'. Use on/off or true/false."),
    }
}
