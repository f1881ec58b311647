use std::path::Path;

use anyhow::{Context, Result};
use kronos_engine::EngineConfig;
use serde::Deserialize;

/// Optional TOML overrides applied on top of a scenario's defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunOverrides {
    /// Ensemble size.
    pub members: Option<usize>,
    /// Number of time steps.
    pub steps: Option<u64>,
    /// Time increment per step.
    pub dt: Option<f64>,
    /// Batch reporting interval.
    pub batch: Option<u64>,
    /// Global RNG seed.
    pub seed: Option<u64>,
}

/// Reads overrides from a TOML file.
pub fn load(path: &Path) -> Result<RunOverrides> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    toml::from_str(&text).context("failed to parse TOML config")
}

/// Applies the overrides to a scenario's engine configuration.
pub fn apply(config: EngineConfig, overrides: &RunOverrides) -> EngineConfig {
    let mut config = config;
    if let Some(members) = overrides.members {
        config = config.with_members(members);
    }
    if let Some(steps) = overrides.steps {
        config = config.with_steps(steps);
    }
    if let Some(dt) = overrides.dt {
        config = config.with_dt(dt);
    }
    if let Some(batch) = overrides.batch {
        config = config.with_batch(batch);
    }
    config
}
