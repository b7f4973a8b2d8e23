use anyhow::{Context as AnyhowContext, Result};
use orgtree_core::EngineConfig;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming the config file when `--config` is absent
pub(crate) const CONFIG_ENV: &str = "ORGTREE_CONFIG";

/// Resolve and load the engine config: `--config`, then `ORGTREE_CONFIG`,
/// then built-in defaults.
pub(crate) fn load_config(explicit: Option<&Path>) -> Result<EngineConfig> {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(|| env::var_os(CONFIG_ENV).map(PathBuf::from));

    let Some(path) = path else {
        log::debug!("No config given, using defaults");
        return Ok(EngineConfig::default());
    };

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config =
        parse_config(&raw).with_context(|| format!("Invalid config {}", path.display()))?;
    log::debug!(
        "Loaded config {} ({} additive, {} ratio metrics)",
        path.display(),
        config.metrics.additive.len(),
        config.metrics.ratios.len()
    );
    Ok(config)
}

pub(crate) fn parse_config(raw: &str) -> Result<EngineConfig> {
    let config: EngineConfig = toml::from_str(raw)?;
    config.validate()?;
    Ok(config)
}
