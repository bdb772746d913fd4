use crate::core::error::GridplanError;
use crate::core::store::PROJECT_DIR_NAME;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Engine configuration from `.gridplan/config.toml`. Every field has a default.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub engine: EngineSection,
    pub temporal: TemporalSection,
    pub validation: ValidationSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineSection {
    /// Actor recorded in the broker audit log and lifecycle events.
    pub actor: String,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            actor: "gridplan".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TemporalSection {
    /// Upper bound on an asset's operational lifetime; longer lifetimes are rejected.
    pub max_lifetime_periods: u32,
    /// Expand portfolio assets on the rayon pool instead of sequentially.
    pub parallel_expansion: bool,
}

impl Default for TemporalSection {
    fn default() -> Self {
        Self {
            max_lifetime_periods: 200,
            parallel_expansion: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ValidationSection {
    /// Warn when an existing asset lists periods the temporal subscenario does not define.
    pub warn_on_out_of_study_periods: bool,
}

impl Default for ValidationSection {
    fn default() -> Self {
        Self {
            warn_on_out_of_study_periods: true,
        }
    }
}

impl EngineConfig {
    pub fn parse(content: &str) -> Result<Self, GridplanError> {
        toml::from_str(content).map_err(|e| GridplanError::ConfigError(e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String, GridplanError> {
        toml::to_string_pretty(self).map_err(|e| GridplanError::ConfigError(e.to_string()))
    }
}

/// Load config from `<project>/.gridplan/config.toml`.
/// No config file means defaults (not an error).
pub fn load_config(project_root: &Path) -> Result<EngineConfig, GridplanError> {
    let config_path = project_root.join(PROJECT_DIR_NAME).join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        return Ok(EngineConfig::default());
    }
    let content = fs::read_to_string(&config_path).map_err(GridplanError::IoError)?;
    EngineConfig::parse(&content)
}

/// Write the default config unless one already exists. Returns true when written.
pub fn write_default_config(project_root: &Path) -> Result<bool, GridplanError> {
    let dir = project_root.join(PROJECT_DIR_NAME);
    let config_path = dir.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        return Ok(false);
    }
    fs::create_dir_all(&dir).map_err(GridplanError::IoError)?;
    fs::write(&config_path, EngineConfig::default().to_toml()?).map_err(GridplanError::IoError)?;
    Ok(true)
}
