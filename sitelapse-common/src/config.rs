//! Project configuration loading
//!
//! A sitelapse deployment serves one construction project per config file.
//! The config path resolves with the usual priority order:
//! 1. Command-line argument (highest priority)
//! 2. `SITELAPSE_CONFIG` environment variable
//! 3. Platform config directory (`~/.config/sitelapse/project.toml`)

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming the project config file
pub const CONFIG_ENV_VAR: &str = "SITELAPSE_CONFIG";

/// Anchor mapping week numbers in the progress spreadsheet to calendar dates
///
/// Source spreadsheets number weeks from an arbitrary project-specific
/// origin; `anchor_week` starts at `anchor_start` and every other week is
/// offset by whole 7-day steps from there.
#[derive(Debug, Clone, Deserialize)]
pub struct WeeklyPlanConfig {
    /// Week number whose start date is known
    pub anchor_week: u32,
    /// Start-of-week instant for `anchor_week` (RFC 3339 string in TOML)
    pub anchor_start: DateTime<Utc>,
    /// Optional URL of the published progress table
    #[serde(default)]
    pub url: Option<String>,
}

/// Per-project configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    /// Internal project identifier, used in entity ids and cache keys
    pub project_id: String,
    /// Upstream business identifier required by the asset API
    #[serde(default)]
    pub business_id: String,
    /// Base URL of the upstream asset API
    #[serde(default)]
    pub api_base_url: String,
    /// API key sent as the `ax-api-key` header
    #[serde(default)]
    pub api_key: Option<String>,
    /// Project timeline start (RFC 3339 string in TOML)
    pub start_date: DateTime<Utc>,
    /// Project timeline end (RFC 3339 string in TOML)
    pub end_date: DateTime<Utc>,
    /// Clock multiplier for animated layers (seconds of scene time per
    /// second of wall time); one day per second by default
    #[serde(default = "default_playback_multiplier")]
    pub playback_multiplier: i64,
    /// Optional GeoJSON geometry restricting the upstream asset query
    #[serde(default)]
    pub polygon_geojson: Option<serde_json::Value>,
    /// Weekly progress plan anchoring, if the project publishes one
    #[serde(default)]
    pub weekly_plan: Option<WeeklyPlanConfig>,
}

fn default_playback_multiplier() -> i64 {
    86_400
}

impl ProjectConfig {
    /// Load and validate a project config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: ProjectConfig = toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field requirements that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.project_id.is_empty() {
            return Err(Error::Config("project_id must not be empty".to_string()));
        }
        if self.start_date > self.end_date {
            return Err(Error::Config(format!(
                "start_date {} is after end_date {}",
                self.start_date, self.end_date
            )));
        }
        Ok(())
    }

    /// Validate the fields required to query the upstream asset API.
    ///
    /// A project without upstream credentials is still viewable (empty
    /// scene), so this is checked at fetch time, not at load time.
    pub fn validate_for_fetch(&self) -> Result<()> {
        if self.business_id.is_empty() {
            return Err(Error::Config(
                "business_id is required to query the asset API".to_string(),
            ));
        }
        if self.api_base_url.is_empty() {
            return Err(Error::Config(
                "api_base_url is required to query the asset API".to_string(),
            ));
        }
        Ok(())
    }
}

/// Resolve the config file path following the priority order
pub fn resolve_config_path(cli_arg: Option<&str>) -> Result<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Ok(PathBuf::from(path));
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return Ok(PathBuf::from(path));
    }

    // Priority 3: Platform config directory
    let default = dirs::config_dir().map(|d| d.join("sitelapse").join("project.toml"));
    match default {
        Some(path) if path.exists() => Ok(path),
        _ => Err(Error::Config(
            "no config file given and no default found".to_string(),
        )),
    }
}
