//! Settings loader
//!
//! Resolution order: defaults, then the JSON settings file (explicit path or
//! `RESINDEX_CONFIG`), then `RESINDEX_*` environment overrides. Validation
//! runs last, so an invalid override is reported as a configuration error.

use crate::config::Settings;
use resindex_core::{
    Error, Result, ResultExt, RESINDEX_CONFIG_VAR, RESINDEX_MAX_QUEUE_SIZE_VAR,
    RESINDEX_MAX_RETRIES_VAR, RESINDEX_ON_LLM_UNAVAILABLE_VAR, RESINDEX_RETRY_DELAYS_VAR,
    RESINDEX_RETRY_QUEUE_PATH_VAR,
};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Builder that resolves the final `Settings`
pub struct SettingsLoader {
    /// Explicit settings file; must exist when given
    file: Option<PathBuf>,
    /// Whether to consult `RESINDEX_*` variables
    use_env: bool,
}

impl SettingsLoader {
    pub fn new() -> Self {
        Self {
            file: None,
            use_env: true,
        }
    }

    /// Read settings from this JSON file
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Enable or disable environment overrides
    pub fn env(mut self, use_env: bool) -> Self {
        self.use_env = use_env;
        self
    }

    /// Resolve and validate the settings
    pub fn load(self) -> Result<Settings> {
        let file = self.file.clone().or_else(|| {
            if self.use_env {
                std::env::var_os(RESINDEX_CONFIG_VAR).map(PathBuf::from)
            } else {
                None
            }
        });

        let mut settings = match file {
            Some(path) => read_settings_file(&path)?,
            None => Settings::default(),
        };

        if self.use_env {
            apply_env_overrides(&mut settings)?;
        }

        settings.validate()?;
        Ok(settings)
    }
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a settings file; missing sections and fields keep their defaults
pub fn read_settings_file(path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::file_system(path, "read settings file", e))?;
    let settings: Settings = serde_json::from_str(&content)
        .with_context(|| format!("invalid settings file '{}'", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded settings file");
    Ok(settings)
}

fn apply_env_overrides(settings: &mut Settings) -> Result<()> {
    let indexer = &mut settings.indexer;

    if let Some(policy) = env_parsed(RESINDEX_ON_LLM_UNAVAILABLE_VAR)? {
        indexer.on_llm_unavailable = policy;
    }
    if let Some(max_retries) = env_parsed(RESINDEX_MAX_RETRIES_VAR)? {
        indexer.max_retries = max_retries;
    }
    if let Some(max_queue_size) = env_parsed(RESINDEX_MAX_QUEUE_SIZE_VAR)? {
        indexer.max_queue_size = max_queue_size;
    }
    if let Some(raw) = env_value(RESINDEX_RETRY_DELAYS_VAR) {
        indexer.retry_delays_secs = parse_delays(&raw)?;
    }
    if let Some(raw) = env_value(RESINDEX_RETRY_QUEUE_PATH_VAR) {
        // "none" or "memory" disables persistence
        indexer.retry_queue_path = match raw.to_ascii_lowercase().as_str() {
            "none" | "memory" => None,
            _ => Some(PathBuf::from(raw)),
        };
    }
    Ok(())
}

fn env_value(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parsed<T>(var: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_value(var) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::configuration(format!("invalid {var}='{raw}': {e}"))),
    }
}

/// Parse a comma separated list of seconds, e.g. `"60,300,900"`
pub fn parse_delays(raw: &str) -> Result<Vec<u64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u64>().map_err(|e| {
                Error::configuration(format!("invalid retry delay '{part}': {e}"))
            })
        })
        .collect()
}
