//! Configuration loading and TOML file discovery
//!
//! Every service setting resolves with the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! Tiers 1 and 2 are handled by the service's `clap` definitions; this module
//! covers TOML discovery and the final merge.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Directory name used under the platform config directory
const CONFIG_DIR_NAME: &str = "skyport";

/// Logging section of a TOML config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default tracing filter directive (e.g., "info", "skyport_importer=debug")
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Contents of a service TOML config file
///
/// All fields are optional; anything missing falls through to the
/// compiled default of the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// HTTP listen address (e.g., "127.0.0.1:5780")
    pub bind_addr: Option<String>,
    /// Remote personal data server base URL
    pub pds_host: Option<String>,
    /// Timeout for each remote HTTP call, in seconds
    pub http_timeout_secs: Option<u64>,
    /// Capacity of the per-import progress channel
    pub event_buffer: Option<usize>,
    /// Maximum accepted upload size, in bytes
    pub max_upload_bytes: Option<usize>,
    /// Parent directory for per-session temporary workspaces
    pub temp_root: Option<PathBuf>,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Candidate config file locations for a service, in lookup order
///
/// - `<user config dir>/skyport/<module>.toml` (e.g., ~/.config/skyport/skyport-importer.toml)
/// - `/etc/skyport/<module>.toml` (Linux only)
pub fn config_file_candidates(module_name: &str) -> Vec<PathBuf> {
    let file_name = format!("{}.toml", module_name);
    let mut candidates = Vec::new();

    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join(CONFIG_DIR_NAME).join(&file_name));
    }

    if cfg!(target_os = "linux") {
        candidates.push(PathBuf::from("/etc").join(CONFIG_DIR_NAME).join(&file_name));
    }

    candidates
}

/// First existing config file for a service, if any
pub fn find_config_file(module_name: &str) -> Option<PathBuf> {
    config_file_candidates(module_name)
        .into_iter()
        .find(|path| path.exists())
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;

    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load the TOML config for a service
///
/// An explicitly requested file must exist. Without one, the standard
/// locations are searched; finding nothing is not an error: a warning is
/// logged and an empty config (all defaults) is returned.
pub fn load_module_config(explicit: Option<&Path>, module_name: &str) -> Result<TomlConfig> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        info!("Loading config from {}", path.display());
        return load_toml_config(path);
    }

    match find_config_file(module_name) {
        Some(path) => {
            info!("Loading config from {}", path.display());
            load_toml_config(&path)
        }
        None => {
            warn!(
                "No config file found for {} (searched {:?}); using defaults",
                module_name,
                config_file_candidates(module_name)
            );
            Ok(TomlConfig::default())
        }
    }
}

/// Merge one setting: CLI/ENV value, then TOML value, then compiled default
pub fn resolve_setting<T>(cli_or_env: Option<T>, toml_value: Option<T>, default: T) -> T {
    cli_or_env.or(toml_value).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_setting_priority() {
        assert_eq!(resolve_setting(Some(1), Some(2), 3), 1);
        assert_eq!(resolve_setting(None, Some(2), 3), 2);
        assert_eq!(resolve_setting(None::<i32>, None, 3), 3);
    }

    #[test]
    fn test_empty_toml_uses_default_logging() {
        let config: TomlConfig = toml::from_str("").unwrap();
        assert_eq!(config, TomlConfig::default());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_candidates_end_with_module_file() {
        let candidates = config_file_candidates("skyport-importer");
        assert!(!candidates.is_empty());
        for path in candidates {
            assert!(path.ends_with("skyport/skyport-importer.toml"));
        }
    }
}
