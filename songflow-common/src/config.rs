//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV: &str = "SONGFLOW_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "songflow.db";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 3001;

/// Default bind address
pub const DEFAULT_BIND: &str = "0.0.0.0";

/// Admin password used when nothing else is configured
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// Optional TOML configuration file contents
///
/// Every field is optional; a missing file is equivalent to an empty one.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub port: Option<u16>,
    pub bind: Option<String>,
    pub admin_password: Option<String>,
    pub rate_limits: RateLimitConfig,
}

/// Per-client request limits applied by the HTTP layer
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Song and ballot submissions per client per minute
    pub submissions_per_minute: u32,
    /// Read-only polling requests per client per minute
    pub reads_per_minute: u32,
    /// Admin login attempts per client per 15 minutes
    pub logins_per_15_minutes: u32,
    /// Submissions per client per minute served without delay
    pub slow_down_after_per_minute: u32,
    /// Longest delay added to a submission past the free allowance
    pub slow_down_max_delay_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            submissions_per_minute: 10,
            reads_per_minute: 30,
            logins_per_15_minutes: 5,
            slow_down_after_per_minute: 5,
            slow_down_max_delay_ms: 2000,
        }
    }
}

impl RateLimitConfig {
    /// Limits switched off (tests, trusted deployments)
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Load and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))
}

/// Load the config file if one exists, falling back to defaults
///
/// An explicitly requested file that cannot be read is an error. The
/// platform default location is optional and silently skipped when absent.
pub fn load_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    if let Some(path) = explicit {
        let config = load_toml_config(path)?;
        info!("Loaded configuration from {}", path.display());
        return Ok(config);
    }

    match default_config_path() {
        Some(path) if path.exists() => match load_toml_config(&path) {
            Ok(config) => {
                info!("Loaded configuration from {}", path.display());
                Ok(config)
            }
            Err(e) => {
                warn!("Ignoring unreadable config file: {}", e);
                Ok(TomlConfig::default())
            }
        },
        _ => Ok(TomlConfig::default()),
    }
}

/// Platform config file location (`<config dir>/songflow/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("songflow").join("config.toml"))
}

/// Root folder resolution, highest priority first:
/// 1. Command-line argument
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    config: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// Get OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("songflow"))
        .unwrap_or_else(|| PathBuf::from("./songflow_data"))
}

/// Database file location inside a root folder
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join(DATABASE_FILE)
}
