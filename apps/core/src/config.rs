use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const MAX_DEBOUNCE_MS: u64 = 250;

const QUALIFIER: &str = "org";
const ORGANIZATION: &str = "recoll";
const APPLICATION: &str = "recoll-launcher";

const CONFIG_DIR_ENV: &str = "RECOLL_LAUNCHER_CONFIG_DIR";
const CACHE_DIR_ENV: &str = "RECOLL_LAUNCHER_CACHE_DIR";
const DATA_DIR_ENV: &str = "RECOLL_LAUNCHER_DATA_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io failed for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid toml in '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("config could not be serialized: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("{0}")]
    Invalid(String),
    #[error("unable to determine a home directory for recoll-launcher")]
    NoHome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Collapse hits that share a container file, such as the chapters of an epub.
    pub remove_duplicates: bool,
    pub max_results: usize,
    pub max_chars: usize,
    pub context_words: usize,
    pub debounce_ms: u64,
    /// Fail the invocation instead of rendering an error row.
    pub dev_mode: bool,
    pub trigger: String,
    pub recollq_program: String,
    pub recoll_config_dir: Option<PathBuf>,
    /// Resolved per machine; written files leave these out so the environment
    /// overrides keep working.
    #[serde(skip_serializing)]
    pub config_dir: PathBuf,
    #[serde(skip_serializing)]
    pub cache_dir: PathBuf,
    #[serde(skip_serializing)]
    pub data_dir: PathBuf,
    #[serde(skip)]
    pub config_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let dirs = AppDirs::resolve().unwrap_or_else(|_| AppDirs::fallback());
        let config_path = dirs.config.join(CONFIG_FILE_NAME);
        Self {
            remove_duplicates: true,
            max_results: 10,
            max_chars: 80,
            context_words: 4,
            debounce_ms: 0,
            dev_mode: false,
            trigger: String::new(),
            recollq_program: "recollq".to_string(),
            recoll_config_dir: None,
            config_dir: dirs.config,
            cache_dir: dirs.cache,
            data_dir: dirs.data,
            config_path,
        }
    }
}

impl Config {
    pub fn logs_dir(&self) -> PathBuf {
        self.cache_dir.join("logs")
    }

    /// Directories the plugin owns, in creation order.
    pub fn plugin_dirs(&self) -> [&Path; 3] {
        [&self.cache_dir, &self.config_dir, &self.data_dir]
    }
}

pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.max_results == 0 || cfg.max_results > 100 {
        return Err(ConfigError::Invalid("max_results out of range".into()));
    }

    if cfg.max_chars == 0 {
        return Err(ConfigError::Invalid("max_chars must be positive".into()));
    }

    if cfg.debounce_ms > MAX_DEBOUNCE_MS {
        return Err(ConfigError::Invalid(format!(
            "debounce_ms must be at most {MAX_DEBOUNCE_MS}"
        )));
    }

    if cfg.recollq_program.trim().is_empty() {
        return Err(ConfigError::Invalid("recollq_program is required".into()));
    }

    Ok(())
}

/// Load the config at `path`, or at the default location when `None`.
///
/// A missing file yields defaults; the caller decides whether to persist them.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let defaults = Config::default();
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| defaults.config_path.clone());

    if !config_path.exists() {
        let mut cfg = defaults;
        cfg.config_path = config_path;
        return Ok(cfg);
    }

    let raw = std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Io {
        path: config_path.clone(),
        source,
    })?;
    let mut cfg: Config = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: config_path.clone(),
        source,
    })?;
    cfg.config_path = config_path;
    apply_env_overrides(&mut cfg);
    validate(&cfg)?;
    Ok(cfg)
}

pub fn save(cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = cfg.config_path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let encoded = toml::to_string_pretty(cfg)?;
    std::fs::write(&cfg.config_path, encoded).map_err(|source| ConfigError::Io {
        path: cfg.config_path.clone(),
        source,
    })
}

/// Environment directories beat whatever a hand-edited file says.
fn apply_env_overrides(cfg: &mut Config) {
    if let Some(dir) = dir_from_env(CONFIG_DIR_ENV) {
        cfg.config_dir = dir;
    }
    if let Some(dir) = dir_from_env(CACHE_DIR_ENV) {
        cfg.cache_dir = dir;
    }
    if let Some(dir) = dir_from_env(DATA_DIR_ENV) {
        cfg.data_dir = dir;
    }
}

struct AppDirs {
    config: PathBuf,
    cache: PathBuf,
    data: PathBuf,
}

impl AppDirs {
    fn resolve() -> Result<Self, ConfigError> {
        let env_config = dir_from_env(CONFIG_DIR_ENV);
        let env_cache = dir_from_env(CACHE_DIR_ENV);
        let env_data = dir_from_env(DATA_DIR_ENV);
        if let (Some(config), Some(cache), Some(data)) = (&env_config, &env_cache, &env_data) {
            return Ok(Self {
                config: config.clone(),
                cache: cache.clone(),
                data: data.clone(),
            });
        }

        let project = ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
            .ok_or(ConfigError::NoHome)?;
        Ok(Self {
            config: env_config.unwrap_or_else(|| project.config_dir().to_path_buf()),
            cache: env_cache.unwrap_or_else(|| project.cache_dir().to_path_buf()),
            data: env_data.unwrap_or_else(|| project.data_dir().to_path_buf()),
        })
    }

    fn fallback() -> Self {
        let base = std::env::temp_dir().join(APPLICATION);
        Self {
            config: base.join("config"),
            cache: base.join("cache"),
            data: base.join("data"),
        }
    }
}

/// An empty variable counts as unset.
fn dir_from_env(name: &str) -> Option<PathBuf> {
    let value = std::env::var_os(name)?;
    if value.is_empty() {
        None
    } else {
        Some(PathBuf::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::{validate, Config};

    #[test]
    fn default_limits_match_recoll_excerpt_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.max_results, 10);
        assert_eq!(cfg.max_chars, 80);
        assert_eq!(cfg.context_words, 4);
        assert!(cfg.remove_duplicates);
        assert!(cfg.config_path.ends_with("config.toml"));
    }

    #[test]
    fn rejects_long_debounce() {
        let cfg = Config {
            debounce_ms: 1_000,
            ..Default::default()
        };
        assert!(validate(&cfg).is_err());
    }
}
