use crate::{ExclusionSet, HashAlgorithm, ZCompareError};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "zcompare.toml";

pub const DEFAULT_MAX_ARCHIVE_SIZE_MB: u64 = 50;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Largest accepted archive, in MiB
    #[serde(default = "default_max_archive_size_mb")]
    pub max_archive_size_mb: u64,

    /// Extensions excluded from every comparison (e.g. ".log")
    #[serde(default)]
    pub default_exclusions: Vec<String>,

    /// Content hash used for equally sized entries
    #[serde(default)]
    pub hash_algorithm: HashAlgorithm,

    /// Enable portable mode (config alongside binary)
    #[serde(default)]
    pub portable_mode: bool,
}

fn default_max_archive_size_mb() -> u64 {
    DEFAULT_MAX_ARCHIVE_SIZE_MB
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_archive_size_mb: DEFAULT_MAX_ARCHIVE_SIZE_MB,
            default_exclusions: Vec::new(),
            hash_algorithm: HashAlgorithm::default(),
            portable_mode: false,
        }
    }
}

impl AppConfig {
    pub fn compare_options(&self) -> CompareOptions {
        CompareOptions::default()
            .with_max_archive_size_mb(self.max_archive_size_mb)
            .with_hash_algorithm(self.hash_algorithm)
    }

    pub fn exclusions(&self) -> ExclusionSet {
        ExclusionSet::from_list(&self.default_exclusions)
    }
}

/// Tunables for a single comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompareOptions {
    /// Largest accepted serialized archive, in bytes
    pub max_archive_size: u64,
    pub hash_algorithm: HashAlgorithm,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            max_archive_size: DEFAULT_MAX_ARCHIVE_SIZE_MB * 1024 * 1024,
            hash_algorithm: HashAlgorithm::default(),
        }
    }
}

impl CompareOptions {
    pub fn with_max_archive_size_mb(mut self, megabytes: u64) -> Self {
        self.max_archive_size = megabytes.saturating_mul(1024 * 1024);
        self
    }

    pub fn with_max_archive_size(mut self, bytes: u64) -> Self {
        self.max_archive_size = bytes;
        self
    }

    pub fn with_hash_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.hash_algorithm = algorithm;
        self
    }

    /// The limit as shown in messages, in whole MiB
    pub fn max_archive_size_mb(&self) -> u64 {
        self.max_archive_size / (1024 * 1024)
    }
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: AppConfig,
    pub path: PathBuf,
    pub exists: bool,
    pub portable: bool,
}

pub fn load_config(prefer_portable: bool) -> Result<LoadedConfig, ZCompareError> {
    let (path, portable) = resolve_config_path(prefer_portable)?;
    load_config_from(path, portable)
}

pub fn load_config_from(path: PathBuf, portable: bool) -> Result<LoadedConfig, ZCompareError> {
    let exists = path.exists();

    let mut config = if exists {
        let data = fs::read_to_string(&path)?;
        toml::from_str(&data).map_err(|e| ZCompareError::Serialization(e.to_string()))?
    } else {
        AppConfig::default()
    };

    if config.max_archive_size_mb == 0 {
        return Err(ZCompareError::Config(
            "max_archive_size_mb must be greater than zero".to_string(),
        ));
    }

    config.portable_mode = portable;

    Ok(LoadedConfig {
        config,
        path,
        exists,
        portable,
    })
}

pub fn ensure_config(prefer_portable: bool) -> Result<LoadedConfig, ZCompareError> {
    let loaded = load_config(prefer_portable)?;
    if !loaded.exists {
        save_config(&loaded.path, &loaded.config)?;
    }
    Ok(loaded)
}

pub fn save_config(path: &Path, config: &AppConfig) -> Result<(), ZCompareError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let data = toml::to_string_pretty(config)
        .map_err(|e| ZCompareError::Serialization(e.to_string()))?;
    fs::write(path, data)?;
    Ok(())
}

fn resolve_config_path(prefer_portable: bool) -> Result<(PathBuf, bool), ZCompareError> {
    if let Some(portable_path) = portable_config_path() {
        if prefer_portable || portable_path.exists() {
            return Ok((portable_path, true));
        }
    }

    let dirs = ProjectDirs::from("", "aecs4u", "zcompare")
        .ok_or_else(|| ZCompareError::Config("Unable to determine config directory".to_string()))?;
    Ok((dirs.config_dir().join(CONFIG_FILE_NAME), false))
}

fn portable_config_path() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|path| path.parent().map(|dir| dir.join(CONFIG_FILE_NAME)))
}
