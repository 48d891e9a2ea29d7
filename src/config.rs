use crate::error::{Result, RollupError};
use serde::Deserialize;
use std::env::{self, VarError};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_PATH_ENV: &str = "ROLLUP_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "rollup.toml";

pub const TABLE_NAME_ENV: &str = "TABLE_NAME";
pub const BIND_ADDR_ENV: &str = "ROLLUP_BIND_ADDR";
pub const SQLITE_PATH_ENV: &str = "ROLLUP_SQLITE_PATH";
pub const LOG_DIR_ENV: &str = "ROLLUP_LOG_DIR";
pub const METRICS_ADDR_ENV: &str = "ROLLUP_METRICS_ADDR";

/// Process-wide settings, built once at startup and passed down explicitly
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Table holding both raw readings and aggregates
    pub table_name: String,
    pub bind_addr: String,
    /// SQLite database file; in-memory storage when unset
    pub sqlite_path: Option<PathBuf>,
    pub log_dir: PathBuf,
    /// Prometheus exporter listen address; no exporter when unset
    pub metrics_addr: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            table_name: "metric_readings".to_string(),
            bind_addr: "0.0.0.0:8080".to_string(),
            sqlite_path: None,
            log_dir: PathBuf::from("logs"),
            metrics_addr: None,
        }
    }
}

impl Config {
    /// Defaults, then the optional TOML file, then environment overrides
    pub fn load() -> Result<Self> {
        let path = env_optional(CONFIG_PATH_ENV)?
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

        let mut config = Self::from_file(&path)?;
        config.apply_overrides(env_optional)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML config file. A missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|e| {
            RollupError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Overlay values from `lookup`, keyed by the `*_ENV` variable names
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Result<Option<String>>,
    {
        if let Some(table) = lookup(TABLE_NAME_ENV)? {
            self.table_name = table;
        }
        if let Some(addr) = lookup(BIND_ADDR_ENV)? {
            self.bind_addr = addr;
        }
        if let Some(path) = lookup(SQLITE_PATH_ENV)? {
            self.sqlite_path = Some(PathBuf::from(path));
        }
        if let Some(dir) = lookup(LOG_DIR_ENV)? {
            self.log_dir = PathBuf::from(dir);
        }
        if let Some(addr) = lookup(METRICS_ADDR_ENV)? {
            self.metrics_addr = Some(addr);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !is_valid_table_name(&self.table_name) {
            return Err(RollupError::Config(format!(
                "{} must be a plain identifier, got '{}'",
                TABLE_NAME_ENV, self.table_name
            )));
        }
        Ok(())
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_valid_table_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

fn env_optional(key: &str) -> Result<Option<String>> {
    match env::var(key) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value.trim().to_string())),
        Err(VarError::NotPresent) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
