use anyhow::{Context, Result};
use figment::{providers::{Env, Format, Toml}, Figment};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use validator::Validate;

use crate::domain::DEFAULT_BINARY_THRESHOLD;
use crate::optimizer::{SolverKind, DEFAULT_SCALABILITY_LIMIT};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Config {
    pub solver: SolverConfig,
    #[validate(nested)]
    pub routing: RoutingConfig,
    pub network: NetworkConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub backend: SolverKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RoutingConfig {
    /// Value above which a binary routing decision counts as selected.
    #[validate(range(exclusive_min = 0.0, exclusive_max = 1.0))]
    pub binary_threshold: f64,
    /// Demands × links above which model size is reported as a scalability risk.
    #[validate(range(min = 1))]
    pub scalability_limit: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            binary_threshold: DEFAULT_BINARY_THRESHOLD,
            scalability_limit: DEFAULT_SCALABILITY_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Network file to route (`.toml` or `.json`).
    pub path: PathBuf,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("networks/line.toml"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, overridden by `RUST_LOG`.
    pub filter: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load from a TOML file (missing file means defaults), then `UFR__` env overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("UFR__").split("__"));
        let cfg: Config = figment.extract().context("invalid configuration")?;
        cfg.validate().context("configuration failed validation")?;
        Ok(cfg)
    }
}
