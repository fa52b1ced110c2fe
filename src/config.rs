//! Engine configuration, persisted as TOML.
//!
//! Every field has a serde default, so an empty file is a valid configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::Context;
use crate::engine::EngineConfig;

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(selene::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}")]
    #[diagnostic(
        code(selene::config::parse),
        help("Check the TOML syntax. {message}")
    )]
    Parse { path: String, message: String },

    #[error("invalid config value for {field}: {message}")]
    #[diagnostic(code(selene::config::invalid))]
    Invalid {
        field: &'static str,
        message: String,
    },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeleneConfig {
    /// Directory of the redb snapshot. `None` keeps the graph in memory only.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Corpus records per migration page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Threads in the chart query pool.
    #[serde(default = "default_query_workers")]
    pub query_workers: usize,
    #[serde(default = "default_results_per_query")]
    pub results_per_query: usize,
    #[serde(default = "default_passages_per_condition")]
    pub passages_per_condition: usize,
    /// Deadline applied to each query issued from the command line.
    #[serde(default)]
    pub query_timeout_ms: Option<u64>,
}

fn default_page_size() -> usize {
    crate::migrate::DEFAULT_PAGE_SIZE
}
fn default_query_workers() -> usize {
    4
}
fn default_results_per_query() -> usize {
    3
}
fn default_passages_per_condition() -> usize {
    5
}

impl Default for SeleneConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            page_size: default_page_size(),
            query_workers: default_query_workers(),
            results_per_query: default_results_per_query(),
            passages_per_condition: default_passages_per_condition(),
            query_timeout_ms: None,
        }
    }
}

impl SeleneConfig {
    /// Load and validate a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: "<inline>".into(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let positive = [
            ("page_size", self.page_size),
            ("query_workers", self.query_workers),
            ("results_per_query", self.results_per_query),
            ("passages_per_condition", self.passages_per_condition),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    message: "must be greater than 0".into(),
                });
            }
        }
        if self.query_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid {
                field: "query_timeout_ms",
                message: "must be greater than 0 when set".into(),
            });
        }
        Ok(())
    }

    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout_ms.map(Duration::from_millis)
    }

    /// A fresh query context. The deadline, if any, starts now, so call this
    /// only once the engine is open.
    pub fn query_context(&self) -> Context {
        match self.query_timeout() {
            Some(timeout) => Context::with_timeout(timeout),
            None => Context::background(),
        }
    }

    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig {
            data_dir: self.data_dir.clone(),
            page_size: self.page_size,
            query_workers: self.query_workers,
            results_per_query: self.results_per_query,
            passages_per_condition: self.passages_per_condition,
        }
    }
}
