//! Server configuration: TOML file merged under CLI flags.
//!
//! ```toml
//! backend = "google"            # or "memory"
//! api_base = "https://docs.googleapis.com"
//! token_env = "DOCWEAVE_ACCESS_TOKEN"
//! max_batch_requests = 50
//! max_table_chain = 10
//! max_snapshots = 10
//! log_filter = "docweave_kernel=debug"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use docweave_kernel::{BatchConfig, EngineConfig};

/// Environment variable holding the access token unless configured otherwise.
pub const DEFAULT_TOKEN_ENV: &str = "DOCWEAVE_ACCESS_TOKEN";

/// Which [`docweave_kernel::DocsApi`] implementation serves requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum BackendKind {
    /// Ephemeral in-process documents.
    #[default]
    Memory,
    /// Google Docs REST API.
    Google,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendKind,
    pub api_base: String,
    pub token_env: String,
    pub max_batch_requests: usize,
    pub max_table_chain: usize,
    pub max_snapshots: usize,
    pub log_filter: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            backend: BackendKind::default(),
            api_base: docweave_kernel::google::DEFAULT_API_BASE.to_string(),
            token_env: DEFAULT_TOKEN_ENV.to_string(),
            max_batch_requests: engine.batch.max_requests_per_batch,
            max_table_chain: engine.max_table_chain,
            max_snapshots: engine.max_snapshots,
            log_filter: None,
        }
    }
}

impl Config {
    /// Load from `path`; a missing file yields defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Load from `path` if given, otherwise from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => match Self::default_path() {
                Some(path) => Self::load_from_path(&path),
                None => Ok(Self::default()),
            },
        }
    }

    /// `<config dir>/docweave/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("docweave").join("config.toml"))
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            batch: BatchConfig { max_requests_per_batch: self.max_batch_requests.max(1) },
            max_table_chain: self.max_table_chain.max(1),
            max_snapshots: self.max_snapshots.max(1),
        }
    }
}
