//! Client configuration.
//!
//! ```toml
//! server_url = "ws://127.0.0.1:5000/ws"
//! stt_url = "http://127.0.0.1:5000"
//! model = "gemini-1.5-flash-001"
//!
//! [history]
//! backend = "sqlite"          # file | sqlite | memory
//! path = "/home/me/.chat.db"
//! key = "chatHistory"
//! ```
//!
//! Values from the file are overridden by command-line flags.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::ValueEnum;
use serde::Deserialize;

use crate::cli::Args;
use crate::error::Result;
use crate::history::{HistoryLog, DEFAULT_HISTORY_KEY};
use crate::models::{validate_model, DEFAULT_MODEL};
use crate::store::{FileStore, KvStore, MemoryStore, SqliteStore};

pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:5000/ws";
pub const DEFAULT_STT_URL: &str = "http://127.0.0.1:5000";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum HistoryBackend {
    Memory,
    File,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub backend: HistoryBackend,
    pub path: Option<PathBuf>,
    pub key: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        HistoryConfig {
            backend: HistoryBackend::File,
            path: None,
            key: DEFAULT_HISTORY_KEY.to_string(),
        }
    }
}

impl HistoryConfig {
    pub fn resolved_path(&self) -> PathBuf {
        match (&self.path, self.backend) {
            (Some(p), _) => p.clone(),
            (None, HistoryBackend::Sqlite) => PathBuf::from(".chatstream/history.db"),
            (None, _) => PathBuf::from(".chatstream"),
        }
    }

    pub fn open_store(&self) -> Result<Arc<dyn KvStore>> {
        let store: Arc<dyn KvStore> = match self.backend {
            HistoryBackend::Memory => Arc::new(MemoryStore::new()),
            HistoryBackend::File => Arc::new(FileStore::open(self.resolved_path())?),
            HistoryBackend::Sqlite => Arc::new(SqliteStore::open(self.resolved_path())?),
        };
        Ok(store)
    }

    pub fn open_log(&self) -> Result<HistoryLog> {
        Ok(HistoryLog::new(self.open_store()?, self.key.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server_url: String,
    pub stt_url: String,
    pub model: String,
    pub history: HistoryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_url: DEFAULT_SERVER_URL.to_string(),
            stt_url: DEFAULT_STT_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            history: HistoryConfig::default(),
        }
    }
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// File config (if `--config` was given) with flags layered on top.
    pub fn resolve(args: &Args) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_args(args);
        validate_model(&config.model)?;
        Ok(config)
    }

    pub fn apply_args(&mut self, args: &Args) {
        if let Some(url) = &args.server {
            self.server_url = url.clone();
        }
        if let Some(url) = &args.stt_url {
            self.stt_url = url.clone();
        }
        if let Some(model) = &args.model {
            self.model = model.clone();
        }
        if let Some(backend) = args.history_backend {
            self.history.backend = backend;
        }
        if let Some(path) = &args.history_path {
            self.history.path = Some(path.clone());
        }
        if let Some(key) = &args.history_key {
            self.history.key = key.clone();
        }
    }
}
