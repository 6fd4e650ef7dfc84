//! Configuration management with layered hierarchy

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::core::draft::{
    DraftError, DraftStore, FileDraftStore, MemoryDraftStore, SqliteDraftStore,
};

/// Seconds the CLI waits for a finalizer before giving up
pub const DEFAULT_SUBMIT_TIMEOUT_SECS: u64 = 30;

/// Directory name of the local (per working directory) config
pub const LOCAL_DIR: &str = ".intake";

/// Every config key with a short description, for `intake config keys`
pub const KEYS: &[(&str, &str, &str)] = &[
    ("data_dir", "INTAKE_DATA_DIR", "Directory holding drafts and the submission outbox"),
    ("draft_store", "INTAKE_DRAFT_STORE", "Draft backend: file, sqlite or memory"),
    ("submit_timeout_secs", "INTAKE_SUBMIT_TIMEOUT", "Seconds to wait for a submission to finish"),
    ("log_level", "INTAKE_LOG_LEVEL", "Default log filter (error, warn, info, debug, trace)"),
];

/// Where drafts are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    File,
    Sqlite,
    Memory,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::File => write!(f, "file"),
            StoreKind::Sqlite => write!(f, "sqlite"),
            StoreKind::Memory => write!(f, "memory"),
        }
    }
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "file" => Ok(StoreKind::File),
            "sqlite" => Ok(StoreKind::Sqlite),
            "memory" => Ok(StoreKind::Memory),
            other => Err(format!(
                "Unknown draft store '{}'. Use file, sqlite or memory",
                other
            )),
        }
    }
}

/// Intake configuration with layered hierarchy
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory for drafts and the outbox
    pub data_dir: Option<PathBuf>,

    /// Draft backend
    pub draft_store: Option<StoreKind>,

    /// Finalizer timeout used by the CLI
    pub submit_timeout_secs: Option<u64>,

    /// Default tracing filter
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load() -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (already in Default impl)

        // 2. Global user config (~/.config/intake/config.yaml)
        if let Some(global) = Self::global_config_path().and_then(|p| Self::read_file(&p)) {
            config.merge(global);
        }

        // 3. Local config (./.intake/config.yaml)
        if let Some(local) = Self::read_file(&Self::local_config_path()) {
            config.merge(local);
        }

        // 4. Environment variables
        config.merge(Self::from_env(|name| std::env::var(name).ok()));

        config
    }

    fn read_file(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        serde_yml::from_str::<Config>(&contents).ok()
    }

    /// Build the environment layer; unparseable values are ignored
    fn from_env(var: impl Fn(&str) -> Option<String>) -> Config {
        Config {
            data_dir: var("INTAKE_DATA_DIR").map(PathBuf::from),
            draft_store: var("INTAKE_DRAFT_STORE").and_then(|s| s.parse().ok()),
            submit_timeout_secs: var("INTAKE_SUBMIT_TIMEOUT").and_then(|s| s.trim().parse().ok()),
            log_level: var("INTAKE_LOG_LEVEL"),
        }
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "intake")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Get the path to the local config file
    pub fn local_config_path() -> PathBuf {
        PathBuf::from(LOCAL_DIR).join("config.yaml")
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.data_dir.is_some() {
            self.data_dir = other.data_dir;
        }
        if other.draft_store.is_some() {
            self.draft_store = other.draft_store;
        }
        if other.submit_timeout_secs.is_some() {
            self.submit_timeout_secs = other.submit_timeout_secs;
        }
        if other.log_level.is_some() {
            self.log_level = other.log_level;
        }
    }

    /// Data directory, falling back to the platform data dir
    pub fn data_dir(&self) -> PathBuf {
        if let Some(ref dir) = self.data_dir {
            return dir.clone();
        }
        directories::ProjectDirs::from("", "", "intake")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(LOCAL_DIR))
    }

    pub fn draft_store(&self) -> StoreKind {
        self.draft_store.unwrap_or_default()
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(
            self.submit_timeout_secs
                .unwrap_or(DEFAULT_SUBMIT_TIMEOUT_SECS),
        )
    }

    pub fn outbox_dir(&self) -> PathBuf {
        self.data_dir().join("outbox")
    }

    /// Open the configured draft store
    pub fn open_store(&self) -> Result<Box<dyn DraftStore>, DraftError> {
        let data_dir = self.data_dir();
        Ok(match self.draft_store() {
            StoreKind::File => Box::new(FileDraftStore::new(data_dir.join("drafts"))),
            StoreKind::Sqlite => Box::new(SqliteDraftStore::open(&data_dir.join("drafts.db"))?),
            StoreKind::Memory => Box::new(MemoryDraftStore::new()),
        })
    }

    /// Value of a key as displayed by `intake config show`
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "data_dir" => Some(self.data_dir().display().to_string()),
            "draft_store" => Some(self.draft_store().to_string()),
            "submit_timeout_secs" => Some(self.submit_timeout().as_secs().to_string()),
            "log_level" => self.log_level.clone(),
            _ => None,
        }
    }
}
