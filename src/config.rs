//! Unit configuration: working-directory layout plus optional overrides read
//! from `configuration/unit.yaml`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::types::Position;

const CONFIGURATION_DIR: &str = "configuration";
const ORDERS_DIR: &str = "orders";
const CONFIG_FILE: &str = "unit.yaml";

/// Topic names the message adapter recognizes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Topics {
    pub current_position: String,
    pub next_order: String,
    pub shutdown: String,
}

impl Topics {
    pub fn with_prefix(prefix: &str) -> Self {
        let prefix = prefix.trim_end_matches('/');
        Self {
            current_position: format!("{prefix}/currentPosition"),
            next_order: format!("{prefix}/nextOrder"),
            shutdown: format!("{prefix}/shutdown"),
        }
    }
}

impl Default for Topics {
    fn default() -> Self {
        Self::with_prefix("/AmrUnit")
    }
}

/// Settings for one unit run.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UnitConfig {
    /// Directory holding the `configuration/` and `orders/` subdirectories.
    #[serde(skip)]
    pub working_directory: PathBuf,
    /// Idle wait between empty-queue checks of the drain loop.
    pub poll_interval_ms: u64,
    /// Catalog file name inside `configuration/`.
    pub catalog_file: String,
    /// Order record files inside `orders/`; `None` scans the directory.
    pub order_files: Option<Vec<String>>,
    pub starting_position: Position,
    pub topic_prefix: String,
}

impl Default for UnitConfig {
    fn default() -> Self {
        Self {
            working_directory: PathBuf::from("."),
            poll_interval_ms: 20,
            catalog_file: "products.yaml".to_string(),
            order_files: None,
            starting_position: Position::default(),
            topic_prefix: "/AmrUnit".to_string(),
        }
    }
}

impl UnitConfig {
    /// Defaults rooted at `working_directory`.
    pub fn new(working_directory: impl Into<PathBuf>) -> Self {
        Self {
            working_directory: working_directory.into(),
            ..Self::default()
        }
    }

    /// Load overrides from `<working_directory>/configuration/unit.yaml`.
    /// A missing file means defaults.
    pub fn load(working_directory: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let working_directory = working_directory.into();
        let path = working_directory.join(CONFIGURATION_DIR).join(CONFIG_FILE);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no unit configuration file; using defaults");
                return Ok(Self::new(working_directory));
            }
            Err(source) => return Err(ConfigError::Io { path, source }),
        };

        let mut config = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str::<Self>(&content).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?
        };
        config.working_directory = working_directory;
        info!(path = %path.display(), "unit configuration loaded");
        Ok(config)
    }

    pub fn configuration_dir(&self) -> PathBuf {
        self.working_directory.join(CONFIGURATION_DIR)
    }

    pub fn orders_dir(&self) -> PathBuf {
        self.working_directory.join(ORDERS_DIR)
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.configuration_dir().join(&self.catalog_file)
    }

    /// Explicitly configured order files, resolved against `orders/`.
    pub fn order_paths(&self) -> Option<Vec<PathBuf>> {
        let orders_dir = self.orders_dir();
        self.order_files
            .as_ref()
            .map(|files| files.iter().map(|file| resolve(&orders_dir, file)).collect())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn topics(&self) -> Topics {
        Topics::with_prefix(&self.topic_prefix)
    }
}

fn resolve(base: &Path, file: &str) -> PathBuf {
    let path = Path::new(file);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
