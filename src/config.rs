use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;

use crate::filter::{FilterError, FilterState};
use crate::reconcile::RetentionPolicy;
use crate::source::DEFAULT_SERVICES_FILE;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub filter: FilterSettings,
    pub view: ViewSettings,
    pub poll: PollSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    pub enabled: bool,
    pub text: String,
    pub case_sensitive: bool,
    /// Parse AND/OR/NOT/groups; otherwise every word is a literal
    pub operators: bool,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            text: String::new(),
            case_sensitive: true,
            operators: false,
        }
    }
}

impl FilterSettings {
    pub fn to_state(&self) -> Result<FilterState, FilterError> {
        let mut state = FilterState::new(&self.text, self.case_sensitive, self.operators)?;
        state.set_enabled(self.enabled);
        Ok(state)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    /// Also list listening and half-open sockets
    pub show_unestablished: bool,
    pub show_closed: bool,
    /// Never evict closed connections
    pub keep_closed: bool,
    pub closed_linger_secs: u64,
    /// Services database used to name ports
    pub services_file: PathBuf,
    /// Print interface traffic totals after each `watch` cycle
    pub show_traffic: bool,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            show_unestablished: true,
            show_closed: true,
            keep_closed: true,
            closed_linger_secs: 3,
            services_file: PathBuf::from(DEFAULT_SERVICES_FILE),
            show_traffic: true,
        }
    }
}

impl ViewSettings {
    pub fn retention(&self) -> RetentionPolicy {
        RetentionPolicy {
            show_closed: self.show_closed,
            keep_closed: self.keep_closed,
            closed_linger: Duration::from_secs(self.closed_linger_secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    pub interval_ms: u64,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self { interval_ms: 1000 }
    }
}

impl PollSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

pub fn load_config(path: Option<&Path>) -> Result<ViewerConfig, ConfigError> {
    if let Some(path) = path {
        load_config_from_path(path)
    } else {
        Ok(default_config().clone())
    }
}

pub fn load_config_from_path(path: &Path) -> Result<ViewerConfig, ConfigError> {
    let path_display = path.display().to_string();
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path_display.clone(),
        source,
    })?;

    toml::from_str::<ViewerConfig>(&raw).map_err(|source| ConfigError::Parse {
        path: path_display,
        source,
    })
}

pub fn default_config() -> &'static ViewerConfig {
    static DEFAULT_CONFIG: LazyLock<ViewerConfig> = LazyLock::new(ViewerConfig::default);
    &DEFAULT_CONFIG
}
