//! Engine configuration, read from the `[engine]` section of a TOML file.
//!
//! ```toml
//! [engine]
//! poll_interval_ms = 100
//! auto_commit = false
//! rollback = "retain"
//!
//! [engine.plugin_versions]
//! grants = 1
//! ```

use crate::error::EngineResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// What happens to state mutated by a call whose before/action/after phase faults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RollbackPolicy {
    /// Keep partial mutations and the journal entry.
    #[default]
    Retain,
    /// Restore the state captured at the commit point, drop the journal
    /// entry and discard notices the call emitted.
    Restore,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Bounded wait of the async consumer between queue polls.
    pub poll_interval_ms: u64,
    /// Reset the undo depth after every successful call.
    pub auto_commit: bool,
    pub rollback: RollbackPolicy,
    /// Required compat major version per plugin name.
    pub plugin_versions: BTreeMap<String, u32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            auto_commit: false,
            rollback: RollbackPolicy::Retain,
            plugin_versions: BTreeMap::new(),
        }
    }
}

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    engine: EngineConfig,
}

impl EngineConfig {
    /// Loads the `[engine]` section from `path`.
    ///
    /// A missing file yields defaults. An unreadable or malformed file also
    /// yields defaults, with a warning.
    pub fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!("No engine config at {:?}, using defaults", path);
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => match Self::from_toml_str(&contents) {
                Ok(config) => {
                    info!("Loaded engine config from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!(
                        "Failed to parse engine config {:?}: {}. Falling back to defaults.",
                        path, e
                    );
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read engine config {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Parses a TOML document, failing on malformed input.
    pub fn from_toml_str(contents: &str) -> EngineResult<Self> {
        let file: ConfigFile = toml::from_str(contents)?;
        Ok(file.engine)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    #[must_use]
    pub fn with_auto_commit(mut self, auto_commit: bool) -> Self {
        self.auto_commit = auto_commit;
        self
    }

    #[must_use]
    pub fn with_rollback(mut self, rollback: RollbackPolicy) -> Self {
        self.rollback = rollback;
        self
    }

    #[must_use]
    pub fn with_plugin_version(mut self, plugin: impl Into<String>, major: u32) -> Self {
        self.plugin_versions.insert(plugin.into(), major);
        self
    }
}
