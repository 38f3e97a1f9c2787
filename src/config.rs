//! Runtime tunables, resolved from the environment.

use std::time::Duration;

use crate::error::{Error, Result};

const DEFAULT_DEBOUNCE_MS: u64 = 10;
const DEFAULT_EXPORT_TITLE: &str = "Export to waterfall";

pub const ENV_DEBOUNCE_MS: &str = "TRANSFERDESK_SETTINGS_DEBOUNCE_MS";
pub const ENV_EXPORT_TITLE: &str = "TRANSFERDESK_EXPORT_TITLE";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncConfig {
    /// Window during which local settings edits collapse into one write.
    pub debounce: Duration,
    /// Title given to export windows opened for selected items.
    pub export_title: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            export_title: DEFAULT_EXPORT_TITLE.to_string(),
        }
    }
}

impl SyncConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_var_non_empty)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_DEBOUNCE_MS) {
            let millis = raw.parse::<u64>().map_err(|err| {
                Error::Config(format!("Invalid {ENV_DEBOUNCE_MS} ({raw}): {err}"))
            })?;
            config.debounce = Duration::from_millis(millis);
        }

        if let Some(title) = lookup(ENV_EXPORT_TITLE) {
            config.export_title = title;
        }

        Ok(config)
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

fn env_var_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
