//! Settings persistence backed by a single JSON file.
//!
//! Lets the synchronizer run in-process without a separate host, and keeps
//! the first-run contract: a missing or unreadable file reads as "no blob".
//!
//! Several windows can share one file. Each window saves through its own
//! handle from [`SettingsFile::for_window`]; after a successful write the blob
//! is emitted as `settings-updated` on the bus of every other window.

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use futures_util::future::BoxFuture;

use crate::bus::EventBus;
use crate::config_paths::settings_path;
use crate::error::{Error, HostError, Result};
use crate::host::{HostResult, SettingsHost};
use crate::settings::SETTINGS_UPDATED_EVENT;

type Windows = Vec<(String, EventBus)>;

#[derive(Clone)]
pub struct SettingsFile {
    path: PathBuf,
    windows: Arc<Mutex<Windows>>,
    /// Window this handle saves for; it gets no broadcast of its own writes.
    origin: Option<String>,
}

fn lock(windows: &Mutex<Windows>) -> MutexGuard<'_, Windows> {
    windows.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SettingsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_windows(path, Vec::new())
    }

    pub fn with_windows(path: impl Into<PathBuf>, windows: Vec<(String, EventBus)>) -> Self {
        Self {
            path: path.into(),
            windows: Arc::new(Mutex::new(windows)),
            origin: None,
        }
    }

    /// `settings.json` in the platform config directory.
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(settings_path()?))
    }

    pub fn add_window(&self, label: impl Into<String>, bus: EventBus) {
        lock(&self.windows).push((label.into(), bus));
    }

    /// Handle sharing this file and window list, saving on behalf of `label`.
    pub fn for_window(&self, label: impl Into<String>) -> Self {
        Self {
            path: self.path.clone(),
            windows: Arc::clone(&self.windows),
            origin: Some(label.into()),
        }
    }

    pub fn window_labels(&self) -> Vec<String> {
        lock(&self.windows)
            .iter()
            .map(|(label, _)| label.clone())
            .collect()
    }

    fn broadcast(&self, settings: &str) {
        let targets: Vec<EventBus> = lock(&self.windows)
            .iter()
            .filter(|(label, _)| self.origin.as_deref() != Some(label.as_str()))
            .map(|(_, bus)| bus.clone())
            .collect();
        for bus in targets {
            bus.emit(SETTINGS_UPDATED_EVENT, Some(settings.to_string()));
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn read(&self) -> Option<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => Some(raw),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => {
                log::warn!("Failed to read {}: {err}", self.path.display());
                None
            }
        }
    }

    pub async fn write(&self, contents: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| Error::Io {
                    path: parent.to_path_buf(),
                    message: err.to_string(),
                })?;
        }
        tokio::fs::write(&self.path, contents)
            .await
            .map_err(|err| Error::Io {
                path: self.path.clone(),
                message: err.to_string(),
            })
    }
}

impl SettingsHost for SettingsFile {
    fn get_settings(&self) -> BoxFuture<'_, HostResult<Option<String>>> {
        Box::pin(async move { Ok(self.read().await) })
    }

    fn save_settings(&self, settings: String) -> BoxFuture<'_, HostResult<()>> {
        Box::pin(async move {
            self.write(&settings)
                .await
                .map_err(|err| HostError::Rejected(err.to_string()))?;
            self.broadcast(&settings);
            Ok(())
        })
    }
}

impl std::fmt::Debug for SettingsFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsFile")
            .field("path", &self.path)
            .field("origin", &self.origin)
            .field("windows", &self.window_labels())
            .finish()
    }
}
