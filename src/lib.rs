pub mod actions;
pub mod bus;
pub mod config;
pub mod config_paths;
pub mod debounce;
pub mod error;
pub mod host;
pub mod merge;
pub mod selection;
pub mod settings;
pub mod settings_file;
pub mod store;

use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinHandle;

pub use crate::actions::{ActionDispatcher, ActionReport, ContextMenu, SelectionAction};
pub use crate::bus::{Event, EventBus};
pub use crate::config::SyncConfig;
pub use crate::error::{Error, HostError, Result};
pub use crate::host::{MenuEntry, MenuItem, MenuPosition, SettingsHost, TransferHost};
pub use crate::selection::{ItemId, Selection, SelectionStore};
pub use crate::settings::{default_settings, SettingsSync, SETTINGS_UPDATED_EVENT};
pub use crate::settings_file::SettingsFile;
pub use crate::store::{Store, Subscription};

/// Settings and selection state of one front-end window, wired to its host.
pub struct Frontend {
    settings: SettingsSync,
    selection: SelectionStore,
    dispatcher: Arc<ActionDispatcher>,
}

impl Frontend {
    /// Attaches to `bus` and waits for the persisted settings to load.
    pub async fn start(
        settings_host: Arc<dyn SettingsHost>,
        transfer_host: Arc<dyn TransferHost>,
        bus: &EventBus,
        config: SyncConfig,
    ) -> Result<Self> {
        let settings = SettingsSync::new(Store::new(default_settings()), settings_host, &config)?;
        settings.attach(bus);

        let selection = SelectionStore::default();
        let dispatcher = ActionDispatcher::new(selection.clone(), transfer_host, &config)?;
        dispatcher.register(bus);

        settings.load().await;

        Ok(Self {
            settings,
            selection,
            dispatcher,
        })
    }

    pub fn settings(&self) -> &Store<Value> {
        self.settings.store()
    }

    pub fn settings_loaded(&self) -> &Store<bool> {
        self.settings.loaded()
    }

    pub fn settings_sync(&self) -> &SettingsSync {
        &self.settings
    }

    pub fn selection(&self) -> &SelectionStore {
        &self.selection
    }

    pub fn dispatcher(&self) -> &Arc<ActionDispatcher> {
        &self.dispatcher
    }

    pub async fn open_context_menu(&self, position: MenuPosition) -> std::result::Result<(), HostError> {
        self.dispatcher.open_context_menu(position).await
    }

    /// Stops reacting to host events and flushes settings immediately.
    pub fn shutdown(&self) -> JoinHandle<()> {
        self.dispatcher.unregister();
        self.settings.shutdown()
    }
}
