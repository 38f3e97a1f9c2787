//! Keeps the settings store in step with the host.
//!
//! - load: the persisted blob is merged over the built-in defaults;
//! - host push (`settings-updated`): the payload replaces the tree outright
//!   and the resulting notification is not written back;
//! - local edits: debounced `save_settings` with the newest tree;
//! - shutdown: one immediate `save_settings`, bypassing the debounce.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, MutexGuard, PoisonError,
};

use serde_json::{json, Value};
use tokio::{runtime::Handle, task::JoinHandle};

use crate::bus::EventBus;
use crate::config::SyncConfig;
use crate::debounce::Debouncer;
use crate::error::{Error, Result};
use crate::host::SettingsHost;
use crate::merge::merge_tree;
use crate::store::{Store, Subscription};

pub const SETTINGS_UPDATED_EVENT: &str = "settings-updated";

pub fn default_settings() -> Value {
    json!({
        "statusWidth": "15%",
        "filter": "",
        "leftBar": {
            "statusOpen": true
        },
        "transfers": {
            "columns": [
                ["name", 140],
                ["size", 80]
            ],
            "sort": ["name", "asc"]
        }
    })
}

/// Decodes a settings blob; the root must be a mapping.
pub fn decode_tree(raw: &str) -> Result<Value> {
    let tree: Value = serde_json::from_str(raw)?;
    if !tree.is_object() {
        return Err(Error::NotAMapping);
    }
    Ok(tree)
}

pub struct SettingsSync {
    store: Store<Value>,
    loaded: Store<bool>,
    host: Arc<dyn SettingsHost>,
    handle: Handle,
    debouncer: Debouncer,
    suppress_echo: Arc<AtomicBool>,
    subscriptions: Mutex<Vec<Subscription>>,
}

fn lock(subscriptions: &Mutex<Vec<Subscription>>) -> MutexGuard<'_, Vec<Subscription>> {
    subscriptions.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn persist(host: Arc<dyn SettingsHost>, serialized: String) {
    if let Err(err) = host.save_settings(serialized).await {
        log::warn!("Failed to persist settings: {err}");
    }
}

fn apply_push(store: &Store<Value>, suppress_echo: &AtomicBool, payload: &str) -> Result<()> {
    let tree = decode_tree(payload)?;
    suppress_echo.store(true, Ordering::SeqCst);
    store.set(tree);
    // Consumed by the persistence observer; reset in case none is attached.
    suppress_echo.store(false, Ordering::SeqCst);
    Ok(())
}

impl SettingsSync {
    pub fn new(store: Store<Value>, host: Arc<dyn SettingsHost>, config: &SyncConfig) -> Result<Self> {
        let handle = Handle::try_current().map_err(|_| Error::NoRuntime)?;
        let debouncer = Debouncer::with_handle(config.debounce, handle.clone());
        Ok(Self {
            store,
            loaded: Store::new(false),
            host,
            handle,
            debouncer,
            suppress_echo: Arc::new(AtomicBool::new(false)),
            subscriptions: Mutex::new(Vec::new()),
        })
    }

    /// Builds a synchronizer, attaches it to `bus` and waits for the initial load.
    pub async fn start(
        store: Store<Value>,
        host: Arc<dyn SettingsHost>,
        bus: &EventBus,
        config: &SyncConfig,
    ) -> Result<Self> {
        let sync = Self::new(store, host, config)?;
        sync.attach(bus);
        sync.load().await;
        Ok(sync)
    }

    pub fn store(&self) -> &Store<Value> {
        &self.store
    }

    /// Becomes `true` once the initial load finished, whatever its outcome.
    pub fn loaded(&self) -> &Store<bool> {
        &self.loaded
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.get()
    }

    pub fn has_pending_write(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Installs the persistence observer and the `settings-updated` listener.
    pub fn attach(&self, bus: &EventBus) {
        let persistence = self.observe_local_changes();

        let store = self.store.clone();
        let suppress_echo = Arc::clone(&self.suppress_echo);
        let host_push = bus.listen(SETTINGS_UPDATED_EVENT, move |event| {
            let Some(payload) = event.payload.as_deref() else {
                log::warn!("Ignoring {SETTINGS_UPDATED_EVENT} without payload");
                return;
            };
            if let Err(err) = apply_push(&store, &suppress_echo, payload) {
                log::warn!("Ignoring {SETTINGS_UPDATED_EVENT}: {err}");
            }
        });

        lock(&self.subscriptions).extend([persistence, host_push]);
    }

    fn observe_local_changes(&self) -> Subscription {
        let suppress_echo = Arc::clone(&self.suppress_echo);
        let debouncer = self.debouncer.clone();
        let host = Arc::clone(&self.host);
        let handle = self.handle.clone();
        // `subscribe` calls back once with the current tree; that is not an edit.
        let initial = AtomicBool::new(true);

        self.store.subscribe(move |tree| {
            if initial.swap(false, Ordering::SeqCst) {
                return;
            }
            if suppress_echo.swap(false, Ordering::SeqCst) {
                log::debug!("Settings replaced by host, not writing back");
                return;
            }

            let serialized = tree.to_string();
            let host = Arc::clone(&host);
            let handle = handle.clone();
            debouncer.schedule(move || {
                handle.spawn(persist(host, serialized));
            });
        })
    }

    /// Requests the persisted blob and merges it over the current tree.
    ///
    /// Failures leave the current tree untouched.
    pub async fn load(&self) {
        match self.fetch().await {
            Ok(Some(tree)) => self.store.update(|current| merge_tree(current, tree)),
            Ok(None) => log::debug!("No persisted settings, keeping defaults"),
            Err(err) => log::warn!("Failed to load settings, keeping defaults: {err}"),
        }
        self.loaded.set(true);
    }

    async fn fetch(&self) -> Result<Option<Value>> {
        let Some(raw) = self.host.get_settings().await? else {
            return Ok(None);
        };
        if raw.trim().is_empty() {
            return Ok(None);
        }
        decode_tree(&raw).map(Some)
    }

    /// Replaces the tree with a host-pushed payload without writing it back.
    pub fn apply_host_push(&self, payload: &str) -> Result<()> {
        apply_push(&self.store, &self.suppress_echo, payload)
    }

    /// Detaches from the store and bus, then writes the current tree once.
    ///
    /// The write is spawned rather than awaited; the handle is returned for
    /// callers that can afford to wait on it.
    pub fn shutdown(&self) -> JoinHandle<()> {
        lock(&self.subscriptions).clear();
        let serialized = self.store.get().to_string();
        self.handle.spawn(persist(Arc::clone(&self.host), serialized))
    }
}
