//! Selection-driven actions and the transfer list's context menu.
//!
//! The menu is only a descriptor: the host renders it and, when the user picks
//! an item, emits that item's event on the bus. The handlers registered here
//! pick the event up and act on whatever is selected at that moment.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures_util::future::join_all;
use tokio::runtime::Handle;

use crate::bus::EventBus;
use crate::config::SyncConfig;
use crate::error::{Error, HostError, Result};
use crate::host::{HostResult, MenuEntry, MenuItem, MenuPosition, TransferHost};
use crate::selection::{ItemId, SelectionStore};
use crate::store::Subscription;

const EXPORT_PAGE: &str = "index.html";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SelectionAction {
    Pause,
    Resume,
    Export,
    Delete,
}

impl SelectionAction {
    pub const ALL: [Self; 4] = [Self::Pause, Self::Resume, Self::Export, Self::Delete];

    pub fn event_name(self) -> &'static str {
        match self {
            Self::Pause => "pause_selection",
            Self::Resume => "resume_selection",
            Self::Export => "export_selection",
            Self::Delete => "delete_selection",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pause => "Pause",
            Self::Resume => "Resume",
            Self::Export => "Export to waterfall",
            Self::Delete => "Delete",
        }
    }

    pub fn from_event(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|action| action.event_name() == name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionFailure {
    /// `None` when one batched call covered the whole selection.
    pub item: Option<ItemId>,
    pub error: HostError,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionReport {
    pub action: SelectionAction,
    pub items: Vec<ItemId>,
    pub failures: Vec<ActionFailure>,
}

impl ActionReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ContextMenu {
    pub position: MenuPosition,
    pub items: Vec<MenuEntry>,
}

pub fn export_url(id: ItemId) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("path", "export")
        .append_pair("exportid", &id.to_string())
        .finish();
    format!("{EXPORT_PAGE}?{query}")
}

pub struct ActionDispatcher {
    selection: SelectionStore,
    host: Arc<dyn TransferHost>,
    export_title: String,
    handle: Handle,
    listeners: Mutex<Vec<Subscription>>,
}

impl ActionDispatcher {
    pub fn new(
        selection: SelectionStore,
        host: Arc<dyn TransferHost>,
        config: &SyncConfig,
    ) -> Result<Arc<Self>> {
        let handle = Handle::try_current().map_err(|_| Error::NoRuntime)?;
        Ok(Arc::new(Self {
            selection,
            host,
            export_title: config.export_title.clone(),
            handle,
            listeners: Mutex::new(Vec::new()),
        }))
    }

    pub fn selection(&self) -> &SelectionStore {
        &self.selection
    }

    /// Listens for every action event on `bus`.
    ///
    /// Each event spawns [`ActionDispatcher::dispatch`]; the bus only holds a
    /// weak reference to the dispatcher.
    pub fn register(self: &Arc<Self>, bus: &EventBus) {
        let mut listeners = self.lock_listeners();
        for action in SelectionAction::ALL {
            let dispatcher: Weak<Self> = Arc::downgrade(self);
            listeners.push(bus.listen(action.event_name(), move |_| {
                let Some(dispatcher) = dispatcher.upgrade() else {
                    return;
                };
                let handle = dispatcher.handle.clone();
                handle.spawn(async move {
                    dispatcher.dispatch(action).await;
                });
            }));
        }
    }

    pub fn unregister(&self) {
        self.lock_listeners().clear();
    }

    fn lock_listeners(&self) -> MutexGuard<'_, Vec<Subscription>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `action` against the current selection.
    ///
    /// An empty selection issues no host call.
    pub async fn dispatch(&self, action: SelectionAction) -> ActionReport {
        let items = self.selection.get().ids();
        let mut report = ActionReport {
            action,
            items: items.clone(),
            failures: Vec::new(),
        };
        if items.is_empty() {
            log::debug!("{} with empty selection, nothing to do", action.event_name());
            return report;
        }
        log::debug!("{} on {} item(s)", action.event_name(), items.len());

        let batch = match action {
            SelectionAction::Export => {
                report.failures = self.export(&items).await;
                return report;
            }
            SelectionAction::Pause => self.host.pause_items(items).await,
            SelectionAction::Resume => self.host.resume_items(items).await,
            SelectionAction::Delete => self.host.delete_items(items).await,
        };
        if let Err(error) = batch {
            log::warn!("{} failed: {error}", action.event_name());
            report.failures.push(ActionFailure { item: None, error });
        }
        report
    }

    async fn export(&self, items: &[ItemId]) -> Vec<ActionFailure> {
        let requests = items.iter().map(|&id| {
            let url = export_url(id);
            let title = self.export_title.clone();
            async move { (id, self.host.open_window(url, title).await) }
        });

        join_all(requests)
            .await
            .into_iter()
            .filter_map(|(id, result)| {
                let error = result.err()?;
                log::warn!("Failed to open export window for item {id}: {error}");
                Some(ActionFailure {
                    item: Some(id),
                    error,
                })
            })
            .collect()
    }

    pub fn build_context_menu(&self, position: MenuPosition) -> ContextMenu {
        let disabled = self.selection.get().is_empty();
        let item = |action: SelectionAction| {
            MenuEntry::Item(MenuItem {
                label: action.label().to_string(),
                event: action.event_name().to_string(),
                disabled,
                icon: None,
            })
        };

        ContextMenu {
            position,
            items: vec![
                item(SelectionAction::Pause),
                item(SelectionAction::Resume),
                MenuEntry::separator(),
                item(SelectionAction::Export),
                MenuEntry::separator(),
                item(SelectionAction::Delete),
            ],
        }
    }

    pub async fn open_context_menu(&self, position: MenuPosition) -> HostResult<()> {
        let menu = self.build_context_menu(position);
        self.host.show_context_menu(menu.position, menu.items).await
    }
}
