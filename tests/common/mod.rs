#![allow(dead_code)]

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use futures_util::future::BoxFuture;
use serde_json::Value;
use tokio::sync::Notify;
use transferdesk_lib::{
    HostError, ItemId, MenuEntry, MenuPosition, SettingsHost, TransferHost,
};

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    GetSettings,
    SaveSettings(String),
    OpenWindow { url: String, title: String },
    Pause(Vec<ItemId>),
    Resume(Vec<ItemId>),
    Delete(Vec<ItemId>),
    ShowContextMenu(MenuPosition, Vec<MenuEntry>),
}

/// Records every host call; behavior is tuned through its public fields.
#[derive(Default)]
pub struct FakeHost {
    pub blob: Mutex<Option<String>>,
    pub load_error: Mutex<Option<HostError>>,
    pub fail_saves: AtomicBool,
    pub failing_exports: Mutex<HashSet<ItemId>>,
    calls: Mutex<Vec<Call>>,
    changed: Notify,
}

impl FakeHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_blob(blob: &str) -> Arc<Self> {
        let host = Self::default();
        *host.blob.lock().unwrap() = Some(blob.to_string());
        Arc::new(host)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn saves(&self) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::SaveSettings(raw) => Some(serde_json::from_str(&raw).unwrap()),
                _ => None,
            })
            .collect()
    }

    pub fn transfer_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| !matches!(call, Call::GetSettings | Call::SaveSettings(_)))
            .collect()
    }

    /// Waits until `ready` holds for the recorded calls.
    pub async fn wait_until(&self, ready: impl Fn(&[Call]) -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let notified = self.changed.notified();
                if ready(&self.calls.lock().unwrap()) {
                    return;
                }
                notified.await;
            }
        })
        .await
        .expect("expected host calls never arrived");
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
        self.changed.notify_waiters();
    }
}

impl SettingsHost for FakeHost {
    fn get_settings(&self) -> BoxFuture<'_, Result<Option<String>, HostError>> {
        Box::pin(async move {
            self.record(Call::GetSettings);
            if let Some(err) = self.load_error.lock().unwrap().clone() {
                return Err(err);
            }
            Ok(self.blob.lock().unwrap().clone())
        })
    }

    fn save_settings(&self, settings: String) -> BoxFuture<'_, Result<(), HostError>> {
        Box::pin(async move {
            self.record(Call::SaveSettings(settings.clone()));
            if self.fail_saves.load(Ordering::SeqCst) {
                return Err(HostError::Rejected("disk full".to_string()));
            }
            *self.blob.lock().unwrap() = Some(settings);
            Ok(())
        })
    }
}

impl TransferHost for FakeHost {
    fn open_window(&self, url: String, title: String) -> BoxFuture<'_, Result<(), HostError>> {
        Box::pin(async move {
            let failing = self
                .failing_exports
                .lock()
                .unwrap()
                .iter()
                .any(|id| url.ends_with(&format!("exportid={id}")));
            self.record(Call::OpenWindow { url, title });
            if failing {
                return Err(HostError::Rejected("window creation failed".to_string()));
            }
            Ok(())
        })
    }

    fn pause_items(&self, items: Vec<ItemId>) -> BoxFuture<'_, Result<(), HostError>> {
        Box::pin(async move {
            self.record(Call::Pause(items));
            Ok(())
        })
    }

    fn resume_items(&self, items: Vec<ItemId>) -> BoxFuture<'_, Result<(), HostError>> {
        Box::pin(async move {
            self.record(Call::Resume(items));
            Ok(())
        })
    }

    fn delete_items(&self, items: Vec<ItemId>) -> BoxFuture<'_, Result<(), HostError>> {
        Box::pin(async move {
            self.record(Call::Delete(items));
            Ok(())
        })
    }

    fn show_context_menu(
        &self,
        pos: MenuPosition,
        items: Vec<MenuEntry>,
    ) -> BoxFuture<'_, Result<(), HostError>> {
        Box::pin(async move {
            self.record(Call::ShowContextMenu(pos, items));
            Ok(())
        })
    }
}
