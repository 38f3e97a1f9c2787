//! RPC surface of the native host process, as seen from the front-end.
//!
//! Methods return boxed futures so that hosts can be shared as
//! `Arc<dyn SettingsHost>` / `Arc<dyn TransferHost>` and swapped for
//! recording fakes in tests.

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::HostError;
use crate::selection::ItemId;

pub type HostResult<T> = Result<T, HostError>;

pub trait SettingsHost: Send + Sync {
    /// Returns the persisted settings blob, or `None` on first run.
    fn get_settings(&self) -> BoxFuture<'_, HostResult<Option<String>>>;

    fn save_settings(&self, settings: String) -> BoxFuture<'_, HostResult<()>>;
}

pub trait TransferHost: Send + Sync {
    fn open_window(&self, url: String, title: String) -> BoxFuture<'_, HostResult<()>>;

    fn pause_items(&self, items: Vec<ItemId>) -> BoxFuture<'_, HostResult<()>>;

    fn resume_items(&self, items: Vec<ItemId>) -> BoxFuture<'_, HostResult<()>>;

    fn delete_items(&self, items: Vec<ItemId>) -> BoxFuture<'_, HostResult<()>>;

    fn show_context_menu(
        &self,
        pos: MenuPosition,
        items: Vec<MenuEntry>,
    ) -> BoxFuture<'_, HostResult<()>>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MenuPosition {
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub label: String,
    /// Named event the host emits back when the item is chosen.
    pub event: String,
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MenuEntry {
    Item(MenuItem),
    Separator { is_separator: bool },
}

impl MenuEntry {
    pub fn separator() -> Self {
        Self::Separator { is_separator: true }
    }

    pub fn is_separator(&self) -> bool {
        matches!(self, Self::Separator { .. })
    }

    pub fn as_item(&self) -> Option<&MenuItem> {
        match self {
            Self::Item(item) => Some(item),
            Self::Separator { .. } => None,
        }
    }
}
