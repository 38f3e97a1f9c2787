use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::store::Store;

pub type ItemId = i64;

/// Item identifiers currently marked in the transfer list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selection(BTreeSet<ItemId>);

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.0.contains(&id)
    }

    /// Identifiers in ascending order.
    pub fn ids(&self) -> Vec<ItemId> {
        self.0.iter().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<ItemId> for Selection {
    fn from_iter<I: IntoIterator<Item = ItemId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[ItemId; N]> for Selection {
    fn from(ids: [ItemId; N]) -> Self {
        ids.into_iter().collect()
    }
}

/// Shared selection; list views `set` it, menus and actions read it.
pub type SelectionStore = Store<Selection>;
