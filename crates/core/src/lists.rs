use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::names;

/// Attempts at drawing an unused id before falling back to a suffixed one.
const MAX_ID_ATTEMPTS: usize = 16;

/// A named, ordered collection of work items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemList {
    pub id: String,
    pub items: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing entry without the items themselves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListInfo {
    pub id: String,
    pub item_count: usize,
}

/// In-memory registry of item lists.
///
/// Shared between tool handlers as `Arc<ListStore>`. Reads hand out cloned
/// snapshots, so a run keeps working on the items it looked up even if the
/// list is updated or deleted meanwhile.
#[derive(Debug, Default)]
pub struct ListStore {
    lists: RwLock<HashMap<String, ItemList>>,
}

impl ListStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new list under a freshly generated id.
    pub fn create(&self, items: Vec<String>) -> ItemList {
        let mut lists = self.lists.write().unwrap_or_else(PoisonError::into_inner);
        let id = Self::unused_id(&lists);
        let now = Utc::now();
        let list = ItemList {
            id: id.clone(),
            items,
            created_at: now,
            updated_at: now,
        };
        info!(list_id = %id, items = list.items.len(), "list created");
        lists.insert(id, list.clone());
        list
    }

    fn unused_id(lists: &HashMap<String, ItemList>) -> String {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = names::generate_id();
            if !lists.contains_key(&id) {
                return id;
            }
        }
        let base = names::generate_id();
        let mut n = 2;
        loop {
            let id = format!("{base}-{n}");
            if !lists.contains_key(&id) {
                return id;
            }
            n += 1;
        }
    }

    /// The ordered items of a list, or `None` if the id is unknown.
    pub fn lookup(&self, id: &str) -> Option<Vec<String>> {
        self.lists
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .map(|list| list.items.clone())
    }

    /// Replace a list's items. Returns `None` if the id is unknown.
    pub fn update(&self, id: &str, items: Vec<String>) -> Option<ItemList> {
        let mut lists = self.lists.write().unwrap_or_else(PoisonError::into_inner);
        let list = lists.get_mut(id)?;
        list.items = items;
        list.updated_at = Utc::now();
        info!(list_id = %id, items = list.items.len(), "list updated");
        Some(list.clone())
    }

    /// Remove a list. Returns whether it existed.
    pub fn delete(&self, id: &str) -> bool {
        let removed = self
            .lists
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some();
        if removed {
            info!(list_id = %id, "list deleted");
        }
        removed
    }

    /// All lists, sorted by id.
    pub fn list(&self) -> Vec<ListInfo> {
        let mut infos: Vec<ListInfo> = self
            .lists
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|list| ListInfo {
                id: list.id.clone(),
                item_count: list.items.len(),
            })
            .collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }

    pub fn len(&self) -> usize {
        self.lists.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
