use async_trait::async_trait;
use chrono::Utc;
use shared::domain::{Item, ItemId};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    error::{StoreError, StoreResult},
    RemoteStore,
};

/// Process-local store with the same contract as the hosted API. Ids are
/// random UUIDs, assigned on create.
#[derive(Default)]
pub struct InMemoryRemoteStore {
    items: Mutex<Vec<Item>>,
}

impl InMemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: Vec<Item>) -> Self {
        Self {
            items: Mutex::new(items),
        }
    }

    pub async fn items(&self) -> Vec<Item> {
        self.items.lock().await.clone()
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemoteStore {
    async fn list(&self) -> StoreResult<Vec<Item>> {
        Ok(self.items.lock().await.clone())
    }

    async fn create(&self, name: &str) -> StoreResult<Item> {
        if name.is_empty() {
            return Err(StoreError::Rejected("name must not be empty".to_string()));
        }
        let now = Utc::now();
        let item = Item {
            id: ItemId(Uuid::new_v4().to_string()),
            name: name.to_string(),
            description: None,
            created_at: Some(now),
            updated_at: Some(now),
        };
        self.items.lock().await.push(item.clone());
        Ok(item)
    }

    async fn update(&self, id: &ItemId, name: &str) -> StoreResult<()> {
        if name.is_empty() {
            return Err(StoreError::Rejected("name must not be empty".to_string()));
        }
        let mut guard = self.items.lock().await;
        let Some(item) = guard.iter_mut().find(|item| &item.id == id) else {
            return Err(StoreError::Rejected(format!("no todo with id {id}")));
        };
        item.name = name.to_string();
        item.updated_at = Some(Utc::now());
        Ok(())
    }

    async fn delete(&self, id: &ItemId) -> StoreResult<()> {
        let mut guard = self.items.lock().await;
        let before = guard.len();
        guard.retain(|item| &item.id != id);
        if guard.len() == before {
            return Err(StoreError::Rejected(format!("no todo with id {id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/memory_store_tests.rs"]
mod tests;
