use std::{collections::HashSet, fmt, sync::Arc};

use async_trait::async_trait;
use shared::domain::{Item, ItemId};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

pub mod error;
mod memory_store;
pub mod transport;

pub use error::{StoreError, StoreErrorKind, StoreResult};
pub use memory_store::InMemoryRemoteStore;
pub use transport::{GraphqlRemoteStore, GraphqlStoreConfig};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Hosted CRUD backend for todo items.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn list(&self) -> StoreResult<Vec<Item>>;
    async fn create(&self, name: &str) -> StoreResult<Item>;
    async fn update(&self, id: &ItemId, name: &str) -> StoreResult<()>;
    async fn delete(&self, id: &ItemId) -> StoreResult<()>;
}

pub struct MissingRemoteStore;

#[async_trait]
impl RemoteStore for MissingRemoteStore {
    async fn list(&self) -> StoreResult<Vec<Item>> {
        Err(StoreError::Unavailable("no todo endpoint configured".into()))
    }

    async fn create(&self, _name: &str) -> StoreResult<Item> {
        Err(StoreError::Unavailable("no todo endpoint configured".into()))
    }

    async fn update(&self, id: &ItemId, _name: &str) -> StoreResult<()> {
        Err(StoreError::Unavailable(format!(
            "no todo endpoint configured; cannot update {id}"
        )))
    }

    async fn delete(&self, id: &ItemId) -> StoreResult<()> {
        Err(StoreError::Unavailable(format!(
            "no todo endpoint configured; cannot delete {id}"
        )))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Initialize,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Initialize => "initialize",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single item currently being edited, plus its uncommitted name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditCursor {
    pub id: ItemId,
    pub buffer: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListSnapshot {
    pub items: Vec<Item>,
    pub draft_name: String,
    pub edit: Option<EditCursor>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    ItemsLoaded(Vec<Item>),
    ItemAdded(Item),
    /// A create came back with an id already in the list; that entry was overwritten.
    ItemReplaced(Item),
    ItemRenamed { id: ItemId, name: String },
    ItemRemoved(ItemId),
    EditChanged(Option<ItemId>),
    OperationFailed {
        operation: Operation,
        kind: StoreErrorKind,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ControllerOptions {
    /// Seed the edit buffer with the item's current name instead of leaving it empty.
    pub prefill_edit_buffer: bool,
}

#[derive(Default)]
struct ListState {
    items: Vec<Item>,
    draft_name: String,
    edit_cursor: Option<EditCursor>,
    initialized: bool,
}

/// Owns the local view of the todo collection and reconciles it with a
/// [`RemoteStore`]. The state lock is never held across a remote call, so
/// operations may overlap; each completion applies its own change and the
/// last writer wins.
///
/// Remote failures never reach the caller. They are logged and published as
/// [`ControllerEvent::OperationFailed`].
pub struct ListStateController {
    store: Arc<dyn RemoteStore>,
    options: ControllerOptions,
    inner: Mutex<ListState>,
    events: broadcast::Sender<ControllerEvent>,
}

impl ListStateController {
    pub fn new(store: Arc<dyn RemoteStore>) -> Arc<Self> {
        Self::new_with_options(store, ControllerOptions::default())
    }

    pub fn new_with_options(store: Arc<dyn RemoteStore>, options: ControllerOptions) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            store,
            options,
            inner: Mutex::new(ListState::default()),
            events,
        })
    }

    /// Builds a controller and performs its one initial fetch.
    pub async fn start(store: Arc<dyn RemoteStore>, options: ControllerOptions) -> Arc<Self> {
        let controller = Self::new_with_options(store, options);
        controller.initialize().await;
        controller
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> ListSnapshot {
        let guard = self.inner.lock().await;
        ListSnapshot {
            items: guard.items.clone(),
            draft_name: guard.draft_name.clone(),
            edit: guard.edit_cursor.clone(),
        }
    }

    pub async fn items(&self) -> Vec<Item> {
        self.inner.lock().await.items.clone()
    }

    pub async fn draft_name(&self) -> String {
        self.inner.lock().await.draft_name.clone()
    }

    pub async fn edit_cursor(&self) -> Option<EditCursor> {
        self.inner.lock().await.edit_cursor.clone()
    }

    /// Replaces the collection with the store's full listing. Only the first
    /// call per controller reaches the store.
    pub async fn initialize(&self) {
        {
            let mut guard = self.inner.lock().await;
            if guard.initialized {
                warn!("list already initialized; ignoring repeated fetch");
                return;
            }
            guard.initialized = true;
        }

        let result = self.store.list().await;
        let mut guard = self.inner.lock().await;
        match result {
            Ok(items) => {
                let items = dedupe_by_id(items);
                info!(count = items.len(), "loaded todo list");
                guard.items = items.clone();
                let cursor_lost = guard
                    .edit_cursor
                    .as_ref()
                    .is_some_and(|cursor| !contains_id(&guard.items, &cursor.id));
                if cursor_lost {
                    guard.edit_cursor = None;
                    self.emit(ControllerEvent::EditChanged(None));
                }
                self.emit(ControllerEvent::ItemsLoaded(items));
            }
            Err(err) => self.report(Operation::Initialize, err),
        }
    }

    pub async fn set_draft_name(&self, text: impl Into<String>) {
        self.inner.lock().await.draft_name = text.into();
    }

    /// Creates an item from the draft. An empty draft is ignored outright;
    /// otherwise the draft is cleared once the call resolves, whatever the outcome.
    pub async fn submit_create(&self) {
        let name = {
            let guard = self.inner.lock().await;
            if guard.draft_name.is_empty() {
                debug!("ignoring create with empty draft");
                return;
            }
            guard.draft_name.clone()
        };

        let result = self.store.create(&name).await;
        let mut guard = self.inner.lock().await;
        match result {
            Ok(item) => {
                info!(item_id = %item.id, "created todo");
                if let Some(existing) = guard.items.iter_mut().find(|i| i.id == item.id) {
                    warn!(item_id = %item.id, "created id already present; replacing in place");
                    *existing = item.clone();
                    self.emit(ControllerEvent::ItemReplaced(item));
                } else {
                    guard.items.push(item.clone());
                    self.emit(ControllerEvent::ItemAdded(item));
                }
            }
            Err(err) => self.report(Operation::Create, err),
        }
        guard.draft_name.clear();
    }

    /// Opens the edit cursor on `id`, replacing any previous one. Unknown ids are ignored.
    pub async fn begin_edit(&self, id: &ItemId) {
        let mut guard = self.inner.lock().await;
        let Some(item) = guard.items.iter().find(|item| &item.id == id) else {
            debug!(item_id = %id, "begin_edit on unknown item ignored");
            return;
        };
        let buffer = if self.options.prefill_edit_buffer {
            item.name.clone()
        } else {
            String::new()
        };
        guard.edit_cursor = Some(EditCursor {
            id: id.clone(),
            buffer,
        });
        self.emit(ControllerEvent::EditChanged(Some(id.clone())));
    }

    pub async fn set_edit_buffer(&self, text: impl Into<String>) {
        let mut guard = self.inner.lock().await;
        match guard.edit_cursor.as_mut() {
            Some(cursor) => cursor.buffer = text.into(),
            None => debug!("set_edit_buffer without an active edit ignored"),
        }
    }

    /// Commits the edit buffer. The local name only changes if the store
    /// accepted the update; the cursor is cleared either way. An empty buffer
    /// never reaches the store, the same as an empty draft on create.
    pub async fn submit_update(&self) {
        let cursor = {
            let mut guard = self.inner.lock().await;
            let Some(cursor) = guard.edit_cursor.clone() else {
                debug!("submit_update without an active edit ignored");
                return;
            };
            if cursor.buffer.is_empty() {
                debug!(item_id = %cursor.id, "ignoring update with empty name");
                guard.edit_cursor = None;
                self.emit(ControllerEvent::EditChanged(None));
                return;
            }
            cursor
        };

        let result = self.store.update(&cursor.id, &cursor.buffer).await;
        let mut guard = self.inner.lock().await;
        match result {
            Ok(()) => {
                match guard.items.iter_mut().find(|item| item.id == cursor.id) {
                    Some(item) => {
                        item.name = cursor.buffer.clone();
                        info!(item_id = %cursor.id, "updated todo");
                        self.emit(ControllerEvent::ItemRenamed {
                            id: cursor.id.clone(),
                            name: cursor.buffer,
                        });
                    }
                    None => debug!(item_id = %cursor.id, "updated item no longer in local list"),
                }
            }
            Err(err) => self.report(Operation::Update, err),
        }
        guard.edit_cursor = None;
        self.emit(ControllerEvent::EditChanged(None));
    }

    pub async fn cancel_edit(&self) {
        let mut guard = self.inner.lock().await;
        if guard.edit_cursor.take().is_some() {
            self.emit(ControllerEvent::EditChanged(None));
        }
    }

    /// Deletes `id` remotely and, on success only, locally. A cursor on the
    /// deleted item is cleared with it.
    pub async fn submit_delete(&self, id: &ItemId) {
        let result = self.store.delete(id).await;
        let mut guard = self.inner.lock().await;
        match result {
            Ok(()) => {
                let before = guard.items.len();
                guard.items.retain(|item| &item.id != id);
                if guard.items.len() != before {
                    info!(item_id = %id, "deleted todo");
                    self.emit(ControllerEvent::ItemRemoved(id.clone()));
                }
                if guard
                    .edit_cursor
                    .as_ref()
                    .is_some_and(|cursor| &cursor.id == id)
                {
                    guard.edit_cursor = None;
                    self.emit(ControllerEvent::EditChanged(None));
                }
            }
            Err(err) => self.report(Operation::Delete, err),
        }
    }

    fn report(&self, operation: Operation, err: StoreError) {
        let kind = err.kind();
        error!(operation = %operation, ?kind, error = %err, "remote call failed");
        self.emit(ControllerEvent::OperationFailed {
            operation,
            kind,
            message: err.to_string(),
        });
    }

    fn emit(&self, event: ControllerEvent) {
        // No subscribers is fine: failures stay silent unless someone listens.
        let _ = self.events.send(event);
    }
}

fn contains_id(items: &[Item], id: &ItemId) -> bool {
    items.iter().any(|item| &item.id == id)
}

fn dedupe_by_id(items: Vec<Item>) -> Vec<Item> {
    let mut seen = HashSet::with_capacity(items.len());
    let total = items.len();
    let unique: Vec<Item> = items
        .into_iter()
        .filter(|item| seen.insert(item.id.clone()))
        .collect();
    if unique.len() != total {
        warn!(
            dropped = total - unique.len(),
            "listing contained duplicate ids; kept first occurrences"
        );
    }
    unique
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
