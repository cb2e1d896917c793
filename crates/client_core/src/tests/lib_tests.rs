use super::*;
use std::collections::VecDeque;
use tokio::sync::Notify;

#[derive(Default)]
struct ScriptedStore {
    listing: Vec<Item>,
    next_ids: Mutex<VecDeque<String>>,
    fail_list: bool,
    fail_create: bool,
    fail_update: bool,
    fail_delete: bool,
    list_gate: Option<Arc<Notify>>,
    create_gate: Option<Arc<Notify>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedStore {
    fn with_listing(listing: Vec<Item>) -> Self {
        Self {
            listing,
            ..Self::default()
        }
    }

    fn next_id(self, id: &str) -> Self {
        self.next_ids.try_lock().expect("unshared").push_back(id.to_string());
        self
    }

    fn failing_all() -> Self {
        Self {
            fail_list: true,
            fail_create: true,
            fail_update: true,
            fail_delete: true,
            ..Self::default()
        }
    }

    async fn record(&self, call: String) {
        self.calls.lock().await.push(call);
    }
}

fn rejected(what: &str) -> StoreError {
    StoreError::Rejected(format!("simulated {what} rejection"))
}

#[async_trait]
impl RemoteStore for ScriptedStore {
    async fn list(&self) -> StoreResult<Vec<Item>> {
        self.record("list".into()).await;
        if let Some(gate) = &self.list_gate {
            gate.notified().await;
        }
        if self.fail_list {
            return Err(rejected("list"));
        }
        Ok(self.listing.clone())
    }

    async fn create(&self, name: &str) -> StoreResult<Item> {
        self.record(format!("create:{name}")).await;
        if let Some(gate) = &self.create_gate {
            gate.notified().await;
        }
        if self.fail_create {
            return Err(rejected("create"));
        }
        let id = self
            .next_ids
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| format!("generated-{name}"));
        Ok(Item::new(id.as_str(), name))
    }

    async fn update(&self, id: &ItemId, name: &str) -> StoreResult<()> {
        self.record(format!("update:{id}:{name}")).await;
        if self.fail_update {
            return Err(rejected("update"));
        }
        Ok(())
    }

    async fn delete(&self, id: &ItemId) -> StoreResult<()> {
        self.record(format!("delete:{id}")).await;
        if self.fail_delete {
            return Err(rejected("delete"));
        }
        Ok(())
    }
}

fn milk() -> Item {
    Item::new("1", "milk")
}

fn bread() -> Item {
    Item::new("2", "bread")
}

async fn started(store: ScriptedStore) -> (Arc<ListStateController>, Arc<Mutex<Vec<String>>>) {
    let calls = store.calls.clone();
    let controller = ListStateController::start(Arc::new(store), ControllerOptions::default()).await;
    (controller, calls)
}

#[tokio::test]
async fn initialize_replaces_items_with_listing() {
    let (controller, calls) = started(ScriptedStore::with_listing(vec![milk()])).await;

    assert_eq!(controller.items().await, vec![milk()]);
    assert_eq!(*calls.lock().await, vec!["list".to_string()]);
}

#[tokio::test]
async fn initialize_fetches_only_once_per_controller() {
    let (controller, calls) = started(ScriptedStore::with_listing(vec![milk()])).await;

    controller.initialize().await;
    controller.initialize().await;

    assert_eq!(calls.lock().await.len(), 1);
}

#[tokio::test]
async fn failed_initialize_leaves_list_empty_and_publishes_failure() {
    let controller = ListStateController::new(Arc::new(ScriptedStore::failing_all()));
    let mut rx = controller.subscribe_events();

    controller.initialize().await;

    assert!(controller.items().await.is_empty());
    match rx.recv().await.expect("event") {
        ControllerEvent::OperationFailed {
            operation, kind, ..
        } => {
            assert_eq!(operation, Operation::Initialize);
            assert_eq!(kind, StoreErrorKind::RemoteCallFailed);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn listing_with_duplicate_ids_keeps_first_occurrence() {
    let (controller, _) = started(ScriptedStore::with_listing(vec![
        milk(),
        Item::new("1", "milk again"),
        bread(),
    ]))
    .await;

    assert_eq!(controller.items().await, vec![milk(), bread()]);
}

#[tokio::test]
async fn create_appends_server_item_and_clears_draft() {
    let (controller, calls) =
        started(ScriptedStore::with_listing(vec![milk()]).next_id("2")).await;

    controller.set_draft_name("bread").await;
    controller.submit_create().await;

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.items, vec![milk(), bread()]);
    assert_eq!(snapshot.draft_name, "");
    assert_eq!(calls.lock().await.last().map(String::as_str), Some("create:bread"));
}

#[tokio::test]
async fn create_with_empty_draft_never_reaches_store() {
    let (controller, calls) = started(ScriptedStore::with_listing(vec![milk()])).await;

    controller.set_draft_name("").await;
    controller.submit_create().await;

    assert_eq!(controller.items().await, vec![milk()]);
    assert_eq!(controller.draft_name().await, "");
    assert_eq!(*calls.lock().await, vec!["list".to_string()]);
}

#[tokio::test]
async fn failed_create_keeps_items_but_still_clears_draft() {
    let store = ScriptedStore {
        listing: vec![milk()],
        fail_create: true,
        ..ScriptedStore::default()
    };
    let (controller, _) = started(store).await;
    let mut rx = controller.subscribe_events();

    controller.set_draft_name("bread").await;
    controller.submit_create().await;

    assert_eq!(controller.items().await, vec![milk()]);
    assert_eq!(controller.draft_name().await, "");
    assert!(matches!(
        rx.recv().await.expect("event"),
        ControllerEvent::OperationFailed {
            operation: Operation::Create,
            ..
        }
    ));
}

#[tokio::test]
async fn created_id_already_present_is_replaced_not_duplicated() {
    let (controller, _) = started(ScriptedStore::with_listing(vec![milk()]).next_id("1")).await;

    let mut rx = controller.subscribe_events();

    controller.set_draft_name("milk v2").await;
    controller.submit_create().await;

    assert_eq!(controller.items().await, vec![Item::new("1", "milk v2")]);
    assert_eq!(
        rx.recv().await.expect("event"),
        ControllerEvent::ItemReplaced(Item::new("1", "milk v2"))
    );
}

#[tokio::test]
async fn begin_edit_starts_with_empty_buffer() {
    let (controller, _) = started(ScriptedStore::with_listing(vec![milk()])).await;

    controller.begin_edit(&ItemId::new("1")).await;

    assert_eq!(
        controller.edit_cursor().await,
        Some(EditCursor {
            id: ItemId::new("1"),
            buffer: String::new(),
        })
    );
}

#[tokio::test]
async fn prefill_option_seeds_buffer_with_current_name() {
    let controller = ListStateController::start(
        Arc::new(ScriptedStore::with_listing(vec![milk()])),
        ControllerOptions {
            prefill_edit_buffer: true,
        },
    )
    .await;

    controller.begin_edit(&ItemId::new("1")).await;

    let cursor = controller.edit_cursor().await.expect("cursor");
    assert_eq!(cursor.buffer, "milk");
}

#[tokio::test]
async fn begin_edit_on_unknown_id_is_ignored() {
    let (controller, _) = started(ScriptedStore::with_listing(vec![milk()])).await;

    controller.begin_edit(&ItemId::new("404")).await;

    assert_eq!(controller.edit_cursor().await, None);
}

#[tokio::test]
async fn begin_edit_replaces_previous_cursor() {
    let (controller, _) = started(ScriptedStore::with_listing(vec![milk(), bread()])).await;

    controller.begin_edit(&ItemId::new("1")).await;
    controller.set_edit_buffer("oat milk").await;
    controller.begin_edit(&ItemId::new("2")).await;

    assert_eq!(
        controller.edit_cursor().await,
        Some(EditCursor {
            id: ItemId::new("2"),
            buffer: String::new(),
        })
    );
}

#[tokio::test]
async fn update_renames_item_and_clears_cursor() {
    let (controller, calls) = started(ScriptedStore::with_listing(vec![milk(), bread()])).await;

    controller.begin_edit(&ItemId::new("1")).await;
    controller.set_edit_buffer("oat milk").await;
    controller.submit_update().await;

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.items, vec![Item::new("1", "oat milk"), bread()]);
    assert_eq!(snapshot.edit, None);
    assert_eq!(
        calls.lock().await.last().map(String::as_str),
        Some("update:1:oat milk")
    );
}

#[tokio::test]
async fn failed_update_keeps_name_and_clears_cursor() {
    let store = ScriptedStore {
        listing: vec![milk()],
        fail_update: true,
        ..ScriptedStore::default()
    };
    let (controller, _) = started(store).await;

    controller.begin_edit(&ItemId::new("1")).await;
    controller.set_edit_buffer("oat milk").await;
    controller.submit_update().await;

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.items, vec![milk()]);
    assert_eq!(snapshot.edit, None);
}

#[tokio::test]
async fn update_with_empty_buffer_never_reaches_store() {
    let (controller, calls) = started(ScriptedStore::with_listing(vec![milk()])).await;
    let mut rx = controller.subscribe_events();

    controller.begin_edit(&ItemId::new("1")).await;
    controller.submit_update().await;

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.items, vec![milk()]);
    assert_eq!(snapshot.edit, None);
    assert_eq!(*calls.lock().await, vec!["list".to_string()]);
    assert_eq!(
        rx.recv().await.expect("opened"),
        ControllerEvent::EditChanged(Some(ItemId::new("1")))
    );
    assert_eq!(
        rx.recv().await.expect("closed"),
        ControllerEvent::EditChanged(None)
    );
}

#[tokio::test]
async fn update_and_buffer_without_cursor_are_ignored() {
    let (controller, calls) = started(ScriptedStore::with_listing(vec![milk()])).await;

    controller.set_edit_buffer("orphan").await;
    controller.submit_update().await;

    assert_eq!(controller.edit_cursor().await, None);
    assert_eq!(*calls.lock().await, vec!["list".to_string()]);
}

#[tokio::test]
async fn cancel_edit_discards_buffer_without_remote_call() {
    let (controller, calls) = started(ScriptedStore::with_listing(vec![milk()])).await;

    controller.begin_edit(&ItemId::new("1")).await;
    controller.set_edit_buffer("oat milk").await;
    controller.cancel_edit().await;

    assert_eq!(controller.edit_cursor().await, None);
    assert_eq!(controller.items().await, vec![milk()]);
    assert_eq!(calls.lock().await.len(), 1);
}

#[tokio::test]
async fn delete_removes_exactly_the_matching_item() {
    let (controller, _) = started(ScriptedStore::with_listing(vec![
        milk(),
        bread(),
        Item::new("3", "eggs"),
    ]))
    .await;

    controller.submit_delete(&ItemId::new("2")).await;

    assert_eq!(controller.items().await, vec![milk(), Item::new("3", "eggs")]);
}

#[tokio::test]
async fn rejected_delete_leaves_items_untouched() {
    let store = ScriptedStore {
        listing: vec![milk(), bread()],
        fail_delete: true,
        ..ScriptedStore::default()
    };
    let (controller, _) = started(store).await;
    let before = controller.items().await;

    controller.submit_delete(&ItemId::new("2")).await;

    assert_eq!(controller.items().await, before);
}

#[tokio::test]
async fn deleting_the_edited_item_clears_cursor() {
    let (controller, _) = started(ScriptedStore::with_listing(vec![milk(), bread()])).await;

    controller.begin_edit(&ItemId::new("1")).await;
    controller.submit_delete(&ItemId::new("2")).await;
    assert!(controller.edit_cursor().await.is_some());

    controller.submit_delete(&ItemId::new("1")).await;
    assert_eq!(controller.edit_cursor().await, None);
    assert!(controller.items().await.is_empty());
}

#[tokio::test]
async fn overlapping_create_and_delete_both_apply() {
    let gate = Arc::new(Notify::new());
    let store = ScriptedStore {
        listing: vec![milk()],
        create_gate: Some(gate.clone()),
        ..ScriptedStore::default()
    }
    .next_id("2");
    let (controller, calls) = started(store).await;

    controller.set_draft_name("bread").await;
    let pending = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.submit_create().await })
    };
    while !calls.lock().await.iter().any(|call| call == "create:bread") {
        tokio::task::yield_now().await;
    }

    // The create is parked inside the store; the delete must not wait on it.
    controller.submit_delete(&ItemId::new("1")).await;
    assert!(controller.items().await.is_empty());

    gate.notify_one();
    pending.await.expect("create task");
    assert_eq!(controller.items().await, vec![bread()]);
    assert_eq!(controller.draft_name().await, "");
}

#[tokio::test]
async fn late_listing_without_edited_item_clears_cursor() {
    let gate = Arc::new(Notify::new());
    let store = ScriptedStore {
        listing: vec![milk()],
        list_gate: Some(gate.clone()),
        ..ScriptedStore::default()
    }
    .next_id("9");
    let calls = store.calls.clone();
    let controller = ListStateController::new(Arc::new(store));
    let mut rx = controller.subscribe_events();

    let loading = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.initialize().await })
    };
    while !calls.lock().await.iter().any(|call| call == "list") {
        tokio::task::yield_now().await;
    }

    // The listing is parked; the created item will not be part of it.
    controller.set_draft_name("bread").await;
    controller.submit_create().await;
    controller.begin_edit(&ItemId::new("9")).await;
    assert!(controller.edit_cursor().await.is_some());

    gate.notify_one();
    loading.await.expect("initialize task");

    assert_eq!(controller.items().await, vec![milk()]);
    assert_eq!(controller.edit_cursor().await, None);
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert_eq!(
        events,
        vec![
            ControllerEvent::ItemAdded(Item::new("9", "bread")),
            ControllerEvent::EditChanged(Some(ItemId::new("9"))),
            ControllerEvent::EditChanged(None),
            ControllerEvent::ItemsLoaded(vec![milk()]),
        ]
    );
}

#[tokio::test]
async fn events_follow_successful_mutations() {
    let (controller, _) =
        started(ScriptedStore::with_listing(vec![milk()]).next_id("2")).await;
    let mut rx = controller.subscribe_events();

    controller.set_draft_name("bread").await;
    controller.submit_create().await;
    controller.submit_delete(&ItemId::new("1")).await;

    assert_eq!(
        rx.recv().await.expect("added"),
        ControllerEvent::ItemAdded(bread())
    );
    assert_eq!(
        rx.recv().await.expect("removed"),
        ControllerEvent::ItemRemoved(ItemId::new("1"))
    );
}

#[tokio::test]
async fn missing_store_fails_every_call_quietly() {
    let controller =
        ListStateController::start(Arc::new(MissingRemoteStore), ControllerOptions::default())
            .await;

    controller.set_draft_name("bread").await;
    controller.submit_create().await;

    let snapshot = controller.snapshot().await;
    assert!(snapshot.items.is_empty());
    assert_eq!(snapshot.draft_name, "");
}

#[test]
fn malformed_errors_are_classified_separately() {
    assert_eq!(
        StoreError::Malformed("no data".into()).kind(),
        StoreErrorKind::MalformedResponse
    );
    assert_eq!(
        StoreError::Status {
            status: 502,
            body: "bad gateway".into(),
        }
        .kind(),
        StoreErrorKind::RemoteCallFailed
    );
    assert_eq!(
        StoreError::from(shared::error::DecodeError::MissingField("id")).kind(),
        StoreErrorKind::MalformedResponse
    );
}
