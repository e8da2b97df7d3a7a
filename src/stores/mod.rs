//! State containers behind the terminal's screens.
//!
//! Every store is constructed once by [`crate::AppState`], holds the last
//! fetched data in memory, and turns every failure into an [`ActionResult`]
//! with a user-visible message. `reset()` returns a store to its initial
//! state on logout.

pub mod categories;
pub mod info;
pub mod orders;
pub mod services;
pub mod settings;
pub mod shifts;
pub mod users;
pub mod visit_objects;

use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

use crate::api::ApiClient;
use crate::collection::{merge_changes, Collection, Tracked};
use crate::endpoints::{self, Resource};

pub use categories::CategoryVisitorStore;
pub use info::InfoStore;
pub use orders::OrderStore;
pub use services::ServiceStore;
pub use settings::SettingsStore;
pub use shifts::ShiftStore;
pub use users::UserStore;
pub use visit_objects::VisitObjectStore;

// ---------------------------------------------------------------------------
// Action results
// ---------------------------------------------------------------------------

/// Outcome of a store action, handed to view code instead of an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionResult<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ActionResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Success without a payload, e.g. an empty acknowledgement.
    pub fn done() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Loading flag and last error shared by every store.
#[derive(Debug, Default)]
pub(crate) struct Status {
    loading: bool,
    last_error: Option<String>,
}

impl Status {
    pub(crate) fn begin(&mut self) {
        self.loading = true;
        self.last_error = None;
    }

    pub(crate) fn finish<T>(&mut self, result: &ActionResult<T>) {
        self.loading = false;
        self.last_error = result.error.clone();
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

// ---------------------------------------------------------------------------
// Generic CRUD store
// ---------------------------------------------------------------------------

struct ResourceState<T> {
    items: Collection<T>,
    status: Status,
}

/// A backend collection with fetch/add/update/delete.
///
/// Updates send the full record with the requested changes applied. When
/// the backend answers with the record it is stored as confirmed; when the
/// call fails the change is kept locally but marked unconfirmed, and the
/// next fetch replaces it.
pub struct ResourceStore<T> {
    client: Arc<ApiClient>,
    state: Mutex<ResourceState<T>>,
}

impl<T: Resource> ResourceStore<T> {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            state: Mutex::new(ResourceState {
                items: Collection::new(),
                status: Status::default(),
            }),
        }
    }

    pub(crate) fn client(&self) -> &ApiClient {
        &self.client
    }

    fn state(&self) -> MutexGuard<'_, ResourceState<T>> {
        lock(&self.state)
    }

    pub(crate) fn begin(&self) {
        self.state().status.begin();
    }

    pub(crate) fn finish<R>(&self, result: ActionResult<R>) -> ActionResult<R> {
        self.state().status.finish(&result);
        result
    }

    pub async fn fetch(&self) -> ActionResult<Vec<T>> {
        self.begin();
        let result = match endpoints::list::<T>(&self.client).await {
            Ok(records) => {
                info!(resource = T::NAME, count = records.len(), "collection loaded");
                self.replace_all(records.clone());
                ActionResult::ok(records)
            }
            Err(e) => ActionResult::fail(format!("Failed to load {}: {e}", plural(T::NAME))),
        };
        self.finish(result)
    }

    pub async fn add(&self, record: T) -> ActionResult<T> {
        self.begin();
        let result = match endpoints::create(&self.client, &record).await {
            Ok(Some(created)) => {
                self.state().items.confirm(created.clone());
                ActionResult::ok(created)
            }
            Ok(None) => {
                self.refetch().await;
                ActionResult::done()
            }
            Err(e) => ActionResult::fail(format!("Failed to create {}: {e}", T::NAME)),
        };
        self.finish(result)
    }

    /// Apply `changes` (top-level backend fields) to the record `id`.
    pub async fn update(&self, id: i64, changes: &Value) -> ActionResult<T> {
        self.begin();
        let result = self.update_inner(id, changes).await;
        self.finish(result)
    }

    async fn update_inner(&self, id: i64, changes: &Value) -> ActionResult<T> {
        let Some(current) = self.get(id) else {
            return ActionResult::fail(format!("{} {id} not found", capitalize(T::NAME)));
        };
        let merged = match merge_changes(&current, changes) {
            Ok(m) if m.id() == id => m,
            Ok(_) => return ActionResult::fail(format!("{} cannot be changed", T::ID_FIELD)),
            Err(e) => return ActionResult::fail(e),
        };

        match endpoints::update(&self.client, &merged).await {
            Ok(Some(saved)) => {
                self.state().items.confirm(saved.clone());
                ActionResult::ok(saved)
            }
            Ok(None) => {
                if !self.refetch().await {
                    self.state().items.apply_unconfirmed(id, |r| *r = merged.clone());
                }
                ActionResult::ok(self.get(id).unwrap_or(merged))
            }
            Err(e) => {
                warn!(resource = T::NAME, id, "update failed, keeping unconfirmed local change");
                self.state().items.apply_unconfirmed(id, |r| *r = merged);
                ActionResult::fail(format!("Failed to update {}: {e}", T::NAME))
            }
        }
    }

    pub async fn delete(&self, id: i64) -> ActionResult<()> {
        self.begin();
        let result = match endpoints::delete::<T>(&self.client, id).await {
            Ok(()) => {
                self.state().items.remove(id);
                ActionResult::done()
            }
            Err(e) => ActionResult::fail(format!("Failed to delete {}: {e}", T::NAME)),
        };
        self.finish(result)
    }

    /// Re-list after an empty acknowledgement. Returns whether it succeeded.
    async fn refetch(&self) -> bool {
        match endpoints::list::<T>(&self.client).await {
            Ok(records) => {
                self.replace_all(records);
                true
            }
            Err(_) => false,
        }
    }

    pub(crate) fn replace_all(&self, records: Vec<T>) {
        self.state().items.replace_all(records);
    }

    pub(crate) fn confirm(&self, record: T) {
        self.state().items.confirm(record);
    }

    pub fn get(&self, id: i64) -> Option<T> {
        self.state().items.get(id).map(|t| t.record.clone())
    }

    pub fn tracked(&self, id: i64) -> Option<Tracked<T>> {
        self.state().items.get(id).cloned()
    }

    pub fn all(&self) -> Vec<T> {
        self.state().items.records().cloned().collect()
    }

    pub fn find(&self, mut predicate: impl FnMut(&T) -> bool) -> Option<T> {
        self.state().items.records().find(|r| predicate(r)).cloned()
    }

    pub fn sorted_by(&self, compare: impl FnMut(&T, &T) -> std::cmp::Ordering) -> Vec<T> {
        self.state().items.sorted_by(compare)
    }

    pub fn unconfirmed_ids(&self) -> Vec<i64> {
        self.state().items.unconfirmed().iter().map(|r| r.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.state().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().items.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.state().status.loading
    }

    pub fn last_error(&self) -> Option<String> {
        self.state().status.last_error.clone()
    }

    pub fn reset(&self) {
        let mut state = self.state();
        state.items.clear();
        state.status = Status::default();
    }
}

fn plural(name: &str) -> String {
    match name.strip_suffix('y') {
        Some(stem) => format!("{stem}ies"),
        None => format!("{name}s"),
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
