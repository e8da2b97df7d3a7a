//! Orders for the selected date range, their status labels and state
//! transitions.

use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

use super::{lock, ActionResult, Status};
use crate::api::ApiClient;
use crate::collection::{Collection, Tracked};
use crate::endpoints;
use crate::models::{Order, OrderCost, OrderDraft};
use crate::order_filter::{filter_orders_by_date, DateRange, FilterMode, FilterOutcome};
use crate::order_status::StatusTable;

#[derive(Default)]
struct OrderState {
    items: Collection<Order>,
    range: Option<DateRange>,
    status: Status,
}

pub struct OrderStore {
    client: Arc<ApiClient>,
    statuses: Arc<StatusTable>,
    state: Mutex<OrderState>,
}

impl OrderStore {
    pub fn new(client: Arc<ApiClient>, statuses: Arc<StatusTable>) -> Self {
        Self {
            client,
            statuses,
            state: Mutex::new(OrderState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, OrderState> {
        lock(&self.state)
    }

    fn finish<T>(&self, result: ActionResult<T>) -> ActionResult<T> {
        self.state().status.finish(&result);
        result
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    /// Replace the collection with the backend's orders for `range`.
    pub async fn fetch_range(&self, range: &DateRange) -> ActionResult<Vec<Order>> {
        self.state().status.begin();
        let result = match endpoints::orders::get_range(&self.client, range.start(), range.end()).await
        {
            Ok(found) => {
                info!(
                    start = range.start(),
                    end = range.end(),
                    count = found.order.len(),
                    "orders loaded"
                );
                let mut state = self.state();
                state.items.replace_all(found.order.clone());
                state.range = Some(range.clone());
                ActionResult::ok(found.order)
            }
            Err(e) => ActionResult::fail(format!("Failed to load orders: {e}")),
        };
        self.finish(result)
    }

    pub async fn fetch_by_id(&self, order_id: i64) -> ActionResult<Order> {
        self.state().status.begin();
        let result = match endpoints::orders::get_by_id(&self.client, order_id).await {
            Ok(order) => {
                self.state().items.confirm(order.clone());
                ActionResult::ok(order)
            }
            Err(e) => ActionResult::fail(format!("Failed to load order {order_id}: {e}")),
        };
        self.finish(result)
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    /// Loaded orders restricted to `range`. Dropped orders are reported in
    /// the outcome's diagnostics.
    pub fn filtered(&self, range: &DateRange, mode: FilterMode) -> FilterOutcome {
        let orders: Vec<Order> = self.state().items.records().cloned().collect();
        let outcome = filter_orders_by_date(&orders, range, mode);
        if !outcome.diagnostics.is_empty() {
            warn!(
                dropped = outcome.diagnostics.len(),
                "orders excluded from date filter"
            );
        }
        outcome
    }

    pub fn status_label(&self, code: i32) -> String {
        self.statuses.label(code).to_string()
    }

    /// Most recent first.
    pub fn sorted(&self) -> Vec<Order> {
        self.state().items.sorted_by(|a, b| b.order_id.cmp(&a.order_id))
    }

    pub fn get(&self, order_id: i64) -> Option<Tracked<Order>> {
        self.state().items.get(order_id).cloned()
    }

    pub fn range(&self) -> Option<DateRange> {
        self.state().range.clone()
    }

    // -----------------------------------------------------------------------
    // Local changes
    // -----------------------------------------------------------------------

    /// Show a status the backend has not confirmed. Returns `false` when the
    /// order is not loaded.
    pub fn update_status_locally(&self, order_id: i64, code: i32) -> bool {
        self.state()
            .items
            .apply_unconfirmed(order_id, |o| o.order_state_id = code)
    }

    pub fn remove_locally(&self, order_id: i64) -> Option<Order> {
        self.state().items.remove(order_id)
    }

    // -----------------------------------------------------------------------
    // Backend actions
    // -----------------------------------------------------------------------

    pub async fn create(&self, draft: &OrderDraft) -> ActionResult<Order> {
        self.state().status.begin();
        let outcome = endpoints::orders::create(&self.client, draft).await;
        self.after_create(outcome)
    }

    /// Create an order that stays editable on the backend until sold.
    pub async fn create_editable(&self, draft: &OrderDraft) -> ActionResult<Order> {
        self.state().status.begin();
        let outcome = endpoints::orders::create_editable(&self.client, draft).await;
        self.after_create(outcome)
    }

    fn after_create(
        &self,
        outcome: Result<Option<Order>, crate::api::ApiError>,
    ) -> ActionResult<Order> {
        let result = match outcome {
            Ok(Some(order)) => {
                self.state().items.confirm(order.clone());
                ActionResult::ok(order)
            }
            Ok(None) => ActionResult::done(),
            Err(e) => ActionResult::fail(format!("Failed to create order: {e}")),
        };
        self.finish(result)
    }

    pub async fn cost(&self, draft: &OrderDraft) -> ActionResult<OrderCost> {
        match endpoints::orders::cost(&self.client, draft).await {
            Ok(cost) => ActionResult::ok(cost),
            Err(e) => ActionResult::fail(format!("Failed to price order: {e}")),
        }
    }

    pub async fn cancel(&self, order_id: i64) -> ActionResult<Order> {
        self.state().status.begin();
        let outcome = endpoints::orders::cancel(&self.client, order_id).await;
        self.after_transition("cancel", order_id, outcome).await
    }

    pub async fn sell(&self, order_id: i64) -> ActionResult<Order> {
        self.state().status.begin();
        let outcome = endpoints::orders::sold(&self.client, order_id).await;
        self.after_transition("sell", order_id, outcome).await
    }

    pub async fn refund(&self, order_id: i64) -> ActionResult<Order> {
        self.state().status.begin();
        let outcome = endpoints::orders::refund(&self.client, order_id).await;
        self.after_transition("refund", order_id, outcome).await
    }

    /// Store the backend's record after a state transition. An empty
    /// acknowledgement is followed by a re-fetch of that order.
    async fn after_transition(
        &self,
        action: &str,
        order_id: i64,
        outcome: Result<Option<Order>, crate::api::ApiError>,
    ) -> ActionResult<Order> {
        let result = match outcome {
            Ok(Some(order)) => {
                self.state().items.confirm(order.clone());
                ActionResult::ok(order)
            }
            Ok(None) => match endpoints::orders::get_by_id(&self.client, order_id).await {
                Ok(order) => {
                    self.state().items.confirm(order.clone());
                    ActionResult::ok(order)
                }
                Err(e) => {
                    warn!(order_id, error = %e, "order changed but could not be reloaded");
                    ActionResult::done()
                }
            },
            Err(e) => ActionResult::fail(format!("Failed to {action} order {order_id}: {e}")),
        };
        self.finish(result)
    }

    pub fn is_loading(&self) -> bool {
        self.state().status.loading
    }

    pub fn last_error(&self) -> Option<String> {
        self.state().status.last_error.clone()
    }

    pub fn reset(&self) {
        *self.state() = OrderState::default();
    }
}
