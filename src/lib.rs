//! Ticket Terminal - admin and point-of-sale core for the park ticketing
//! backend.
//!
//! [`AppState`] is built once per process and owns every store. Front-end
//! shells call the stores through it; nothing here is a global.

use std::sync::Arc;
use tracing::{info, warn};

pub mod api;
pub mod collection;
pub mod config;
pub mod db;
pub mod diagnostics;
pub mod endpoints;
pub mod guard;
pub mod models;
pub mod order_filter;
pub mod order_status;
pub mod session;
pub mod storage;
pub mod stores;

#[cfg(test)]
mod test_support;

use api::ApiClient;
use config::AppConfig;
use db::DbState;
use diagnostics::AboutInfo;
use models::Order;
use order_status::StatusTable;
use session::{Session, SessionSnapshot};
use storage::TokenVault;
use stores::{
    ActionResult, CategoryVisitorStore, InfoStore, OrderStore, ServiceStore, SettingsStore,
    ShiftStore, UserStore, VisitObjectStore,
};

// ============================================================================
// Application state
// ============================================================================

pub struct AppState {
    pub config: AppConfig,
    pub db: Arc<DbState>,
    pub client: Arc<ApiClient>,
    pub session: Arc<Session>,
    pub statuses: Arc<StatusTable>,
    pub orders: OrderStore,
    pub services: ServiceStore,
    pub users: UserStore,
    pub visit_objects: VisitObjectStore,
    pub categories: CategoryVisitorStore,
    pub shifts: ShiftStore,
    pub settings: SettingsStore,
    pub info: InfoStore,
}

impl AppState {
    /// Validate the config, open the local cache and build every store.
    pub fn init(config: AppConfig) -> Result<Self, String> {
        config.validate()?;
        let db = Arc::new(db::init(&config.data_dir)?);
        Self::with_db(config, db)
    }

    pub fn with_db(config: AppConfig, db: Arc<DbState>) -> Result<Self, String> {
        let statuses = Arc::new(StatusTable::from_config(&config.order_status_labels)?);
        let client = Arc::new(ApiClient::new(&config).map_err(|e| e.to_string())?);
        let vault = TokenVault::new(config.token_store, db.clone());
        let session = Arc::new(Session::new(client.clone(), vault));

        let state = Self {
            orders: OrderStore::new(client.clone(), statuses.clone()),
            services: ServiceStore::new(client.clone()),
            users: UserStore::new(client.clone(), session.clone()),
            visit_objects: VisitObjectStore::new(client.clone()),
            categories: CategoryVisitorStore::new(client.clone()),
            shifts: ShiftStore::new(db.clone()),
            settings: SettingsStore::new(db.clone()),
            info: InfoStore::new(client.clone()),
            config,
            db,
            client,
            session,
            statuses,
        };

        let loaded = state.settings.load();
        if let Some(e) = loaded.error {
            warn!(error = %e, "terminal settings not loaded, using defaults");
        }
        Ok(state)
    }

    pub async fn login(&self, username: &str, password: String) -> ActionResult<SessionSnapshot> {
        match self.session.login(username, password).await {
            Ok(()) => ActionResult::ok(self.session.snapshot()),
            Err(e) => ActionResult::fail(e),
        }
    }

    /// End the session and return every store to its initial state.
    pub fn logout(&self) {
        self.session.logout();
        self.reset_stores();
    }

    fn reset_stores(&self) {
        self.orders.reset();
        self.services.reset();
        self.users.reset();
        self.visit_objects.reset();
        self.categories.reset();
        self.shifts.reset();
        self.settings.reset();
        self.info.reset();
    }

    /// Delete a user. Deleting the signed-in user logs out and clears the
    /// stores.
    pub async fn delete_user(&self, user_id: i64) -> ActionResult<()> {
        let result = self.users.delete(user_id).await;
        if result.success && !self.session.is_authenticated() {
            self.reset_stores();
        }
        result
    }

    /// Mark an order sold and count it in the open shift, if any.
    pub async fn sell_order(&self, order_id: i64) -> ActionResult<Order> {
        let result = self.orders.sell(order_id).await;
        if let Some(order) = &result.data {
            if self.shifts.is_open() {
                let recorded = self.shifts.record_sale(order.order_id, order.total());
                if let Some(e) = recorded.error {
                    warn!(order_id, error = %e, "sale not recorded in shift");
                }
            } else {
                info!(order_id, "order sold with no open shift");
            }
        }
        result
    }

    /// Build details, plus the backend version when it can be fetched.
    pub async fn about_info(&self) -> AboutInfo {
        let backend = self.info.fetch_version().await.data.map(|v| v.version);
        diagnostics::about_info(backend)
    }
}

// ============================================================================
// Entry point
// ============================================================================

/// Load config, start logging, restore and validate the saved session and
/// report the backend version.
pub async fn run() -> anyhow::Result<()> {
    let config = config::load().map_err(anyhow::Error::msg)?;
    let guard = diagnostics::init_logging(&config).map_err(anyhow::Error::msg)?;

    info!("Starting Ticket Terminal v{}", env!("CARGO_PKG_VERSION"));
    info!(api_base = %config.api_base, data_dir = %config.data_dir.display(), "configuration loaded");

    let state = AppState::init(config).map_err(anyhow::Error::msg)?;

    if state.session.restore() {
        match state.session.check_auth().await {
            Ok(true) => {
                if let Err(e) = state.session.load_identity().await {
                    warn!(error = %e, "could not load signed-in identity");
                }
                info!(
                    username = %state.session.username().unwrap_or_default(),
                    "session restored"
                );
            }
            Ok(false) => info!("saved credentials rejected, login required"),
            Err(e) => warn!(error = %e, "backend unreachable, keeping saved session"),
        }
    } else {
        info!("no saved session, login required");
    }

    let about = state.about_info().await;
    match &about.backend_version {
        Some(version) => info!(backend_version = %version, git_sha = about.git_sha, "backend reachable"),
        None => warn!("backend version unavailable"),
    }
    if let Some(shift) = state.shifts.current() {
        info!(shift_id = %shift.id, cashier = %shift.cashier, "shift open");
    }

    drop(guard);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::CannedServer;

    fn state_for(server: &CannedServer) -> AppState {
        let mut config = server.config();
        config
            .order_status_labels
            .insert("5".to_string(), "Paid".to_string());
        AppState::with_db(config, Arc::new(db::open_in_memory())).unwrap()
    }

    #[tokio::test]
    async fn sale_is_counted_in_open_shift() {
        let server = CannedServer::start(vec![(
            200,
            r#"{"OrderId":8,"OrderStateId":5,"Service":[{"ServiceId":1,"Quantity":2,"Price":250.0}]}"#
                .into(),
        )])
        .await;
        let state = state_for(&server);
        assert!(state.shifts.open("Ivanova").success);

        let sold = state.sell_order(8).await;
        assert!(sold.success);
        assert_eq!(state.orders.status_label(sold.data.unwrap().order_state_id), "Paid");

        let report = state.shifts.current_report().unwrap();
        assert_eq!(report.total_orders, 1);
        assert_eq!(report.total_amount, 500.0);
    }

    #[tokio::test]
    async fn deleting_self_logs_out_and_clears_stores() {
        let server = CannedServer::start(vec![
            (200, "{}".into()),
            (200, r#"{"UserId":4,"Login":"admin","Role":"admin"}"#.into()),
            (200, "false".into()),
            (200, "{}".into()),
            (200, r#"[{"UserId":4,"Login":"admin"}]"#.into()),
            (200, String::new()),
        ])
        .await;
        let state = state_for(&server);

        let login = state.login("admin", "secret".to_string()).await;
        assert!(login.success);
        assert!(login.data.unwrap().is_admin);
        assert!(state.users.fetch().await.success);

        assert!(state.delete_user(4).await.success);
        assert!(!state.session.is_authenticated());
        assert!(state.users.sorted().is_empty());
    }

    #[tokio::test]
    async fn logout_resets_every_store() {
        let server = CannedServer::start(vec![(
            200,
            r#"[{"VisitObjectId":1,"VisitObjectName":"Zoo"}]"#.into(),
        )])
        .await;
        let state = state_for(&server);
        assert!(state.visit_objects.fetch().await.success);
        state.logout();
        assert!(state.visit_objects.sorted().is_empty());
        assert!(!state.session.is_authenticated());
    }

    #[test]
    fn invalid_status_table_is_rejected_at_startup() {
        let mut config = crate::test_support::refused_config();
        config
            .order_status_labels
            .insert("paid".to_string(), "Paid".to_string());
        assert!(AppState::with_db(config, Arc::new(db::open_in_memory())).is_err());
    }
}
