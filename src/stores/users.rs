//! User administration.
//!
//! Deleting the signed-in user ends the session in the same call.

use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use super::{ActionResult, ResourceStore};
use crate::api::ApiClient;
use crate::endpoints;
use crate::models::{PermissionInfo, User};
use crate::session::Session;

pub struct UserStore {
    users: ResourceStore<User>,
    session: Arc<Session>,
}

impl UserStore {
    pub fn new(client: Arc<ApiClient>, session: Arc<Session>) -> Self {
        Self {
            users: ResourceStore::new(client),
            session,
        }
    }

    pub async fn fetch(&self) -> ActionResult<Vec<User>> {
        self.users.fetch().await
    }

    pub async fn add(&self, user: User) -> ActionResult<User> {
        if user.login.trim().is_empty() {
            return ActionResult::fail("Login is required");
        }
        self.users.add(user).await
    }

    /// Apply `changes` to user `id`. A blank or missing `Password` keeps the
    /// current password.
    pub async fn update(&self, id: i64, changes: &Value) -> ActionResult<User> {
        let mut changes = changes.clone();
        if let Some(obj) = changes.as_object_mut() {
            let blank = obj
                .get("Password")
                .is_some_and(|p| p.is_null() || p.as_str().is_some_and(|s| s.is_empty()));
            if blank {
                obj.remove("Password");
            }
        }
        let login = self.users.get(id).map(|u| u.login);
        let result = self.users.update(id, &changes).await;
        if result.success && self.is_signed_in(id, login.as_deref()) {
            if let Err(e) = self.session.load_identity().await {
                warn!(error = %e, "failed to refresh signed-in identity after update");
            }
        }
        result
    }

    /// Activate or block a user.
    pub async fn toggle_active(&self, id: i64) -> ActionResult<User> {
        let Some(user) = self.users.get(id) else {
            return ActionResult::fail(format!("User {id} not found"));
        };
        self.update(id, &json!({ "Active": !user.active })).await
    }

    pub async fn delete(&self, id: i64) -> ActionResult<()> {
        let login = self.users.get(id).map(|u| u.login);
        let result = self.users.delete(id).await;
        if result.success && self.is_signed_in(id, login.as_deref()) {
            info!(user_id = id, "signed-in user deleted, ending session");
            self.session.logout();
        }
        result
    }

    /// Whether user `id` (with `login`, if known) is the session's user.
    /// Falls back to the login name when the identity was never loaded.
    fn is_signed_in(&self, id: i64, login: Option<&str>) -> bool {
        if self.session.user_id() == Some(id) {
            return true;
        }
        match (login, self.session.username()) {
            (Some(login), Some(username)) => login.trim().eq_ignore_ascii_case(username.trim()),
            _ => false,
        }
    }

    pub async fn permissions_list(&self) -> ActionResult<Vec<PermissionInfo>> {
        match endpoints::users::permissions_list(self.users.client()).await {
            Ok(list) => ActionResult::ok(list),
            Err(e) => ActionResult::fail(format!("Failed to load permissions: {e}")),
        }
    }

    pub fn get(&self, id: i64) -> Option<User> {
        self.users.get(id)
    }

    pub fn find_by_login(&self, login: &str) -> Option<User> {
        self.users.find(|u| u.login.eq_ignore_ascii_case(login))
    }

    /// Sorted by login.
    pub fn sorted(&self) -> Vec<User> {
        self.users.sorted_by(|a, b| a.login.cmp(&b.login))
    }

    pub fn current_user(&self) -> Option<User> {
        self.session.current_user()
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.session.has_permission(permission)
    }

    pub fn is_admin(&self) -> bool {
        self.session.is_admin()
    }

    pub fn is_loading(&self) -> bool {
        self.users.is_loading()
    }

    pub fn last_error(&self) -> Option<String> {
        self.users.last_error()
    }

    pub fn reset(&self) {
        self.users.reset();
    }
}
