//! Authenticated session: Basic token, signed-in identity, permissions.
//!
//! The token is validated against the backend before it is installed, saved
//! to the [`TokenVault`] on login and removed on logout. A 401/403 from the
//! auth probe forces a logout; transport failures leave the session alone.

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};
use zeroize::Zeroize;

use crate::api::{self, ApiClient, ApiError};
use crate::endpoints;
use crate::models::{PermissionSet, User};
use crate::storage::TokenVault;

/// Role name that grants admin routes without root.
const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Default)]
struct SessionState {
    token: Option<String>,
    username: Option<String>,
    user: Option<User>,
    is_root: bool,
    permissions: PermissionSet,
}

/// Serializable view of the session for a front-end shell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub authenticated: bool,
    pub username: Option<String>,
    pub user_id: Option<i64>,
    pub is_root: bool,
    pub is_admin: bool,
    pub permissions: PermissionSet,
}

pub struct Session {
    client: Arc<ApiClient>,
    vault: TokenVault,
    state: Mutex<SessionState>,
}

impl Session {
    pub fn new(client: Arc<ApiClient>, vault: TokenVault) -> Self {
        Self {
            client,
            vault,
            state: Mutex::new(SessionState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Encode the credentials, validate them with the auth probe and install
    /// the token. The password is wiped once encoded.
    pub async fn login(&self, username: &str, mut password: String) -> Result<(), String> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            password.zeroize();
            return Err("Username and password are required".into());
        }
        let mut token = api::basic_token(username, &password);
        password.zeroize();

        if let Err(e) = self.client.probe(&token).await {
            token.zeroize();
            warn!(username, error = %e, "login rejected");
            return Err(if e.is_auth_failure() {
                "Invalid username or password".to_string()
            } else {
                e.to_string()
            });
        }

        if let Err(e) = self.vault.save(&token) {
            warn!(error = %e, "failed to persist auth token, session will not survive restart");
        }
        self.install(token, username.to_string());
        info!(username, "logged in");

        if let Err(e) = self.load_identity().await {
            warn!(error = %e, "logged in but identity could not be loaded");
        }
        Ok(())
    }

    /// Drop the token everywhere and forget the identity.
    pub fn logout(&self) {
        let username = {
            let mut state = self.state();
            let username = state.username.take();
            *state = SessionState::default();
            username
        };
        self.client.set_token(None);
        if let Err(e) = self.vault.clear() {
            warn!(error = %e, "failed to remove stored auth token");
        }
        info!(username = username.as_deref().unwrap_or(""), "logged out");
    }

    /// Reinstall a token saved by a previous run. Returns whether one was found.
    pub fn restore(&self) -> bool {
        let Some(token) = self.vault.load() else {
            return false;
        };
        let Some(username) = api::username_from_token(&token) else {
            warn!("stored auth token is not a valid Basic token, discarding");
            if let Err(e) = self.vault.clear() {
                warn!(error = %e, "failed to remove stored auth token");
            }
            return false;
        };
        info!(username = %username, "restored session from stored token");
        self.install(token, username);
        true
    }

    /// Re-validate the installed token.
    ///
    /// `Ok(false)` when there is no session or the backend rejected the
    /// credentials (the session is cleared). Transport and server failures
    /// are returned as errors and the session is kept.
    pub async fn check_auth(&self) -> Result<bool, ApiError> {
        let Some(token) = self.state().token.clone() else {
            return Ok(false);
        };
        match self.client.probe(&token).await {
            Ok(()) => Ok(true),
            Err(e) if e.is_auth_failure() => {
                warn!(status = e.status(), "stored credentials rejected, logging out");
                self.logout();
                Ok(false)
            }
            Err(e) => {
                api::log_failure("check auth", &e);
                Err(e)
            }
        }
    }

    /// Fetch the signed-in user, root flag and permissions.
    pub async fn load_identity(&self) -> Result<(), ApiError> {
        let user = endpoints::users::current(&self.client).await?;
        let is_root = match endpoints::users::is_root(&self.client).await {
            Ok(flag) => flag || user.is_root,
            Err(e) => {
                warn!(error = %e, "root check failed, using user record flag");
                user.is_root
            }
        };
        let permissions = match endpoints::users::current_permissions(&self.client).await {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "permission lookup failed, using user record permissions");
                user.permissions.clone()
            }
        };

        let mut state = self.state();
        if state.token.is_none() {
            return Ok(());
        }
        state.is_root = is_root;
        state.permissions = permissions;
        state.user = Some(user);
        Ok(())
    }

    fn install(&self, token: String, username: String) {
        self.client.set_token(Some(token.clone()));
        let mut state = self.state();
        state.token = Some(token);
        state.username = Some(username);
        state.user = None;
        state.is_root = false;
        state.permissions.clear();
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn is_authenticated(&self) -> bool {
        self.state().token.is_some()
    }

    pub fn current_user(&self) -> Option<User> {
        self.state().user.clone()
    }

    pub fn username(&self) -> Option<String> {
        self.state().username.clone()
    }

    pub fn user_id(&self) -> Option<i64> {
        self.state().user.as_ref().map(|u| u.user_id)
    }

    /// `Basic <token>`, or `None` when signed out.
    pub fn auth_header(&self) -> Option<String> {
        self.state().token.as_ref().map(|t| format!("Basic {t}"))
    }

    pub fn is_root(&self) -> bool {
        self.state().is_root
    }

    /// Root bypasses every permission check.
    pub fn has_permission(&self, permission: &str) -> bool {
        let state = self.state();
        if state.is_root {
            return true;
        }
        state.permissions.get(permission).copied().unwrap_or(false)
            || state
                .user
                .as_ref()
                .and_then(|u| u.permissions.get(permission).copied())
                .unwrap_or(false)
    }

    pub fn is_admin(&self) -> bool {
        let state = self.state();
        state.is_root
            || state
                .user
                .as_ref()
                .and_then(|u| u.role.as_deref())
                .is_some_and(|r| r.eq_ignore_ascii_case(ADMIN_ROLE))
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let is_admin = self.is_admin();
        let state = self.state();
        SessionSnapshot {
            authenticated: state.token.is_some(),
            username: state.username.clone(),
            user_id: state.user.as_ref().map(|u| u.user_id),
            is_root: state.is_root,
            is_admin,
            permissions: state.permissions.clone(),
        }
    }
}
