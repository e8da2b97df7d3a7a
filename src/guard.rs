//! Navigation guard over the session.
//!
//! Routes declare what they need in a [`RouteMeta`]; [`check`] decides
//! whether navigation proceeds or where it is redirected.

use serde::Serialize;
use tracing::debug;

use crate::session::Session;

pub const LOGIN_PATH: &str = "/login";
pub const DASHBOARD_PATH: &str = "/admin/dashboard";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteMeta {
    pub requires_auth: bool,
    pub requires_admin_role: bool,
    pub permission: Option<String>,
}

impl RouteMeta {
    pub fn public() -> Self {
        Self::default()
    }

    pub fn authenticated() -> Self {
        Self {
            requires_auth: true,
            ..Self::default()
        }
    }

    pub fn admin() -> Self {
        Self {
            requires_auth: true,
            requires_admin_role: true,
            permission: None,
        }
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.requires_auth = true;
        self.permission = Some(permission.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Navigation {
    Allow,
    /// `redirect` carries the originally requested path on login redirects.
    Redirect {
        to: String,
        redirect: Option<String>,
    },
}

/// Decide navigation to `target` using the session's current state.
pub fn check(meta: &RouteMeta, target: &str, session: &Session) -> Navigation {
    if !meta.requires_auth && !meta.requires_admin_role {
        if target == LOGIN_PATH && session.is_authenticated() {
            return Navigation::Redirect {
                to: DASHBOARD_PATH.to_string(),
                redirect: None,
            };
        }
        return Navigation::Allow;
    }

    if !session.is_authenticated() {
        debug!(path = target, "navigation requires login");
        return Navigation::Redirect {
            to: LOGIN_PATH.to_string(),
            redirect: Some(target.to_string()),
        };
    }

    if meta.requires_admin_role && !session.is_admin() {
        debug!(path = target, "navigation requires admin role");
        return to_dashboard(target);
    }

    if let Some(permission) = &meta.permission {
        if !session.has_permission(permission) {
            debug!(path = target, permission = %permission, "navigation requires permission");
            return to_dashboard(target);
        }
    }

    Navigation::Allow
}

/// Like [`check`], but first re-validates the token for protected routes.
///
/// A rejected token logs the session out and the result is a login
/// redirect. An unreachable backend does not block navigation.
pub async fn before_each(meta: &RouteMeta, target: &str, session: &Session) -> Navigation {
    if (meta.requires_auth || meta.requires_admin_role) && session.is_authenticated() {
        match session.check_auth().await {
            Ok(true) => {}
            Ok(false) => debug!(path = target, "session ended by auth check"),
            Err(e) => debug!(path = target, error = %e, "auth check unavailable, using cached session"),
        }
    }
    check(meta, target, session)
}

fn to_dashboard(target: &str) -> Navigation {
    // Avoid a redirect loop when the dashboard itself is gated.
    if target == DASHBOARD_PATH {
        return Navigation::Redirect {
            to: LOGIN_PATH.to_string(),
            redirect: None,
        };
    }
    Navigation::Redirect {
        to: DASHBOARD_PATH.to_string(),
        redirect: None,
    }
}
