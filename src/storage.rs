//! Persistent storage for the Basic auth token.
//!
//! The token lives under a fixed key, either in the OS credential store
//! (Keychain, DPAPI, Secret Service via the `keyring` crate) or in the local
//! cache's `local_settings` table. It is restored on startup and deleted on
//! logout.

use keyring::Entry;
use std::sync::Arc;
use tracing::warn;

use crate::config::TokenStoreKind;
use crate::db::{self, DbState};

const SERVICE_NAME: &str = "ticket-terminal";

/// Fixed key the token is stored under.
pub const AUTH_TOKEN_KEY: &str = "auth_token";

const AUTH_CATEGORY: &str = "auth";

// ---------------------------------------------------------------------------
// OS keyring helpers
// ---------------------------------------------------------------------------

/// Retrieve a single credential from the OS keyring. Returns `None` when the
/// entry does not exist (or the platform returns a "not found" error).
pub fn get_credential(key: &str) -> Option<String> {
    let entry = match Entry::new(SERVICE_NAME, key) {
        Ok(e) => e,
        Err(e) => {
            warn!(key, error = %e, "keyring: failed to create entry");
            return None;
        }
    };
    match entry.get_password() {
        Ok(pw) => Some(pw),
        Err(keyring::Error::NoEntry) => None,
        Err(e) => {
            warn!(key, error = %e, "keyring: failed to read credential");
            None
        }
    }
}

pub fn set_credential(key: &str, value: &str) -> Result<(), String> {
    let entry = Entry::new(SERVICE_NAME, key).map_err(|e| e.to_string())?;
    entry.set_password(value).map_err(|e| e.to_string())?;
    Ok(())
}

/// Silently succeeds if the entry does not exist.
pub fn delete_credential(key: &str) -> Result<(), String> {
    let entry = Entry::new(SERVICE_NAME, key).map_err(|e| e.to_string())?;
    match entry.delete_credential() {
        Ok(()) => Ok(()),
        Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(e.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Token vault
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub enum TokenVault {
    Keyring,
    Local(Arc<DbState>),
}

impl TokenVault {
    pub fn new(kind: TokenStoreKind, db: Arc<DbState>) -> Self {
        match kind {
            TokenStoreKind::Keyring => TokenVault::Keyring,
            TokenStoreKind::Local => TokenVault::Local(db),
        }
    }

    pub fn load(&self) -> Option<String> {
        let token = match self {
            TokenVault::Keyring => get_credential(AUTH_TOKEN_KEY),
            TokenVault::Local(db) => {
                let conn = db.conn.lock().ok()?;
                db::get_setting(&conn, AUTH_CATEGORY, AUTH_TOKEN_KEY)
            }
        };
        token.filter(|t| !t.trim().is_empty())
    }

    pub fn save(&self, token: &str) -> Result<(), String> {
        match self {
            TokenVault::Keyring => set_credential(AUTH_TOKEN_KEY, token),
            TokenVault::Local(db) => {
                let conn = db.conn.lock().map_err(|e| e.to_string())?;
                db::set_setting(&conn, AUTH_CATEGORY, AUTH_TOKEN_KEY, token)
            }
        }
    }

    pub fn clear(&self) -> Result<(), String> {
        match self {
            TokenVault::Keyring => delete_credential(AUTH_TOKEN_KEY),
            TokenVault::Local(db) => {
                let conn = db.conn.lock().map_err(|e| e.to_string())?;
                db::delete_setting(&conn, AUTH_CATEGORY, AUTH_TOKEN_KEY)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_vault_round_trip() {
        let vault = TokenVault::new(TokenStoreKind::Local, Arc::new(db::open_in_memory()));
        assert_eq!(vault.load(), None);
        vault.save("YWRtaW46MTIz").unwrap();
        assert_eq!(vault.load().as_deref(), Some("YWRtaW46MTIz"));
        vault.clear().unwrap();
        assert_eq!(vault.load(), None);
        vault.clear().expect("clearing twice is fine");
    }

    #[test]
    fn blank_token_reads_as_absent() {
        let vault = TokenVault::new(TokenStoreKind::Local, Arc::new(db::open_in_memory()));
        vault.save("   ").unwrap();
        assert_eq!(vault.load(), None);
    }
}
