//! Local SQLite cache for the terminal.
//!
//! Holds the state that has no backend counterpart (shifts, terminal
//! settings, media) and, optionally, the auth token. Lifecycle: opened and
//! migrated once at startup, written on every change, never synchronised
//! across processes.

use rusqlite::{params, Connection};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{error, info, warn};

pub struct DbState {
    pub conn: Mutex<Connection>,
    pub db_path: PathBuf,
}

/// Current schema version. Bump when adding new migrations.
const CURRENT_SCHEMA_VERSION: i32 = 2;

const DB_FILE: &str = "terminal.db";

/// Initialize the database at `{data_dir}/terminal.db`.
///
/// On open failure the file is treated as corrupt: it is deleted and the
/// open retried once. The cache holds nothing the backend cannot rebuild
/// except shift history.
pub fn init(data_dir: &Path) -> Result<DbState, String> {
    fs::create_dir_all(data_dir).map_err(|e| format!("Failed to create data dir: {e}"))?;

    let db_path = data_dir.join(DB_FILE);
    info!("Opening local cache at {}", db_path.display());

    let conn = match open_and_configure(&db_path) {
        Ok(c) => c,
        Err(first_err) => {
            warn!(
                "Local cache open failed ({}), deleting and retrying once",
                first_err
            );
            if db_path.exists() {
                let _ = fs::remove_file(&db_path);
                let _ = fs::remove_file(db_path.with_extension("db-wal"));
                let _ = fs::remove_file(db_path.with_extension("db-shm"));
            }
            open_and_configure(&db_path)
                .map_err(|e| format!("Local cache open failed after retry: {e}"))?
        }
    };

    run_migrations(&conn)?;

    info!("Local cache initialized (schema v{CURRENT_SCHEMA_VERSION})");

    Ok(DbState {
        conn: Mutex::new(conn),
        db_path,
    })
}

fn open_and_configure(path: &Path) -> Result<Connection, String> {
    let conn = Connection::open(path).map_err(|e| format!("sqlite open: {e}"))?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )
    .map_err(|e| format!("pragma setup: {e}"))?;
    Ok(conn)
}

fn run_migrations(conn: &Connection) -> Result<(), String> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT DEFAULT (datetime('now'))
        );",
    )
    .map_err(|e| format!("create schema_version: {e}"))?;

    let current: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current >= CURRENT_SCHEMA_VERSION {
        info!("Local cache schema up to date (v{current})");
        return Ok(());
    }

    info!("Migrating local cache from v{current} to v{CURRENT_SCHEMA_VERSION}");

    if current < 1 {
        migrate_v1(conn)?;
    }
    if current < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

/// Migration v1: category/key/value settings.
fn migrate_v1(conn: &Connection) -> Result<(), String> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS local_settings (
            id TEXT PRIMARY KEY DEFAULT (lower(hex(randomblob(16)))),
            setting_category TEXT NOT NULL,
            setting_key TEXT NOT NULL,
            setting_value TEXT NOT NULL,
            created_at TEXT DEFAULT (datetime('now')),
            updated_at TEXT DEFAULT (datetime('now')),
            UNIQUE(setting_category, setting_key)
        );

        INSERT INTO schema_version (version) VALUES (1);
        ",
    )
    .map_err(|e| {
        error!("Migration v1 failed: {e}");
        format!("migration v1: {e}")
    })?;

    info!("Applied migration v1 (local_settings)");
    Ok(())
}

/// Migration v2: cashier shifts. At most one shift may be open.
fn migrate_v2(conn: &Connection) -> Result<(), String> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS shifts (
            id TEXT PRIMARY KEY,
            cashier TEXT NOT NULL,
            open_time TEXT NOT NULL,
            close_time TEXT,
            status TEXT NOT NULL DEFAULT 'open'
                CHECK (status IN ('open', 'closed')),
            sales TEXT NOT NULL DEFAULT '[]',
            total_orders INTEGER NOT NULL DEFAULT 0,
            total_amount REAL NOT NULL DEFAULT 0
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_shifts_single_open
            ON shifts(status) WHERE status = 'open';
        CREATE INDEX IF NOT EXISTS idx_shifts_open_time ON shifts(open_time);

        INSERT INTO schema_version (version) VALUES (2);
        ",
    )
    .map_err(|e| {
        error!("Migration v2 failed: {e}");
        format!("migration v2: {e}")
    })?;

    info!("Applied migration v2 (shifts)");
    Ok(())
}

// ---------------------------------------------------------------------------
// Settings helpers
// ---------------------------------------------------------------------------

/// Get a single setting value.
pub fn get_setting(conn: &Connection, category: &str, key: &str) -> Option<String> {
    conn.query_row(
        "SELECT setting_value FROM local_settings WHERE setting_category = ?1 AND setting_key = ?2",
        params![category, key],
        |row| row.get(0),
    )
    .ok()
}

/// Insert or update a setting.
pub fn set_setting(
    conn: &Connection,
    category: &str,
    key: &str,
    value: &str,
) -> Result<(), String> {
    conn.execute(
        "INSERT INTO local_settings (setting_category, setting_key, setting_value, updated_at)
         VALUES (?1, ?2, ?3, datetime('now'))
         ON CONFLICT(setting_category, setting_key) DO UPDATE SET
            setting_value = excluded.setting_value,
            updated_at = excluded.updated_at",
        params![category, key, value],
    )
    .map_err(|e| format!("set_setting: {e}"))?;
    Ok(())
}

pub fn delete_setting(conn: &Connection, category: &str, key: &str) -> Result<(), String> {
    conn.execute(
        "DELETE FROM local_settings WHERE setting_category = ?1 AND setting_key = ?2",
        params![category, key],
    )
    .map_err(|e| format!("delete_setting: {e}"))?;
    Ok(())
}

/// In-memory database with all migrations applied.
#[cfg(test)]
pub fn open_in_memory() -> DbState {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;",
    )
    .expect("pragma setup");
    run_migrations(&conn).expect("run_migrations should succeed in test");
    DbState {
        conn: Mutex::new(conn),
        db_path: PathBuf::from(":memory:"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .expect("prepare table list");
        stmt.query_map([], |row| row.get(0))
            .expect("query tables")
            .filter_map(|r| r.ok())
            .collect()
    }

    #[test]
    fn migrations_create_tables_and_are_rerunnable() {
        let db = open_in_memory();
        let conn = db.conn.lock().unwrap();
        let tables = table_names(&conn);
        assert!(tables.contains(&"local_settings".to_string()));
        assert!(tables.contains(&"shifts".to_string()));

        run_migrations(&conn).expect("second run is a no-op");
        let version: i32 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn settings_upsert_and_delete() {
        let db = open_in_memory();
        let conn = db.conn.lock().unwrap();
        assert_eq!(get_setting(&conn, "auth", "auth_token"), None);

        set_setting(&conn, "auth", "auth_token", "abc").unwrap();
        set_setting(&conn, "auth", "auth_token", "def").unwrap();
        assert_eq!(get_setting(&conn, "auth", "auth_token").as_deref(), Some("def"));

        delete_setting(&conn, "auth", "auth_token").unwrap();
        assert_eq!(get_setting(&conn, "auth", "auth_token"), None);
    }

    #[test]
    fn only_one_open_shift_is_allowed() {
        let db = open_in_memory();
        let conn = db.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO shifts (id, cashier, open_time, status) VALUES ('a', 'Ivanova', '2025-05-14T09:00:00Z', 'open')",
            [],
        )
        .unwrap();
        let second = conn.execute(
            "INSERT INTO shifts (id, cashier, open_time, status) VALUES ('b', 'Petrov', '2025-05-14T10:00:00Z', 'open')",
            [],
        );
        assert!(second.is_err());
    }

    #[test]
    fn init_creates_file_in_data_dir() {
        let dir = std::env::temp_dir().join(format!("tt-db-{}", uuid::Uuid::new_v4()));
        let db = init(&dir).expect("init on disk");
        assert!(db.db_path.ends_with(DB_FILE));
        assert!(db.db_path.exists());
        drop(db);
        let _ = fs::remove_dir_all(&dir);
    }
}
