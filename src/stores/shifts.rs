//! Cashier shifts, kept in the local cache.
//!
//! At most one shift is open at a time (enforced by a partial unique index).
//! Sales recorded while a shift is open roll up into its order count and
//! amount; closing the shift produces its report.

use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::Error::FromSqlConversionFailure;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use uuid::Uuid;

use super::{lock, ActionResult};
use crate::db::DbState;
use crate::models::{Shift, ShiftReport, ShiftSale, ShiftStatus};

const UNKNOWN_CASHIER: &str = "Unknown cashier";

const SHIFT_COLUMNS: &str =
    "id, cashier, open_time, close_time, status, sales, total_orders, total_amount";

pub struct ShiftStore {
    db: Arc<DbState>,
    last_error: Mutex<Option<String>>,
}

impl ShiftStore {
    pub fn new(db: Arc<DbState>) -> Self {
        Self {
            db,
            last_error: Mutex::new(None),
        }
    }

    fn record<T>(&self, result: Result<T, String>) -> ActionResult<T> {
        match result {
            Ok(v) => {
                *lock(&self.last_error) = None;
                ActionResult::ok(v)
            }
            Err(e) => {
                warn!(error = %e, "shift action failed");
                *lock(&self.last_error) = Some(e.clone());
                ActionResult::fail(e)
            }
        }
    }

    /// Open a shift for `cashier`. A blank name is recorded as an unknown
    /// cashier.
    pub fn open(&self, cashier: &str) -> ActionResult<Shift> {
        let result = (|| -> Result<Shift, String> {
            let conn = self.db.conn.lock().map_err(|e| e.to_string())?;
            if let Some(existing) = open_shift(&conn)? {
                return Err(format!("A shift is already open ({})", existing.id));
            }

            let cashier = match cashier.trim() {
                "" => UNKNOWN_CASHIER,
                name => name,
            };
            let shift = Shift {
                id: Uuid::new_v4().to_string(),
                cashier: cashier.to_string(),
                open_time: Utc::now().to_rfc3339(),
                close_time: None,
                status: ShiftStatus::Open,
                sales: Vec::new(),
                total_orders: 0,
                total_amount: 0.0,
            };
            conn.execute(
                "INSERT INTO shifts (id, cashier, open_time, status, sales, total_orders, total_amount)
                 VALUES (?1, ?2, ?3, 'open', '[]', 0, 0)",
                params![shift.id, shift.cashier, shift.open_time],
            )
            .map_err(|e| format!("open shift: {e}"))?;

            info!(shift_id = %shift.id, cashier = %shift.cashier, "shift opened");
            Ok(shift)
        })();
        self.record(result)
    }

    /// Close the open shift and return its report.
    pub fn close(&self) -> ActionResult<ShiftReport> {
        let result = (|| -> Result<ShiftReport, String> {
            let conn = self.db.conn.lock().map_err(|e| e.to_string())?;
            let mut shift = open_shift(&conn)?.ok_or("No shift is open")?;
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "UPDATE shifts SET status = 'closed', close_time = ?1 WHERE id = ?2",
                params![now, shift.id],
            )
            .map_err(|e| format!("close shift: {e}"))?;

            shift.status = ShiftStatus::Closed;
            shift.close_time = Some(now);
            info!(
                shift_id = %shift.id,
                total_orders = shift.total_orders,
                total_amount = shift.total_amount,
                "shift closed"
            );
            Ok(ShiftReport::from(&shift))
        })();
        self.record(result)
    }

    /// Add a sold order to the open shift. Recording the same order twice
    /// leaves the totals unchanged.
    pub fn record_sale(&self, order_id: i64, total: f64) -> ActionResult<Shift> {
        let result = (|| -> Result<Shift, String> {
            let conn = self.db.conn.lock().map_err(|e| e.to_string())?;
            let mut shift = open_shift(&conn)?.ok_or("No shift is open")?;
            if shift.sales.iter().any(|s| s.order_id == order_id) {
                return Ok(shift);
            }

            shift.sales.push(ShiftSale { order_id, total });
            shift.total_orders += 1;
            shift.total_amount += total;
            let sales = serde_json::to_string(&shift.sales).map_err(|e| e.to_string())?;
            conn.execute(
                "UPDATE shifts SET sales = ?1, total_orders = ?2, total_amount = ?3 WHERE id = ?4",
                params![sales, shift.total_orders, shift.total_amount, shift.id],
            )
            .map_err(|e| format!("record sale: {e}"))?;
            Ok(shift)
        })();
        self.record(result)
    }

    pub fn current(&self) -> Option<Shift> {
        let conn = self.db.conn.lock().ok()?;
        let found = open_shift(&conn);
        found
            .inspect_err(|e| warn!(error = %e, "failed to read open shift"))
            .ok()
            .flatten()
    }

    pub fn is_open(&self) -> bool {
        self.current().is_some()
    }

    pub fn current_report(&self) -> Option<ShiftReport> {
        self.current().as_ref().map(ShiftReport::from)
    }

    /// All shifts, most recent first.
    pub fn history(&self) -> Vec<Shift> {
        let result = (|| -> Result<Vec<Shift>, String> {
            let conn = self.db.conn.lock().map_err(|e| e.to_string())?;
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {SHIFT_COLUMNS} FROM shifts ORDER BY open_time DESC"
                ))
                .map_err(|e| e.to_string())?;
            let rows = stmt
                .query_map([], shift_from_row)
                .map_err(|e| e.to_string())?;
            rows.collect::<Result<Vec<_>, _>>().map_err(|e| e.to_string())
        })();
        result.unwrap_or_else(|e| {
            warn!(error = %e, "failed to read shift history");
            Vec::new()
        })
    }

    pub fn last_error(&self) -> Option<String> {
        lock(&self.last_error).clone()
    }

    /// Shifts outlive a logout; only the error state is cleared.
    pub fn reset(&self) {
        *lock(&self.last_error) = None;
    }
}

fn open_shift(conn: &Connection) -> Result<Option<Shift>, String> {
    conn.query_row(
        &format!("SELECT {SHIFT_COLUMNS} FROM shifts WHERE status = 'open'"),
        [],
        shift_from_row,
    )
    .optional()
    .map_err(|e| format!("query open shift: {e}"))
}

/// Map a `shifts` row. An unknown status or unreadable `sales` list is a
/// conversion error, so a damaged row is never rewritten from a guess.
fn shift_from_row(row: &Row<'_>) -> rusqlite::Result<Shift> {
    let status: String = row.get(4)?;
    let status = ShiftStatus::parse(&status).ok_or_else(|| {
        FromSqlConversionFailure(4, Type::Text, format!("unknown shift status '{status}'").into())
    })?;
    let sales: String = row.get(5)?;
    let sales = serde_json::from_str(&sales)
        .map_err(|e| FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;
    Ok(Shift {
        id: row.get(0)?,
        cashier: row.get(1)?,
        open_time: row.get(2)?,
        close_time: row.get(3)?,
        status,
        sales,
        total_orders: row.get(6)?,
        total_amount: row.get(7)?,
    })
}
