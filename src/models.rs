//! Backend resource schemas.
//!
//! One explicit schema per resource. Field names follow the backend's
//! PascalCase casing verbatim. Records that are edited and sent back keep
//! unknown fields in `extra` so a PUT never drops data the client does not
//! model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A record with a backend-assigned numeric identifier.
pub trait Entity: Clone {
    fn id(&self) -> i64;
}

/// Capability name -> granted.
pub type PermissionSet = BTreeMap<String, bool>;

fn default_true() -> bool {
    true
}

fn default_quantity() -> u32 {
    1
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrderItem {
    pub service_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    /// Visit date-time as sent by the backend (`YYYY-MM-DD`,
    /// `YYYY-MM-DD HH:mm` or `YYYY-MM-DDTHH:mm:ss`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dt_visit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_visitor_id: Option<i64>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Order {
    pub order_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dt_create: Option<String>,
    #[serde(default)]
    pub order_state_id: i32,
    /// Line items.
    #[serde(default, rename = "Service")]
    pub items: Vec<OrderItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sum: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity for Order {
    fn id(&self) -> i64 {
        self.order_id
    }
}

impl Order {
    pub fn total(&self) -> f64 {
        self.sum.unwrap_or_else(|| {
            self.items
                .iter()
                .map(|i| i.price * f64::from(i.quantity))
                .sum()
        })
    }
}

/// `GET /Order/Range` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrderRange {
    #[serde(default)]
    pub order: Vec<Order>,
}

/// Body for `POST /Order/Create`, `/Order/CreateEditable` and `/Order/Cost`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrderDraft {
    #[serde(rename = "Service")]
    pub items: Vec<OrderItem>,
}

/// Body for `POST /Order/Cancel`, `/Order/Sold`, `/Order/Refund`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrderRef {
    pub order_id: i64,
}

/// `POST /Order/Cost` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrderCost {
    pub sum: f64,
}

// ---------------------------------------------------------------------------
// Services and reference data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServicePrice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_visitor_id: Option<i64>,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VisitObject {
    #[serde(default)]
    pub visit_object_id: i64,
    pub visit_object_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_visit_object_id: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity for VisitObject {
    fn id(&self) -> i64 {
        self.visit_object_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CategoryVisitor {
    #[serde(default)]
    pub category_visitor_id: i64,
    pub category_visitor_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_category_visitor_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_category_visitor_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity for CategoryVisitor {
    fn id(&self) -> i64 {
        self.category_visitor_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GroupCategoryVisitor {
    pub group_category_visitor_id: i64,
    pub group_category_visitor_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GroupVisitObject {
    pub group_visit_object_id: i64,
    pub group_visit_object_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SeanceGrid {
    pub seance_grid_id: i64,
    #[serde(default)]
    pub seance_grid_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Service {
    #[serde(default)]
    pub service_id: i64,
    pub service_name: String,
    #[serde(default = "default_true")]
    pub available: bool,
    #[serde(default)]
    pub price: Vec<ServicePrice>,
    #[serde(default)]
    pub visit_object: Vec<VisitObject>,
    #[serde(default)]
    pub category_visitor: Vec<CategoryVisitor>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity for Service {
    fn id(&self) -> i64 {
        self.service_id
    }
}

/// `GET /Service/Editable` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EditableServices {
    #[serde(default)]
    pub service: Vec<Service>,
    #[serde(default)]
    pub visit_object: Vec<VisitObject>,
    #[serde(default)]
    pub category_visitor: Vec<CategoryVisitor>,
    #[serde(default)]
    pub group_visit_object: Vec<GroupVisitObject>,
    #[serde(default)]
    pub group_category_visitor: Vec<GroupCategoryVisitor>,
    #[serde(default)]
    pub seance_grid: Vec<SeanceGrid>,
}

/// `GET /Service/Simple` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SimpleServices {
    #[serde(default)]
    pub service: Vec<Service>,
}

// ---------------------------------------------------------------------------
// Users and permissions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct User {
    #[serde(default)]
    pub user_id: i64,
    pub login: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Write-only; the backend never returns it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub is_root: bool,
    #[serde(default)]
    pub permissions: PermissionSet,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity for User {
    fn id(&self) -> i64 {
        self.user_id
    }
}

/// Entry of `GET /Permissions/List`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PermissionInfo {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// System info
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogEntry {
    #[serde(default)]
    pub log_id: i64,
    #[serde(default)]
    pub dt_create: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VersionInfo {
    pub version: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrgInfo {
    #[serde(default)]
    pub org_name: String,
    #[serde(default)]
    pub inn: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// Shifts (terminal-local)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftStatus {
    Open,
    Closed,
}

impl ShiftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShiftStatus::Open => "open",
            ShiftStatus::Closed => "closed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "open" => Some(ShiftStatus::Open),
            "closed" => Some(ShiftStatus::Closed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftSale {
    pub order_id: i64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shift {
    pub id: String,
    pub cashier: String,
    pub open_time: String,
    pub close_time: Option<String>,
    pub status: ShiftStatus,
    pub sales: Vec<ShiftSale>,
    pub total_orders: u32,
    pub total_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftReport {
    pub shift_id: String,
    pub cashier: String,
    pub open_time: String,
    pub close_time: Option<String>,
    pub total_orders: u32,
    pub total_amount: f64,
}

impl From<&Shift> for ShiftReport {
    fn from(shift: &Shift) -> Self {
        Self {
            shift_id: shift.id.clone(),
            cashier: shift.cashier.clone(),
            open_time: shift.open_time.clone(),
            close_time: shift.close_time.clone(),
            total_orders: shift.total_orders,
            total_amount: shift.total_amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn order_decodes_backend_casing() {
        let order: Order = serde_json::from_value(json!({
            "OrderId": 42,
            "DtCreate": "2025-05-27T10:00:00",
            "OrderStateId": 5,
            "Service": [
                {"ServiceId": 135, "DtVisit": "2025-05-27 21:07", "Quantity": 2, "Price": 450.0}
            ],
            "Barcode": "TK-42"
        }))
        .unwrap();
        assert_eq!(order.id(), 42);
        assert_eq!(order.items[0].dt_visit.as_deref(), Some("2025-05-27 21:07"));
        assert_eq!(order.total(), 900.0);
        assert_eq!(order.extra.get("Barcode"), Some(&json!("TK-42")));
    }

    #[test]
    fn service_keeps_unknown_fields_on_round_trip() {
        let raw = json!({
            "ServiceId": 7,
            "ServiceName": "Carousel",
            "AgeRestriction": "0+"
        });
        let service: Service = serde_json::from_value(raw).unwrap();
        assert!(service.available);
        let back = serde_json::to_value(&service).unwrap();
        assert_eq!(back["AgeRestriction"], "0+");
        assert_eq!(back["ServiceName"], "Carousel");
    }

    #[test]
    fn user_without_login_is_rejected() {
        let err = serde_json::from_value::<User>(json!({"UserId": 1})).unwrap_err();
        assert!(err.to_string().contains("Login"));
    }
}
