//! Date-range filtering of orders.
//!
//! Pure functions over fetched orders: no network access, no mutation.
//! Dates are compared in their canonical zero-padded `YYYY-MM-DD` form, which
//! sorts identically to chronological order.

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::Order;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// Filter by the date of the order's first line item.
    LineItemDate,
    /// Filter by the order's own `DtCreate`, the field `GET /Order/Range`
    /// matches on. Falls back to the first line item's date when absent.
    ServerRange,
}

/// Inclusive calendar date range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    start: String,
    end: String,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, String> {
        if start > end {
            return Err(format!("Start date {start} is after end date {end}"));
        }
        Ok(Self {
            start: start.format(DATE_FORMAT).to_string(),
            end: end.format(DATE_FORMAT).to_string(),
        })
    }

    /// Parse both bounds from `YYYY-MM-DD` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self, String> {
        let parse = |raw: &str| {
            normalize_date(raw)
                .and_then(|canonical| NaiveDate::parse_from_str(&canonical, DATE_FORMAT).ok())
                .ok_or_else(|| format!("Invalid date '{raw}', expected YYYY-MM-DD"))
        };
        Self::new(parse(start)?, parse(end)?)
    }

    pub fn day(date: NaiveDate) -> Self {
        let s = date.format(DATE_FORMAT).to_string();
        Self {
            start: s.clone(),
            end: s,
        }
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn end(&self) -> &str {
        &self.end
    }

    pub fn is_daily(&self) -> bool {
        self.start == self.end
    }

    /// `date` must already be in canonical form.
    pub fn contains(&self, date: &str) -> bool {
        if self.is_daily() {
            date == self.start
        } else {
            date >= self.start.as_str() && date <= self.end.as_str()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SkipReason {
    NoLineItems,
    MissingDate,
    MalformedDate(String),
}

/// Why a single order was left out of a filtered result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterDiagnostic {
    pub order_id: i64,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterOutcome {
    pub orders: Vec<Order>,
    pub diagnostics: Vec<FilterDiagnostic>,
}

/// Reduce a timestamp to its `YYYY-MM-DD` date.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:mm` and `YYYY-MM-DDTHH:mm:ss`.
/// Returns `None` when the date part is not a valid calendar date in that
/// shape.
pub fn normalize_date(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let date_part = trimmed
        .split(|c| c == 'T' || c == ' ')
        .next()
        .unwrap_or_default();

    let bytes = date_part.as_bytes();
    let shaped = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !shaped {
        return None;
    }
    NaiveDate::parse_from_str(date_part, DATE_FORMAT).ok()?;
    Some(date_part.to_string())
}

/// Date used to place an order in a range. Orders without line items have
/// no date in either mode.
fn order_date(order: &Order, mode: FilterMode) -> Result<String, SkipReason> {
    let first = order.items.first().ok_or(SkipReason::NoLineItems)?;
    let non_blank = |s: &&str| !s.trim().is_empty();
    let visit = first.dt_visit.as_deref().filter(non_blank);
    let raw = match mode {
        FilterMode::LineItemDate => visit,
        FilterMode::ServerRange => order.dt_create.as_deref().filter(non_blank).or(visit),
    }
    .ok_or(SkipReason::MissingDate)?;
    normalize_date(raw).ok_or_else(|| SkipReason::MalformedDate(raw.to_string()))
}

/// Keep the orders whose date falls inside `range`.
///
/// Orders without a usable date are dropped, never included by default;
/// each drop is reported in the outcome's diagnostics.
pub fn filter_orders_by_date(orders: &[Order], range: &DateRange, mode: FilterMode) -> FilterOutcome {
    let mut outcome = FilterOutcome::default();
    for order in orders {
        match order_date(order, mode) {
            Ok(date) if range.contains(&date) => outcome.orders.push(order.clone()),
            Ok(_) => {}
            Err(reason) => outcome.diagnostics.push(FilterDiagnostic {
                order_id: order.order_id,
                reason,
            }),
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderItem;

    fn order(id: i64, dates: &[&str]) -> Order {
        Order {
            order_id: id,
            dt_create: None,
            order_state_id: 0,
            items: dates
                .iter()
                .map(|d| OrderItem {
                    service_id: 1,
                    service_name: None,
                    dt_visit: Some(d.to_string()),
                    category_visitor_id: None,
                    quantity: 1,
                    price: 100.0,
                })
                .collect(),
            sum: None,
            extra: Default::default(),
        }
    }

    fn ids(outcome: &FilterOutcome) -> Vec<i64> {
        outcome.orders.iter().map(|o| o.order_id).collect()
    }

    #[test]
    fn all_accepted_shapes_normalize_to_the_same_date() {
        for raw in ["2025-05-27 21:07", "2025-05-27T21:07:00", "2025-05-27"] {
            assert_eq!(normalize_date(raw).as_deref(), Some("2025-05-27"), "{raw}");
        }
        assert_eq!(normalize_date("27.05.2025"), None);
        assert_eq!(normalize_date("2025-5-27"), None);
        assert_eq!(normalize_date("2025-02-30"), None);
    }

    #[test]
    fn daily_mode_keeps_exact_date_only() {
        let orders = vec![
            order(1, &["2025-05-26"]),
            order(2, &["2025-05-27T09:30:00"]),
            order(3, &["2025-05-28"]),
        ];
        let range = DateRange::parse("2025-05-27", "2025-05-27").unwrap();
        assert!(range.is_daily());
        let outcome = filter_orders_by_date(&orders, &range, FilterMode::LineItemDate);
        assert_eq!(ids(&outcome), vec![2]);
    }

    #[test]
    fn range_mode_is_inclusive_at_both_ends() {
        let orders = vec![
            order(1, &["2025-04-30"]),
            order(2, &["2025-05-01 00:00"]),
            order(3, &["2025-05-15"]),
            order(4, &["2025-05-31T23:59:59"]),
            order(5, &["2025-06-01"]),
        ];
        let range = DateRange::parse("2025-05-01", "2025-05-31").unwrap();
        let outcome = filter_orders_by_date(&orders, &range, FilterMode::LineItemDate);
        assert_eq!(ids(&outcome), vec![2, 3, 4]);
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn only_first_line_item_decides() {
        let orders = vec![order(1, &["2025-06-02", "2025-05-10"])];
        let range = DateRange::parse("2025-05-01", "2025-05-31").unwrap();
        let outcome = filter_orders_by_date(&orders, &range, FilterMode::LineItemDate);
        assert!(outcome.orders.is_empty());
    }

    #[test]
    fn orders_without_usable_dates_are_dropped_and_reported() {
        let mut missing = order(3, &["x"]);
        missing.items[0].dt_visit = None;
        let orders = vec![order(1, &[]), order(2, &["31/05/2025"]), missing, order(4, &["2025-05-20"])];
        let range = DateRange::parse("2025-05-01", "2025-05-31").unwrap();
        let outcome = filter_orders_by_date(&orders, &range, FilterMode::LineItemDate);

        assert_eq!(ids(&outcome), vec![4]);
        assert_eq!(
            outcome.diagnostics,
            vec![
                FilterDiagnostic {
                    order_id: 1,
                    reason: SkipReason::NoLineItems
                },
                FilterDiagnostic {
                    order_id: 2,
                    reason: SkipReason::MalformedDate("31/05/2025".into())
                },
                FilterDiagnostic {
                    order_id: 3,
                    reason: SkipReason::MissingDate
                },
            ]
        );
    }

    #[test]
    fn filtering_is_idempotent() {
        let orders = vec![
            order(1, &["2025-05-02"]),
            order(2, &["2025-07-02"]),
            order(3, &[]),
        ];
        let range = DateRange::parse("2025-05-01", "2025-05-31").unwrap();
        let once = filter_orders_by_date(&orders, &range, FilterMode::LineItemDate);
        let twice = filter_orders_by_date(&once.orders, &range, FilterMode::LineItemDate);
        assert_eq!(once.orders, twice.orders);
    }

    #[test]
    fn server_range_mode_filters_on_creation_date() {
        let mut created_in_range = order(4, &["2025-06-10"]);
        created_in_range.dt_create = Some("2025-05-27T08:15:00".into());
        let mut created_outside = order(5, &["2025-05-27"]);
        created_outside.dt_create = Some("2025-05-20 10:00".into());
        let mut bad_create = order(6, &["2025-05-27"]);
        bad_create.dt_create = Some("yesterday".into());
        let orders = vec![
            order(1, &[]),
            order(2, &["2025-05-26"]),
            order(3, &["2025-05-27"]),
            created_in_range,
            created_outside,
            bad_create,
        ];
        let range = DateRange::parse("2025-05-27", "2025-05-27").unwrap();
        let outcome = filter_orders_by_date(&orders, &range, FilterMode::ServerRange);

        assert_eq!(ids(&outcome), vec![3, 4]);
        assert_eq!(
            outcome.diagnostics,
            vec![
                FilterDiagnostic {
                    order_id: 1,
                    reason: SkipReason::NoLineItems
                },
                FilterDiagnostic {
                    order_id: 6,
                    reason: SkipReason::MalformedDate("yesterday".into())
                },
            ]
        );
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert!(DateRange::parse("2025-06-01", "2025-05-01").is_err());
        assert!(DateRange::parse("2025-6-1", "2025-06-02").is_err());
    }
}
