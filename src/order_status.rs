//! Order status labels.
//!
//! The meaning of `OrderStateId` is owned by the backend. The table is built
//! once, from the configuration (or from a backend-supplied lookup) and
//! shared by every caller; no mapping is compiled in.

use std::collections::BTreeMap;
use tracing::warn;

/// Label returned for codes missing from the table.
pub const UNKNOWN_STATUS: &str = "Unknown status";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusTable {
    labels: BTreeMap<i32, String>,
}

impl StatusTable {
    /// Build from the config section, whose keys are decimal codes.
    pub fn from_config(raw: &BTreeMap<String, String>) -> Result<Self, String> {
        let pairs = raw
            .iter()
            .map(|(code, label)| {
                code.trim()
                    .parse::<i32>()
                    .map(|code| (code, label.trim().to_string()))
                    .map_err(|_| format!("Invalid order status code: {code}"))
            })
            .collect::<Result<Vec<_>, String>>()?;
        let table = Self::from_pairs(pairs);
        if table.is_empty() {
            warn!("no order status labels configured, every status will read as unknown");
        }
        Ok(table)
    }

    /// Build from `(code, label)` pairs, e.g. a lookup fetched from the
    /// backend. A repeated code keeps its last label.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (i32, String)>) -> Self {
        Self {
            labels: pairs.into_iter().collect(),
        }
    }

    pub fn label(&self, code: i32) -> &str {
        self.labels
            .get(&code)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_STATUS)
    }

    pub fn contains(&self, code: i32) -> bool {
        self.labels.contains_key(&code)
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_code_returns_label_and_unknown_returns_sentinel() {
        let mut raw = BTreeMap::new();
        raw.insert("4".to_string(), "Ordered".to_string());
        raw.insert(" 5 ".to_string(), "Paid".to_string());
        let table = StatusTable::from_config(&raw).unwrap();

        assert_eq!(table.label(5), "Paid");
        assert_eq!(table.label(4), "Ordered");
        assert_eq!(table.label(99), UNKNOWN_STATUS);
        assert!(!table.contains(99));
    }

    #[test]
    fn empty_table_reads_everything_as_unknown() {
        let table = StatusTable::from_config(&BTreeMap::new()).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.label(1), UNKNOWN_STATUS);
    }

    #[test]
    fn non_numeric_code_is_rejected() {
        let mut raw = BTreeMap::new();
        raw.insert("paid".to_string(), "Paid".to_string());
        assert!(StatusTable::from_config(&raw).is_err());
    }

    #[test]
    fn backend_pairs_build_the_same_lookup() {
        let table = StatusTable::from_pairs([(0, "New".to_string()), (3, "Refunded".to_string())]);
        assert_eq!(table.label(3), "Refunded");
        assert_eq!(table.label(2), UNKNOWN_STATUS);
    }
}
