//! In-memory copy of a backend collection with confirmed/unconfirmed tracking.
//!
//! Records fetched from or returned by the backend are *confirmed*. Records
//! changed locally after a failed call are *unconfirmed* until the next
//! successful response for that id, and a full re-fetch replaces everything.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;

use crate::models::Entity;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tracked<T> {
    pub record: T,
    pub confirmed: bool,
}

#[derive(Debug, Clone)]
pub struct Collection<T> {
    items: Vec<Tracked<T>>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Entity> Collection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole collection with a fresh fetch. Every local guess is
    /// discarded.
    pub fn replace_all(&mut self, records: Vec<T>) {
        self.items = records
            .into_iter()
            .map(|record| Tracked {
                record,
                confirmed: true,
            })
            .collect();
    }

    /// Store the server's representation for its id, replacing any local
    /// record in full. Appends when the id is new.
    pub fn confirm(&mut self, record: T) {
        let tracked = Tracked {
            record,
            confirmed: true,
        };
        match self.position(tracked.record.id()) {
            Some(idx) => self.items[idx] = tracked,
            None => self.items.push(tracked),
        }
    }

    /// Apply a local change that the backend has not accepted.
    /// Returns `false` when the id is not present.
    pub fn apply_unconfirmed(&mut self, id: i64, change: impl FnOnce(&mut T)) -> bool {
        match self.position(id) {
            Some(idx) => {
                let item = &mut self.items[idx];
                change(&mut item.record);
                item.confirmed = false;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: i64) -> Option<T> {
        self.position(id).map(|idx| self.items.remove(idx).record)
    }

    pub fn get(&self, id: i64) -> Option<&Tracked<T>> {
        self.items.iter().find(|t| t.record.id() == id)
    }

    pub fn records(&self) -> impl Iterator<Item = &T> {
        self.items.iter().map(|t| &t.record)
    }

    pub fn tracked(&self) -> &[Tracked<T>] {
        &self.items
    }

    pub fn unconfirmed(&self) -> Vec<&T> {
        self.items
            .iter()
            .filter(|t| !t.confirmed)
            .map(|t| &t.record)
            .collect()
    }

    pub fn sorted_by(&self, compare: impl FnMut(&T, &T) -> Ordering) -> Vec<T> {
        let mut records: Vec<T> = self.records().cloned().collect();
        records.sort_by(compare);
        records
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    fn position(&self, id: i64) -> Option<usize> {
        self.items.iter().position(|t| t.record.id() == id)
    }
}

/// Overlay the top-level fields of `changes` onto `record`.
///
/// Fields not named in `changes` keep their current value, so the result
/// differs from `record` only where the caller asked for a change.
pub fn merge_changes<T>(record: &T, changes: &Value) -> Result<T, String>
where
    T: Serialize + DeserializeOwned,
{
    let patch = changes
        .as_object()
        .ok_or("Changes must be a JSON object")?;
    let mut value = serde_json::to_value(record).map_err(|e| e.to_string())?;
    let target = value
        .as_object_mut()
        .ok_or("Record does not serialize to a JSON object")?;
    for (key, v) in patch {
        target.insert(key.clone(), v.clone());
    }
    serde_json::from_value(value).map_err(|e| format!("Invalid change set: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VisitObject;
    use serde_json::json;

    fn visit_object(id: i64, name: &str) -> VisitObject {
        VisitObject {
            visit_object_id: id,
            visit_object_name: name.to_string(),
            group_visit_object_id: Some(1),
            extra: Default::default(),
        }
    }

    #[test]
    fn confirm_replaces_record_in_full() {
        let mut c = Collection::new();
        c.replace_all(vec![visit_object(1, "Museum")]);
        c.apply_unconfirmed(1, |v| v.visit_object_name = "Local guess".into());

        // The server cleared the group; the stale local value must not survive.
        let mut from_server = visit_object(1, "Museum Hall");
        from_server.group_visit_object_id = None;
        c.confirm(from_server.clone());

        let tracked = c.get(1).unwrap();
        assert!(tracked.confirmed);
        assert_eq!(tracked.record, from_server);
    }

    #[test]
    fn unconfirmed_changes_are_flagged_until_refetch() {
        let mut c = Collection::new();
        c.replace_all(vec![visit_object(1, "Museum"), visit_object(2, "Park")]);
        assert!(c.apply_unconfirmed(2, |v| v.visit_object_name = "Garden".into()));
        assert!(!c.apply_unconfirmed(9, |_| {}));

        assert_eq!(c.unconfirmed().len(), 1);
        assert_eq!(c.unconfirmed()[0].visit_object_name, "Garden");

        c.replace_all(vec![visit_object(1, "Museum"), visit_object(2, "Park")]);
        assert!(c.unconfirmed().is_empty());
        assert_eq!(c.get(2).unwrap().record.visit_object_name, "Park");
    }

    #[test]
    fn remove_and_sort() {
        let mut c = Collection::new();
        c.replace_all(vec![visit_object(3, "C"), visit_object(1, "A"), visit_object(2, "B")]);
        assert_eq!(c.remove(1).map(|v| v.visit_object_name), Some("A".to_string()));
        assert!(c.remove(1).is_none());
        let sorted = c.sorted_by(|a, b| b.visit_object_id.cmp(&a.visit_object_id));
        let ids: Vec<i64> = sorted.iter().map(|v| v.visit_object_id).collect();
        assert_eq!(ids, vec![3, 2]);
    }

    #[test]
    fn merge_changes_touches_only_named_fields() {
        let original = visit_object(5, "Old name");
        let merged: VisitObject =
            merge_changes(&original, &json!({"VisitObjectName": "New name"})).unwrap();
        assert_eq!(merged.visit_object_name, "New name");
        assert_eq!(merged.visit_object_id, 5);
        assert_eq!(merged.group_visit_object_id, Some(1));

        assert!(merge_changes(&original, &json!(["not", "an", "object"])).is_err());
        assert!(merge_changes(&original, &json!({"VisitObjectName": 12})).is_err());
    }
}
