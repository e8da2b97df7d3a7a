//! Visit objects (exhibits, attractions, halls).

use serde_json::Value;
use std::sync::Arc;

use super::{ActionResult, ResourceStore};
use crate::api::ApiClient;
use crate::models::VisitObject;

pub struct VisitObjectStore {
    objects: ResourceStore<VisitObject>,
}

impl VisitObjectStore {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            objects: ResourceStore::new(client),
        }
    }

    pub async fn fetch(&self) -> ActionResult<Vec<VisitObject>> {
        self.objects.fetch().await
    }

    pub async fn add(&self, object: VisitObject) -> ActionResult<VisitObject> {
        if object.visit_object_name.trim().is_empty() {
            return ActionResult::fail("Visit object name is required");
        }
        self.objects.add(object).await
    }

    pub async fn update(&self, id: i64, changes: &Value) -> ActionResult<VisitObject> {
        self.objects.update(id, changes).await
    }

    pub async fn delete(&self, id: i64) -> ActionResult<()> {
        self.objects.delete(id).await
    }

    pub fn get(&self, id: i64) -> Option<VisitObject> {
        self.objects.get(id)
    }

    pub fn sorted(&self) -> Vec<VisitObject> {
        self.objects
            .sorted_by(|a, b| a.visit_object_name.cmp(&b.visit_object_name))
    }

    pub fn in_group(&self, group_id: i64) -> Vec<VisitObject> {
        self.sorted()
            .into_iter()
            .filter(|v| v.group_visit_object_id == Some(group_id))
            .collect()
    }

    pub fn is_loading(&self) -> bool {
        self.objects.is_loading()
    }

    pub fn last_error(&self) -> Option<String> {
        self.objects.last_error()
    }

    pub fn reset(&self) {
        self.objects.reset();
    }
}
