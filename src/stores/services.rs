//! Service catalogue and the reference lists that come with it.

use serde_json::Value;
use std::sync::{Arc, Mutex};
use tracing::info;

use super::{lock, ActionResult, ResourceStore};
use crate::api::ApiClient;
use crate::endpoints;
use crate::models::{
    CategoryVisitor, EditableServices, GroupCategoryVisitor, GroupVisitObject, SeanceGrid,
    Service, VisitObject,
};

/// Lists delivered alongside the services by `GET /Service/Editable`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceReferences {
    pub visit_objects: Vec<VisitObject>,
    pub category_visitors: Vec<CategoryVisitor>,
    pub group_visit_objects: Vec<GroupVisitObject>,
    pub group_category_visitors: Vec<GroupCategoryVisitor>,
    pub seance_grids: Vec<SeanceGrid>,
}

impl From<&EditableServices> for ServiceReferences {
    fn from(editable: &EditableServices) -> Self {
        Self {
            visit_objects: editable.visit_object.clone(),
            category_visitors: editable.category_visitor.clone(),
            group_visit_objects: editable.group_visit_object.clone(),
            group_category_visitors: editable.group_category_visitor.clone(),
            seance_grids: editable.seance_grid.clone(),
        }
    }
}

pub struct ServiceStore {
    services: ResourceStore<Service>,
    references: Mutex<ServiceReferences>,
}

impl ServiceStore {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            services: ResourceStore::new(client),
            references: Mutex::new(ServiceReferences::default()),
        }
    }

    /// Load services together with their reference lists.
    pub async fn fetch(&self) -> ActionResult<Vec<Service>> {
        self.services.begin();
        let result = match endpoints::services::get_editable(self.services.client()).await {
            Ok(editable) => {
                info!(
                    services = editable.service.len(),
                    visit_objects = editable.visit_object.len(),
                    "service catalogue loaded"
                );
                *lock(&self.references) = ServiceReferences::from(&editable);
                self.services.replace_all(editable.service.clone());
                ActionResult::ok(editable.service)
            }
            Err(e) => ActionResult::fail(format!("Failed to load services: {e}")),
        };
        self.services.finish(result)
    }

    pub async fn add(&self, service: Service) -> ActionResult<Service> {
        self.services.add(service).await
    }

    /// Apply `changes` (top-level backend fields) to service `id`.
    pub async fn update(&self, id: i64, changes: &Value) -> ActionResult<Service> {
        self.services.update(id, changes).await
    }

    pub async fn delete(&self, id: i64) -> ActionResult<()> {
        self.services.delete(id).await
    }

    pub fn get(&self, id: i64) -> Option<Service> {
        self.services.get(id)
    }

    pub fn is_confirmed(&self, id: i64) -> Option<bool> {
        self.services.tracked(id).map(|t| t.confirmed)
    }

    /// All services sorted by name.
    pub fn sorted(&self) -> Vec<Service> {
        self.services
            .sorted_by(|a, b| a.service_name.to_lowercase().cmp(&b.service_name.to_lowercase()))
    }

    pub fn available(&self) -> Vec<Service> {
        self.sorted().into_iter().filter(|s| s.available).collect()
    }

    /// Services that grant access to the given visit object.
    pub fn for_visit_object(&self, visit_object_id: i64) -> Vec<Service> {
        self.sorted()
            .into_iter()
            .filter(|s| {
                s.visit_object
                    .iter()
                    .any(|v| v.visit_object_id == visit_object_id)
            })
            .collect()
    }

    pub fn references(&self) -> ServiceReferences {
        lock(&self.references).clone()
    }

    pub fn is_loading(&self) -> bool {
        self.services.is_loading()
    }

    pub fn last_error(&self) -> Option<String> {
        self.services.last_error()
    }

    pub fn reset(&self) {
        self.services.reset();
        *lock(&self.references) = ServiceReferences::default();
    }
}
