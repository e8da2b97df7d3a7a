//! Visitor categories and the groups derived from them.

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::{ActionResult, ResourceStore};
use crate::api::ApiClient;
use crate::endpoints;
use crate::models::{CategoryVisitor, GroupCategoryVisitor};

pub struct CategoryVisitorStore {
    categories: ResourceStore<CategoryVisitor>,
}

impl CategoryVisitorStore {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            categories: ResourceStore::new(client),
        }
    }

    pub async fn fetch(&self) -> ActionResult<Vec<CategoryVisitor>> {
        self.categories.fetch().await
    }

    /// Load one category and store it as confirmed.
    pub async fn fetch_by_id(&self, id: i64) -> ActionResult<CategoryVisitor> {
        match endpoints::categories::get_by_id(self.categories.client(), id).await {
            Ok(category) => {
                self.categories.confirm(category.clone());
                ActionResult::ok(category)
            }
            Err(e) => ActionResult::fail(format!("Failed to load visitor category {id}: {e}")),
        }
    }

    pub async fn add(&self, category: CategoryVisitor) -> ActionResult<CategoryVisitor> {
        if category.category_visitor_name.trim().is_empty() {
            return ActionResult::fail("Category name is required");
        }
        self.categories.add(category).await
    }

    pub async fn update(&self, id: i64, changes: &Value) -> ActionResult<CategoryVisitor> {
        self.categories.update(id, changes).await
    }

    pub async fn delete(&self, id: i64) -> ActionResult<()> {
        self.categories.delete(id).await
    }

    pub fn get(&self, id: i64) -> Option<CategoryVisitor> {
        self.categories.get(id)
    }

    pub fn sorted(&self) -> Vec<CategoryVisitor> {
        self.categories
            .sorted_by(|a, b| a.category_visitor_name.cmp(&b.category_visitor_name))
    }

    /// Distinct groups referenced by the loaded categories, by id.
    pub fn groups(&self) -> Vec<GroupCategoryVisitor> {
        let mut groups = BTreeMap::new();
        for category in self.categories.all() {
            if let Some(id) = category.group_category_visitor_id {
                let name = category
                    .group_category_visitor_name
                    .clone()
                    .unwrap_or_else(|| format!("Group {id}"));
                groups.entry(id).or_insert(name);
            }
        }
        groups
            .into_iter()
            .map(|(id, name)| GroupCategoryVisitor {
                group_category_visitor_id: id,
                group_category_visitor_name: name,
            })
            .collect()
    }

    pub fn in_group(&self, group_id: i64) -> Vec<CategoryVisitor> {
        self.sorted()
            .into_iter()
            .filter(|c| c.group_category_visitor_id == Some(group_id))
            .collect()
    }

    pub fn is_loading(&self) -> bool {
        self.categories.is_loading()
    }

    pub fn last_error(&self) -> Option<String> {
        self.categories.last_error()
    }

    pub fn reset(&self) {
        self.categories.reset();
    }
}
