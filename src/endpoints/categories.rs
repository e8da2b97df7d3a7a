//! `/CategoryVisitors` endpoints.

use super::Resource;
use crate::api::{ApiClient, ApiError};
use crate::models::CategoryVisitor;

impl Resource for CategoryVisitor {
    const NAME: &'static str = "visitor category";
    const ID_FIELD: &'static str = "CategoryVisitorId";
    const LIST_PATH: &'static str = "/CategoryVisitors";
    const CREATE_PATH: &'static str = "/CategoryVisitors/Create";
    const UPDATE_PATH: &'static str = "/CategoryVisitors/Update";
    const DELETE_PATH: &'static str = "/CategoryVisitors/Delete";
}

pub async fn list(client: &ApiClient) -> Result<Vec<CategoryVisitor>, ApiError> {
    super::list::<CategoryVisitor>(client).await
}

pub async fn get_by_id(client: &ApiClient, category_id: i64) -> Result<CategoryVisitor, ApiError> {
    super::fetch(
        client,
        &format!("get visitor category {category_id}"),
        &format!("{}/{category_id}", CategoryVisitor::LIST_PATH),
    )
    .await
}

pub async fn create(
    client: &ApiClient,
    category: &CategoryVisitor,
) -> Result<Option<CategoryVisitor>, ApiError> {
    super::create(client, category).await
}

pub async fn update(
    client: &ApiClient,
    category: &CategoryVisitor,
) -> Result<Option<CategoryVisitor>, ApiError> {
    super::update(client, category).await
}

pub async fn delete(client: &ApiClient, category_id: i64) -> Result<(), ApiError> {
    super::delete::<CategoryVisitor>(client, category_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::CannedServer;

    #[tokio::test]
    async fn get_by_id_uses_plural_path() {
        let server = CannedServer::start(vec![(
            200,
            r#"{"CategoryVisitorId":2,"CategoryVisitorName":"Child","GroupCategoryVisitorId":1}"#.into(),
        )])
        .await;
        let client = ApiClient::new(&server.config()).unwrap();
        let category = get_by_id(&client, 2).await.unwrap();
        assert_eq!(category.category_visitor_name, "Child");
        assert_eq!(server.requests()[0].path, "/api/CategoryVisitors/2");
    }

    #[tokio::test]
    async fn not_found_is_status_error() {
        let server = CannedServer::start(vec![]).await;
        let client = ApiClient::new(&server.config()).unwrap();
        let err = get_by_id(&client, 404).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
    }
}
