//! `/VisitObject` endpoints.

use super::Resource;
use crate::api::{ApiClient, ApiError};
use crate::models::VisitObject;

impl Resource for VisitObject {
    const NAME: &'static str = "visit object";
    const ID_FIELD: &'static str = "VisitObjectId";
    const LIST_PATH: &'static str = "/VisitObject";
    const CREATE_PATH: &'static str = "/VisitObject/Create";
    const UPDATE_PATH: &'static str = "/VisitObject/Update";
    const DELETE_PATH: &'static str = "/VisitObject/Delete";
}

pub async fn list(client: &ApiClient) -> Result<Vec<VisitObject>, ApiError> {
    super::list::<VisitObject>(client).await
}

pub async fn create(
    client: &ApiClient,
    object: &VisitObject,
) -> Result<Option<VisitObject>, ApiError> {
    super::create(client, object).await
}

pub async fn update(
    client: &ApiClient,
    object: &VisitObject,
) -> Result<Option<VisitObject>, ApiError> {
    super::update(client, object).await
}

pub async fn delete(client: &ApiClient, visit_object_id: i64) -> Result<(), ApiError> {
    super::delete::<VisitObject>(client, visit_object_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::CannedServer;

    #[tokio::test]
    async fn create_posts_and_returns_assigned_id() {
        let server = CannedServer::start(vec![(
            201,
            r#"{"VisitObjectId":31,"VisitObjectName":"Planetarium"}"#.into(),
        )])
        .await;
        let client = ApiClient::new(&server.config()).unwrap();
        let draft = VisitObject {
            visit_object_id: 0,
            visit_object_name: "Planetarium".into(),
            group_visit_object_id: None,
            extra: Default::default(),
        };
        let created = create(&client, &draft).await.unwrap().unwrap();
        assert_eq!(created.visit_object_id, 31);
        assert_eq!(server.requests()[0].path, "/api/VisitObject/Create");
    }
}
