//! `/Service` endpoints.

use serde_json::Value;

use super::Resource;
use crate::api::{self, ApiClient, ApiError};
use crate::models::{EditableServices, Service, SimpleServices};

impl Resource for Service {
    const NAME: &'static str = "service";
    const ID_FIELD: &'static str = "ServiceId";
    const LIST_PATH: &'static str = "/Service/Editable";
    const CREATE_PATH: &'static str = "/Service/Create";
    const UPDATE_PATH: &'static str = "/Service/Update";
    const DELETE_PATH: &'static str = "/Service/Delete";

    fn decode_list(path: &str, value: Value) -> Result<Vec<Self>, ApiError> {
        api::decode::<EditableServices>(path, value).map(|editable| editable.service)
    }
}

pub async fn get_simple(client: &ApiClient) -> Result<SimpleServices, ApiError> {
    super::fetch(client, "get simple services", "/Service/Simple").await
}

/// Services with their reference lists (visit objects, categories, groups,
/// seance grids).
pub async fn get_editable(client: &ApiClient) -> Result<EditableServices, ApiError> {
    super::fetch(client, "get editable services", Service::LIST_PATH).await
}

pub async fn get_by_id(client: &ApiClient, service_id: i64) -> Result<Service, ApiError> {
    super::fetch(
        client,
        &format!("get service {service_id}"),
        &format!("/Service/{service_id}"),
    )
    .await
}

pub async fn create(client: &ApiClient, service: &Service) -> Result<Option<Service>, ApiError> {
    super::create(client, service).await
}

pub async fn update(client: &ApiClient, service: &Service) -> Result<Option<Service>, ApiError> {
    super::update(client, service).await
}

pub async fn delete(client: &ApiClient, service_id: i64) -> Result<(), ApiError> {
    super::delete::<Service>(client, service_id).await
}
