//! One function per backend REST endpoint.
//!
//! Each function logs its own failure with context and returns the error
//! unchanged; stores decide what the user sees.

pub mod categories;
pub mod info;
pub mod orders;
pub mod services;
pub mod users;
pub mod visit_objects;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::api::{self, ApiClient, ApiError};
use crate::models::Entity;

/// A backend collection with the standard list/create/update/delete routes.
pub trait Resource: Entity + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Human name used in logs and messages.
    const NAME: &'static str;
    /// Backend name of the id field, e.g. `ServiceId`.
    const ID_FIELD: &'static str;
    const LIST_PATH: &'static str;
    const CREATE_PATH: &'static str;
    /// `/{id}` is appended.
    const UPDATE_PATH: &'static str;
    /// `/{id}` is appended.
    const DELETE_PATH: &'static str;

    /// Decode the list response. Most resources return a bare array.
    fn decode_list(path: &str, value: Value) -> Result<Vec<Self>, ApiError> {
        api::decode(path, value)
    }
}

pub async fn list<T: Resource>(client: &ApiClient) -> Result<Vec<T>, ApiError> {
    let result: Result<Vec<T>, ApiError> = async {
        let value = client.get::<Value>(T::LIST_PATH).await?;
        T::decode_list(T::LIST_PATH, value)
    }
    .await;
    result.inspect_err(|e| api::log_failure(&format!("list {}", T::NAME), e))
}

/// Create a record. `None` when the backend acknowledges with an empty body.
pub async fn create<T: Resource>(client: &ApiClient, record: &T) -> Result<Option<T>, ApiError> {
    let result: Result<Option<T>, ApiError> = async {
        let value = client.post(T::CREATE_PATH, record).await?;
        api::decode_optional(T::CREATE_PATH, value)
    }
    .await;
    match &result {
        Ok(_) => api::log_success(&format!("create {}", T::NAME)),
        Err(e) => api::log_failure(&format!("create {}", T::NAME), e),
    }
    result
}

/// Update a record in full. The record's id selects the target; a missing
/// id is rejected before any request is made.
pub async fn update<T: Resource>(client: &ApiClient, record: &T) -> Result<Option<T>, ApiError> {
    let id = record.id();
    let result: Result<Option<T>, ApiError> = async {
        if id <= 0 {
            return Err(ApiError::Validation(format!(
                "Missing {} for {} update",
                T::ID_FIELD,
                T::NAME
            )));
        }
        let path = format!("{}/{id}", T::UPDATE_PATH);
        let value = client.put(&path, record).await?;
        api::decode_optional(&path, value)
    }
    .await;
    match &result {
        Ok(_) => api::log_success(&format!("update {} {id}", T::NAME)),
        Err(e) => api::log_failure(&format!("update {} {id}", T::NAME), e),
    }
    result
}

pub async fn delete<T: Resource>(client: &ApiClient, id: i64) -> Result<(), ApiError> {
    let path = format!("{}/{id}", T::DELETE_PATH);
    let result = client.delete(&path).await.map(|_| ());
    match &result {
        Ok(_) => api::log_success(&format!("delete {} {id}", T::NAME)),
        Err(e) => api::log_failure(&format!("delete {} {id}", T::NAME), e),
    }
    result
}

/// GET and decode against `T`, logging failures under `operation`.
pub(crate) async fn fetch<T: DeserializeOwned>(
    client: &ApiClient,
    operation: &str,
    path: &str,
) -> Result<T, ApiError> {
    client
        .get::<T>(path)
        .await
        .inspect_err(|e| api::log_failure(operation, e))
}
