//! `/Users` and `/Permissions` endpoints.

use serde::Deserialize;

use super::Resource;
use crate::api::{ApiClient, ApiError};
use crate::models::{PermissionInfo, PermissionSet, User};

impl Resource for User {
    const NAME: &'static str = "user";
    const ID_FIELD: &'static str = "UserId";
    const LIST_PATH: &'static str = "/Users";
    const CREATE_PATH: &'static str = "/Users/Create";
    const UPDATE_PATH: &'static str = "/Users/Update";
    const DELETE_PATH: &'static str = "/Users/Delete";
}

/// `GET /Users/IsRoot` answers either a bare boolean or `{"IsRoot": bool}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RootFlag {
    Bare(bool),
    Wrapped {
        #[serde(rename = "IsRoot")]
        is_root: bool,
    },
}

pub async fn list(client: &ApiClient) -> Result<Vec<User>, ApiError> {
    super::list::<User>(client).await
}

pub async fn find_by_id(client: &ApiClient, user_id: i64) -> Result<User, ApiError> {
    super::fetch(
        client,
        &format!("find user {user_id}"),
        &format!("/Users/FindById/{user_id}"),
    )
    .await
}

pub async fn current(client: &ApiClient) -> Result<User, ApiError> {
    super::fetch(client, "get current user", "/Users/Current").await
}

pub async fn is_root(client: &ApiClient) -> Result<bool, ApiError> {
    let flag: RootFlag = super::fetch(client, "check root", "/Users/IsRoot").await?;
    Ok(match flag {
        RootFlag::Bare(v) => v,
        RootFlag::Wrapped { is_root } => is_root,
    })
}

pub async fn create(client: &ApiClient, user: &User) -> Result<Option<User>, ApiError> {
    super::create(client, user).await
}

pub async fn update(client: &ApiClient, user: &User) -> Result<Option<User>, ApiError> {
    super::update(client, user).await
}

pub async fn delete(client: &ApiClient, user_id: i64) -> Result<(), ApiError> {
    super::delete::<User>(client, user_id).await
}

pub async fn current_permissions(client: &ApiClient) -> Result<PermissionSet, ApiError> {
    super::fetch(client, "get current permissions", "/Permissions/Current").await
}

pub async fn permissions_list(client: &ApiClient) -> Result<Vec<PermissionInfo>, ApiError> {
    super::fetch(client, "list permissions", "/Permissions/List").await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::CannedServer;

    #[tokio::test]
    async fn is_root_accepts_both_shapes() {
        let server = CannedServer::start(vec![
            (200, "true".into()),
            (200, r#"{"IsRoot":false}"#.into()),
        ])
        .await;
        let client = ApiClient::new(&server.config()).unwrap();
        assert!(is_root(&client).await.unwrap());
        assert!(!is_root(&client).await.unwrap());
    }

    #[tokio::test]
    async fn current_permissions_decode_as_flags() {
        let server = CannedServer::start(vec![(
            200,
            r#"{"orders.view":true,"users.edit":false}"#.into(),
        )])
        .await;
        let client = ApiClient::new(&server.config()).unwrap();
        let perms = current_permissions(&client).await.unwrap();
        assert_eq!(perms.get("orders.view"), Some(&true));
        assert_eq!(perms.get("users.edit"), Some(&false));
    }

    #[tokio::test]
    async fn list_requires_login_field() {
        let server = CannedServer::start(vec![(200, r#"[{"UserId":1}]"#.into())]).await;
        let client = ApiClient::new(&server.config()).unwrap();
        let err = list(&client).await.unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
    }

    #[tokio::test]
    async fn find_by_id_decodes_single_user() {
        let server = CannedServer::start(vec![(
            200,
            r#"{"UserId":9,"Login":"guide","Role":"cashier","Active":true}"#.into(),
        )])
        .await;
        let client = ApiClient::new(&server.config()).unwrap();
        let user = find_by_id(&client, 9).await.unwrap();
        assert_eq!(user.login, "guide");
        assert_eq!(user.role.as_deref(), Some("cashier"));

        let req = &server.requests()[0];
        assert_eq!(req.method, "GET");
        assert_eq!(req.path, "/api/Users/FindById/9");
    }

    #[tokio::test]
    async fn delete_targets_id_path() {
        let server = CannedServer::start(vec![(200, String::new())]).await;
        let client = ApiClient::new(&server.config()).unwrap();
        delete(&client, 14).await.unwrap();
        let req = &server.requests()[0];
        assert_eq!(req.method, "DELETE");
        assert_eq!(req.path, "/api/Users/Delete/14");
    }
}
