//! System information endpoints: logs, backend version, organization.

use crate::api::{self, ApiClient, ApiError};
use crate::models::{LogEntry, OrgInfo, VersionInfo};

pub async fn logs(client: &ApiClient) -> Result<Vec<LogEntry>, ApiError> {
    super::fetch(client, "get logs", "/Logs").await
}

pub async fn delete_logs(client: &ApiClient) -> Result<(), ApiError> {
    let result = client.delete("/Logs/Delete").await.map(|_| ());
    match &result {
        Ok(_) => api::log_success("delete logs"),
        Err(e) => api::log_failure("delete logs", e),
    }
    result
}

pub async fn version_info(client: &ApiClient) -> Result<VersionInfo, ApiError> {
    super::fetch(client, "get version info", "/Version/Info").await
}

pub async fn org_info(client: &ApiClient) -> Result<OrgInfo, ApiError> {
    super::fetch(client, "get organization info", "/Info/Org").await
}
