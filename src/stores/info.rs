//! Backend logs, version and organization details.

use std::sync::{Arc, Mutex, MutexGuard};

use super::{lock, ActionResult, Status};
use crate::api::ApiClient;
use crate::endpoints;
use crate::models::{LogEntry, OrgInfo, VersionInfo};

#[derive(Default)]
struct InfoState {
    logs: Vec<LogEntry>,
    version: Option<VersionInfo>,
    org: Option<OrgInfo>,
    status: Status,
}

pub struct InfoStore {
    client: Arc<ApiClient>,
    state: Mutex<InfoState>,
}

impl InfoStore {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            state: Mutex::new(InfoState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, InfoState> {
        lock(&self.state)
    }

    fn finish<T>(&self, result: ActionResult<T>) -> ActionResult<T> {
        self.state().status.finish(&result);
        result
    }

    pub async fn fetch_logs(&self) -> ActionResult<Vec<LogEntry>> {
        self.state().status.begin();
        let result = match endpoints::info::logs(&self.client).await {
            Ok(logs) => {
                self.state().logs = logs.clone();
                ActionResult::ok(logs)
            }
            Err(e) => ActionResult::fail(format!("Failed to load logs: {e}")),
        };
        self.finish(result)
    }

    pub async fn clear_logs(&self) -> ActionResult<()> {
        self.state().status.begin();
        let result = match endpoints::info::delete_logs(&self.client).await {
            Ok(()) => {
                self.state().logs.clear();
                ActionResult::done()
            }
            Err(e) => ActionResult::fail(format!("Failed to delete logs: {e}")),
        };
        self.finish(result)
    }

    pub async fn fetch_version(&self) -> ActionResult<VersionInfo> {
        self.state().status.begin();
        let result = match endpoints::info::version_info(&self.client).await {
            Ok(version) => {
                self.state().version = Some(version.clone());
                ActionResult::ok(version)
            }
            Err(e) => ActionResult::fail(format!("Failed to load version info: {e}")),
        };
        self.finish(result)
    }

    pub async fn fetch_org(&self) -> ActionResult<OrgInfo> {
        self.state().status.begin();
        let result = match endpoints::info::org_info(&self.client).await {
            Ok(org) => {
                self.state().org = Some(org.clone());
                ActionResult::ok(org)
            }
            Err(e) => ActionResult::fail(format!("Failed to load organization info: {e}")),
        };
        self.finish(result)
    }

    pub fn logs(&self) -> Vec<LogEntry> {
        self.state().logs.clone()
    }

    pub fn version(&self) -> Option<VersionInfo> {
        self.state().version.clone()
    }

    pub fn org(&self) -> Option<OrgInfo> {
        self.state().org.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.state().status.last_error.clone()
    }

    pub fn reset(&self) {
        *self.state() = InfoState::default();
    }
}
