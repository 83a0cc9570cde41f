//! worker_install / worker_activate tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use zubid_sw_core::{Error, EventResponse, LifecyclePhase, Worker, WorkerEvent};

use super::json_result;

/// Parameters for the worker_install tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct WorkerInstallParams {
    /// Version tag to install. Defaults to the configured version.
    #[serde(default)]
    pub version: Option<String>,
}

/// Output from the worker_install tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerInstallOutput {
    pub phase: LifecyclePhase,
    pub static_id: String,
    pub dynamic_id: String,
    /// URLs pre-cached into the static generation.
    pub cached: Vec<String>,
}

/// Output from the worker_activate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerActivateOutput {
    pub phase: LifecyclePhase,
    pub static_id: String,
    pub dynamic_id: String,
    /// Generations removed during activation.
    pub deleted: Vec<String>,
}

fn unexpected(response: &EventResponse) -> McpError {
    Error::Lifecycle(format!("unexpected worker response: {response:?}")).into()
}

/// Implementation of the worker_install tool.
pub async fn install_impl(worker: &Worker, params: WorkerInstallParams) -> Result<CallToolResult, McpError> {
    let outcome = worker.dispatch(WorkerEvent::Install { version: params.version }).await?;
    let report = match outcome.response {
        EventResponse::Installed(report) => report,
        other => return Err(unexpected(&other)),
    };

    json_result(&WorkerInstallOutput {
        phase: worker.phase().await,
        static_id: report.generations.static_id,
        dynamic_id: report.generations.dynamic_id,
        cached: report.cached,
    })
}

/// Implementation of the worker_activate tool.
pub async fn activate_impl(worker: &Worker) -> Result<CallToolResult, McpError> {
    let outcome = worker.dispatch(WorkerEvent::Activate).await?;
    let report = match outcome.response {
        EventResponse::Activated(report) => report,
        other => return Err(unexpected(&other)),
    };

    json_result(&WorkerActivateOutput {
        phase: worker.phase().await,
        static_id: report.generations.static_id,
        dynamic_id: report.generations.dynamic_id,
        deleted: report.deleted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::offline_worker;

    #[tokio::test]
    async fn test_install_offline_fails() {
        let (worker, _) = offline_worker().await;
        let err = install_impl(&worker, WorkerInstallParams::default()).await.unwrap_err();
        assert_eq!(err.code.0, -32008);
        assert_eq!(worker.phase().await, LifecyclePhase::Parsed);
    }

    #[tokio::test]
    async fn test_install_blank_version() {
        let (worker, _) = offline_worker().await;
        let params = WorkerInstallParams { version: Some(String::new()) };
        let err = install_impl(&worker, params).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }

    #[tokio::test]
    async fn test_activate_without_install() {
        let (worker, _) = offline_worker().await;
        let err = activate_impl(&worker).await.unwrap_err();
        assert_eq!(err.code.0, -32010);
    }
}
