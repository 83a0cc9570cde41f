//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the worker.
use std::sync::Arc;

use crate::platform::HostPlatform;
use crate::tools::{
    cache::generations_impl,
    fetch::{WorkerFetchParams, fetch_impl},
    lifecycle::{WorkerInstallParams, activate_impl, install_impl},
    push::{WorkerNotificationClickParams, WorkerPushParams, notification_click_impl, push_impl},
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use tokio::sync::Mutex;
use zubid_sw_core::{WaitUntil, Worker};

/// The MCP server handler hosting one offline worker.
#[derive(Clone)]
pub struct ZubidWorkerServer {
    tool_router: ToolRouter<Self>,
    worker: Arc<Worker>,
    platform: Arc<HostPlatform>,
    background: Arc<Mutex<WaitUntil>>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl ZubidWorkerServer {
    /// Create a new server handler.
    pub fn new(worker: Arc<Worker>, platform: Arc<HostPlatform>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            worker,
            platform,
            background: Arc::new(Mutex::new(WaitUntil::new())),
        }
    }

    /// Background work still owed by earlier tool calls.
    pub fn background(&self) -> Arc<Mutex<WaitUntil>> {
        self.background.clone()
    }

    #[tool(
        description = "Install a worker version: pre-cache the manifest into a new static generation. Fails without writing anything if any manifest entry cannot be fetched."
    )]
    async fn worker_install(&self, params: Parameters<WorkerInstallParams>) -> Result<CallToolResult, McpError> {
        install_impl(&self.worker, params.0).await
    }

    #[tool(
        description = "Activate the installed version: delete every stale cache generation and start intercepting fetches with the new generation set."
    )]
    async fn worker_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.worker).await
    }

    #[tool(
        description = "Deliver a fetch to the worker. Returns the response with its routing decision and source (cache, network or offline fallback), or intercepted=false before activation."
    )]
    async fn worker_fetch(&self, params: Parameters<WorkerFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, &self.background, params.0).await
    }

    #[tool(description = "Deliver a push event. Shows exactly one notification and returns its descriptor.")]
    async fn worker_push(&self, params: Parameters<WorkerPushParams>) -> Result<CallToolResult, McpError> {
        push_impl(&self.worker, &self.platform, params.0).await
    }

    #[tool(description = "Click a notification returned by worker_push. Closes it and opens a window at its target URL.")]
    async fn worker_notification_click(
        &self, params: Parameters<WorkerNotificationClickParams>,
    ) -> Result<CallToolResult, McpError> {
        notification_click_impl(&self.worker, &self.platform, params.0).await
    }

    #[tool(description = "List cache generations with entry counts and sizes, plus the lifecycle phase and active set.")]
    async fn cache_generations(&self) -> Result<CallToolResult, McpError> {
        generations_impl(&self.worker).await
    }
}

impl ServerHandler for ZubidWorkerServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "zubid-sw".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Offline caching worker for the ZUBID auction site. Call worker_install then worker_activate before worker_fetch."
                    .into(),
            ),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::offline_worker;

    #[tokio::test]
    async fn test_all_tools_registered() {
        let (worker, platform) = offline_worker().await;
        let server = ZubidWorkerServer::new(Arc::new(worker), platform);

        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "cache_generations",
                "worker_activate",
                "worker_fetch",
                "worker_install",
                "worker_notification_click",
                "worker_push",
            ]
        );
    }

    #[tokio::test]
    async fn test_server_info() {
        let (worker, platform) = offline_worker().await;
        let server = ZubidWorkerServer::new(Arc::new(worker), platform);
        assert_eq!(server.get_info().server_info.name, "zubid-sw");
    }
}
