//! MCP tool implementations.
//!
//! Each tool turns its parameters into a worker event, dispatches it and
//! renders the outcome as pretty JSON text.

pub mod cache;
pub mod fetch;
pub mod lifecycle;
pub mod push;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;
use zubid_sw_core::Error;

fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use rmcp::model::CallToolResult;
    use zubid_sw_client::{FetchClient, FetchConfig};
    use zubid_sw_core::{AppConfig, CacheDb, Worker, WorkerSettings};

    use crate::platform::HostPlatform;

    /// Worker whose origin refuses every connection.
    pub(crate) async fn offline_worker() -> (Worker, Arc<HostPlatform>) {
        let config = AppConfig { origin_url: "http://127.0.0.1:1".into(), ..Default::default() };
        let store = CacheDb::open_in_memory().await.unwrap();
        let origin = Arc::new(FetchClient::new(FetchConfig::from_app_config(&config)).unwrap());
        let platform = Arc::new(HostPlatform::default());
        let settings = WorkerSettings::from_config(&config).unwrap();
        (Worker::new(settings, store, origin, platform.clone()), platform)
    }

    pub(crate) fn output(result: &CallToolResult) -> serde_json::Value {
        let content_val = serde_json::to_value(&result.content[0]).unwrap();
        let text = content_val
            .get("text")
            .and_then(|v| v.as_str())
            .expect("Expected text field in content");
        serde_json::from_str(text).unwrap()
    }
}
