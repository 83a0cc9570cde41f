//! worker_fetch tool implementation.
//!
//! Hands a request to the worker as an intercepted fetch. Background
//! refreshes started for cache hits are either awaited before returning or
//! handed to the host to settle at shutdown.

use std::collections::BTreeMap;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use zubid_sw_core::{Error, EventResponse, Request, ResponseSource, RoutingDecision, WaitUntil, Worker, WorkerEvent};

use super::json_result;

/// Parameters for the worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchParams {
    /// Absolute URL of the request.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request headers, e.g. `{"Accept": "text/html"}`.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Wait for any background cache refresh before returning.
    #[serde(default)]
    pub wait_for_refresh: bool,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchOutput {
    /// False when the worker declined the request and the host must fetch it.
    pub intercepted: bool,
    pub decision: Option<RoutingDecision>,
    pub source: Option<ResponseSource>,
    pub status: Option<u16>,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8 (lossy).
    pub body: Option<String>,
    pub body_bytes: usize,
    /// Background tasks started by this request.
    pub background: Vec<String>,
}

impl WorkerFetchOutput {
    fn not_intercepted() -> Self {
        Self {
            intercepted: false,
            decision: None,
            source: None,
            status: None,
            content_type: None,
            headers: Vec::new(),
            body: None,
            body_bytes: 0,
            background: Vec::new(),
        }
    }
}

/// Hand work to the host, dropping whatever earlier calls left behind that
/// has already finished.
async fn keep_in_background(background: &Mutex<WaitUntil>, work: WaitUntil) {
    let mut pending = background.lock().await;
    let reaped = pending.reap();
    if reaped > 0 {
        tracing::debug!(reaped, remaining = pending.len(), "reaped finished background work");
    }
    pending.extend(work);
}

/// Implementation of the worker_fetch tool.
pub async fn fetch_impl(
    worker: &Worker, background: &Mutex<WaitUntil>, params: WorkerFetchParams,
) -> Result<CallToolResult, McpError> {
    let mut request = Request::new(&params.method, &params.url).map_err(Error::from)?;
    for (name, value) in &params.headers {
        request = request.with_header(name, value);
    }

    let outcome = worker.dispatch(WorkerEvent::Fetch(request)).await?;
    let labels: Vec<String> = outcome.wait_until.labels().into_iter().map(String::from).collect();

    if params.wait_for_refresh {
        outcome.wait_until.settle().await?;
    } else {
        keep_in_background(background, outcome.wait_until).await;
    }

    let output = match outcome.response {
        EventResponse::Fetched { decision, served } => {
            let response = served.response;
            WorkerFetchOutput {
                intercepted: true,
                decision: Some(decision),
                source: Some(served.source),
                status: Some(response.status),
                content_type: response.content_type().map(str::to_string),
                headers: response.headers.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
                body: Some(String::from_utf8_lossy(&response.body).into_owned()),
                body_bytes: response.body.len(),
                background: labels,
            }
        }
        EventResponse::NotIntercepted => WorkerFetchOutput::not_intercepted(),
        other => return Err(Error::Lifecycle(format!("unexpected worker response: {other:?}")).into()),
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{offline_worker, output};

    fn params(url: &str) -> WorkerFetchParams {
        WorkerFetchParams {
            url: url.into(),
            method: default_method(),
            headers: BTreeMap::new(),
            wait_for_refresh: false,
        }
    }

    #[test]
    fn test_params_defaults() {
        let params: WorkerFetchParams = serde_json::from_str(r#"{"url":"http://localhost/"}"#).unwrap();
        assert_eq!(params.method, "GET");
        assert!(params.headers.is_empty());
        assert!(!params.wait_for_refresh);
    }

    #[tokio::test]
    async fn test_fetch_before_activation() {
        let (worker, _) = offline_worker().await;
        let background = Mutex::new(WaitUntil::new());

        let result = fetch_impl(&worker, &background, params("http://127.0.0.1:1/index.html")).await.unwrap();
        let output = output(&result);
        assert_eq!(output["intercepted"], false);
        assert!(output["status"].is_null());
        assert!(background.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_background_work_stays_bounded() {
        let background = Mutex::new(WaitUntil::new());

        for _ in 0..100 {
            let mut hit = WaitUntil::new();
            hit.spawn("cache_refresh", async { Ok(()) });
            keep_in_background(&background, hit).await;
            assert!(background.lock().await.len() <= 1);

            tokio::time::timeout(std::time::Duration::from_secs(5), async {
                while !background.lock().await.is_finished() {
                    tokio::task::yield_now().await;
                }
            })
            .await
            .unwrap();
        }

        keep_in_background(&background, WaitUntil::new()).await;
        assert!(background.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_invalid_url() {
        let (worker, _) = offline_worker().await;
        let background = Mutex::new(WaitUntil::new());

        let err = fetch_impl(&worker, &background, params("not a url")).await.unwrap_err();
        assert_eq!(err.code.0, -32003);
    }
}
