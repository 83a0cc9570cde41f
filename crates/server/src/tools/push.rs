//! worker_push / worker_notification_click tool implementations.
//!
//! Platform calls are awaited before returning so the output can list them.

use bytes::Bytes;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use zubid_sw_core::{Error, EventResponse, NotificationDescriptor, Worker, WorkerEvent};

use super::json_result;
use crate::platform::{HostPlatform, PlatformAction};

/// Parameters for the worker_push tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct WorkerPushParams {
    /// Raw push data, normally a JSON object such as
    /// `{"title": "...", "body": "...", "url": "...", "type": "..."}`.
    #[serde(default)]
    pub payload: Option<String>,
}

/// Output from the worker_push tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerPushOutput {
    /// Descriptor to hand back to worker_notification_click.
    pub notification: NotificationDescriptor,
    pub platform_calls: Vec<PlatformAction>,
}

/// Parameters for the worker_notification_click tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerNotificationClickParams {
    /// The clicked notification, as returned by worker_push.
    pub notification: NotificationDescriptor,
}

/// Output from the worker_notification_click tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerNotificationClickOutput {
    pub navigated_to: String,
    pub platform_calls: Vec<PlatformAction>,
}

/// Implementation of the worker_push tool.
pub async fn push_impl(
    worker: &Worker, platform: &HostPlatform, params: WorkerPushParams,
) -> Result<CallToolResult, McpError> {
    let outcome = worker.dispatch(WorkerEvent::Push(params.payload.map(Bytes::from))).await?;
    outcome.wait_until.settle().await?;

    let notification = match outcome.response {
        EventResponse::Notified(notification) => notification,
        other => return Err(Error::Lifecycle(format!("unexpected worker response: {other:?}")).into()),
    };

    json_result(&WorkerPushOutput { notification, platform_calls: platform.drain().await })
}

/// Implementation of the worker_notification_click tool.
pub async fn notification_click_impl(
    worker: &Worker, platform: &HostPlatform, params: WorkerNotificationClickParams,
) -> Result<CallToolResult, McpError> {
    let outcome = worker.dispatch(WorkerEvent::NotificationClick(params.notification)).await?;
    outcome.wait_until.settle().await?;

    let navigated_to = match outcome.response {
        EventResponse::Navigated(url) => url,
        other => return Err(Error::Lifecycle(format!("unexpected worker response: {other:?}")).into()),
    };

    json_result(&WorkerNotificationClickOutput { navigated_to, platform_calls: platform.drain().await })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{offline_worker, output};

    #[tokio::test]
    async fn test_push_then_click() {
        let (worker, platform) = offline_worker().await;

        let params = WorkerPushParams {
            payload: Some(r#"{"title":"Auction ending","type":"auction_ending","auctionId":12}"#.into()),
        };
        let result = push_impl(&worker, &platform, params).await.unwrap();
        let pushed = output(&result);
        assert_eq!(pushed["notification"]["title"], "Auction ending");
        assert_eq!(pushed["platform_calls"][0]["action"], "show_notification");

        let notification: NotificationDescriptor = serde_json::from_value(pushed["notification"].clone()).unwrap();
        let result = notification_click_impl(&worker, &platform, WorkerNotificationClickParams { notification })
            .await
            .unwrap();
        let clicked = output(&result);
        assert_eq!(clicked["navigated_to"], "/auction-detail.html?id=12");
        assert_eq!(clicked["platform_calls"][0]["action"], "close_notification");
        assert_eq!(clicked["platform_calls"][1]["url"], "/auction-detail.html?id=12");
    }

    #[tokio::test]
    async fn test_empty_push_uses_defaults() {
        let (worker, platform) = offline_worker().await;
        let result = push_impl(&worker, &platform, WorkerPushParams::default()).await.unwrap();
        let pushed = output(&result);
        assert_eq!(pushed["notification"]["title"], "ZUBID");
        assert_eq!(pushed["notification"]["body"], "You have a new notification");
        assert_eq!(pushed["notification"]["vibrate"], serde_json::json!([100, 50, 100]));
    }

    #[tokio::test]
    async fn test_malformed_push_still_shows() {
        let (worker, platform) = offline_worker().await;
        let params = WorkerPushParams { payload: Some("not json".into()) };
        let result = push_impl(&worker, &platform, params).await.unwrap();
        assert_eq!(output(&result)["platform_calls"][0]["title"], "ZUBID");
    }
}
