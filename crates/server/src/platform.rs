//! Host-side notification and navigation hooks.
//!
//! There is no display attached to a stdio host, so every call is logged and
//! recorded; tools drain the record and report it back to the client.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use zubid_sw_core::{Error, NotificationDescriptor, Platform};

/// A platform call made by the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlatformAction {
    ShowNotification { title: String, body: String },
    CloseNotification { title: String },
    OpenWindow { url: String },
}

#[derive(Debug, Default)]
pub struct HostPlatform {
    actions: Mutex<Vec<PlatformAction>>,
}

impl HostPlatform {
    /// Take every action recorded since the last drain.
    pub async fn drain(&self) -> Vec<PlatformAction> {
        std::mem::take(&mut *self.actions.lock().await)
    }

    async fn record(&self, action: PlatformAction) {
        self.actions.lock().await.push(action);
    }
}

#[async_trait::async_trait]
impl Platform for HostPlatform {
    async fn show_notification(&self, notification: &NotificationDescriptor) -> Result<(), Error> {
        tracing::info!(title = %notification.title, body = %notification.body, "show notification");
        self.record(PlatformAction::ShowNotification {
            title: notification.title.clone(),
            body: notification.body.clone(),
        })
        .await;
        Ok(())
    }

    async fn close_notification(&self, notification: &NotificationDescriptor) -> Result<(), Error> {
        tracing::debug!(title = %notification.title, "close notification");
        self.record(PlatformAction::CloseNotification { title: notification.title.clone() }).await;
        Ok(())
    }

    async fn open_window(&self, url: &str) -> Result<(), Error> {
        tracing::info!(url = %url, "open window");
        self.record(PlatformAction::OpenWindow { url: url.to_string() }).await;
        Ok(())
    }
}
