//! Host primitives for notifications and navigation.

use crate::Error;
use crate::push::NotificationDescriptor;

/// User-visible side effects the worker asks its host to perform.
#[async_trait::async_trait]
pub trait Platform: Send + Sync {
    /// Display a notification. Completes once the host has shown it.
    async fn show_notification(&self, notification: &NotificationDescriptor) -> Result<(), Error>;

    /// Dismiss a previously displayed notification.
    async fn close_notification(&self, notification: &NotificationDescriptor) -> Result<(), Error>;

    /// Hand navigation off to a window showing `url`.
    async fn open_window(&self, url: &str) -> Result<(), Error>;
}
