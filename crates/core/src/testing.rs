//! In-process test doubles for the origin and host platform.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::OwnedMutexGuard;

use crate::Error;
use crate::origin::Origin;
use crate::platform::Platform;
use crate::push::NotificationDescriptor;
use crate::request::{Request, Response};

/// Origin answering from a fixed URL → response table.
///
/// URLs without a scripted response fail as if the network were down.
#[derive(Default)]
pub(crate) struct ScriptedOrigin {
    responses: Mutex<HashMap<String, Response>>,
    calls: Mutex<Vec<String>>,
    gate: Arc<tokio::sync::Mutex<()>>,
}

impl ScriptedOrigin {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(self, url: &str, response: Response) -> Self {
        self.set(url, response);
        self
    }

    pub(crate) fn set(&self, url: &str, response: Response) {
        self.responses.lock().unwrap().insert(url.to_string(), response);
    }

    /// Take the origin offline.
    pub(crate) fn clear(&self) {
        self.responses.lock().unwrap().clear();
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Block every fetch until the returned guard is dropped.
    pub(crate) async fn hold(&self) -> OwnedMutexGuard<()> {
        self.gate.clone().lock_owned().await
    }
}

#[async_trait::async_trait]
impl Origin for ScriptedOrigin {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let url = request.url.to_string();
        self.calls.lock().unwrap().push(url.clone());

        let _open = self.gate.lock().await;

        self.responses
            .lock()
            .unwrap()
            .get(&url)
            .cloned()
            .ok_or_else(|| Error::NetworkUnavailable(format!("no route to {url}")))
    }
}

/// A call the worker made on the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PlatformCall {
    Show(String),
    Close(String),
    Open(String),
}

/// Platform that records every call.
#[derive(Default)]
pub(crate) struct RecordingPlatform {
    calls: Mutex<Vec<PlatformCall>>,
}

impl RecordingPlatform {
    pub(crate) fn calls(&self) -> Vec<PlatformCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Platform for RecordingPlatform {
    async fn show_notification(&self, notification: &NotificationDescriptor) -> Result<(), Error> {
        self.calls.lock().unwrap().push(PlatformCall::Show(notification.title.clone()));
        Ok(())
    }

    async fn close_notification(&self, notification: &NotificationDescriptor) -> Result<(), Error> {
        self.calls.lock().unwrap().push(PlatformCall::Close(notification.title.clone()));
        Ok(())
    }

    async fn open_window(&self, url: &str) -> Result<(), Error> {
        self.calls.lock().unwrap().push(PlatformCall::Open(url.to_string()));
        Ok(())
    }
}
