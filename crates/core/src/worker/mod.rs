//! Worker event dispatch.
//!
//! A [`Worker`] owns the lifecycle state and routes each [`WorkerEvent`] to
//! its handler. Every handler returns an [`EventOutcome`]: the immediate
//! response plus the background work it started.
//!
//! Lifecycle phases advance `Parsed → Installing → Installed → Activating →
//! Activated`. A failed install returns to the phase it started from, so a
//! previously activated generation set keeps serving. Fetch events are not
//! intercepted until the first activation completes.

mod wait;

use std::sync::Arc;

use bytes::Bytes;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use url::Url;

use crate::Error;
use crate::cache::CacheDb;
use crate::config::{AppConfig, NotificationConfig};
use crate::engine::FetchEngine;
use crate::lifecycle::{self, ActivateReport, GenerationSet, InstallReport};
use crate::origin::Origin;
use crate::platform::Platform;
use crate::push::NotificationDescriptor;
use crate::request::{Request, Served};
use crate::router::{self, RouteTable, RoutingDecision};

pub use wait::WaitUntil;

/// Everything the worker needs from configuration.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub cache_prefix: String,
    pub version: String,
    pub manifest: Vec<Url>,
    pub routes: RouteTable,
    pub offline_document: String,
    pub notification: NotificationConfig,
}

impl WorkerSettings {
    /// Resolve settings from loaded configuration.
    ///
    /// # Errors
    ///
    /// `InvalidUrl` if the origin or a manifest path does not resolve.
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin_url)
            .map_err(|e| Error::InvalidUrl(format!("origin '{}': {e}", config.origin_url)))?;

        Ok(Self {
            cache_prefix: config.cache_prefix.clone(),
            version: config.version.clone(),
            manifest: lifecycle::resolve_manifest(&origin, &config.manifest)?,
            routes: RouteTable::from_config(config),
            offline_document: config.offline_document.clone(),
            notification: config.notification.clone(),
        })
    }

    /// Generation set for the configured version.
    pub fn generations(&self) -> GenerationSet {
        self.generations_for(&self.version)
    }

    pub fn generations_for(&self, version: &str) -> GenerationSet {
        GenerationSet::for_version(&self.cache_prefix, version)
    }
}

/// Where the worker is in its install/activate cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
}

#[derive(Debug)]
struct LifecycleState {
    phase: LifecyclePhase,
    /// Set produced by the last successful install, waiting for activation.
    pending: Option<GenerationSet>,
    /// Set serving fetches.
    active: Option<GenerationSet>,
}

/// Events delivered by the host.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// Pre-cache the manifest for `version`, or the configured version.
    Install { version: Option<String> },
    Activate,
    Fetch(Request),
    /// Raw push data, if any.
    Push(Option<Bytes>),
    /// A displayed notification was clicked.
    NotificationClick(NotificationDescriptor),
}

/// Immediate result of an event.
#[derive(Debug)]
pub enum EventResponse {
    Installed(InstallReport),
    Activated(ActivateReport),
    Fetched { decision: RoutingDecision, served: Served },
    /// The host should perform the request itself.
    NotIntercepted,
    Notified(NotificationDescriptor),
    /// Navigation target of a clicked notification.
    Navigated(String),
}

/// Response plus the background work it started.
#[derive(Debug)]
pub struct EventOutcome {
    pub response: EventResponse,
    pub wait_until: WaitUntil,
}

impl EventOutcome {
    fn now(response: EventResponse) -> Self {
        Self { response, wait_until: WaitUntil::new() }
    }
}

/// Single logical worker per session.
pub struct Worker {
    settings: WorkerSettings,
    engine: FetchEngine,
    platform: Arc<dyn Platform>,
    state: RwLock<LifecycleState>,
}

impl Worker {
    pub fn new(settings: WorkerSettings, store: CacheDb, origin: Arc<dyn Origin>, platform: Arc<dyn Platform>) -> Self {
        let engine = FetchEngine::new(store, origin, settings.offline_document.clone());
        Self {
            settings,
            engine,
            platform,
            state: RwLock::new(LifecycleState { phase: LifecyclePhase::Parsed, pending: None, active: None }),
        }
    }

    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    pub fn store(&self) -> &CacheDb {
        self.engine.store()
    }

    pub async fn phase(&self) -> LifecyclePhase {
        self.state.read().await.phase
    }

    pub async fn active_generations(&self) -> Option<GenerationSet> {
        self.state.read().await.active.clone()
    }

    /// Route an event to its handler.
    pub async fn dispatch(&self, event: WorkerEvent) -> Result<EventOutcome, Error> {
        match event {
            WorkerEvent::Install { version } => self.on_install(version).await,
            WorkerEvent::Activate => self.on_activate().await,
            WorkerEvent::Fetch(request) => self.on_fetch(request).await,
            WorkerEvent::Push(data) => Ok(self.on_push(data.as_deref())),
            WorkerEvent::NotificationClick(notification) => Ok(self.on_notification_click(notification)),
        }
    }

    async fn on_install(&self, version: Option<String>) -> Result<EventOutcome, Error> {
        let version = version.unwrap_or_else(|| self.settings.version.clone());
        if version.trim().is_empty() {
            return Err(Error::InvalidInput("version must not be empty".into()));
        }
        let generations = self.settings.generations_for(&version);

        let previous = {
            let mut state = self.state.write().await;
            if matches!(state.phase, LifecyclePhase::Installing | LifecyclePhase::Activating) {
                return Err(Error::Lifecycle(format!("cannot install while {:?}", state.phase)));
            }
            std::mem::replace(&mut state.phase, LifecyclePhase::Installing)
        };

        // The lock is released while fetching so fetches keep being served.
        let result = lifecycle::install(
            self.engine.store(),
            self.engine.origin(),
            &generations,
            &self.settings.manifest,
        )
        .await;

        let mut state = self.state.write().await;
        match result {
            Ok(report) => {
                tracing::info!(generation = %generations.static_id, cached = report.cached.len(), "install complete");
                state.phase = LifecyclePhase::Installed;
                state.pending = Some(generations);
                Ok(EventOutcome::now(EventResponse::Installed(report)))
            }
            Err(err) => {
                tracing::warn!(generation = %generations.static_id, error = %err, "install failed");
                state.phase = previous;
                Err(err)
            }
        }
    }

    async fn on_activate(&self) -> Result<EventOutcome, Error> {
        // Held through the delete pass: later fetches wait for the new set.
        let mut state = self.state.write().await;

        if state.phase != LifecyclePhase::Installed {
            return Err(Error::Lifecycle(format!("cannot activate while {:?}", state.phase)));
        }
        let Some(generations) = state.pending.clone() else {
            return Err(Error::Lifecycle("no installed generation set to activate".into()));
        };

        state.phase = LifecyclePhase::Activating;
        match lifecycle::activate(self.engine.store(), &generations).await {
            Ok(report) => {
                tracing::info!(
                    static_id = %generations.static_id,
                    dynamic_id = %generations.dynamic_id,
                    deleted = report.deleted.len(),
                    "activated"
                );
                state.phase = LifecyclePhase::Activated;
                state.pending = None;
                state.active = Some(generations);
                Ok(EventOutcome::now(EventResponse::Activated(report)))
            }
            Err(err) => {
                tracing::warn!(error = %err, "activation failed");
                state.phase = LifecyclePhase::Installed;
                Err(err)
            }
        }
    }

    async fn on_fetch(&self, request: Request) -> Result<EventOutcome, Error> {
        let Some(generations) = self.active_generations().await else {
            tracing::debug!(url = %request.url, "not activated, passing through");
            return Ok(EventOutcome::now(EventResponse::NotIntercepted));
        };

        let Some(decision) = router::classify(&request, &self.settings.routes) else {
            return Ok(EventOutcome::now(EventResponse::NotIntercepted));
        };

        let handled = self.engine.handle(&request, decision, &generations).await?;

        let mut wait_until = WaitUntil::new();
        if let Some(refresh) = handled.refresh {
            wait_until.push("cache_refresh", refresh);
        }

        Ok(EventOutcome { response: EventResponse::Fetched { decision, served: handled.served }, wait_until })
    }

    fn on_push(&self, data: Option<&[u8]>) -> EventOutcome {
        let notification = NotificationDescriptor::from_push(data, &self.settings.notification);

        let mut wait_until = WaitUntil::new();
        let platform = self.platform.clone();
        let shown = notification.clone();
        wait_until.spawn("show_notification", async move { platform.show_notification(&shown).await });

        EventOutcome { response: EventResponse::Notified(notification), wait_until }
    }

    fn on_notification_click(&self, notification: NotificationDescriptor) -> EventOutcome {
        let target = notification.data.target_url();
        tracing::debug!(target = %target, "notification clicked");

        let mut wait_until = WaitUntil::new();
        let platform = self.platform.clone();
        let url = target.clone();
        wait_until.spawn("open_window", async move {
            platform.close_notification(&notification).await?;
            platform.open_window(&url).await
        });

        EventOutcome { response: EventResponse::Navigated(target), wait_until }
    }
}
