//! Worker configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (ZUBID_SW_*)
//! 2. TOML config file (if ZUBID_SW_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Worker configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (ZUBID_SW_*)
/// 2. TOML config file (if ZUBID_SW_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite cache database.
    ///
    /// Set via ZUBID_SW_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin the worker fronts; manifest paths resolve against it.
    ///
    /// Set via ZUBID_SW_ORIGIN_URL environment variable.
    #[serde(default = "default_origin_url")]
    pub origin_url: String,

    /// Prefix for generation ids (`{prefix}-static-{version}`).
    ///
    /// Set via ZUBID_SW_CACHE_PREFIX environment variable. May be empty.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Deployed version tag embedded in generation ids.
    ///
    /// Set via ZUBID_SW_VERSION environment variable.
    #[serde(default = "default_version")]
    pub version: String,

    /// Paths pre-cached into the static generation at install.
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,

    /// Cached document served to HTML requests when offline.
    ///
    /// Set via ZUBID_SW_OFFLINE_DOCUMENT environment variable.
    #[serde(default = "default_offline_document")]
    pub offline_document: String,

    /// Path prefixes that always go to the network (live auction data).
    #[serde(default = "default_api_prefixes")]
    pub api_prefixes: Vec<String>,

    /// Path prefixes for uploaded media, never cached.
    #[serde(default = "default_media_prefixes")]
    pub media_prefixes: Vec<String>,

    /// Path prefixes served network-first with cache fallback.
    #[serde(default)]
    pub network_first_prefixes: Vec<String>,

    /// Maximum body bytes a single generation may hold.
    ///
    /// Set via ZUBID_SW_MAX_GENERATION_BYTES environment variable.
    #[serde(default = "default_max_generation_bytes")]
    pub max_generation_bytes: u64,

    /// User-Agent string for origin requests.
    ///
    /// Set via ZUBID_SW_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Origin request timeout in milliseconds.
    ///
    /// Set via ZUBID_SW_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Notification defaults used by the push bridge.
    #[serde(default)]
    pub notification: NotificationConfig,
}

/// Fixed values for notifications built from push events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Title used when the payload has none.
    #[serde(default = "default_notification_title")]
    pub title: String,

    /// Body used when the payload has none.
    #[serde(default = "default_notification_body")]
    pub body: String,

    #[serde(default = "default_notification_icon")]
    pub icon: String,

    #[serde(default = "default_notification_badge")]
    pub badge: String,

    /// Vibration pattern in milliseconds.
    #[serde(default = "default_vibrate")]
    pub vibrate: Vec<u32>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./zubid-sw-cache.sqlite")
}

fn default_origin_url() -> String {
    "http://localhost:8080".into()
}

fn default_cache_prefix() -> String {
    "zubid".into()
}

fn default_version() -> String {
    "v1".into()
}

fn default_manifest() -> Vec<String> {
    [
        "/",
        "/index.html",
        "/auctions.html",
        "/my-bids.html",
        "/payments.html",
        "/profile.html",
        "/styles.css",
        "/app.js",
        "/api.js",
        "/auctions.js",
        "/payments.js",
        "/manifest.json",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_offline_document() -> String {
    "/index.html".into()
}

fn default_api_prefixes() -> Vec<String> {
    vec!["/api/".into()]
}

fn default_media_prefixes() -> Vec<String> {
    vec!["/uploads/".into()]
}

fn default_max_generation_bytes() -> u64 {
    52_428_800 // 50MB
}

fn default_user_agent() -> String {
    "zubid-sw/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_notification_title() -> String {
    "ZUBID".into()
}

fn default_notification_body() -> String {
    "You have a new notification".into()
}

fn default_notification_icon() -> String {
    "/icons/icon-192x192.png".into()
}

fn default_notification_badge() -> String {
    "/icons/icon-72x72.png".into()
}

fn default_vibrate() -> Vec<u32> {
    vec![100, 50, 100]
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            title: default_notification_title(),
            body: default_notification_body(),
            icon: default_notification_icon(),
            badge: default_notification_badge(),
            vibrate: default_vibrate(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin_url: default_origin_url(),
            cache_prefix: default_cache_prefix(),
            version: default_version(),
            manifest: default_manifest(),
            offline_document: default_offline_document(),
            api_prefixes: default_api_prefixes(),
            media_prefixes: default_media_prefixes(),
            network_first_prefixes: Vec::new(),
            max_generation_bytes: default_max_generation_bytes(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            notification: NotificationConfig::default(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `ZUBID_SW_`
    /// 2. TOML file from `ZUBID_SW_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file or environment cannot be parsed, or
    /// validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("ZUBID_SW_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("ZUBID_SW_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
