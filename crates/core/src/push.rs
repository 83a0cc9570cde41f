//! Push event decoding and notification click targets.
//!
//! Every push event yields exactly one notification descriptor. Payloads that
//! are absent, empty, or not a JSON object fall back to the configured default
//! title and body. Click targets come from the notification's stored data:
//! an explicit `url` wins, then the notification kind, then the site root.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Error;
use crate::config::NotificationConfig;

/// Navigation target when a notification carries nothing more specific.
pub const SITE_ROOT: &str = "/";

/// Auction identifier as sent by the backend (numeric or string).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum AuctionRef {
    Number(u64),
    Text(String),
}

impl fmt::Display for AuctionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuctionRef::Number(n) => write!(f, "{n}"),
            AuctionRef::Text(s) => f.write_str(s),
        }
    }
}

/// Decoded push payload. Consumed once to build a descriptor.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PushPayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default, rename = "auctionId")]
    pub auction_id: Option<AuctionRef>,
    /// Any other fields, carried through to the notification data untouched.
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl PushPayload {
    /// Decode raw push data.
    ///
    /// Absent or blank data is `Ok(None)`. Anything else must be a JSON object.
    pub fn decode(data: Option<&[u8]>) -> Result<Option<Self>, Error> {
        let Some(bytes) = data else {
            return Ok(None);
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        let value: Value = serde_json::from_slice(bytes).map_err(|e| Error::MalformedPushPayload(e.to_string()))?;
        if !value.is_object() {
            return Err(Error::MalformedPushPayload("payload is not a JSON object".into()));
        }

        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| Error::MalformedPushPayload(e.to_string()))
    }
}

/// Data stored on a displayed notification and returned on click.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NotificationData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, rename = "auctionId", skip_serializing_if = "Option::is_none")]
    pub auction_id: Option<AuctionRef>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Known notification kinds. Anything else maps to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    AuctionBid,
    AuctionEnding,
    AuctionWon,
    Payment,
    Unknown,
}

impl NotificationKind {
    pub fn parse(kind: Option<&str>) -> Self {
        match kind {
            Some("auction_bid") => NotificationKind::AuctionBid,
            Some("auction_ending") => NotificationKind::AuctionEnding,
            Some("auction_won") => NotificationKind::AuctionWon,
            Some("payment") => NotificationKind::Payment,
            _ => NotificationKind::Unknown,
        }
    }
}

impl NotificationData {
    /// Resolve where a click on this notification should navigate.
    pub fn target_url(&self) -> String {
        if let Some(url) = self.url.as_deref().filter(|u| !u.trim().is_empty()) {
            return url.to_string();
        }

        match (NotificationKind::parse(self.kind.as_deref()), &self.auction_id) {
            (NotificationKind::AuctionBid | NotificationKind::AuctionEnding, Some(id)) => {
                format!("/auction-detail.html?id={id}")
            }
            (NotificationKind::AuctionWon, _) => "/my-bids.html".into(),
            (NotificationKind::Payment, _) => "/payments.html".into(),
            _ => SITE_ROOT.into(),
        }
    }
}

/// Everything the host needs to display one notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NotificationDescriptor {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub data: NotificationData,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl NotificationDescriptor {
    /// Build a descriptor from decoded payload fields.
    pub fn from_payload(payload: PushPayload, defaults: &NotificationConfig) -> Self {
        Self {
            title: non_empty(payload.title).unwrap_or_else(|| defaults.title.clone()),
            body: non_empty(payload.body).unwrap_or_else(|| defaults.body.clone()),
            icon: defaults.icon.clone(),
            badge: defaults.badge.clone(),
            vibrate: defaults.vibrate.clone(),
            data: NotificationData {
                url: non_empty(payload.url),
                kind: payload.kind,
                auction_id: payload.auction_id,
                extra: payload.metadata,
            },
        }
    }

    /// Build a descriptor from raw push data, substituting the default on any
    /// decode failure.
    pub fn from_push(data: Option<&[u8]>, defaults: &NotificationConfig) -> Self {
        let payload = match PushPayload::decode(data) {
            Ok(payload) => payload.unwrap_or_default(),
            Err(err) => {
                tracing::warn!(error = %err, "push payload replaced by default notification");
                PushPayload::default()
            }
        };
        Self::from_payload(payload, defaults)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> NotificationConfig {
        NotificationConfig::default()
    }

    #[test]
    fn test_bid_placed_payload() {
        let raw = br#"{"title":"Bid placed","url":"/auction-detail.html?id=7"}"#;
        let descriptor = NotificationDescriptor::from_push(Some(&raw[..]), &defaults());
        assert_eq!(descriptor.title, "Bid placed");
        assert_eq!(descriptor.body, "You have a new notification");
        assert_eq!(descriptor.data.target_url(), "/auction-detail.html?id=7");
    }

    #[test]
    fn test_empty_payload_uses_default() {
        for raw in [None, Some(&b""[..]), Some(&b"  \n"[..])] {
            let descriptor = NotificationDescriptor::from_push(raw, &defaults());
            assert_eq!(descriptor.title, "ZUBID");
            assert_eq!(descriptor.body, "You have a new notification");
            assert_eq!(descriptor.icon, "/icons/icon-192x192.png");
            assert_eq!(descriptor.badge, "/icons/icon-72x72.png");
            assert_eq!(descriptor.data.target_url(), SITE_ROOT);
        }
    }

    #[test]
    fn test_malformed_payload_recovered() {
        assert!(matches!(PushPayload::decode(Some(&b"{not json"[..])), Err(Error::MalformedPushPayload(_))));
        assert!(matches!(PushPayload::decode(Some(&b"[1,2]"[..])), Err(Error::MalformedPushPayload(_))));

        let descriptor = NotificationDescriptor::from_push(Some(&b"{not json"[..]), &defaults());
        assert_eq!(descriptor.title, "ZUBID");
        assert_eq!(descriptor.data, NotificationData::default());
    }

    #[test]
    fn test_blank_title_falls_back() {
        let descriptor = NotificationDescriptor::from_push(Some(&br#"{"title":"","body":"Outbid!"}"#[..]), &defaults());
        assert_eq!(descriptor.title, "ZUBID");
        assert_eq!(descriptor.body, "Outbid!");
    }

    #[test]
    fn test_metadata_carried_through() {
        let raw = br#"{"type":"auction_bid","auctionId":42,"amount":"125.00"}"#;
        let descriptor = NotificationDescriptor::from_push(Some(&raw[..]), &defaults());
        assert_eq!(descriptor.data.kind.as_deref(), Some("auction_bid"));
        assert_eq!(descriptor.data.auction_id, Some(AuctionRef::Number(42)));
        assert_eq!(descriptor.data.extra.get("amount"), Some(&Value::from("125.00")));
    }

    #[test]
    fn test_kind_targets() {
        let data = |kind: &str, id: Option<AuctionRef>| NotificationData {
            kind: Some(kind.into()),
            auction_id: id,
            ..Default::default()
        };

        assert_eq!(data("auction_bid", Some(AuctionRef::Number(7))).target_url(), "/auction-detail.html?id=7");
        assert_eq!(
            data("auction_ending", Some(AuctionRef::Text("a-9".into()))).target_url(),
            "/auction-detail.html?id=a-9"
        );
        assert_eq!(data("auction_won", None).target_url(), "/my-bids.html");
        assert_eq!(data("payment", None).target_url(), "/payments.html");
        assert_eq!(data("newsletter", None).target_url(), SITE_ROOT);
        assert_eq!(data("auction_bid", None).target_url(), SITE_ROOT);
    }

    #[test]
    fn test_explicit_url_beats_kind() {
        let data = NotificationData {
            url: Some("/profile.html".into()),
            kind: Some("payment".into()),
            ..Default::default()
        };
        assert_eq!(data.target_url(), "/profile.html");
    }

    #[test]
    fn test_data_round_trips_through_json() {
        let raw = br#"{"type":"auction_ending","auctionId":"15","seller":"acme"}"#;
        let descriptor = NotificationDescriptor::from_push(Some(&raw[..]), &defaults());
        let stored = serde_json::to_value(&descriptor.data).unwrap();
        assert_eq!(stored["type"], "auction_ending");
        assert_eq!(stored["seller"], "acme");

        let restored: NotificationData = serde_json::from_value(stored).unwrap();
        assert_eq!(restored.target_url(), "/auction-detail.html?id=15");
    }
}
