use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{parse_optional_json, parse_timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingEventType {
    Sent,
    Delivered,
    Opened,
    Clicked,
    Bounced,
    Unsubscribed,
    Complained,
}

impl TrackingEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingEventType::Sent => "sent",
            TrackingEventType::Delivered => "delivered",
            TrackingEventType::Opened => "opened",
            TrackingEventType::Clicked => "clicked",
            TrackingEventType::Bounced => "bounced",
            TrackingEventType::Unsubscribed => "unsubscribed",
            TrackingEventType::Complained => "complained",
        }
    }

    /// Tipos de webhook de Resend ("email.delivered", ...)
    pub fn from_provider_event(kind: &str) -> Option<Self> {
        match kind {
            "email.sent" => Some(TrackingEventType::Sent),
            "email.delivered" => Some(TrackingEventType::Delivered),
            "email.opened" => Some(TrackingEventType::Opened),
            "email.clicked" => Some(TrackingEventType::Clicked),
            "email.bounced" => Some(TrackingEventType::Bounced),
            "email.complained" => Some(TrackingEventType::Complained),
            _ => None,
        }
    }
}

impl fmt::Display for TrackingEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrackingEventType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sent" => Ok(TrackingEventType::Sent),
            "delivered" => Ok(TrackingEventType::Delivered),
            "opened" => Ok(TrackingEventType::Opened),
            "clicked" => Ok(TrackingEventType::Clicked),
            "bounced" => Ok(TrackingEventType::Bounced),
            "unsubscribed" => Ok(TrackingEventType::Unsubscribed),
            "complained" => Ok(TrackingEventType::Complained),
            other => Err(anyhow!("Unknown tracking event type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EmailTrackingEvent {
    pub id: String,
    pub campaign_id: Option<String>,
    pub recipient_email: String,
    pub event_type: TrackingEventType,
    pub event_data: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct EmailTrackingRow {
    pub id: String,
    pub campaign_id: Option<String>,
    pub recipient_email: String,
    pub event_type: String,
    pub event_data: Option<String>,
    pub created_at: String,
}

impl TryFrom<EmailTrackingRow> for EmailTrackingEvent {
    type Error = anyhow::Error;

    fn try_from(row: EmailTrackingRow) -> Result<Self> {
        Ok(EmailTrackingEvent {
            event_type: row.event_type.parse()?,
            event_data: parse_optional_json(row.event_data)?,
            created_at: parse_timestamp(&row.created_at)?,
            id: row.id,
            campaign_id: row.campaign_id,
            recipient_email: row.recipient_email,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordTrackingEventRequest {
    pub campaign_id: Option<String>,
    pub recipient_email: String,
    pub event_type: TrackingEventType,
    pub event_data: Option<serde_json::Value>,
}

/// Webhook de Resend: `{ "type": "email.delivered", "created_at": ..., "data": {...} }`
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderWebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub created_at: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl ProviderWebhookEvent {
    pub fn recipients(&self) -> Vec<String> {
        match self.data.get("to") {
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Some(serde_json::Value::String(single)) => vec![single.clone()],
            _ => Vec::new(),
        }
    }

    /// Los tags pueden venir como objeto `{campaign_id: ..}` o como lista `[{name, value}]`
    pub fn campaign_id(&self) -> Option<String> {
        match self.data.get("tags")? {
            serde_json::Value::Object(map) => {
                map.get("campaign_id").and_then(|v| v.as_str()).map(str::to_string)
            }
            serde_json::Value::Array(items) => items.iter().find_map(|tag| {
                if tag.get("name").and_then(|n| n.as_str()) == Some("campaign_id") {
                    tag.get("value").and_then(|v| v.as_str()).map(str::to_string)
                } else {
                    None
                }
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WebhookIngestResponse {
    pub success: bool,
    pub recorded: usize,
    pub ignored: bool,
}
