use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{parse_optional_json, parse_optional_timestamp, parse_timestamp};

/// Prioridad por defecto (menor número = más prioridad)
pub const DEFAULT_PRIORITY: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Pending,
    Sent,
    Failed,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Pending => "pending",
            QueueStatus::Sent => "sent",
            QueueStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueueStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(QueueStatus::Pending),
            "sent" => Ok(QueueStatus::Sent),
            "failed" => Ok(QueueStatus::Failed),
            other => Err(anyhow!("Unknown queue status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EmailQueueItem {
    pub id: String,
    pub recipient_email: String,
    pub template_id: Option<String>,
    pub subject: String,
    pub html_content: String,
    pub text_content: Option<String>,
    pub status: QueueStatus,
    pub priority: i64,
    pub metadata: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub provider_message_id: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EmailQueueItem {
    /// campaign_id guardado en metadata, si lo hay
    pub fn campaign_id(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("campaign_id"))
            .and_then(|v| v.as_str())
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct EmailQueueRow {
    pub id: String,
    pub recipient_email: String,
    pub template_id: Option<String>,
    pub subject: String,
    pub html_content: String,
    pub text_content: Option<String>,
    pub status: String,
    pub priority: i64,
    pub metadata: Option<String>,
    pub error_message: Option<String>,
    pub provider_message_id: Option<String>,
    pub sent_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<EmailQueueRow> for EmailQueueItem {
    type Error = anyhow::Error;

    fn try_from(row: EmailQueueRow) -> Result<Self> {
        Ok(EmailQueueItem {
            status: row.status.parse()?,
            metadata: parse_optional_json(row.metadata)?,
            sent_at: parse_optional_timestamp(row.sent_at)?,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
            id: row.id,
            recipient_email: row.recipient_email,
            template_id: row.template_id,
            subject: row.subject,
            html_content: row.html_content,
            text_content: row.text_content,
            priority: row.priority,
            error_message: row.error_message,
            provider_message_id: row.provider_message_id,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueEmailRequest {
    pub recipient_email: String,
    pub template_id: Option<String>,
    pub subject: String,
    pub html_content: String,
    pub text_content: Option<String>,
    pub priority: Option<i64>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueItemError {
    pub queue_id: String,
    pub recipient_email: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessQueueResult {
    pub success: bool,
    pub processed: usize,
    pub sent: usize,
    pub failed: usize,
    pub errors: Vec<QueueItemError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListQueueResponse {
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub items: Vec<EmailQueueItem>,
}
