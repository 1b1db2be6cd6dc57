use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{parse_optional_json, parse_optional_timestamp, parse_timestamp};
use crate::models::template_model::TemplateVariables;

/// draft -> sending -> sent; draft|sending -> cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Draft,
    Sending,
    Sent,
    Cancelled,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Draft => "draft",
            CampaignStatus::Sending => "sending",
            CampaignStatus::Sent => "sent",
            CampaignStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CampaignStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "draft" => Ok(CampaignStatus::Draft),
            "sending" => Ok(CampaignStatus::Sending),
            "sent" => Ok(CampaignStatus::Sent),
            "cancelled" => Ok(CampaignStatus::Cancelled),
            other => Err(anyhow!("Unknown campaign status '{other}'")),
        }
    }
}

/// Destinatario: email, nombre opcional y cualquier campo extra para el template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    pub email: String,
    /// Cualquier valor JSON, igual que el resto de campos del destinatario
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<serde_json::Value>,
    #[serde(flatten)]
    pub fields: TemplateVariables,
}

impl Recipient {
    /// Los propios campos del destinatario son el set de variables
    pub fn template_variables(&self) -> TemplateVariables {
        let mut vars = self.fields.clone();
        vars.insert(
            "email".to_string(),
            serde_json::Value::String(self.email.clone()),
        );
        if let Some(name) = &self.name {
            vars.insert("name".to_string(), name.clone());
        }
        vars
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EmailCampaign {
    pub id: String,
    pub campaign_name: String,
    pub subject_line: String,
    /// Template literal (no FK)
    pub email_template: Option<String>,
    /// Alternativa: clave de un EmailTemplate guardado
    pub template_key: Option<String>,
    pub from_name: Option<String>,
    pub from_email: Option<String>,
    pub reply_to: Option<String>,
    pub recipient_list: Vec<Recipient>,
    pub segment_criteria: Option<serde_json::Value>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub status: CampaignStatus,
    pub total_recipients: i64,
    pub sent_count: i64,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct EmailCampaignRow {
    pub id: String,
    pub campaign_name: String,
    pub subject_line: String,
    pub email_template: Option<String>,
    pub template_key: Option<String>,
    pub from_name: Option<String>,
    pub from_email: Option<String>,
    pub reply_to: Option<String>,
    pub recipient_list: String,
    pub segment_criteria: Option<String>,
    pub scheduled_for: Option<String>,
    pub status: String,
    pub total_recipients: i64,
    pub sent_count: i64,
    pub sent_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<EmailCampaignRow> for EmailCampaign {
    type Error = anyhow::Error;

    fn try_from(row: EmailCampaignRow) -> Result<Self> {
        Ok(EmailCampaign {
            recipient_list: serde_json::from_str(&row.recipient_list)
                .context("Invalid recipient_list column in email_campaigns")?,
            segment_criteria: parse_optional_json(row.segment_criteria)?,
            scheduled_for: parse_optional_timestamp(row.scheduled_for)?,
            status: row.status.parse()?,
            sent_at: parse_optional_timestamp(row.sent_at)?,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
            id: row.id,
            campaign_name: row.campaign_name,
            subject_line: row.subject_line,
            email_template: row.email_template,
            template_key: row.template_key,
            from_name: row.from_name,
            from_email: row.from_email,
            reply_to: row.reply_to,
            total_recipients: row.total_recipients,
            sent_count: row.sent_count,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCampaignRequest {
    pub campaign_name: String,
    pub subject_line: String,
    pub email_template: Option<String>,
    pub template_key: Option<String>,
    pub from_name: Option<String>,
    pub from_email: Option<String>,
    pub reply_to: Option<String>,
    #[serde(default)]
    pub recipient_list: Vec<Recipient>,
    pub segment_criteria: Option<serde_json::Value>,
    pub scheduled_for: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRecipientsRequest {
    pub recipient_list: Vec<Recipient>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CampaignSendResult {
    /// Solo refleja el batch del procesador; errores de encolado van en `errors`
    pub success: bool,
    pub campaign_id: String,
    pub queued_count: usize,
    pub sent_count: usize,
    pub failed_count: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CampaignMetrics {
    pub campaign_id: String,
    pub sent: i64,
    pub delivered: i64,
    pub opened: i64,
    pub clicked: i64,
    pub bounced: i64,
    pub unsubscribed: i64,
    pub complained: i64,
    pub delivery_rate: f64,
    pub open_rate: f64,
    pub click_rate: f64,
    pub click_to_open_rate: f64,
    pub bounce_rate: f64,
    pub unsubscribe_rate: f64,
}

/// Para listar campañas con paginación
#[derive(Debug, Clone, Serialize)]
pub struct ListCampaignsResponse {
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub items: Vec<EmailCampaign>,
}
