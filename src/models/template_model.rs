use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::db::parse_timestamp;

/// Variables de render: nombre -> valor JSON (se stringifica al sustituir)
pub type TemplateVariables = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailTemplate {
    pub id: String,
    pub template_key: String,
    pub subject: String,
    pub html_content: String,
    pub text_content: Option<String>,
    pub variables: Vec<String>,
    pub language: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct EmailTemplateRow {
    pub id: String,
    pub template_key: String,
    pub subject: String,
    pub html_content: String,
    pub text_content: Option<String>,
    pub variables: String,
    pub language: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<EmailTemplateRow> for EmailTemplate {
    type Error = anyhow::Error;

    fn try_from(row: EmailTemplateRow) -> Result<Self> {
        Ok(EmailTemplate {
            variables: serde_json::from_str(&row.variables)
                .context("Invalid variables column in email_templates")?,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
            id: row.id,
            template_key: row.template_key,
            subject: row.subject,
            html_content: row.html_content,
            text_content: row.text_content,
            language: row.language,
            is_active: row.is_active,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTemplateRequest {
    pub template_key: String,
    pub subject: String,
    pub html_content: String,
    pub text_content: Option<String>,
    /// Si no viene, se deriva del contenido
    pub variables: Option<Vec<String>>,
    pub language: Option<String>,
    pub is_active: Option<bool>,
}

/// `Some(v)` si el campo vino en el JSON (aunque sea `null`), `None` si no vino
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTemplateRequest {
    pub subject: Option<String>,
    pub html_content: Option<String>,
    /// Ausente = sin cambios; `null` = borrar la versión de texto
    #[serde(default, deserialize_with = "present")]
    pub text_content: Option<Option<String>>,
    pub language: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderTemplateRequest {
    #[serde(default)]
    pub variables: TemplateVariables,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedTemplate {
    pub subject: String,
    pub html: String,
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateValidation {
    pub valid: bool,
    pub missing: Vec<String>,
}
