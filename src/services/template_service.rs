//! services/template_service.rs
//! Render de `{{variable}}` y CRUD de plantillas guardadas.

use std::collections::HashSet;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde_json::Value;
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::{
    db::now_timestamp,
    errors::TemplateError,
    models::template_model::{
        CreateTemplateRequest, EmailTemplate, EmailTemplateRow, RenderedTemplate,
        TemplateValidation, TemplateVariables, UpdateTemplateRequest,
    },
};

const TEMPLATE_COLUMNS: &str = "id, template_key, subject, html_content, text_content, \
     variables, language, is_active, created_at, updated_at";

fn variable_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{\{([A-Za-z0-9_]+)\}\}").expect("static regex"))
}

fn stringify_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Sustituye cada `{{clave}}` por el valor de la variable.
///
/// En modo estricto una variable ausente es error; en modo permisivo se
/// renderiza como cadena vacía. El texto que no matchea queda intacto.
pub fn render_template(
    template: &str,
    variables: &TemplateVariables,
    strict: bool,
) -> Result<String, TemplateError> {
    let mut rendered = String::with_capacity(template.len());
    let mut last = 0;

    for caps in variable_pattern().captures_iter(template) {
        let (Some(token), Some(key)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        rendered.push_str(&template[last..token.start()]);

        match variables.get(key.as_str()) {
            Some(value) => rendered.push_str(&stringify_value(value)),
            None if strict => return Err(TemplateError::MissingVariable(key.as_str().to_string())),
            None => {}
        }
        last = token.end();
    }

    rendered.push_str(&template[last..]);
    Ok(rendered)
}

/// Nombres de variables referenciadas, sin duplicados (orden de primera aparición).
pub fn extract_template_variables(template: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    variable_pattern()
        .captures_iter(template)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

pub fn validate_template_variables(
    template: &str,
    variables: &TemplateVariables,
) -> TemplateValidation {
    let missing: Vec<String> = extract_template_variables(template)
        .into_iter()
        .filter(|name| !variables.contains_key(name))
        .collect();

    TemplateValidation {
        valid: missing.is_empty(),
        missing,
    }
}

/// Variables de subject + html + text, sin repetir
fn derive_variables(subject: &str, html: &str, text: Option<&str>) -> Vec<String> {
    let combined = format!("{subject}\n{html}\n{}", text.unwrap_or_default());
    extract_template_variables(&combined)
}

#[derive(Clone, Debug)]
pub struct TemplateService {
    db_pool: Pool<Sqlite>,
}

impl TemplateService {
    pub fn new(db_pool: Pool<Sqlite>) -> Self {
        TemplateService { db_pool }
    }

    pub async fn create_template(&self, req: CreateTemplateRequest) -> Result<EmailTemplate> {
        let key = req.template_key.trim().to_string();
        if key.is_empty() {
            return Err(TemplateError::Invalid("template_key is required".to_string()).into());
        }
        if self.find_template(&key).await?.is_some() {
            return Err(
                TemplateError::Invalid(format!("template_key '{key}' already exists")).into(),
            );
        }

        let id = Uuid::new_v4().to_string();
        let now = now_timestamp();
        let variables = req.variables.unwrap_or_else(|| {
            derive_variables(&req.subject, &req.html_content, req.text_content.as_deref())
        });
        let variables_json = serde_json::to_string(&variables)?;
        let language = req.language.unwrap_or_else(|| "en".to_string());
        let is_active = req.is_active.unwrap_or(true);

        sqlx::query(
            r#"
            INSERT INTO email_templates (
                id, template_key, subject, html_content, text_content,
                variables, language, is_active, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
            "#,
        )
        .bind(&id)
        .bind(&key)
        .bind(&req.subject)
        .bind(&req.html_content)
        .bind(&req.text_content)
        .bind(&variables_json)
        .bind(&language)
        .bind(is_active)
        .bind(&now)
        .execute(&self.db_pool)
        .await
        .context("Failed to insert email template")?;

        log::info!("(create_template) Template '{}' created with ID={}", key, id);
        self.get_template(&key).await
    }

    pub async fn find_template(&self, template_key: &str) -> Result<Option<EmailTemplate>> {
        let sql = format!("SELECT {TEMPLATE_COLUMNS} FROM email_templates WHERE template_key = ?1");
        let row = sqlx::query_as::<_, EmailTemplateRow>(&sql)
            .bind(template_key)
            .fetch_optional(&self.db_pool)
            .await
            .context("Failed to load email template")?;

        row.map(EmailTemplate::try_from).transpose()
    }

    pub async fn get_template(&self, template_key: &str) -> Result<EmailTemplate> {
        self.find_template(template_key)
            .await?
            .ok_or_else(|| TemplateError::NotFound(template_key.to_string()).into())
    }

    pub async fn list_templates(&self, active_only: bool) -> Result<Vec<EmailTemplate>> {
        let filter = if active_only { "WHERE is_active = 1" } else { "" };
        let sql = format!("SELECT {TEMPLATE_COLUMNS} FROM email_templates {filter} ORDER BY template_key");

        let rows = sqlx::query_as::<_, EmailTemplateRow>(&sql)
            .fetch_all(&self.db_pool)
            .await
            .context("Failed to list email templates")?;

        rows.into_iter().map(EmailTemplate::try_from).collect()
    }

    /// Edita contenido; las variables se vuelven a derivar del contenido final.
    pub async fn update_template(
        &self,
        template_key: &str,
        changes: UpdateTemplateRequest,
    ) -> Result<EmailTemplate> {
        let current = self.get_template(template_key).await?;

        let subject = changes.subject.unwrap_or(current.subject);
        let html_content = changes.html_content.unwrap_or(current.html_content);
        let text_content = changes.text_content.unwrap_or(current.text_content);
        let language = changes.language.unwrap_or(current.language);
        let is_active = changes.is_active.unwrap_or(current.is_active);
        let variables = derive_variables(&subject, &html_content, text_content.as_deref());

        sqlx::query(
            r#"
            UPDATE email_templates
            SET subject = ?2,
                html_content = ?3,
                text_content = ?4,
                variables = ?5,
                language = ?6,
                is_active = ?7,
                updated_at = ?8
            WHERE template_key = ?1
            "#,
        )
        .bind(template_key)
        .bind(&subject)
        .bind(&html_content)
        .bind(&text_content)
        .bind(serde_json::to_string(&variables)?)
        .bind(&language)
        .bind(is_active)
        .bind(now_timestamp())
        .execute(&self.db_pool)
        .await
        .context("Failed to update email template")?;

        self.get_template(template_key).await
    }

    pub async fn delete_template(&self, template_key: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM email_templates WHERE template_key = ?1")
            .bind(template_key)
            .execute(&self.db_pool)
            .await
            .context("Failed to delete email template")?;

        if result.rows_affected() == 0 {
            return Err(TemplateError::NotFound(template_key.to_string()).into());
        }
        Ok(())
    }

    /// Valida primero y después renderiza en modo estricto.
    pub async fn render_stored_template(
        &self,
        template_key: &str,
        variables: &TemplateVariables,
    ) -> Result<RenderedTemplate> {
        let template = self.get_template(template_key).await?;
        render_email_template(&template, variables)
    }
}

pub fn render_email_template(
    template: &EmailTemplate,
    variables: &TemplateVariables,
) -> Result<RenderedTemplate> {
    let combined = format!(
        "{}\n{}\n{}",
        template.subject,
        template.html_content,
        template.text_content.as_deref().unwrap_or_default()
    );
    let validation = validate_template_variables(&combined, variables);
    if !validation.valid {
        return Err(TemplateError::MissingVariables(validation.missing).into());
    }

    Ok(RenderedTemplate {
        subject: render_template(&template.subject, variables, true)?,
        html: render_template(&template.html_content, variables, true)?,
        text: template
            .text_content
            .as_deref()
            .map(|text| render_template(text, variables, true))
            .transpose()?,
    })
}
