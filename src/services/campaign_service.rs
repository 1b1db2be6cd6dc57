//! services/campaign_service.rs
//! Campañas: alta, destinatarios, envío (render por destinatario -> cola ->
//! procesador) y métricas de engagement a partir del tracking.

use anyhow::{Context, Result};
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::{
    db::{format_timestamp, now_timestamp, page_window},
    errors::CampaignError,
    models::{
        campaign_model::{
            CampaignMetrics, CampaignSendResult, CampaignStatus, CreateCampaignRequest,
            EmailCampaign, EmailCampaignRow, ListCampaignsResponse, Recipient,
        },
        queue_model::QueueEmailRequest,
        tracking_model::TrackingEventType,
    },
    services::{
        email_queue_service::EmailQueueService,
        template_service::{render_template, TemplateService},
        tracking_service::TrackingService,
    },
};

const CAMPAIGN_COLUMNS: &str = "id, campaign_name, subject_line, email_template, template_key, \
     from_name, from_email, reply_to, recipient_list, segment_criteria, scheduled_for, status, \
     total_recipients, sent_count, sent_at, created_at, updated_at";

/// Cociente con denominador cero = 0
fn ratio(numerator: i64, denominator: i64) -> f64 {
    if denominator <= 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Contenido ya resuelto (literal o plantilla guardada) para renderizar por destinatario
struct CampaignContent {
    template_id: Option<String>,
    subject: String,
    html: String,
    text: Option<String>,
}

#[derive(Clone)]
pub struct CampaignService {
    db_pool: Pool<Sqlite>,
    queue_service: EmailQueueService,
    template_service: TemplateService,
    tracking_service: TrackingService,
    strict_rendering: bool,
}

impl CampaignService {
    pub fn new(
        db_pool: Pool<Sqlite>,
        queue_service: EmailQueueService,
        template_service: TemplateService,
        tracking_service: TrackingService,
        strict_rendering: bool,
    ) -> Self {
        Self {
            db_pool,
            queue_service,
            template_service,
            tracking_service,
            strict_rendering,
        }
    }

    /// Crea la campaña en "draft"; total_recipients sale del largo de la lista
    pub async fn create_campaign(&self, req: CreateCampaignRequest) -> Result<EmailCampaign> {
        let has_literal = req
            .email_template
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty());
        if !has_literal && req.template_key.is_none() {
            return Err(CampaignError::MissingTemplate.into());
        }

        let id = Uuid::new_v4().to_string();
        let now = now_timestamp();
        let recipients_json = serde_json::to_string(&req.recipient_list)?;
        let segment_json = req
            .segment_criteria
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let scheduled_for = req.scheduled_for.as_ref().map(format_timestamp);

        sqlx::query(
            r#"
            INSERT INTO email_campaigns (
                id, campaign_name, subject_line, email_template, template_key,
                from_name, from_email, reply_to, recipient_list, segment_criteria,
                scheduled_for, status, total_recipients, sent_count, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 'draft', ?12, 0, ?13, ?13)
            "#,
        )
        .bind(&id)
        .bind(&req.campaign_name)
        .bind(&req.subject_line)
        .bind(&req.email_template)
        .bind(&req.template_key)
        .bind(&req.from_name)
        .bind(&req.from_email)
        .bind(&req.reply_to)
        .bind(&recipients_json)
        .bind(segment_json)
        .bind(scheduled_for)
        .bind(req.recipient_list.len() as i64)
        .bind(&now)
        .execute(&self.db_pool)
        .await
        .context("Failed to insert email campaign")?;

        log::info!(
            "(create_campaign) Campaign '{}' created with ID={} ({} recipients)",
            req.campaign_name,
            id,
            req.recipient_list.len()
        );
        self.get_campaign(&id).await
    }

    pub async fn get_campaign(&self, campaign_id: &str) -> Result<EmailCampaign> {
        let sql = format!("SELECT {CAMPAIGN_COLUMNS} FROM email_campaigns WHERE id = ?1");
        let row = sqlx::query_as::<_, EmailCampaignRow>(&sql)
            .bind(campaign_id)
            .fetch_optional(&self.db_pool)
            .await
            .context("Failed to load email campaign")?
            .ok_or_else(|| CampaignError::NotFound(campaign_id.to_string()))?;

        EmailCampaign::try_from(row)
    }

    /// Lista campañas con paginación
    pub async fn list_campaigns(&self, page: u64, page_size: u64) -> Result<ListCampaignsResponse> {
        let (page, page_size, offset) = page_window(page, page_size);

        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM email_campaigns")
            .fetch_one(&self.db_pool)
            .await?;

        let sql = format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM email_campaigns \
             ORDER BY created_at DESC LIMIT ?1 OFFSET ?2"
        );
        let rows = sqlx::query_as::<_, EmailCampaignRow>(&sql)
            .bind(page_size as i64)
            .bind(offset)
            .fetch_all(&self.db_pool)
            .await?;

        Ok(ListCampaignsResponse {
            total: total as u64,
            page,
            page_size,
            items: rows
                .into_iter()
                .map(EmailCampaign::try_from)
                .collect::<Result<_>>()?,
        })
    }

    /// Reemplaza la lista y recalcula total_recipients en el mismo UPDATE
    pub async fn update_recipients(
        &self,
        campaign_id: &str,
        recipients: Vec<Recipient>,
    ) -> Result<EmailCampaign> {
        let campaign = self.get_campaign(campaign_id).await?;
        ensure_not_terminal(campaign.status)?;

        let result = sqlx::query(
            r#"
            UPDATE email_campaigns
            SET recipient_list = ?2,
                total_recipients = ?3,
                updated_at = ?4
            WHERE id = ?1 AND status NOT IN ('sent', 'cancelled')
            "#,
        )
        .bind(campaign_id)
        .bind(serde_json::to_string(&recipients)?)
        .bind(recipients.len() as i64)
        .bind(now_timestamp())
        .execute(&self.db_pool)
        .await
        .context("Failed to update campaign recipients")?;

        if result.rows_affected() == 0 {
            return Err(self.terminal_error(campaign_id).await);
        }
        self.get_campaign(campaign_id).await
    }

    /// draft|sending -> cancelled
    pub async fn cancel_campaign(&self, campaign_id: &str) -> Result<EmailCampaign> {
        let campaign = self.get_campaign(campaign_id).await?;
        ensure_not_terminal(campaign.status)?;

        self.transition(campaign_id, CampaignStatus::Cancelled).await?;
        log::info!("(cancel_campaign) Campaign {} cancelled", campaign_id);
        self.get_campaign(campaign_id).await
    }

    /// Envía la campaña: cada destinatario se renderiza y encola por separado;
    /// luego se procesa exactamente lo encolado.
    pub async fn send_campaign(&self, campaign_id: &str) -> Result<CampaignSendResult> {
        // 1) Cargar y validar estado
        let campaign = self.get_campaign(campaign_id).await?;
        ensure_not_terminal(campaign.status)?;
        let content = self.resolve_content(&campaign).await?;

        // 2) -> sending (no se revierte si algo falla después)
        self.transition(campaign_id, CampaignStatus::Sending).await?;
        log::info!(
            "(send_campaign) Campaign {} -> sending ({} recipients)",
            campaign_id,
            campaign.recipient_list.len()
        );

        // 3) + 4) Render y encolado por destinatario
        let mut errors = Vec::new();
        let mut queued_count = 0usize;
        for recipient in &campaign.recipient_list {
            match self.queue_for_recipient(&campaign, &content, recipient).await {
                Ok(_) => queued_count += 1,
                Err(e) => {
                    log::error!(
                        "(send_campaign) Could not queue {} for campaign {}: {:#}",
                        recipient.email,
                        campaign_id,
                        e
                    );
                    errors.push(format!("{}: {:#}", recipient.email, e));
                }
            }
        }

        // 5) Procesar exactamente lo encolado
        let batch = self.queue_service.process_queue(queued_count as i64).await?;
        errors.extend(
            batch
                .errors
                .iter()
                .map(|e| format!("{}: {}", e.recipient_email, e.error)),
        );

        // 6) -> sent, aunque haya fallos parciales
        let now = now_timestamp();
        sqlx::query(
            r#"
            UPDATE email_campaigns
            SET status = 'sent',
                sent_at = ?2,
                sent_count = ?3,
                updated_at = ?2
            WHERE id = ?1
            "#,
        )
        .bind(campaign_id)
        .bind(&now)
        .bind(batch.sent as i64)
        .execute(&self.db_pool)
        .await
        .context("Failed to mark campaign as sent")?;

        log::info!(
            "(send_campaign) Campaign {} sent: queued={}, sent={}, failed={}",
            campaign_id,
            queued_count,
            batch.sent,
            batch.failed
        );

        // 7) success = solo el flag del batch
        Ok(CampaignSendResult {
            success: batch.success,
            campaign_id: campaign_id.to_string(),
            queued_count,
            sent_count: batch.sent,
            failed_count: batch.failed,
            errors,
        })
    }

    pub async fn get_metrics(&self, campaign_id: &str) -> Result<CampaignMetrics> {
        // Que la campaña exista
        self.get_campaign(campaign_id).await?;

        let counts = self.tracking_service.count_by_type(campaign_id).await?;
        let count = |kind: TrackingEventType| counts.get(&kind).copied().unwrap_or(0);

        let sent = count(TrackingEventType::Sent);
        let delivered = count(TrackingEventType::Delivered);
        let opened = count(TrackingEventType::Opened);
        let clicked = count(TrackingEventType::Clicked);
        let bounced = count(TrackingEventType::Bounced);
        let unsubscribed = count(TrackingEventType::Unsubscribed);
        let complained = count(TrackingEventType::Complained);

        Ok(CampaignMetrics {
            campaign_id: campaign_id.to_string(),
            sent,
            delivered,
            opened,
            clicked,
            bounced,
            unsubscribed,
            complained,
            delivery_rate: ratio(delivered, sent),
            open_rate: ratio(opened, delivered),
            click_rate: ratio(clicked, delivered),
            click_to_open_rate: ratio(clicked, opened),
            bounce_rate: ratio(bounced, sent),
            unsubscribe_rate: ratio(unsubscribed, delivered),
        })
    }

    async fn resolve_content(&self, campaign: &EmailCampaign) -> Result<CampaignContent> {
        match &campaign.template_key {
            Some(key) => {
                let template = self.template_service.get_template(key).await?;
                let subject = if campaign.subject_line.trim().is_empty() {
                    template.subject
                } else {
                    campaign.subject_line.clone()
                };
                Ok(CampaignContent {
                    template_id: Some(template.id),
                    subject,
                    html: template.html_content,
                    text: template.text_content,
                })
            }
            None => Ok(CampaignContent {
                template_id: None,
                subject: campaign.subject_line.clone(),
                html: campaign
                    .email_template
                    .clone()
                    .ok_or(CampaignError::MissingTemplate)?,
                text: None,
            }),
        }
    }

    async fn queue_for_recipient(
        &self,
        campaign: &EmailCampaign,
        content: &CampaignContent,
        recipient: &Recipient,
    ) -> Result<String> {
        let vars = recipient.template_variables();
        let strict = self.strict_rendering;

        let subject = render_template(&content.subject, &vars, strict)?;
        let html = render_template(&content.html, &vars, strict)?;
        let text = content
            .text
            .as_deref()
            .map(|t| render_template(t, &vars, strict))
            .transpose()?;

        self.queue_service
            .queue_email(QueueEmailRequest {
                recipient_email: recipient.email.clone(),
                template_id: content.template_id.clone(),
                subject,
                html_content: html,
                text_content: text,
                priority: None,
                metadata: Some(serde_json::json!({
                    "campaign_id": campaign.id,
                    "campaign_name": campaign.campaign_name,
                    "recipient_name": recipient.name,
                    "from_name": campaign.from_name,
                    "from_email": campaign.from_email,
                })),
            })
            .await
    }

    /// UPDATE condicionado: nunca pisa un estado terminal
    async fn transition(&self, campaign_id: &str, to: CampaignStatus) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE email_campaigns
            SET status = ?2, updated_at = ?3
            WHERE id = ?1 AND status NOT IN ('sent', 'cancelled')
            "#,
        )
        .bind(campaign_id)
        .bind(to.as_str())
        .bind(now_timestamp())
        .execute(&self.db_pool)
        .await
        .context("Failed to update campaign status")?;

        if result.rows_affected() == 0 {
            return Err(self.terminal_error(campaign_id).await);
        }
        Ok(())
    }

    async fn terminal_error(&self, campaign_id: &str) -> anyhow::Error {
        match self.get_campaign(campaign_id).await {
            Ok(c) => match ensure_not_terminal(c.status) {
                Err(e) => e.into(),
                Ok(()) => anyhow::anyhow!("Campaign {campaign_id} changed concurrently"),
            },
            Err(e) => e,
        }
    }
}

fn ensure_not_terminal(status: CampaignStatus) -> Result<(), CampaignError> {
    match status {
        CampaignStatus::Sent => Err(CampaignError::AlreadySent),
        CampaignStatus::Cancelled => Err(CampaignError::AlreadyCancelled),
        CampaignStatus::Draft | CampaignStatus::Sending => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_is_zero_safe() {
        assert_eq!(ratio(0, 0), 0.0);
        assert_eq!(ratio(5, 0), 0.0);
        assert_eq!(ratio(1, 4), 0.25);
    }

    #[test]
    fn terminal_statuses_are_rejected() {
        assert_eq!(
            ensure_not_terminal(CampaignStatus::Sent),
            Err(CampaignError::AlreadySent)
        );
        assert_eq!(
            ensure_not_terminal(CampaignStatus::Cancelled),
            Err(CampaignError::AlreadyCancelled)
        );
        assert!(ensure_not_terminal(CampaignStatus::Draft).is_ok());
        assert!(ensure_not_terminal(CampaignStatus::Sending).is_ok());
    }
}
