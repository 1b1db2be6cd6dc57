//! services/email_queue_service.rs
//! Cola de emails: `queue_email` solo inserta; `process_queue` envía en orden
//! de prioridad y antigüedad, un item a la vez, sin reintentos.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::{
    db::{now_timestamp, page_window},
    errors::QueueError,
    models::{
        email_model::{EmailTag, OutboundEmail, ProviderReceipt},
        queue_model::{
            EmailQueueItem, EmailQueueRow, ListQueueResponse, ProcessQueueResult, QueueEmailRequest,
            QueueItemError, QueueStatus, DEFAULT_PRIORITY,
        },
        tracking_model::TrackingEventType,
    },
    services::{email_provider::EmailProvider, tracking_service::TrackingService},
};

const QUEUE_COLUMNS: &str = "id, recipient_email, template_id, subject, html_content, \
     text_content, status, priority, metadata, error_message, provider_message_id, \
     sent_at, created_at, updated_at";

/// Identidad fija con la que sale todo lo de la cola
#[derive(Debug, Clone)]
pub struct SenderIdentity {
    pub from: String,
    pub reply_to: Option<String>,
}

#[derive(Clone)]
pub struct EmailQueueService {
    db_pool: Pool<Sqlite>,
    provider: Arc<dyn EmailProvider>,
    tracking_service: TrackingService,
    sender: SenderIdentity,
}

impl EmailQueueService {
    pub fn new(
        db_pool: Pool<Sqlite>,
        provider: Arc<dyn EmailProvider>,
        tracking_service: TrackingService,
        sender: SenderIdentity,
    ) -> Self {
        Self {
            db_pool,
            provider,
            tracking_service,
            sender,
        }
    }

    /// Inserta un item en estado "pending" y devuelve su ID. Nunca envía.
    pub async fn queue_email(&self, req: QueueEmailRequest) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let now = now_timestamp();
        let metadata = req.metadata.as_ref().map(serde_json::to_string).transpose()?;

        sqlx::query(
            r#"
            INSERT INTO email_queue (
                id, recipient_email, template_id, subject, html_content,
                text_content, status, priority, metadata, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7, ?8, ?9, ?9)
            "#,
        )
        .bind(&id)
        .bind(&req.recipient_email)
        .bind(&req.template_id)
        .bind(&req.subject)
        .bind(&req.html_content)
        .bind(&req.text_content)
        .bind(req.priority.unwrap_or(DEFAULT_PRIORITY))
        .bind(metadata)
        .bind(&now)
        .execute(&self.db_pool)
        .await
        .context("Failed to insert email_queue record")?;

        Ok(id)
    }

    /// Procesa hasta `limit` items pendientes. Cada item es independiente:
    /// un fallo queda en "failed" y el batch sigue con el siguiente.
    pub async fn process_queue(&self, limit: i64) -> Result<ProcessQueueResult> {
        let sql = format!(
            "SELECT {QUEUE_COLUMNS} FROM email_queue WHERE status = 'pending' \
             ORDER BY priority ASC, created_at ASC, rowid ASC LIMIT ?1"
        );
        let rows = sqlx::query_as::<_, EmailQueueRow>(&sql)
            .bind(limit.max(0))
            .fetch_all(&self.db_pool)
            .await
            .context("Failed to load pending emails")?;

        log::info!(
            "(process_queue) {} pending item(s) selected (limit={}, provider={})",
            rows.len(),
            limit,
            self.provider.name()
        );

        let mut result = ProcessQueueResult::default();

        for row in rows {
            let queue_id = row.id.clone();
            let recipient_email = row.recipient_email.clone();
            result.processed += 1;

            match self.process_item(row).await {
                Ok(()) => result.sent += 1,
                Err(e) => {
                    let error = format!("{e:#}");
                    log::error!(
                        "(process_queue) Failed to send {} to {}: {}",
                        queue_id,
                        recipient_email,
                        error
                    );
                    if let Err(mark_err) = self.mark_failed(&queue_id, &error).await {
                        log::error!(
                            "(process_queue) Could not mark {} as failed: {:?}",
                            queue_id,
                            mark_err
                        );
                    }
                    result.failed += 1;
                    result.errors.push(QueueItemError {
                        queue_id,
                        recipient_email,
                        error,
                    });
                }
            }
        }

        result.success = result.failed == 0;
        log::info!(
            "(process_queue) Batch done: processed={}, sent={}, failed={}",
            result.processed,
            result.sent,
            result.failed
        );
        Ok(result)
    }

    pub async fn get_queue_item(&self, id: &str) -> Result<EmailQueueItem> {
        let sql = format!("SELECT {QUEUE_COLUMNS} FROM email_queue WHERE id = ?1");
        let row = sqlx::query_as::<_, EmailQueueRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await
            .context("Failed to load email queue item")?
            .ok_or_else(|| QueueError::NotFound(id.to_string()))?;

        EmailQueueItem::try_from(row)
    }

    /// Lista la cola con paginación, opcionalmente filtrada por estado
    pub async fn list_queue(
        &self,
        status: Option<QueueStatus>,
        page: u64,
        page_size: u64,
    ) -> Result<ListQueueResponse> {
        let (page, page_size, offset) = page_window(page, page_size);
        let status_str = status.map(|s| s.as_str());

        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM email_queue WHERE (?1 IS NULL OR status = ?1)",
        )
        .bind(status_str)
        .fetch_one(&self.db_pool)
        .await?;

        let sql = format!(
            "SELECT {QUEUE_COLUMNS} FROM email_queue WHERE (?1 IS NULL OR status = ?1) \
             ORDER BY created_at DESC, rowid DESC LIMIT ?2 OFFSET ?3"
        );
        let rows = sqlx::query_as::<_, EmailQueueRow>(&sql)
            .bind(status_str)
            .bind(page_size as i64)
            .bind(offset)
            .fetch_all(&self.db_pool)
            .await?;

        Ok(ListQueueResponse {
            total: total as u64,
            page,
            page_size,
            items: rows
                .into_iter()
                .map(EmailQueueItem::try_from)
                .collect::<Result<_>>()?,
        })
    }

    async fn process_item(&self, row: EmailQueueRow) -> Result<()> {
        let item = EmailQueueItem::try_from(row).context("Undecodable queue item")?;
        let receipt = self.deliver(&item).await?;

        // Si esto falla el caller lo marca "failed": nunca queda pending para reenviarse
        self.mark_sent(&item.id, &receipt.message_id)
            .await
            .with_context(|| format!("Sent as {} but not marked as sent", receipt.message_id))?;

        if let Err(e) = self
            .tracking_service
            .record_event(
                item.campaign_id(),
                &item.recipient_email,
                TrackingEventType::Sent,
                Some(&serde_json::json!({
                    "queue_id": item.id,
                    "provider_message_id": receipt.message_id,
                })),
            )
            .await
        {
            log::error!(
                "(process_queue) Sent {} but tracking failed: {:?}",
                item.id,
                e
            );
        }
        Ok(())
    }

    async fn deliver(&self, item: &EmailQueueItem) -> Result<ProviderReceipt> {
        let mut tags = Vec::new();
        if let Some(campaign_id) = item.campaign_id() {
            tags.push(EmailTag {
                name: "campaign_id".to_string(),
                value: campaign_id.to_string(),
            });
        }

        let mut headers = BTreeMap::new();
        headers.insert("X-Entity-Ref-ID".to_string(), item.id.clone());

        let email = OutboundEmail {
            from: self.sender.from.clone(),
            to: vec![item.recipient_email.clone()],
            subject: item.subject.clone(),
            html: item.html_content.clone(),
            text: item.text_content.clone(),
            reply_to: self.sender.reply_to.clone(),
            tags,
            headers,
        };

        self.provider.send(&email).await
    }

    // Solo se sale de "pending" una vez
    async fn mark_sent(&self, id: &str, provider_message_id: &str) -> Result<()> {
        let now = now_timestamp();
        sqlx::query(
            r#"
            UPDATE email_queue
            SET status = 'sent',
                provider_message_id = ?2,
                sent_at = ?3,
                updated_at = ?3
            WHERE id = ?1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(provider_message_id)
        .bind(&now)
        .execute(&self.db_pool)
        .await
        .context("Failed to mark email as sent")?;
        Ok(())
    }

    async fn mark_failed(&self, id: &str, error: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE email_queue
            SET status = 'failed',
                error_message = ?2,
                updated_at = ?3
            WHERE id = ?1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(now_timestamp())
        .execute(&self.db_pool)
        .await
        .context("Failed to mark email as failed")?;
        Ok(())
    }
}
