//! services/tracking_service.rs
//! Log append-only de eventos de email (sent, delivered, opened, ...).
//! No existe ningún UPDATE ni DELETE sobre `email_tracking`.

use std::collections::HashMap;

use anyhow::{Context, Result};
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::{
    db::now_timestamp,
    models::tracking_model::{
        EmailTrackingEvent, EmailTrackingRow, ProviderWebhookEvent, TrackingEventType,
        WebhookIngestResponse,
    },
};

#[derive(Clone, Debug)]
pub struct TrackingService {
    db_pool: Pool<Sqlite>,
}

impl TrackingService {
    pub fn new(db_pool: Pool<Sqlite>) -> Self {
        TrackingService { db_pool }
    }

    pub async fn record_event(
        &self,
        campaign_id: Option<&str>,
        recipient_email: &str,
        event_type: TrackingEventType,
        event_data: Option<&serde_json::Value>,
    ) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let event_data_json = event_data.map(serde_json::to_string).transpose()?;

        sqlx::query(
            r#"
            INSERT INTO email_tracking (
                id, campaign_id, recipient_email, event_type, event_data, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&id)
        .bind(campaign_id)
        .bind(recipient_email)
        .bind(event_type.as_str())
        .bind(event_data_json)
        .bind(now_timestamp())
        .execute(&self.db_pool)
        .await
        .context("Failed to insert tracking event")?;

        log::debug!(
            "(record_event) {} for {} (campaign={:?})",
            event_type,
            recipient_email,
            campaign_id
        );
        Ok(id)
    }

    /// GROUP BY event_type para una campaña
    pub async fn count_by_type(&self, campaign_id: &str) -> Result<HashMap<TrackingEventType, i64>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT event_type, COUNT(*) AS cnt
            FROM email_tracking
            WHERE campaign_id = ?1
            GROUP BY event_type
            "#,
        )
        .bind(campaign_id)
        .fetch_all(&self.db_pool)
        .await
        .context("Failed to count tracking events")?;

        let mut counts = HashMap::new();
        for (event_type, cnt) in rows {
            match event_type.parse::<TrackingEventType>() {
                Ok(kind) => {
                    counts.insert(kind, cnt);
                }
                Err(e) => log::warn!("(count_by_type) Skipping row: {e}"),
            }
        }
        Ok(counts)
    }

    pub async fn list_events(&self, campaign_id: &str) -> Result<Vec<EmailTrackingEvent>> {
        let rows = sqlx::query_as::<_, EmailTrackingRow>(
            r#"
            SELECT id, campaign_id, recipient_email, event_type, event_data, created_at
            FROM email_tracking
            WHERE campaign_id = ?1
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(campaign_id)
        .fetch_all(&self.db_pool)
        .await
        .context("Failed to list tracking events")?;

        rows.into_iter().map(EmailTrackingEvent::try_from).collect()
    }

    /// Webhook del proveedor: un evento por destinatario. Tipos desconocidos se ignoran.
    pub async fn ingest_provider_event(
        &self,
        event: &ProviderWebhookEvent,
    ) -> Result<WebhookIngestResponse> {
        let Some(event_type) = TrackingEventType::from_provider_event(&event.event_type) else {
            log::info!(
                "(ingest_provider_event) Ignoring provider event '{}'",
                event.event_type
            );
            return Ok(WebhookIngestResponse {
                success: true,
                recorded: 0,
                ignored: true,
            });
        };

        let campaign_id = event.campaign_id();
        let recipients = event.recipients();
        for recipient in &recipients {
            self.record_event(campaign_id.as_deref(), recipient, event_type, Some(&event.data))
                .await?;
        }

        Ok(WebhookIngestResponse {
            success: true,
            recorded: recipients.len(),
            ignored: false,
        })
    }
}
