//! tests/mod.rs
//! Helpers compartidos: SQLite en memoria y un proveedor de email falso.

mod api_tests;
mod queue_tests;

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};

use crate::db::run_migrations;
use crate::models::email_model::{OutboundEmail, ProviderReceipt};
use crate::services::campaign_service::CampaignService;
use crate::services::email_provider::EmailProvider;
use crate::services::email_queue_service::{EmailQueueService, SenderIdentity};
use crate::services::template_service::TemplateService;
use crate::services::tracking_service::TrackingService;

pub async fn test_pool() -> Pool<Sqlite> {
    // Una sola conexión: cada conexión a :memory: es una base distinta
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    run_migrations(&pool).await.expect("migrations");
    pool
}

/// Registra lo enviado; falla para los destinatarios indicados
#[derive(Default)]
pub struct FakeProvider {
    sent: Mutex<Vec<OutboundEmail>>,
    fail_for: HashSet<String>,
}

impl FakeProvider {
    pub fn failing_for(emails: &[&str]) -> Self {
        FakeProvider {
            sent: Mutex::new(Vec::new()),
            fail_for: emails.iter().map(|e| e.to_string()).collect(),
        }
    }

    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailProvider for FakeProvider {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn send(&self, email: &OutboundEmail) -> Result<ProviderReceipt> {
        if email.to.iter().any(|to| self.fail_for.contains(to)) {
            return Err(anyhow!("Mailbox unavailable: {}", email.to.join(",")));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(email.clone());
        Ok(ProviderReceipt {
            message_id: format!("fake-{}", sent.len()),
        })
    }
}

pub struct TestServices {
    pub pool: Pool<Sqlite>,
    pub provider: Arc<FakeProvider>,
    pub tracking: TrackingService,
    pub templates: TemplateService,
    pub queue: EmailQueueService,
    pub campaigns: CampaignService,
}

pub async fn test_services_with(provider: FakeProvider, strict_rendering: bool) -> TestServices {
    let pool = test_pool().await;
    let provider = Arc::new(provider);
    let tracking = TrackingService::new(pool.clone());
    let templates = TemplateService::new(pool.clone());
    let queue = EmailQueueService::new(
        pool.clone(),
        provider.clone(),
        tracking.clone(),
        SenderIdentity {
            from: "Ops <ops@example.com>".to_string(),
            reply_to: Some("support@example.com".to_string()),
        },
    );
    let campaigns = CampaignService::new(
        pool.clone(),
        queue.clone(),
        templates.clone(),
        tracking.clone(),
        strict_rendering,
    );

    TestServices {
        pool,
        provider,
        tracking,
        templates,
        queue,
        campaigns,
    }
}

pub async fn test_services() -> TestServices {
    test_services_with(FakeProvider::default(), false).await
}

/// Cantidad de filas en la cola con ese estado
pub async fn count_queue_status(pool: &Pool<Sqlite>, status: &str) -> i64 {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM email_queue WHERE status = ?1")
        .bind(status)
        .fetch_one(pool)
        .await
        .unwrap();
    count
}

/// Fila pendiente con metadata que no es JSON válido (escrita por fuera del servicio)
pub async fn insert_undecodable_pending(pool: &Pool<Sqlite>, recipient: &str, priority: i64) -> String {
    let id = uuid::Uuid::new_v4().to_string();
    let now = crate::db::now_timestamp();
    sqlx::query(
        r#"
        INSERT INTO email_queue (
            id, recipient_email, subject, html_content, status, priority, metadata,
            created_at, updated_at
        )
        VALUES (?1, ?2, 'Broken', '<p>x</p>', 'pending', ?3, '{not json', ?4, ?4)
        "#,
    )
    .bind(&id)
    .bind(recipient)
    .bind(priority)
    .bind(&now)
    .execute(pool)
    .await
    .unwrap();
    id
}

/// Estado crudo de una fila, sin pasar por el modelo
pub async fn raw_queue_status(pool: &Pool<Sqlite>, id: &str) -> (String, Option<String>) {
    sqlx::query_as("SELECT status, error_message FROM email_queue WHERE id = ?1")
        .bind(id)
        .fetch_one(pool)
        .await
        .unwrap()
}
