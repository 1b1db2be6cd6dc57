//! services/chat_notifier.rs
//! Envío a webhooks de Google Chat con intervalo mínimo por destino.
//!
//! El mapa `clave -> último envío` vive en memoria del proceso: se comparte
//! entre todos los clones del servicio y arranca vacío en cada reinicio.
//! Con varias instancias del servicio no hay garantía global.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;

use crate::models::chat_model::{ChatMessage, ChatMessageRequest, ChatSendResult};

pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(1000);
const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// POST del mensaje; error si la respuesta no es 2xx o falla la red
    async fn post(&self, webhook_url: &str, message: &ChatMessage) -> Result<()>;
}

pub struct WebhookChatTransport {
    http_client: Client,
}

impl WebhookChatTransport {
    pub fn new() -> Self {
        let http_client = Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { http_client }
    }
}

impl Default for WebhookChatTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatTransport for WebhookChatTransport {
    async fn post(&self, webhook_url: &str, message: &ChatMessage) -> Result<()> {
        let resp = self
            .http_client
            .post(webhook_url)
            .header("Content-Type", "application/json; charset=UTF-8")
            .json(message)
            .send()
            .await
            .context("Google Chat request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("Google Chat webhook error {status}: {body}"));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct ChatNotifier {
    transport: Arc<dyn ChatTransport>,
    default_webhook_url: Option<String>,
    min_interval: Duration,
    last_sent: Arc<Mutex<HashMap<String, Instant>>>,
}

impl ChatNotifier {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        default_webhook_url: Option<String>,
        min_interval: Duration,
    ) -> Self {
        Self {
            transport,
            default_webhook_url,
            min_interval,
            last_sent: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Nunca devuelve Err: los fallos de notificación no bloquean al que llama.
    pub async fn send_google_chat_message(&self, req: ChatMessageRequest) -> ChatSendResult {
        // 1) Destino: parámetro explícito, si no el default del proceso
        let Some(webhook_url) = req
            .webhook_url
            .filter(|u| !u.trim().is_empty())
            .or_else(|| self.default_webhook_url.clone())
        else {
            log::warn!("(send_google_chat_message) Webhook URL not configured, skipping");
            return ChatSendResult::failed("Webhook URL not configured");
        };
        let key = req.rate_limit_key.unwrap_or_else(|| webhook_url.clone());

        // 2) Esperar lo que falte del intervalo
        let wait = self.remaining_wait(&key);
        if !wait.is_zero() {
            log::warn!(
                "(send_google_chat_message) Rate limited, waiting {}ms before sending",
                wait.as_millis()
            );
            tokio::time::sleep(wait).await;
        }

        // 3) Enviar; el slot solo se consume si hubo éxito
        match self.transport.post(&webhook_url, &req.message).await {
            Ok(()) => {
                self.record_sent(&key);
                log::info!("(send_google_chat_message) Message delivered");
                ChatSendResult::ok()
            }
            Err(e) => {
                log::error!("(send_google_chat_message) Send failed: {:#}", e);
                ChatSendResult::failed(format!("{e:#}"))
            }
        }
    }

    fn remaining_wait(&self, key: &str) -> Duration {
        let last_sent = match self.last_sent.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match last_sent.get(key) {
            Some(last) => self.min_interval.saturating_sub(last.elapsed()),
            None => Duration::ZERO,
        }
    }

    fn record_sent(&self, key: &str) {
        let mut last_sent = match self.last_sent.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        last_sent.insert(key.to_string(), Instant::now());
    }
}
