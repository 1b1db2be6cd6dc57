//! services/email_provider.rs
//! Proveedores de email transaccional: Resend (HTTP) y SMTP (lettre).

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use reqwest::Client;
use uuid::Uuid;

use crate::{
    config::app_config::{AppConfig, EmailProviderKind},
    models::email_model::{OutboundEmail, ProviderReceipt},
};

const PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait]
pub trait EmailProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, email: &OutboundEmail) -> Result<ProviderReceipt>;
}

/// Elige el proveedor según la config. Sin credenciales no se cae: cada envío fallará.
pub fn provider_from_config(config: &AppConfig) -> Arc<dyn EmailProvider> {
    match config.email_provider {
        EmailProviderKind::Resend => match &config.resend_api_key {
            Some(key) => Arc::new(ResendProvider::new(&config.resend_api_url, key)),
            None => {
                log::warn!("(provider_from_config) RESEND_API_KEY not set, email sending disabled");
                Arc::new(UnconfiguredProvider)
            }
        },
        EmailProviderKind::Smtp => match &config.smtp_host {
            Some(host) => Arc::new(SmtpProvider {
                host: host.clone(),
                port: config.smtp_port,
                user: config.smtp_user.clone().unwrap_or_default(),
                pass: config.smtp_pass.clone().unwrap_or_default(),
            }),
            None => {
                log::warn!("(provider_from_config) SMTP_HOST not set, email sending disabled");
                Arc::new(UnconfiguredProvider)
            }
        },
    }
}

// ========================================================================
// Resend
// ========================================================================

pub struct ResendProvider {
    http_client: Client,
    api_url: String,
    api_key: String,
}

impl ResendProvider {
    pub fn new(api_url: &str, api_key: &str) -> Self {
        let http_client = Client::builder()
            .timeout(PROVIDER_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl EmailProvider for ResendProvider {
    fn name(&self) -> &'static str {
        "resend"
    }

    async fn send(&self, email: &OutboundEmail) -> Result<ProviderReceipt> {
        let url = format!("{}/emails", self.api_url);

        let resp = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(email)
            .send()
            .await
            .context("Resend request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("Resend API error {status}: {body}"));
        }

        resp.json::<ProviderReceipt>()
            .await
            .context("Invalid Resend response body")
    }
}

// ========================================================================
// SMTP
// ========================================================================

pub struct SmtpProvider {
    host: String,
    port: u16,
    user: String,
    pass: String,
}

impl SmtpProvider {
    fn build_message(&self, email: &OutboundEmail, message_id: &str) -> Result<Message> {
        let from: Mailbox = email.from.parse().context("Invalid from address")?;

        let mut builder = Message::builder()
            .from(from)
            .subject(&email.subject)
            .message_id(Some(message_id.to_string()));

        for recip_str in &email.to {
            let to: Mailbox = recip_str.parse().context("Invalid recipient address")?;
            builder = builder.to(to);
        }
        if let Some(reply_to) = &email.reply_to {
            builder = builder.reply_to(reply_to.parse().context("Invalid reply-to address")?);
        }

        // Cuerpo HTML, con alternativa de texto si existe
        let html_part = SinglePart::builder()
            .header(ContentType::TEXT_HTML)
            .body(email.html.clone());

        let message = match &email.text {
            Some(text) => builder.multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text.clone()),
                    )
                    .singlepart(html_part),
            )?,
            None => builder.singlepart(html_part)?,
        };

        Ok(message)
    }
}

#[async_trait]
impl EmailProvider for SmtpProvider {
    fn name(&self) -> &'static str {
        "smtp"
    }

    async fn send(&self, email: &OutboundEmail) -> Result<ProviderReceipt> {
        let message_id = format!("<{}@{}>", Uuid::new_v4(), self.host);
        let message = self.build_message(email, &message_id)?;

        let tls_params = TlsParameters::new(self.host.clone())?;
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&self.host)?
            .port(self.port)
            .credentials(Credentials::new(self.user.clone(), self.pass.clone()))
            .tls(Tls::Required(tls_params))
            .build();

        tokio::time::timeout(PROVIDER_TIMEOUT, mailer.send(message))
            .await
            .context("SMTP send timed out")??;

        Ok(ProviderReceipt { message_id })
    }
}

// ========================================================================
// Sin configurar
// ========================================================================

pub struct UnconfiguredProvider;

#[async_trait]
impl EmailProvider for UnconfiguredProvider {
    fn name(&self) -> &'static str {
        "unconfigured"
    }

    async fn send(&self, _email: &OutboundEmail) -> Result<ProviderReceipt> {
        Err(anyhow!("Email provider not configured"))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn sample_email(text: Option<&str>) -> OutboundEmail {
        OutboundEmail {
            from: "Ops <ops@example.com>".to_string(),
            to: vec!["a@example.com".to_string()],
            subject: "Hola".to_string(),
            html: "<p>Hola</p>".to_string(),
            text: text.map(str::to_string),
            reply_to: Some("support@example.com".to_string()),
            tags: vec![],
            headers: BTreeMap::new(),
        }
    }

    #[test]
    fn smtp_message_builds_with_text_alternative() {
        let provider = SmtpProvider {
            host: "smtp.example.com".to_string(),
            port: 587,
            user: "u".to_string(),
            pass: "p".to_string(),
        };

        let message = provider
            .build_message(&sample_email(Some("Hola")), "<id@smtp.example.com>")
            .expect("message should build");
        let raw = String::from_utf8(message.formatted()).expect("utf8");
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("Reply-To: support@example.com"));
    }

    #[test]
    fn smtp_message_rejects_bad_recipient() {
        let provider = SmtpProvider {
            host: "smtp.example.com".to_string(),
            port: 587,
            user: String::new(),
            pass: String::new(),
        };
        let mut email = sample_email(None);
        email.to = vec!["not-an-address".to_string()];

        assert!(provider.build_message(&email, "<x@y>").is_err());
    }

    #[actix_rt::test]
    async fn unconfigured_provider_always_fails() {
        let err = UnconfiguredProvider
            .send(&sample_email(None))
            .await
            .expect_err("must fail");
        assert_eq!(err.to_string(), "Email provider not configured");
    }

    #[test]
    fn missing_api_key_falls_back_to_unconfigured() {
        let config = AppConfig::default();
        assert_eq!(provider_from_config(&config).name(), "unconfigured");

        let config = AppConfig {
            resend_api_key: Some("re_test".to_string()),
            ..AppConfig::default()
        };
        assert_eq!(provider_from_config(&config).name(), "resend");
    }
}
