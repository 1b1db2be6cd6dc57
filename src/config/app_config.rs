//! config/app_config.rs
//! Configuración global del servicio, con valores por defecto.
//! Se lee de variables de entorno (y de `.env` vía dotenv en main).

use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Proveedor de email transaccional a usar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailProviderKind {
    Resend,
    Smtp,
}

impl FromStr for EmailProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "resend" => Ok(Self::Resend),
            "smtp" => Ok(Self::Smtp),
            other => Err(format!("Unknown email provider: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub port: u16,

    pub email_provider: EmailProviderKind,
    pub resend_api_key: Option<String>,
    pub resend_api_url: String,
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_pass: Option<String>,

    /// Identidad fija para todos los envíos de la cola
    pub email_from: String,
    pub email_reply_to: Option<String>,

    pub google_chat_webhook_url: Option<String>,
    pub app_base_url: String,
    pub chat_min_interval_ms: u64,

    pub queue_batch_size: i64,
    /// false = render permisivo en campañas (variables faltantes -> "")
    pub campaign_strict_rendering: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_url: "sqlite://data/campaigns.db?mode=rwc".to_string(),
            bind_addr: "0.0.0.0".to_string(),
            port: 5022,
            email_provider: EmailProviderKind::Resend,
            resend_api_key: None,
            resend_api_url: "https://api.resend.com".to_string(),
            smtp_host: None,
            smtp_port: 587,
            smtp_user: None,
            smtp_pass: None,
            email_from: "Notifications <notifications@localhost>".to_string(),
            email_reply_to: None,
            google_chat_webhook_url: None,
            app_base_url: "http://localhost:3000".to_string(),
            chat_min_interval_ms: 1000,
            queue_batch_size: 50,
            campaign_strict_rendering: false,
        }
    }
}

impl AppConfig {
    /// Construye la config desde el entorno; lo que falte queda con el default.
    pub fn from_env() -> Self {
        let defaults = AppConfig::default();

        let email_provider = match env::var("EMAIL_PROVIDER") {
            Ok(raw) => raw.parse().unwrap_or_else(|e: String| {
                log::warn!("(AppConfig::from_env) {e}, using resend");
                EmailProviderKind::Resend
            }),
            Err(_) => defaults.email_provider,
        };

        AppConfig {
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            port: parse_var("PORT", defaults.port),
            email_provider,
            resend_api_key: non_empty_var("RESEND_API_KEY"),
            resend_api_url: env::var("RESEND_API_URL").unwrap_or(defaults.resend_api_url),
            smtp_host: non_empty_var("SMTP_HOST"),
            smtp_port: parse_var("SMTP_PORT", defaults.smtp_port),
            smtp_user: non_empty_var("SMTP_USER"),
            smtp_pass: non_empty_var("SMTP_PASS"),
            email_from: env::var("EMAIL_FROM").unwrap_or(defaults.email_from),
            email_reply_to: non_empty_var("EMAIL_REPLY_TO"),
            google_chat_webhook_url: non_empty_var("GOOGLE_CHAT_WEBHOOK_URL"),
            app_base_url: env::var("APP_BASE_URL").unwrap_or(defaults.app_base_url),
            chat_min_interval_ms: parse_var("CHAT_MIN_INTERVAL_MS", defaults.chat_min_interval_ms),
            queue_batch_size: parse_var("QUEUE_BATCH_SIZE", defaults.queue_batch_size),
            campaign_strict_rendering: parse_var(
                "CAMPAIGN_STRICT_RENDERING",
                defaults.campaign_strict_rendering,
            ),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("(AppConfig::from_env) Invalid value for {key}, using default");
            default
        }),
        Err(_) => default,
    }
}
