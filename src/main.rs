use std::sync::Arc;
use std::time::Duration;

use actix_web::{web, App, HttpServer};
use dotenv::dotenv;

use crate::config::app_config::AppConfig;
use crate::logger::init_logger;
use crate::services::campaign_service::CampaignService;
use crate::services::chat_notifier::{ChatNotifier, WebhookChatTransport};
use crate::services::email_provider::provider_from_config;
use crate::services::email_queue_service::{EmailQueueService, SenderIdentity};
use crate::services::template_service::TemplateService;
use crate::services::tracking_service::TrackingService;

mod app;
mod config;
mod db;
mod errors;
mod handlers;
mod logger;
mod models;
mod services;

#[cfg(test)]
mod tests;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok(); // Cargar .env al inicio
    init_logger();

    let config = AppConfig::from_env();

    // Conectarnos a la DB (y migrar)
    let db_pool = match db::setup_database(&config.database_url).await {
        Ok(pool) => pool,
        Err(e) => panic!("No se pudo inicializar la base de datos: {:?}", e),
    };

    let tracking_service = TrackingService::new(db_pool.clone());
    let template_service = TemplateService::new(db_pool.clone());

    let queue_service = EmailQueueService::new(
        db_pool.clone(),
        provider_from_config(&config),
        tracking_service.clone(),
        SenderIdentity {
            from: config.email_from.clone(),
            reply_to: config.email_reply_to.clone(),
        },
    );

    let campaign_service = CampaignService::new(
        db_pool.clone(),
        queue_service.clone(),
        template_service.clone(),
        tracking_service.clone(),
        config.campaign_strict_rendering,
    );

    if config.google_chat_webhook_url.is_none() {
        log::warn!("GOOGLE_CHAT_WEBHOOK_URL no definido; solo se enviará a webhooks explícitos");
    }
    let chat_notifier = ChatNotifier::new(
        Arc::new(WebhookChatTransport::new()),
        config.google_chat_webhook_url.clone(),
        Duration::from_millis(config.chat_min_interval_ms),
    );

    // Levantar servidor
    let bind = (config.bind_addr.clone(), config.port);
    log::info!("Levantando servidor en {}:{}", bind.0, bind.1);
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(config.clone()))
            .app_data(web::Data::new(template_service.clone()))
            .app_data(web::Data::new(tracking_service.clone()))
            .app_data(web::Data::new(queue_service.clone()))
            .app_data(web::Data::new(campaign_service.clone()))
            .app_data(web::Data::new(chat_notifier.clone()))
            .configure(app::init_app)
    })
    .workers(1)
    .bind(bind)?
    .run()
    .await
}
