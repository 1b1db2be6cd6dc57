//! handlers/chat_handler.rs
use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::{
    config::app_config::AppConfig,
    models::chat_model::{
        ChatMessage, ChatMessageRequest, ChatSendResult, FactoryReviewNotice, QcInspectionNotice,
        SimpleCardRequest, SupervisorNudge,
    },
    services::{chat_cards, chat_notifier::ChatNotifier},
};

/// Aviso de dominio + destino opcional
#[derive(Debug, Deserialize)]
pub struct DomainCardRequest<T> {
    pub webhook_url: Option<String>,
    pub rate_limit_key: Option<String>,
    pub notice: T,
}

fn chat_response(result: ChatSendResult) -> HttpResponse {
    if result.success {
        HttpResponse::Ok().json(result)
    } else {
        HttpResponse::BadGateway().json(result)
    }
}

async fn dispatch(
    notifier: &ChatNotifier,
    webhook_url: Option<String>,
    rate_limit_key: Option<String>,
    message: ChatMessage,
) -> HttpResponse {
    let result = notifier
        .send_google_chat_message(ChatMessageRequest {
            webhook_url,
            message,
            rate_limit_key,
        })
        .await;
    chat_response(result)
}

/// POST /api/notifications/chat
pub async fn send_chat_message_endpoint(
    notifier: web::Data<ChatNotifier>,
    body: web::Json<ChatMessageRequest>,
) -> HttpResponse {
    chat_response(notifier.send_google_chat_message(body.into_inner()).await)
}

/// POST /api/notifications/chat/card
pub async fn send_simple_card_endpoint(
    notifier: web::Data<ChatNotifier>,
    body: web::Json<SimpleCardRequest>,
) -> HttpResponse {
    let req = body.into_inner();
    let button = match (&req.button_text, &req.button_url) {
        (Some(text), Some(url)) => Some((text.as_str(), url.as_str())),
        _ => None,
    };
    let message =
        chat_cards::create_card_v2_message(&req.title, req.subtitle.as_deref(), &req.text, button);

    dispatch(&notifier, req.webhook_url, req.rate_limit_key, message).await
}

/// POST /api/notifications/chat/qc
pub async fn send_qc_card_endpoint(
    notifier: web::Data<ChatNotifier>,
    config: web::Data<AppConfig>,
    body: web::Json<DomainCardRequest<QcInspectionNotice>>,
) -> HttpResponse {
    let req = body.into_inner();
    let message = chat_cards::qc_inspection_card(&req.notice, &config.app_base_url);
    dispatch(&notifier, req.webhook_url, req.rate_limit_key, message).await
}

/// POST /api/notifications/chat/factory-review
pub async fn send_factory_review_card_endpoint(
    notifier: web::Data<ChatNotifier>,
    config: web::Data<AppConfig>,
    body: web::Json<DomainCardRequest<FactoryReviewNotice>>,
) -> HttpResponse {
    let req = body.into_inner();
    let message = chat_cards::factory_review_card(&req.notice, &config.app_base_url);
    dispatch(&notifier, req.webhook_url, req.rate_limit_key, message).await
}

/// POST /api/notifications/chat/supervisor-nudge
pub async fn send_supervisor_nudge_endpoint(
    notifier: web::Data<ChatNotifier>,
    config: web::Data<AppConfig>,
    body: web::Json<DomainCardRequest<SupervisorNudge>>,
) -> HttpResponse {
    let req = body.into_inner();
    let message = chat_cards::supervisor_nudge_card(&req.notice, &config.app_base_url);
    dispatch(&notifier, req.webhook_url, req.rate_limit_key, message).await
}
