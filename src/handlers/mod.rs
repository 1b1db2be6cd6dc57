//! handlers/mod.rs
//! Módulo que agrupa los distintos handlers (plantillas, campañas, cola, chat).

use actix_web::{http::StatusCode, HttpResponse};
use serde_json::json;

use crate::errors::{CampaignError, QueueError, TemplateError};

pub mod campaign_handler;
pub mod chat_handler;
pub mod queue_handler;
pub mod template_handler;
pub mod tracking_handler;

/// Traduce errores de dominio a status HTTP; lo demás es 500.
pub fn error_response(e: &anyhow::Error) -> HttpResponse {
    let status = if let Some(err) = e.downcast_ref::<CampaignError>() {
        match err {
            CampaignError::NotFound(_) => StatusCode::NOT_FOUND,
            CampaignError::AlreadySent | CampaignError::AlreadyCancelled => StatusCode::CONFLICT,
            CampaignError::MissingTemplate => StatusCode::UNPROCESSABLE_ENTITY,
        }
    } else if let Some(err) = e.downcast_ref::<TemplateError>() {
        match err {
            TemplateError::NotFound(_) => StatusCode::NOT_FOUND,
            TemplateError::MissingVariable(_)
            | TemplateError::MissingVariables(_)
            | TemplateError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    } else if let Some(QueueError::NotFound(_)) = e.downcast_ref::<QueueError>() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        log::error!("Request failed: {:?}", e);
    }

    HttpResponse::build(status).json(json!({
        "success": false,
        "error": e.to_string()
    }))
}
