//! handlers/queue_handler.rs
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::{
    config::app_config::AppConfig,
    handlers::error_response,
    models::queue_model::{QueueEmailRequest, QueueStatus},
    services::email_queue_service::EmailQueueService,
};

#[derive(Deserialize)]
pub struct ProcessQueueQuery {
    limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct ListQueueQuery {
    status: Option<QueueStatus>,
    page: Option<u64>,
    page_size: Option<u64>,
}

/// POST /api/email/queue
pub async fn queue_email_endpoint(
    queue_service: web::Data<EmailQueueService>,
    body: web::Json<QueueEmailRequest>,
) -> HttpResponse {
    match queue_service.queue_email(body.into_inner()).await {
        Ok(id) => HttpResponse::Ok().json(json!({
            "success": true,
            "id": id,
            "status": QueueStatus::Pending
        })),
        Err(e) => error_response(&e),
    }
}

/// POST /api/email/queue/process?limit=N
/// Disparador externo (cron o manual) del procesador.
pub async fn process_queue_endpoint(
    queue_service: web::Data<EmailQueueService>,
    config: web::Data<AppConfig>,
    query: web::Query<ProcessQueueQuery>,
) -> HttpResponse {
    let limit = query.limit.unwrap_or(config.queue_batch_size);

    match queue_service.process_queue(limit).await {
        Ok(result) => HttpResponse::Ok().json(result),
        Err(e) => error_response(&e),
    }
}

/// GET /api/email/queue
pub async fn list_queue_endpoint(
    queue_service: web::Data<EmailQueueService>,
    query: web::Query<ListQueueQuery>,
) -> HttpResponse {
    let page = query.page.unwrap_or(1);
    let page_size = query.page_size.unwrap_or(20);

    match queue_service.list_queue(query.status, page, page_size).await {
        Ok(list) => HttpResponse::Ok().json(list),
        Err(e) => error_response(&e),
    }
}

/// GET /api/email/queue/{id}
pub async fn get_queue_item_endpoint(
    queue_service: web::Data<EmailQueueService>,
    path: web::Path<String>,
) -> HttpResponse {
    match queue_service.get_queue_item(&path.into_inner()).await {
        Ok(item) => HttpResponse::Ok().json(item),
        Err(e) => error_response(&e),
    }
}
