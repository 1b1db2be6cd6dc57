//! handlers/tracking_handler.rs
use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::{
    handlers::error_response,
    models::tracking_model::{ProviderWebhookEvent, RecordTrackingEventRequest},
    services::tracking_service::TrackingService,
};

/// POST /api/email/tracking
pub async fn record_tracking_event_endpoint(
    tracking_service: web::Data<TrackingService>,
    body: web::Json<RecordTrackingEventRequest>,
) -> HttpResponse {
    let req = body.into_inner();

    match tracking_service
        .record_event(
            req.campaign_id.as_deref(),
            &req.recipient_email,
            req.event_type,
            req.event_data.as_ref(),
        )
        .await
    {
        Ok(id) => HttpResponse::Ok().json(json!({
            "success": true,
            "id": id
        })),
        Err(e) => error_response(&e),
    }
}

/// POST /api/email/webhooks/resend
pub async fn provider_webhook_endpoint(
    tracking_service: web::Data<TrackingService>,
    body: web::Json<ProviderWebhookEvent>,
) -> HttpResponse {
    match tracking_service.ingest_provider_event(&body.into_inner()).await {
        Ok(resp) => HttpResponse::Ok().json(resp),
        Err(e) => error_response(&e),
    }
}

/// GET /api/campaigns/{id}/events
pub async fn campaign_events_endpoint(
    tracking_service: web::Data<TrackingService>,
    path: web::Path<String>,
) -> HttpResponse {
    match tracking_service.list_events(&path.into_inner()).await {
        Ok(events) => HttpResponse::Ok().json(events),
        Err(e) => error_response(&e),
    }
}
