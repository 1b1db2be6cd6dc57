//! handlers/campaign_handler.rs
use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::{
    handlers::error_response,
    models::campaign_model::{CreateCampaignRequest, UpdateRecipientsRequest},
    services::campaign_service::CampaignService,
};

#[derive(Deserialize)]
pub struct PaginationQuery {
    page: Option<u64>,
    page_size: Option<u64>,
}

/// POST /api/campaigns
pub async fn create_campaign_endpoint(
    campaign_service: web::Data<CampaignService>,
    body: web::Json<CreateCampaignRequest>,
) -> HttpResponse {
    match campaign_service.create_campaign(body.into_inner()).await {
        Ok(campaign) => HttpResponse::Created().json(campaign),
        Err(e) => error_response(&e),
    }
}

/// GET /api/campaigns
pub async fn list_campaigns_endpoint(
    campaign_service: web::Data<CampaignService>,
    query: web::Query<PaginationQuery>,
) -> HttpResponse {
    let page = query.page.unwrap_or(1);
    let page_size = query.page_size.unwrap_or(10);

    match campaign_service.list_campaigns(page, page_size).await {
        Ok(list) => HttpResponse::Ok().json(list),
        Err(e) => error_response(&e),
    }
}

/// GET /api/campaigns/{id}
pub async fn get_campaign_endpoint(
    campaign_service: web::Data<CampaignService>,
    path: web::Path<String>,
) -> HttpResponse {
    match campaign_service.get_campaign(&path.into_inner()).await {
        Ok(campaign) => HttpResponse::Ok().json(campaign),
        Err(e) => error_response(&e),
    }
}

/// PUT /api/campaigns/{id}/recipients
pub async fn update_recipients_endpoint(
    campaign_service: web::Data<CampaignService>,
    path: web::Path<String>,
    body: web::Json<UpdateRecipientsRequest>,
) -> HttpResponse {
    match campaign_service
        .update_recipients(&path.into_inner(), body.into_inner().recipient_list)
        .await
    {
        Ok(campaign) => HttpResponse::Ok().json(campaign),
        Err(e) => error_response(&e),
    }
}

/// POST /api/campaigns/{id}/send
pub async fn send_campaign_endpoint(
    campaign_service: web::Data<CampaignService>,
    path: web::Path<String>,
) -> HttpResponse {
    let campaign_id = path.into_inner();
    log::info!("(send_campaign_endpoint) Sending campaign {}", campaign_id);

    match campaign_service.send_campaign(&campaign_id).await {
        Ok(result) => HttpResponse::Ok().json(result),
        Err(e) => error_response(&e),
    }
}

/// POST /api/campaigns/{id}/cancel
pub async fn cancel_campaign_endpoint(
    campaign_service: web::Data<CampaignService>,
    path: web::Path<String>,
) -> HttpResponse {
    match campaign_service.cancel_campaign(&path.into_inner()).await {
        Ok(campaign) => HttpResponse::Ok().json(campaign),
        Err(e) => error_response(&e),
    }
}

/// GET /api/campaigns/{id}/metrics
pub async fn campaign_metrics_endpoint(
    campaign_service: web::Data<CampaignService>,
    path: web::Path<String>,
) -> HttpResponse {
    match campaign_service.get_metrics(&path.into_inner()).await {
        Ok(metrics) => HttpResponse::Ok().json(metrics),
        Err(e) => error_response(&e),
    }
}
