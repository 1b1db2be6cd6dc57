//! handlers/template_handler.rs
use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::{
    handlers::error_response,
    models::template_model::{CreateTemplateRequest, RenderTemplateRequest, UpdateTemplateRequest},
    services::template_service::TemplateService,
};

#[derive(Deserialize)]
pub struct ListTemplatesQuery {
    active_only: Option<bool>,
}

/// POST /api/templates
pub async fn create_template_endpoint(
    template_service: web::Data<TemplateService>,
    body: web::Json<CreateTemplateRequest>,
) -> HttpResponse {
    match template_service.create_template(body.into_inner()).await {
        Ok(template) => HttpResponse::Created().json(template),
        Err(e) => error_response(&e),
    }
}

/// GET /api/templates
pub async fn list_templates_endpoint(
    template_service: web::Data<TemplateService>,
    query: web::Query<ListTemplatesQuery>,
) -> HttpResponse {
    match template_service
        .list_templates(query.active_only.unwrap_or(false))
        .await
    {
        Ok(templates) => HttpResponse::Ok().json(templates),
        Err(e) => error_response(&e),
    }
}

/// GET /api/templates/{key}
pub async fn get_template_endpoint(
    template_service: web::Data<TemplateService>,
    path: web::Path<String>,
) -> HttpResponse {
    match template_service.get_template(&path.into_inner()).await {
        Ok(template) => HttpResponse::Ok().json(template),
        Err(e) => error_response(&e),
    }
}

/// PUT /api/templates/{key}
pub async fn update_template_endpoint(
    template_service: web::Data<TemplateService>,
    path: web::Path<String>,
    body: web::Json<UpdateTemplateRequest>,
) -> HttpResponse {
    match template_service
        .update_template(&path.into_inner(), body.into_inner())
        .await
    {
        Ok(template) => HttpResponse::Ok().json(template),
        Err(e) => error_response(&e),
    }
}

/// DELETE /api/templates/{key}
pub async fn delete_template_endpoint(
    template_service: web::Data<TemplateService>,
    path: web::Path<String>,
) -> HttpResponse {
    match template_service.delete_template(&path.into_inner()).await {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(e) => error_response(&e),
    }
}

/// POST /api/templates/{key}/render
pub async fn render_template_endpoint(
    template_service: web::Data<TemplateService>,
    path: web::Path<String>,
    body: web::Json<RenderTemplateRequest>,
) -> HttpResponse {
    let req = body.into_inner();
    match template_service
        .render_stored_template(&path.into_inner(), &req.variables)
        .await
    {
        Ok(rendered) => HttpResponse::Ok().json(rendered),
        Err(e) => error_response(&e),
    }
}
