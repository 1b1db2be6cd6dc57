//! app.rs
use crate::handlers::{
    campaign_handler, chat_handler, queue_handler, template_handler, tracking_handler,
};
use actix_web::web;

pub fn init_app(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(
                web::scope("/templates")
                    .route(
                        "",
                        web::post().to(template_handler::create_template_endpoint),
                    )
                    .route("", web::get().to(template_handler::list_templates_endpoint))
                    .route(
                        "/{key}",
                        web::get().to(template_handler::get_template_endpoint),
                    )
                    .route(
                        "/{key}",
                        web::put().to(template_handler::update_template_endpoint),
                    )
                    .route(
                        "/{key}",
                        web::delete().to(template_handler::delete_template_endpoint),
                    )
                    .route(
                        "/{key}/render",
                        web::post().to(template_handler::render_template_endpoint),
                    ),
            )
            .service(
                web::scope("/campaigns")
                    .route(
                        "",
                        web::post().to(campaign_handler::create_campaign_endpoint),
                    )
                    .route("", web::get().to(campaign_handler::list_campaigns_endpoint))
                    .route(
                        "/{id}",
                        web::get().to(campaign_handler::get_campaign_endpoint),
                    )
                    .route(
                        "/{id}/recipients",
                        web::put().to(campaign_handler::update_recipients_endpoint),
                    )
                    .route(
                        "/{id}/send",
                        web::post().to(campaign_handler::send_campaign_endpoint),
                    )
                    .route(
                        "/{id}/cancel",
                        web::post().to(campaign_handler::cancel_campaign_endpoint),
                    )
                    .route(
                        "/{id}/metrics",
                        web::get().to(campaign_handler::campaign_metrics_endpoint),
                    )
                    .route(
                        "/{id}/events",
                        web::get().to(tracking_handler::campaign_events_endpoint),
                    ),
            )
            .service(
                web::scope("/email")
                    .route("/queue", web::post().to(queue_handler::queue_email_endpoint))
                    .route("/queue", web::get().to(queue_handler::list_queue_endpoint))
                    .route(
                        "/queue/process",
                        web::post().to(queue_handler::process_queue_endpoint),
                    )
                    .route(
                        "/queue/{id}",
                        web::get().to(queue_handler::get_queue_item_endpoint),
                    )
                    .route(
                        "/tracking",
                        web::post().to(tracking_handler::record_tracking_event_endpoint),
                    )
                    .route(
                        "/webhooks/resend",
                        web::post().to(tracking_handler::provider_webhook_endpoint),
                    ),
            )
            .service(
                web::scope("/notifications/chat")
                    .route("", web::post().to(chat_handler::send_chat_message_endpoint))
                    .route(
                        "/card",
                        web::post().to(chat_handler::send_simple_card_endpoint),
                    )
                    .route("/qc", web::post().to(chat_handler::send_qc_card_endpoint))
                    .route(
                        "/factory-review",
                        web::post().to(chat_handler::send_factory_review_card_endpoint),
                    )
                    .route(
                        "/supervisor-nudge",
                        web::post().to(chat_handler::send_supervisor_nudge_endpoint),
                    ),
            ),
    );
}
