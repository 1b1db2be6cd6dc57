//! tests/api_tests.rs
//! Rutas HTTP de punta a punta con `actix_web::test`, sin red.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{http::StatusCode, test, web, App};
    use serde_json::{json, Value};

    use crate::app::init_app;
    use crate::config::app_config::AppConfig;
    use crate::services::chat_notifier::{ChatNotifier, WebhookChatTransport, DEFAULT_MIN_INTERVAL};
    use crate::tests::{test_services, TestServices};

    macro_rules! test_app {
        ($svc:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(AppConfig::default()))
                    .app_data(web::Data::new($svc.templates.clone()))
                    .app_data(web::Data::new($svc.tracking.clone()))
                    .app_data(web::Data::new($svc.queue.clone()))
                    .app_data(web::Data::new($svc.campaigns.clone()))
                    .app_data(web::Data::new(ChatNotifier::new(
                        Arc::new(WebhookChatTransport::new()),
                        None,
                        DEFAULT_MIN_INTERVAL,
                    )))
                    .configure(init_app),
            )
            .await
        };
    }

    async fn services() -> TestServices {
        test_services().await
    }

    #[actix_rt::test]
    async fn template_create_and_render() {
        let svc = services().await;
        let app = test_app!(svc);

        let req = test::TestRequest::post()
            .uri("/api/templates")
            .set_json(json!({
                "template_key": "welcome",
                "subject": "Hi {{name}}",
                "html_content": "<p>Welcome {{name}} to {{company}}</p>"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["variables"], json!(["name", "company"]));

        let req = test::TestRequest::post()
            .uri("/api/templates/welcome/render")
            .set_json(json!({"variables": {"name": "Ana", "company": "Acme"}}))
            .to_request();
        let rendered: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(rendered["subject"], "Hi Ana");
        assert_eq!(rendered["html"], "<p>Welcome Ana to Acme</p>");

        let req = test::TestRequest::post()
            .uri("/api/templates/welcome/render")
            .set_json(json!({"variables": {"name": "Ana"}}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("company"));
    }

    #[actix_rt::test]
    async fn unknown_template_is_404() {
        let svc = services().await;
        let app = test_app!(svc);

        let req = test::TestRequest::get().uri("/api/templates/nope").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_rt::test]
    async fn campaign_send_then_conflict() {
        let svc = services().await;
        let app = test_app!(svc);

        let req = test::TestRequest::post()
            .uri("/api/campaigns")
            .set_json(json!({
                "campaign_name": "Launch",
                "subject_line": "Hello {{name}}",
                "email_template": "<p>Hi {{name}}</p>",
                "recipient_list": [
                    {"email": "a@x.com", "name": "A"},
                    {"email": "b@x.com", "name": "B"}
                ]
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let campaign: Value = test::read_body_json(resp).await;
        assert_eq!(campaign["status"], "draft");
        assert_eq!(campaign["total_recipients"], 2);
        let id = campaign["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::post()
            .uri(&format!("/api/campaigns/{id}/send"))
            .to_request();
        let result: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(result["success"], true);
        assert_eq!(result["queued_count"], 2);
        assert_eq!(result["sent_count"], 2);

        let req = test::TestRequest::post()
            .uri(&format!("/api/campaigns/{id}/send"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Campaign already sent");

        let req = test::TestRequest::get()
            .uri(&format!("/api/campaigns/{id}/metrics"))
            .to_request();
        let metrics: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(metrics["sent"], 2);
        assert_eq!(metrics["delivery_rate"], 0.0);

        let req = test::TestRequest::get()
            .uri(&format!("/api/campaigns/{id}/events"))
            .to_request();
        let events: Value = test::call_and_read_body_json(&app, req).await;
        let events = events.as_array().unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e["event_type"] == "sent"));
    }

    #[actix_rt::test]
    async fn campaign_without_template_is_422() {
        let svc = services().await;
        let app = test_app!(svc);

        let req = test::TestRequest::post()
            .uri("/api/campaigns")
            .set_json(json!({"campaign_name": "Empty", "subject_line": "x"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[actix_rt::test]
    async fn unknown_campaign_is_404() {
        let svc = services().await;
        let app = test_app!(svc);

        let req = test::TestRequest::post()
            .uri("/api/campaigns/missing/send")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_rt::test]
    async fn queue_then_process() {
        let svc = services().await;
        let app = test_app!(svc);

        let req = test::TestRequest::post()
            .uri("/api/email/queue")
            .set_json(json!({
                "recipient_email": "ops@x.com",
                "subject": "Report",
                "html_content": "<p>Daily</p>"
            }))
            .to_request();
        let queued: Value = test::call_and_read_body_json(&app, req).await;
        let id = queued["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::get()
            .uri(&format!("/api/email/queue/{id}"))
            .to_request();
        let item: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(item["status"], "pending");
        assert_eq!(item["priority"], 5);

        let req = test::TestRequest::post()
            .uri("/api/email/queue/process")
            .to_request();
        let result: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(result["processed"], 1);
        assert_eq!(result["sent"], 1);
        assert_eq!(svc.provider.sent().len(), 1);
    }

    #[actix_rt::test]
    async fn provider_webhook_records_per_recipient() {
        let svc = services().await;
        let app = test_app!(svc);

        let req = test::TestRequest::post()
            .uri("/api/email/webhooks/resend")
            .set_json(json!({
                "type": "email.opened",
                "created_at": "2025-01-01T00:00:00Z",
                "data": {
                    "to": ["a@x.com", "b@x.com"],
                    "tags": [{"name": "campaign_id", "value": "c-1"}]
                }
            }))
            .to_request();
        let resp: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp["recorded"], 2);
        assert_eq!(resp["ignored"], false);

        let req = test::TestRequest::post()
            .uri("/api/email/webhooks/resend")
            .set_json(json!({"type": "email.scheduled", "data": {"to": ["a@x.com"]}}))
            .to_request();
        let resp: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp["ignored"], true);

        let events = svc.tracking.list_events("c-1").await.unwrap();
        assert_eq!(events.len(), 2);
    }

    #[actix_rt::test]
    async fn chat_without_webhook_is_bad_gateway() {
        let svc = services().await;
        let app = test_app!(svc);

        let req = test::TestRequest::post()
            .uri("/api/notifications/chat")
            .set_json(json!({"message": {"text": "hola"}}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Webhook URL not configured");
    }

    #[actix_rt::test]
    async fn unknown_queue_item_is_404() {
        let svc = services().await;
        let app = test_app!(svc);

        let req = test::TestRequest::get()
            .uri("/api/email/queue/does-not-exist")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_rt::test]
    async fn oversized_pagination_returns_empty_page() {
        let svc = services().await;
        let app = test_app!(svc);

        let req = test::TestRequest::get()
            .uri("/api/email/queue?page=18446744073709551615&page_size=2")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["items"], json!([]));

        let req = test::TestRequest::get()
            .uri("/api/campaigns?page=1&page_size=18446744073709551615")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["page_size"], 100);
    }
}
