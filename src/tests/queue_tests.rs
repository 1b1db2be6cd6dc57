//! tests/queue_tests.rs
//! Cola de emails: orden, fallos parciales y transiciones de una sola vez.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use crate::models::queue_model::{QueueEmailRequest, QueueStatus};
    use crate::models::tracking_model::TrackingEventType;
    use crate::services::email_provider::UnconfiguredProvider;
    use crate::services::email_queue_service::{EmailQueueService, SenderIdentity};
    use crate::db::MAX_PAGE_SIZE;
    use crate::errors::QueueError;
    use crate::tests::{
        count_queue_status, insert_undecodable_pending, raw_queue_status, test_services,
        test_services_with, FakeProvider,
    };

    fn email_to(recipient: &str, priority: Option<i64>) -> QueueEmailRequest {
        QueueEmailRequest {
            recipient_email: recipient.to_string(),
            template_id: None,
            subject: format!("Hello {recipient}"),
            html_content: "<p>Hello</p>".to_string(),
            text_content: Some("Hello".to_string()),
            priority,
            metadata: None,
        }
    }

    #[actix_rt::test]
    async fn queue_email_only_inserts_pending() {
        let svc = test_services().await;

        let id = svc.queue.queue_email(email_to("a@x.com", None)).await.unwrap();
        let item = svc.queue.get_queue_item(&id).await.unwrap();

        assert_eq!(item.status, QueueStatus::Pending);
        assert_eq!(item.priority, 5);
        assert!(item.sent_at.is_none());
        assert!(svc.provider.sent().is_empty());
    }

    #[actix_rt::test]
    async fn process_respects_limit() {
        let svc = test_services().await;
        for r in ["a@x.com", "b@x.com", "c@x.com"] {
            svc.queue.queue_email(email_to(r, None)).await.unwrap();
        }

        let result = svc.queue.process_queue(1).await.unwrap();

        assert_eq!(result.processed, 1);
        assert_eq!(result.sent, 1);
        assert!(result.success);
        assert_eq!(count_queue_status(&svc.pool, "pending").await, 2);
        assert_eq!(count_queue_status(&svc.pool, "sent").await, 1);
    }

    #[actix_rt::test]
    async fn process_orders_by_priority_then_age() {
        let svc = test_services().await;
        svc.queue.queue_email(email_to("low@x.com", Some(9))).await.unwrap();
        svc.queue.queue_email(email_to("old@x.com", Some(1))).await.unwrap();
        svc.queue.queue_email(email_to("new@x.com", Some(1))).await.unwrap();

        svc.queue.process_queue(10).await.unwrap();

        let order: Vec<String> = svc
            .provider
            .sent()
            .into_iter()
            .map(|e| e.to[0].clone())
            .collect();
        assert_eq!(order, vec!["old@x.com", "new@x.com", "low@x.com"]);
    }

    #[actix_rt::test]
    async fn failed_item_does_not_abort_batch() {
        let svc = test_services_with(FakeProvider::failing_for(&["bad@x.com"]), false).await;
        let good = svc.queue.queue_email(email_to("good@x.com", None)).await.unwrap();
        let bad = svc.queue.queue_email(email_to("bad@x.com", None)).await.unwrap();
        let later = svc.queue.queue_email(email_to("later@x.com", None)).await.unwrap();

        let result = svc.queue.process_queue(10).await.unwrap();

        assert!(!result.success);
        assert_eq!(result.processed, 3);
        assert_eq!(result.sent, 2);
        assert_eq!(result.failed, 1);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].queue_id, bad);
        assert!(result.errors[0].error.contains("Mailbox unavailable"));

        let bad_item = svc.queue.get_queue_item(&bad).await.unwrap();
        assert_eq!(bad_item.status, QueueStatus::Failed);
        assert!(bad_item.error_message.unwrap().contains("Mailbox unavailable"));

        for id in [good, later] {
            let item = svc.queue.get_queue_item(&id).await.unwrap();
            assert_eq!(item.status, QueueStatus::Sent);
            assert!(item.provider_message_id.is_some());
            assert!(item.sent_at.is_some());
        }
    }

    #[actix_rt::test]
    async fn processed_rows_never_return_to_pending() {
        let svc = test_services_with(FakeProvider::failing_for(&["bad@x.com"]), false).await;
        svc.queue.queue_email(email_to("ok@x.com", None)).await.unwrap();
        svc.queue.queue_email(email_to("bad@x.com", None)).await.unwrap();

        svc.queue.process_queue(10).await.unwrap();
        let second = svc.queue.process_queue(10).await.unwrap();

        assert_eq!(second.processed, 0);
        assert!(second.success);
        assert_eq!(count_queue_status(&svc.pool, "pending").await, 0);
        assert_eq!(count_queue_status(&svc.pool, "sent").await, 1);
        assert_eq!(count_queue_status(&svc.pool, "failed").await, 1);
        assert_eq!(svc.provider.sent().len(), 1);
    }

    #[actix_rt::test]
    async fn sent_event_carries_campaign_id_and_sender_identity() {
        let svc = test_services().await;
        let mut req = email_to("a@x.com", None);
        req.metadata = Some(json!({"campaign_id": "camp-1", "recipient_name": "A"}));
        svc.queue.queue_email(req).await.unwrap();

        svc.queue.process_queue(5).await.unwrap();

        let events = svc.tracking.list_events("camp-1").await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, TrackingEventType::Sent);
        assert_eq!(events[0].recipient_email, "a@x.com");

        let sent = svc.provider.sent();
        assert_eq!(sent[0].from, "Ops <ops@example.com>");
        assert_eq!(sent[0].reply_to.as_deref(), Some("support@example.com"));
        assert_eq!(sent[0].tags[0].name, "campaign_id");
        assert_eq!(sent[0].tags[0].value, "camp-1");
    }

    #[actix_rt::test]
    async fn unconfigured_provider_marks_items_failed() {
        let svc = test_services().await;
        let queue = EmailQueueService::new(
            svc.pool.clone(),
            Arc::new(UnconfiguredProvider),
            svc.tracking.clone(),
            SenderIdentity {
                from: "ops@example.com".to_string(),
                reply_to: None,
            },
        );
        let id = queue.queue_email(email_to("a@x.com", None)).await.unwrap();

        let result = queue.process_queue(10).await.unwrap();

        assert!(!result.success);
        assert_eq!(result.failed, 1);
        let item = queue.get_queue_item(&id).await.unwrap();
        assert_eq!(item.status, QueueStatus::Failed);
        assert_eq!(item.error_message.as_deref(), Some("Email provider not configured"));
    }

    #[actix_rt::test]
    async fn list_queue_filters_by_status() {
        let svc = test_services_with(FakeProvider::failing_for(&["bad@x.com"]), false).await;
        svc.queue.queue_email(email_to("bad@x.com", None)).await.unwrap();
        svc.queue.queue_email(email_to("ok@x.com", None)).await.unwrap();
        svc.queue.process_queue(1).await.unwrap();

        let failed = svc
            .queue
            .list_queue(Some(QueueStatus::Failed), 1, 10)
            .await
            .unwrap();
        assert_eq!(failed.total, 1);
        assert_eq!(failed.items[0].recipient_email, "bad@x.com");

        let all = svc.queue.list_queue(None, 1, 10).await.unwrap();
        assert_eq!(all.total, 2);
    }

    #[actix_rt::test]
    async fn undecodable_row_fails_alone() {
        let svc = test_services().await;
        let bad = insert_undecodable_pending(&svc.pool, "broken@x.com", 1).await;
        svc.queue.queue_email(email_to("a@x.com", None)).await.unwrap();
        svc.queue.queue_email(email_to("b@x.com", None)).await.unwrap();

        let result = svc.queue.process_queue(10).await.unwrap();

        assert!(!result.success);
        assert_eq!(result.processed, 3);
        assert_eq!(result.sent, 2);
        assert_eq!(result.failed, 1);
        assert_eq!(result.errors[0].queue_id, bad);
        assert_eq!(result.errors[0].recipient_email, "broken@x.com");
        assert!(result.errors[0].error.contains("Undecodable queue item"));
        assert_eq!(svc.provider.sent().len(), 2);

        let (status, error) = raw_queue_status(&svc.pool, &bad).await;
        assert_eq!(status, "failed");
        assert!(error.is_some());

        // La fila rota ya no bloquea los siguientes batches
        svc.queue.queue_email(email_to("c@x.com", None)).await.unwrap();
        let next = svc.queue.process_queue(10).await.unwrap();
        assert!(next.success);
        assert_eq!(next.sent, 1);
        assert_eq!(count_queue_status(&svc.pool, "pending").await, 0);
    }

    #[actix_rt::test]
    async fn missing_queue_item_is_typed_not_found() {
        let svc = test_services().await;
        let err = svc.queue.get_queue_item("nope").await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<QueueError>(),
            Some(&QueueError::NotFound("nope".to_string()))
        );
    }

    #[actix_rt::test]
    async fn list_queue_handles_extreme_pages() {
        let svc = test_services().await;
        for i in 0..3 {
            svc.queue
                .queue_email(email_to(&format!("r{i}@x.com"), None))
                .await
                .unwrap();
        }

        let far = svc.queue.list_queue(None, u64::MAX, 2).await.unwrap();
        assert_eq!(far.total, 3);
        assert!(far.items.is_empty());

        let huge = svc.queue.list_queue(None, 1, u64::MAX).await.unwrap();
        assert_eq!(huge.page_size, MAX_PAGE_SIZE);
        assert_eq!(huge.items.len(), 3);

        let campaigns = svc.campaigns.list_campaigns(u64::MAX, u64::MAX).await.unwrap();
        assert!(campaigns.items.is_empty());
    }
}
