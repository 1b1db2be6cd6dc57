//! services/chat_cards.rs
//! Constructores de tarjetas CardsV2. Funciones puras: solo interpolan texto
//! y eligen emoji/icono según el estado.

use uuid::Uuid;

use crate::models::chat_model::{
    Button, Card, CardHeader, CardSection, CardV2, ChatMessage, DecoratedText,
    FactoryReviewDecision, FactoryReviewNotice, Icon, NudgeUrgency, QcInspectionNotice, QcStatus,
    SupervisorNudge, Widget,
};

fn card_message(card_id: String, header: CardHeader, sections: Vec<CardSection>) -> ChatMessage {
    ChatMessage {
        cards_v2: Some(vec![CardV2 {
            card_id,
            card: Card {
                header: Some(header),
                sections,
            },
        }]),
        ..Default::default()
    }
}

fn field(label: &str, value: impl Into<String>, icon: &str) -> Widget {
    Widget::DecoratedText(DecoratedText {
        top_label: Some(label.to_string()),
        text: value.into(),
        bottom_label: None,
        start_icon: Some(Icon {
            known_icon: icon.to_string(),
        }),
    })
}

fn dashboard_link(base_url: &str, path: &str, id: &str) -> String {
    format!(
        "{}/{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_matches('/'),
        urlencoding::encode(id)
    )
}

/// Tarjeta genérica de una sola sección
pub fn create_card_v2_message(
    title: &str,
    subtitle: Option<&str>,
    text: &str,
    button: Option<(&str, &str)>,
) -> ChatMessage {
    let mut widgets = vec![Widget::TextParagraph {
        text: text.to_string(),
    }];
    if let Some((label, url)) = button {
        widgets.push(Widget::ButtonList {
            buttons: vec![Button::link(label, url)],
        });
    }

    card_message(
        format!("card-{}", Uuid::new_v4()),
        CardHeader {
            title: title.to_string(),
            subtitle: subtitle.map(str::to_string),
            image_url: None,
            image_type: None,
        },
        vec![CardSection {
            header: None,
            collapsible: None,
            widgets,
        }],
    )
}

pub fn qc_status_label(status: QcStatus) -> (&'static str, &'static str) {
    match status {
        QcStatus::Passed => ("✅", "Passed"),
        QcStatus::Failed => ("❌", "Failed"),
        QcStatus::PendingReview => ("⏳", "Pending review"),
        QcStatus::NeedsRework => ("🔧", "Needs rework"),
    }
}

pub fn qc_inspection_card(notice: &QcInspectionNotice, base_url: &str) -> ChatMessage {
    let (emoji, label) = qc_status_label(notice.status);

    let mut details = vec![
        field("Factory", notice.factory_name.clone(), "STORE"),
        field("Status", format!("{emoji} {label}"), "BOOKMARK"),
        field("Defects found", notice.defects_found.to_string(), "DESCRIPTION"),
    ];
    if let Some(inspector) = &notice.inspector {
        details.push(field("Inspector", inspector.clone(), "PERSON"));
    }

    let mut sections = vec![CardSection {
        header: Some("Inspection details".to_string()),
        collapsible: None,
        widgets: details,
    }];

    if let Some(notes) = notice.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        sections.push(CardSection {
            header: Some("Notes".to_string()),
            collapsible: Some(true),
            widgets: vec![Widget::TextParagraph {
                text: notes.to_string(),
            }],
        });
    }

    sections.push(CardSection {
        header: None,
        collapsible: None,
        widgets: vec![Widget::ButtonList {
            buttons: vec![Button::link(
                "Open inspection",
                dashboard_link(base_url, "qc/inspections", &notice.inspection_id),
            )],
        }],
    });

    card_message(
        format!("qc-{}", notice.inspection_id),
        CardHeader {
            title: format!("{emoji} QC inspection: {}", notice.product_name),
            subtitle: Some(format!("Inspection {}", notice.inspection_id)),
            image_url: None,
            image_type: None,
        },
        sections,
    )
}

pub fn factory_review_label(decision: FactoryReviewDecision) -> (&'static str, &'static str) {
    match decision {
        FactoryReviewDecision::Approved => ("🟢", "Approved"),
        FactoryReviewDecision::Rejected => ("🔴", "Rejected"),
        FactoryReviewDecision::ChangesRequested => ("🟠", "Changes requested"),
        FactoryReviewDecision::PendingReview => ("🟡", "Pending review"),
    }
}

pub fn factory_review_card(notice: &FactoryReviewNotice, base_url: &str) -> ChatMessage {
    let (emoji, label) = factory_review_label(notice.decision);

    let mut widgets = vec![field("Decision", format!("{emoji} {label}"), "BOOKMARK")];
    if let Some(reviewer) = &notice.reviewer {
        widgets.push(field("Reviewer", reviewer.clone(), "PERSON"));
    }
    if let Some(rating) = notice.rating {
        widgets.push(field("Rating", format!("{rating:.1} / 5"), "STAR"));
    }
    if let Some(summary) = notice.summary.as_deref().filter(|s| !s.trim().is_empty()) {
        widgets.push(Widget::Divider {});
        widgets.push(Widget::TextParagraph {
            text: summary.to_string(),
        });
    }
    widgets.push(Widget::ButtonList {
        buttons: vec![Button::link(
            "Open factory",
            dashboard_link(base_url, "factories", &notice.factory_id),
        )],
    });

    card_message(
        format!("factory-review-{}", notice.factory_id),
        CardHeader {
            title: format!("{emoji} Factory review: {}", notice.factory_name),
            subtitle: Some(label.to_string()),
            image_url: None,
            image_type: None,
        },
        vec![CardSection {
            header: None,
            collapsible: None,
            widgets,
        }],
    )
}

pub fn nudge_urgency_label(urgency: NudgeUrgency) -> (&'static str, &'static str) {
    match urgency {
        NudgeUrgency::Low => ("ℹ️", "Low"),
        NudgeUrgency::Normal => ("📋", "Normal"),
        NudgeUrgency::High => ("⚠️", "High"),
        NudgeUrgency::Critical => ("🚨", "Critical"),
    }
}

pub fn supervisor_nudge_card(nudge: &SupervisorNudge, base_url: &str) -> ChatMessage {
    let (emoji, label) = nudge_urgency_label(nudge.urgency);
    let total: u32 = nudge.pending_items.iter().map(|i| i.count).sum();

    let mut widgets: Vec<Widget> = Vec::new();
    if let Some(message) = nudge.message.as_deref().filter(|m| !m.trim().is_empty()) {
        widgets.push(Widget::TextParagraph {
            text: message.to_string(),
        });
    }
    widgets.extend(
        nudge
            .pending_items
            .iter()
            .filter(|item| item.count > 0)
            .map(|item| field(&item.label, item.count.to_string(), "CLOCK")),
    );
    widgets.push(Widget::ButtonList {
        buttons: vec![Button::link(
            "Review pending items",
            format!("{}/dashboard/pending", base_url.trim_end_matches('/')),
        )],
    });

    card_message(
        format!("nudge-{}", Uuid::new_v4()),
        CardHeader {
            title: format!("{emoji} Reminder for {}", nudge.supervisor_name),
            subtitle: Some(format!("{total} pending item(s) · urgency {label}")),
            image_url: None,
            image_type: None,
        },
        vec![CardSection {
            header: Some("Pending".to_string()),
            collapsible: None,
            widgets,
        }],
    )
}
