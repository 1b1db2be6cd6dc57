//! models/chat_model.rs
//! Mensajes de Google Chat (webhook entrante) y los avisos de dominio
//! que se convierten en tarjetas CardsV2.

use serde::{Deserialize, Serialize};

/// Body del webhook: `{text?, cards?, cardsV2?}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Formato v1 legado, se reenvía tal cual
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cards: Option<Vec<serde_json::Value>>,
    #[serde(default, rename = "cardsV2", skip_serializing_if = "Option::is_none")]
    pub cards_v2: Option<Vec<CardV2>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardV2 {
    pub card_id: String,
    pub card: Card,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<CardHeader>,
    pub sections: Vec<CardSection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardHeader {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collapsible: Option<bool>,
    pub widgets: Vec<Widget>,
}

/// Cada widget es un objeto con una sola clave: `{"textParagraph": {...}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Widget {
    TextParagraph { text: String },
    DecoratedText(DecoratedText),
    ButtonList { buttons: Vec<Button> },
    Divider {},
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecoratedText {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_label: Option<String>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottom_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_icon: Option<Icon>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Icon {
    pub known_icon: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Button {
    pub text: String,
    pub on_click: OnClick,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnClick {
    pub open_link: OpenLink,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenLink {
    pub url: String,
}

impl Button {
    pub fn link(text: impl Into<String>, url: impl Into<String>) -> Self {
        Button {
            text: text.into(),
            on_click: OnClick {
                open_link: OpenLink { url: url.into() },
            },
        }
    }
}

/// Request del endpoint de chat
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessageRequest {
    pub webhook_url: Option<String>,
    pub message: ChatMessage,
    /// Por defecto, la propia URL del webhook
    pub rate_limit_key: Option<String>,
}

/// Tarjeta simple (una sección) armada en el servidor
#[derive(Debug, Clone, Deserialize)]
pub struct SimpleCardRequest {
    pub webhook_url: Option<String>,
    pub rate_limit_key: Option<String>,
    pub title: String,
    pub subtitle: Option<String>,
    pub text: String,
    pub button_text: Option<String>,
    pub button_url: Option<String>,
}

/// Nunca es un error: la notificación no debe bloquear la operación de negocio
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatSendResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatSendResult {
    pub fn ok() -> Self {
        ChatSendResult {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        ChatSendResult {
            success: false,
            error: Some(error.into()),
        }
    }
}

// ----------------------------------------------------------------
// Avisos de dominio (QC, revisión de fábrica, recordatorio a supervisor)
// ----------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QcStatus {
    Passed,
    Failed,
    PendingReview,
    NeedsRework,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QcInspectionNotice {
    pub inspection_id: String,
    pub product_name: String,
    pub factory_name: String,
    pub status: QcStatus,
    pub inspector: Option<String>,
    pub defects_found: u32,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactoryReviewDecision {
    Approved,
    Rejected,
    ChangesRequested,
    PendingReview,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactoryReviewNotice {
    pub factory_id: String,
    pub factory_name: String,
    pub decision: FactoryReviewDecision,
    pub reviewer: Option<String>,
    pub rating: Option<f32>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NudgeUrgency {
    Low,
    Normal,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NudgeItem {
    pub label: String,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorNudge {
    pub supervisor_name: String,
    pub urgency: NudgeUrgency,
    pub message: Option<String>,
    pub pending_items: Vec<NudgeItem>,
}
