//! errors.rs
//! Errores de dominio que los handlers necesitan distinguir.
//! Viajan dentro de `anyhow::Error` y se recuperan con `downcast_ref`.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Missing template variable: {0}")]
    MissingVariable(String),

    #[error("Missing template variables: {}", .0.join(", "))]
    MissingVariables(Vec<String>),

    #[error("Email template not found: {0}")]
    NotFound(String),

    #[error("Invalid template: {0}")]
    Invalid(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CampaignError {
    #[error("Campaign not found: {0}")]
    NotFound(String),

    #[error("Campaign already sent")]
    AlreadySent,

    #[error("Campaign already cancelled")]
    AlreadyCancelled,

    #[error("Campaign needs either email_template or template_key")]
    MissingTemplate,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("Email queue item not found: {0}")]
    NotFound(String),
}
