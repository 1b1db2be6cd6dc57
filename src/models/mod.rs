//! models/mod.rs
//! Módulo raíz para modelos/estructuras compartidas.

pub mod campaign_model;
pub mod chat_model;
pub mod email_model;
pub mod queue_model;
pub mod template_model;
pub mod tracking_model;
