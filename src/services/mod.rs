//! services/mod.rs
//! Módulo que agrupa distintos "servicios" o "capas de negocio" de la app.

pub mod campaign_service;
pub mod chat_cards;
pub mod chat_notifier;
pub mod email_provider;
pub mod email_queue_service;
pub mod template_service;
pub mod tracking_service;
