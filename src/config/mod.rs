//! config/mod.rs
//! Configuración global de la app (leída del entorno).

pub mod app_config;
