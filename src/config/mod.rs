//! config/mod.rs
//! Configuración global del servicio (rutas, servidor y ritmo de envío).

pub mod app_config;
pub mod pacing_config;
