//! services/mod.rs
//! Módulo que agrupa distintos "servicios" o "capas de negocio" de la app.

pub mod account_service;
pub mod campaign_service;
pub mod ledger_service;
pub mod pacer_service;
pub mod partition_service;
pub mod platform_client;
pub mod run_service;
pub mod simulated_platform;
pub mod target_service;
pub mod worker_service;
