//! handlers/mod.rs
//! Módulo que agrupa los distintos handlers (cuentas, campañas, grupos).
pub mod account_handler;
pub mod campaign_handler;
pub mod group_handler;
