//! models/mod.rs
//! Módulo raíz para modelos/estructuras compartidas.

pub mod account_model;
pub mod campaign_model;
pub mod contact_model;
pub mod platform_model;
pub mod run_model;
