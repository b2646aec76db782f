//! models/platform_model.rs
//! Tipos que intercambia el núcleo con el cliente de la plataforma de chat.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Entidad resuelta por la plataforma (usuario o grupo).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntityHandle {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl EntityHandle {
    pub fn new(id: i64) -> Self {
        EntityHandle {
            id,
            username: None,
            first_name: None,
            last_name: None,
        }
    }

    /// Nombre legible para logs: "@usuario" si existe, si no "Nombre Apellido", si no el id.
    pub fn display_name(&self) -> String {
        if let Some(username) = &self.username {
            return format!("@{}", username);
        }
        let full = format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        );
        let full = full.trim();
        if full.is_empty() {
            self.id.to_string()
        } else {
            full.to_string()
        }
    }
}

/// Errores que reporta el cliente de la plataforma.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlatformError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Rate limited, must wait {0} seconds")]
    RateLimited(u64),

    #[error("Target has privacy restrictions")]
    PrivacyRestricted,

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Platform error: {0}")]
    Other(String),
}

/// Errores que el núcleo de campañas devuelve a quien lo llama.
#[derive(Error, Debug)]
pub enum CampaignError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),

    #[error("Platform error: {0}")]
    Connection(#[from] PlatformError),

    #[error("Interrupted by shutdown signal")]
    Interrupted,
}

pub type CampaignResult<T> = Result<T, CampaignError>;
