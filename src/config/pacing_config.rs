//! config/pacing_config.rs
//! Tiempos de espera entre acciones salientes y política ante "flood wait".

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::models::campaign_model::CampaignAction;

/// Ritmo de envío por tipo de acción, con valores por defecto
/// (podría venir de .env, ver `AppConfig::from_env`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PacingConfig {
    pub invite_delay: Duration,  // después de cada invitación exitosa
    pub message_delay: Duration, // después de cada mensaje directo exitoso
    pub join_delay: Duration,    // después de cada unión a grupo
    pub member_page_delay: Duration, // entre páginas al listar miembros
    pub broadcast_message_delay: Duration, // entre grupos dentro de una pasada
    pub broadcast_interval: Duration,      // entre pasadas de difusión
    /// Reintentos permitidos tras una señal de rate-limit para el mismo destino.
    pub max_retries: u32,
    /// Tamaño de página al listar miembros de un grupo.
    pub member_page_size: usize,
}

impl Default for PacingConfig {
    fn default() -> Self {
        PacingConfig {
            invite_delay: Duration::from_secs(10),
            message_delay: Duration::from_secs(5),
            join_delay: Duration::from_secs(20),
            member_page_delay: Duration::from_secs(1),
            broadcast_message_delay: Duration::from_secs(1),
            broadcast_interval: Duration::from_secs(3600),
            max_retries: 1,
            member_page_size: 200,
        }
    }
}

impl PacingConfig {
    /// Sin esperas entre acciones. Mantiene la política de reintentos por defecto.
    pub fn immediate() -> Self {
        PacingConfig {
            invite_delay: Duration::ZERO,
            message_delay: Duration::ZERO,
            join_delay: Duration::ZERO,
            member_page_delay: Duration::ZERO,
            broadcast_message_delay: Duration::ZERO,
            broadcast_interval: Duration::ZERO,
            ..Default::default()
        }
    }

    /// Pausa tras cada acción exitosa del tipo dado.
    pub fn delay_for(&self, action: &CampaignAction) -> Duration {
        match action {
            CampaignAction::Invite { .. } => self.invite_delay,
            CampaignAction::DirectMessage { .. } => self.message_delay,
        }
    }
}
