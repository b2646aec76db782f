//! services/platform_client.rs
//! Capacidades que el núcleo consume del cliente de la plataforma de chat.
//! El transporte real (sesión, cifrado, RPC) vive fuera de este servicio.

use async_trait::async_trait;

use crate::models::account_model::AccountSession;
use crate::models::campaign_model::TargetIdentity;
use crate::models::platform_model::{EntityHandle, PlatformError};

/// Una conexión autenticada de una cuenta. La posee un único worker.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    async fn resolve(&self, target: &TargetIdentity) -> Result<EntityHandle, PlatformError>;

    async fn resolve_group(&self, group: &str) -> Result<EntityHandle, PlatformError>;

    async fn join(&self, group: &str) -> Result<(), PlatformError>;

    async fn invite(
        &self,
        group: &EntityHandle,
        users: &[EntityHandle],
    ) -> Result<(), PlatformError>;

    async fn send_message(&self, user: &EntityHandle, text: &str) -> Result<(), PlatformError>;

    /// Página de miembros; vacía cuando no hay más.
    async fn list_members(
        &self,
        group: &EntityHandle,
        offset: usize,
        page_size: usize,
    ) -> Result<Vec<EntityHandle>, PlatformError>;

    async fn disconnect(&self);
}

/// Abre una conexión autenticada para una cuenta.
#[async_trait]
pub trait PlatformConnector: Send + Sync {
    async fn connect(
        &self,
        account: &AccountSession,
    ) -> Result<Box<dyn PlatformClient>, PlatformError>;
}
