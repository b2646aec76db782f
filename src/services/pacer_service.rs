//! services/pacer_service.rs
//! Espera mínima entre acciones salientes y cool-downs impuestos por la plataforma.
//! Cada worker tiene su propio pacer: suspender uno no afecta a los demás.

use std::time::Duration;
use tokio::sync::watch;

use crate::models::platform_model::{CampaignError, CampaignResult};

/// Canal de apagado compartido. `true` = abandonar las esperas en curso.
pub fn shutdown_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

#[derive(Debug, Clone)]
pub struct RatePacer {
    shutdown: watch::Receiver<bool>,
}

impl RatePacer {
    pub fn new(shutdown: watch::Receiver<bool>) -> Self {
        RatePacer { shutdown }
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Suspende al worker `base_delay` antes de la siguiente acción.
    pub async fn wait_between_actions(&mut self, base_delay: Duration) -> CampaignResult<()> {
        self.suspend(base_delay).await
    }

    /// Cool-down obligatorio indicado por la plataforma.
    pub async fn handle_rate_limit_signal(&mut self, seconds: u64) -> CampaignResult<()> {
        log::warn!("(handle_rate_limit_signal) Flood wait de {} segundos", seconds);
        self.suspend(Duration::from_secs(seconds)).await
    }

    async fn suspend(&mut self, duration: Duration) -> CampaignResult<()> {
        if self.is_shutdown() {
            return Err(CampaignError::Interrupted);
        }
        if duration.is_zero() {
            return Ok(());
        }

        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = wait_for_shutdown(&mut self.shutdown) => {
                log::info!("(RatePacer::suspend) Espera abandonada por apagado");
                Err(CampaignError::Interrupted)
            }
        }
    }
}

async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            // Sin emisor nadie puede pedir apagado
            std::future::pending::<()>().await;
        }
    }
}
