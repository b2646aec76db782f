//! services/campaign_service.rs
//! Orquestador: reparte destinos entre cuentas, corre un worker por cuenta
//! de forma concurrente y agrega los resultados.

use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::watch;

use crate::config::pacing_config::PacingConfig;
use crate::models::account_model::AccountSession;
use crate::models::campaign_model::{
    BroadcastReport, CampaignAction, CampaignReport, TargetIdentity, WorkerReport,
};
use crate::models::platform_model::{CampaignError, CampaignResult, EntityHandle};
use crate::services::ledger_service::LedgerService;
use crate::services::pacer_service::RatePacer;
use crate::services::partition_service::partition;
use crate::services::platform_client::PlatformConnector;
use crate::services::worker_service::AccountWorker;

/// Tope de pasadas por difusión; no hay difusión sin fin.
pub const MAX_BROADCAST_PASSES: u32 = 24;

#[derive(Clone)]
pub struct CampaignService {
    connector: Arc<dyn PlatformConnector>,
    ledgers: LedgerService,
    pacing: PacingConfig,
    shutdown: watch::Receiver<bool>,
}

impl CampaignService {
    pub fn new(
        connector: Arc<dyn PlatformConnector>,
        ledgers: LedgerService,
        pacing: PacingConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            connector,
            ledgers,
            pacing,
            shutdown,
        }
    }

    /// Corre la campaña. Con una sola cuenta no se particiona.
    pub async fn run_campaign(
        &self,
        accounts: &[AccountSession],
        targets: &[TargetIdentity],
        action: &CampaignAction,
    ) -> CampaignResult<CampaignReport> {
        if accounts.is_empty() {
            return Err(CampaignError::InvalidInput(
                "Se requiere al menos una cuenta".to_string(),
            ));
        }
        log::info!(
            "(run_campaign) '{}' con {} cuentas y {} destinos",
            action.action_type(),
            accounts.len(),
            targets.len()
        );

        let reports = if let [account] = accounts {
            vec![self.run_account(account, targets, action).await]
        } else {
            let slices = partition(targets, accounts.len())?;
            let workers = accounts
                .iter()
                .zip(slices.iter())
                .map(|(account, slice)| self.run_account(account, slice, action));
            join_all(workers).await
        };

        let report = CampaignReport::from_workers(reports);
        log::info!(
            "(run_campaign) Finalizado: enviados={} omitidos={} fallidos={}",
            report.total_sent,
            report.counts.skipped_already_contacted
                + report.counts.skipped_already_member
                + report.counts.skipped_privacy_restricted,
            report.counts.failed + report.counts.deferred_flood_wait
        );
        Ok(report)
    }

    /// Un error de conexión o del ledger sólo anula la porción de esta cuenta.
    async fn run_account(
        &self,
        account: &AccountSession,
        targets: &[TargetIdentity],
        action: &CampaignAction,
    ) -> WorkerReport {
        if targets.is_empty() {
            log::info!("(run_account) {} sin destinos asignados", account.phone);
            return WorkerReport::new(&account.phone, 0);
        }

        let worker = match self.build_worker(account).await {
            Ok(worker) => worker,
            Err(e) => {
                log::error!("(run_account) Cuenta {} descartada: {}", account.phone, e);
                return WorkerReport::failed(&account.phone, targets.len(), e.to_string());
            }
        };
        worker.run(targets, action).await
    }

    /// Une una cuenta a una lista de grupos.
    pub async fn join_groups(
        &self,
        account: &AccountSession,
        groups: &[String],
    ) -> CampaignResult<usize> {
        let worker = self.build_worker(account).await?;
        Ok(worker.join_groups(groups).await)
    }

    /// Todos los miembros actuales de un grupo, vistos desde una cuenta.
    pub async fn scrape_members(
        &self,
        account: &AccountSession,
        group: &str,
    ) -> CampaignResult<Vec<EntityHandle>> {
        let worker = self.build_worker(account).await?;
        worker.scrape_members(group).await
    }

    /// Difunde un mensaje a una lista de grupos durante `passes` pasadas.
    pub async fn broadcast(
        &self,
        account: &AccountSession,
        groups: &[String],
        text: &str,
        passes: u32,
    ) -> CampaignResult<BroadcastReport> {
        if passes == 0 || passes > MAX_BROADCAST_PASSES {
            return Err(CampaignError::InvalidInput(format!(
                "'passes' debe estar entre 1 y {}",
                MAX_BROADCAST_PASSES
            )));
        }
        if text.trim().is_empty() {
            return Err(CampaignError::InvalidInput(
                "El mensaje no puede estar vacío".to_string(),
            ));
        }
        let worker = self.build_worker(account).await?;
        Ok(worker.broadcast(groups, text, passes).await)
    }

    async fn build_worker(&self, account: &AccountSession) -> CampaignResult<AccountWorker> {
        let client = self.connector.connect(account).await?;
        let ledger = match self.ledgers.open(&account.phone).await {
            Ok(ledger) => ledger,
            Err(e) => {
                client.disconnect().await;
                return Err(CampaignError::Storage(e));
            }
        };
        Ok(AccountWorker::new(
            &account.phone,
            client,
            ledger,
            RatePacer::new(self.shutdown.clone()),
            self.pacing.clone(),
        ))
    }
}
