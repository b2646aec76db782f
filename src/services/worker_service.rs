//! services/worker_service.rs
//! Worker de una cuenta: recorre su porción de destinos en orden, consultando
//! el ledger y el pacer, y convierte cada error por destino en un `ActionOutcome`.
//! Un error de conexión termina el worker.

use chrono::Utc;
use std::collections::HashSet;

use crate::config::pacing_config::PacingConfig;
use crate::models::campaign_model::{
    ActionOutcome, BroadcastReport, CampaignAction, TargetIdentity, WorkerReport,
};
use crate::models::platform_model::{CampaignError, CampaignResult, EntityHandle, PlatformError};
use crate::services::ledger_service::ContactLedger;
use crate::services::pacer_service::RatePacer;
use crate::services::platform_client::PlatformClient;

/// Acción ya preparada (grupo resuelto, miembros actuales cargados).
enum PreparedAction<'a> {
    Invite {
        group: EntityHandle,
        member_ids: HashSet<i64>,
    },
    Message {
        text: &'a str,
    },
}

/// Resultado de un destino. `performed` indica que la acción saliente
/// llegó a la plataforma, aunque luego fallara el ledger.
struct TargetStep {
    outcome: ActionOutcome,
    detail: Option<String>,
    performed: bool,
}

impl TargetStep {
    fn skipped(outcome: ActionOutcome) -> Self {
        TargetStep {
            outcome,
            detail: None,
            performed: false,
        }
    }

    fn not_performed(outcome: ActionOutcome, detail: String) -> Self {
        TargetStep {
            outcome,
            detail: Some(detail),
            performed: false,
        }
    }
}

pub struct AccountWorker {
    phone: String,
    client: Box<dyn PlatformClient>,
    ledger: ContactLedger,
    pacer: RatePacer,
    pacing: PacingConfig,
}

impl AccountWorker {
    pub fn new(
        phone: &str,
        client: Box<dyn PlatformClient>,
        ledger: ContactLedger,
        pacer: RatePacer,
        pacing: PacingConfig,
    ) -> Self {
        AccountWorker {
            phone: phone.to_string(),
            client,
            ledger,
            pacer,
            pacing,
        }
    }

    /// Procesa los destinos estrictamente en orden. Consume el worker y
    /// libera la conexión al terminar (también si fue interrumpido).
    pub async fn run(mut self, targets: &[TargetIdentity], action: &CampaignAction) -> WorkerReport {
        let mut report = WorkerReport::new(&self.phone, targets.len());
        log::info!(
            "(AccountWorker::run) Cuenta {} inicia '{}' con {} destinos",
            self.phone,
            action.action_type(),
            targets.len()
        );

        let prepared = match self.prepare(action).await {
            Ok(p) => p,
            Err(CampaignError::Interrupted) => {
                report.interrupted = true;
                self.finish().await;
                return report;
            }
            Err(e) => {
                log::error!(
                    "(AccountWorker::run) Cuenta {} no pudo preparar la acción: {}",
                    self.phone,
                    e
                );
                report.error = Some(e.to_string());
                self.finish().await;
                return report;
            }
        };
        let delay = self.pacing.delay_for(action);

        for target in targets {
            if self.pacer.is_shutdown() {
                report.interrupted = true;
                break;
            }

            let step = match self.process_target(target, &prepared).await {
                Ok(step) => step,
                Err(e) => {
                    log::error!(
                        "(AccountWorker::run) Cuenta {} perdió la conexión en {}: {}",
                        self.phone,
                        target,
                        e
                    );
                    report.error = Some(e.to_string());
                    break;
                }
            };
            self.log_outcome(target, step.outcome, step.detail.as_deref());
            report.push(target, step.outcome, step.detail);

            // La pausa aplica a toda acción que llegó a la plataforma
            if step.performed {
                if let Err(CampaignError::Interrupted) =
                    self.pacer.wait_between_actions(delay).await
                {
                    report.interrupted = true;
                    break;
                }
            }
        }

        if report.interrupted {
            log::warn!(
                "(AccountWorker::run) Cuenta {} interrumpida tras {}/{} destinos",
                self.phone,
                report.outcomes.len(),
                targets.len()
            );
        }
        log::info!(
            "(AccountWorker::run) Cuenta {} terminó: enviados={}",
            self.phone,
            report.sent
        );
        self.finish().await;
        report
    }

    /// Une la cuenta a cada grupo en orden, con la pausa de join tras cada éxito.
    /// Devuelve cuántos grupos se unieron.
    pub async fn join_groups(mut self, groups: &[String]) -> usize {
        let mut joined = 0;
        for group in groups {
            if self.pacer.is_shutdown() {
                break;
            }
            match self.client.join(group).await {
                Ok(()) => {
                    log::info!("(join_groups) {} se unió a {}", self.phone, group);
                    joined += 1;
                    if self
                        .pacer
                        .wait_between_actions(self.pacing.join_delay)
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Err(PlatformError::RateLimited(seconds)) => {
                    log::warn!(
                        "(join_groups) {} limitado al unirse a {} ({}s)",
                        self.phone,
                        group,
                        seconds
                    );
                    if self.pacer.handle_rate_limit_signal(seconds).await.is_err() {
                        break;
                    }
                }
                Err(e @ PlatformError::Connection(_)) => {
                    log::error!("(join_groups) {} perdió la conexión: {}", self.phone, e);
                    break;
                }
                Err(e) => {
                    log::error!("(join_groups) {} no pudo unirse a {}: {}", self.phone, group, e)
                }
            }
        }
        self.finish().await;
        joined
    }

    /// Lista todos los miembros de un grupo, página por página.
    pub async fn scrape_members(mut self, group: &str) -> CampaignResult<Vec<EntityHandle>> {
        let result = match self.client.resolve_group(group).await {
            Ok(handle) => self.list_all_members(&handle).await,
            Err(e) => Err(CampaignError::from(e)),
        };
        self.finish().await;

        let members = result?;
        log::info!(
            "(scrape_members) {} obtuvo {} miembros de {}",
            self.phone,
            members.len(),
            group
        );
        Ok(members)
    }

    /// Envía `text` a cada grupo, `passes` veces, con pausa entre grupos y
    /// entre pasadas. Un grupo que falla no detiene la pasada.
    pub async fn broadcast(mut self, groups: &[String], text: &str, passes: u32) -> BroadcastReport {
        let mut report = BroadcastReport::new(&self.phone);

        'passes: for pass in 1..=passes {
            for group in groups {
                if self.pacer.is_shutdown() {
                    report.interrupted = true;
                    break 'passes;
                }
                match self.send_to_group(group, text).await {
                    Ok(()) => {
                        report.sent += 1;
                        if self
                            .pacer
                            .wait_between_actions(self.pacing.broadcast_message_delay)
                            .await
                            .is_err()
                        {
                            report.interrupted = true;
                            break 'passes;
                        }
                    }
                    Err(PlatformError::RateLimited(seconds)) => {
                        report.failed += 1;
                        log::warn!(
                            "(broadcast) {} limitado en {} ({}s), se omite en esta pasada",
                            self.phone,
                            group,
                            seconds
                        );
                        if self.pacer.handle_rate_limit_signal(seconds).await.is_err() {
                            report.interrupted = true;
                            break 'passes;
                        }
                    }
                    Err(e @ PlatformError::Connection(_)) => {
                        log::error!("(broadcast) {} perdió la conexión: {}", self.phone, e);
                        report.error = Some(e.to_string());
                        break 'passes;
                    }
                    Err(e) => {
                        report.failed += 1;
                        log::error!("(broadcast) {} no pudo enviar a {}: {}", self.phone, group, e);
                    }
                }
            }
            report.passes_completed = pass;
            log::info!(
                "(broadcast) {} completó la pasada {}/{}",
                self.phone,
                pass,
                passes
            );

            if pass < passes
                && self
                    .pacer
                    .wait_between_actions(self.pacing.broadcast_interval)
                    .await
                    .is_err()
            {
                report.interrupted = true;
                break;
            }
        }

        self.finish().await;
        report
    }

    async fn send_to_group(&self, group: &str, text: &str) -> Result<(), PlatformError> {
        let handle = self.client.resolve_group(group).await?;
        log::info!(
            "(broadcast) {} envía a {} [id:{}]",
            self.phone,
            handle.display_name(),
            handle.id
        );
        self.client.send_message(&handle, text).await
    }

    async fn prepare<'a>(
        &mut self,
        action: &'a CampaignAction,
    ) -> CampaignResult<PreparedAction<'a>> {
        match action {
            CampaignAction::DirectMessage { text } => Ok(PreparedAction::Message {
                text: text.as_str(),
            }),
            CampaignAction::Invite { group } => {
                if let Err(e) = self.client.join(group).await {
                    log::warn!("(prepare) {} no pudo unirse a {}: {}", self.phone, group, e);
                }
                let group_handle = self.client.resolve_group(group).await?;
                let member_ids: HashSet<i64> = match self.list_all_members(&group_handle).await {
                    Ok(members) => members.iter().map(|m| m.id).collect(),
                    Err(CampaignError::Interrupted) => return Err(CampaignError::Interrupted),
                    Err(e) => {
                        log::warn!(
                            "(prepare) No se pudieron listar miembros de {}: {}",
                            group,
                            e
                        );
                        HashSet::new()
                    }
                };
                log::info!(
                    "(prepare) Grupo {} tiene {} miembros actuales",
                    group_handle.display_name(),
                    member_ids.len()
                );
                Ok(PreparedAction::Invite {
                    group: group_handle,
                    member_ids,
                })
            }
        }
    }

    async fn list_all_members(&mut self, group: &EntityHandle) -> CampaignResult<Vec<EntityHandle>> {
        let page_size = self.pacing.member_page_size.max(1);
        let mut members = Vec::new();
        loop {
            let page = self
                .client
                .list_members(group, members.len(), page_size)
                .await?;
            if page.is_empty() {
                break;
            }
            members.extend(page);
            self.pacer
                .wait_between_actions(self.pacing.member_page_delay)
                .await?;
        }
        Ok(members)
    }

    /// `Err` sólo ante pérdida de conexión; el resto termina en un `TargetStep`.
    async fn process_target(
        &mut self,
        target: &TargetIdentity,
        prepared: &PreparedAction<'_>,
    ) -> Result<TargetStep, PlatformError> {
        // 1) Resolver
        let entity = match self.resolve_target(target).await {
            Ok(entity) => entity,
            Err(e @ PlatformError::Connection(_)) => return Err(e),
            Err(e) => return Ok(TargetStep::not_performed(ActionOutcome::Failed, e.to_string())),
        };

        // 2) Ledger
        match self.ledger.has_contacted(target).await {
            Ok(true) => return Ok(TargetStep::skipped(ActionOutcome::SkippedAlreadyContacted)),
            Ok(false) => {}
            Err(e) => {
                return Ok(TargetStep::not_performed(
                    ActionOutcome::Failed,
                    format!("ledger: {:#}", e),
                ))
            }
        }

        if let PreparedAction::Invite { member_ids, .. } = prepared {
            if member_ids.contains(&entity.id) {
                return Ok(TargetStep::skipped(ActionOutcome::SkippedAlreadyMember));
            }
        }

        // 3) Acción con reintentos acotados ante rate-limit
        let mut retries = 0;
        loop {
            match self.perform(prepared, &entity).await {
                Ok(()) => break,
                Err(PlatformError::RateLimited(seconds)) if retries < self.pacing.max_retries => {
                    retries += 1;
                    if self.pacer.handle_rate_limit_signal(seconds).await.is_err() {
                        return Ok(TargetStep::not_performed(
                            ActionOutcome::DeferredFloodWait,
                            "cool-down interrumpido".to_string(),
                        ));
                    }
                }
                Err(PlatformError::RateLimited(seconds)) => {
                    return Ok(TargetStep::not_performed(
                        ActionOutcome::DeferredFloodWait,
                        format!("rate-limited ({}s) tras {} reintento(s)", seconds, retries),
                    ));
                }
                Err(PlatformError::PrivacyRestricted) => {
                    return Ok(TargetStep::skipped(ActionOutcome::SkippedPrivacyRestricted));
                }
                Err(e @ PlatformError::Connection(_)) => return Err(e),
                Err(e) => return Ok(TargetStep::not_performed(ActionOutcome::Failed, e.to_string())),
            }
        }

        // 4) Registrar
        let step = match self.ledger.record_contacted(target, Utc::now()).await {
            Ok(_) => TargetStep {
                outcome: ActionOutcome::Sent,
                detail: None,
                performed: true,
            },
            Err(e) => TargetStep {
                outcome: ActionOutcome::Failed,
                detail: Some(format!("acción realizada pero el ledger falló: {:#}", e)),
                performed: true,
            },
        };
        Ok(step)
    }

    /// Id numérico primero; si no se encuentra, se intenta como handle.
    async fn resolve_target(&self, target: &TargetIdentity) -> Result<EntityHandle, PlatformError> {
        match target {
            TargetIdentity::Id(id) => match self.client.resolve(target).await {
                Err(PlatformError::NotFound(_)) => {
                    self.client
                        .resolve(&TargetIdentity::Handle(id.to_string()))
                        .await
                }
                other => other,
            },
            TargetIdentity::Handle(_) => self.client.resolve(target).await,
        }
    }

    async fn perform(
        &self,
        prepared: &PreparedAction<'_>,
        entity: &EntityHandle,
    ) -> Result<(), PlatformError> {
        match prepared {
            PreparedAction::Invite { group, .. } => {
                self.client.invite(group, std::slice::from_ref(entity)).await
            }
            PreparedAction::Message { text } => self.client.send_message(entity, text).await,
        }
    }

    fn log_outcome(&self, target: &TargetIdentity, outcome: ActionOutcome, detail: Option<&str>) {
        let detail = detail.unwrap_or("");
        match outcome {
            ActionOutcome::Sent => {
                log::info!("(AccountWorker) {} -> {} enviado", self.phone, target)
            }
            ActionOutcome::Failed => {
                log::error!("(AccountWorker) {} -> {} falló: {}", self.phone, target, detail)
            }
            other => log::warn!(
                "(AccountWorker) {} -> {} {:?} {}",
                self.phone,
                target,
                other,
                detail
            ),
        }
    }

    async fn finish(&self) {
        self.client.disconnect().await;
        self.ledger.close().await;
    }
}
