//! models/campaign_model.rs
//! Destinos, acciones, resultados por destino y reportes de campaña.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identificador de un usuario destino: id numérico o handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetIdentity {
    Id(i64),
    Handle(String),
}

impl TargetIdentity {
    /// "12345" -> Id, "@alguien" / "alguien" -> Handle("alguien")
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(id) = raw.parse::<i64>() {
            return Some(TargetIdentity::Id(id));
        }
        let handle = raw.strip_prefix('@').unwrap_or(raw);
        if handle.is_empty() {
            None
        } else {
            Some(TargetIdentity::Handle(handle.to_string()))
        }
    }

    /// Clave estable usada en el ledger.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TargetIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetIdentity::Id(id) => write!(f, "{}", id),
            TargetIdentity::Handle(h) => write!(f, "{}", h),
        }
    }
}

/// Acción saliente que se aplica a cada destino.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CampaignAction {
    /// Invitar al destino a un grupo/canal
    Invite { group: String },
    /// Mensaje directo al destino
    DirectMessage { text: String },
}

impl CampaignAction {
    pub fn action_type(&self) -> &'static str {
        match self {
            CampaignAction::Invite { .. } => "invite",
            CampaignAction::DirectMessage { .. } => "direct_message",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOutcome {
    Sent,
    SkippedAlreadyContacted,
    SkippedAlreadyMember,
    SkippedPrivacyRestricted,
    DeferredFloodWait,
    Failed,
}

/// Resultado de un intento (cuenta, destino).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetOutcome {
    pub target: TargetIdentity,
    pub outcome: ActionOutcome,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub sent: usize,
    pub skipped_already_contacted: usize,
    pub skipped_already_member: usize,
    pub skipped_privacy_restricted: usize,
    pub deferred_flood_wait: usize,
    pub failed: usize,
}

impl OutcomeCounts {
    pub fn add(&mut self, outcome: ActionOutcome) {
        match outcome {
            ActionOutcome::Sent => self.sent += 1,
            ActionOutcome::SkippedAlreadyContacted => self.skipped_already_contacted += 1,
            ActionOutcome::SkippedAlreadyMember => self.skipped_already_member += 1,
            ActionOutcome::SkippedPrivacyRestricted => self.skipped_privacy_restricted += 1,
            ActionOutcome::DeferredFloodWait => self.deferred_flood_wait += 1,
            ActionOutcome::Failed => self.failed += 1,
        }
    }

    pub fn merge(&mut self, other: &OutcomeCounts) {
        self.sent += other.sent;
        self.skipped_already_contacted += other.skipped_already_contacted;
        self.skipped_already_member += other.skipped_already_member;
        self.skipped_privacy_restricted += other.skipped_privacy_restricted;
        self.deferred_flood_wait += other.deferred_flood_wait;
        self.failed += other.failed;
    }
}

/// Resultado de un worker (una cuenta).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerReport {
    pub phone: String,
    pub assigned: usize,
    pub sent: usize,
    pub outcomes: Vec<TargetOutcome>,
    /// Error a nivel cuenta (conexión, grupo irresoluble, storage del ledger)
    pub error: Option<String>,
    pub interrupted: bool,
}

impl WorkerReport {
    pub fn new(phone: &str, assigned: usize) -> Self {
        WorkerReport {
            phone: phone.to_string(),
            assigned,
            ..Default::default()
        }
    }

    pub fn failed(phone: &str, assigned: usize, error: String) -> Self {
        WorkerReport {
            error: Some(error),
            ..WorkerReport::new(phone, assigned)
        }
    }

    pub fn push(&mut self, target: &TargetIdentity, outcome: ActionOutcome, detail: Option<String>) {
        if outcome == ActionOutcome::Sent {
            self.sent += 1;
        }
        self.outcomes.push(TargetOutcome {
            target: target.clone(),
            outcome,
            detail,
        });
    }

    pub fn counts(&self) -> OutcomeCounts {
        let mut counts = OutcomeCounts::default();
        for o in &self.outcomes {
            counts.add(o.outcome);
        }
        counts
    }
}

/// Reporte agregado de toda la campaña.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignReport {
    pub total_sent: usize,
    pub counts: OutcomeCounts,
    pub accounts: Vec<WorkerReport>,
}

impl CampaignReport {
    pub fn from_workers(accounts: Vec<WorkerReport>) -> Self {
        let mut counts = OutcomeCounts::default();
        for w in &accounts {
            counts.merge(&w.counts());
        }
        CampaignReport {
            total_sent: accounts.iter().map(|w| w.sent).sum(),
            counts,
            accounts,
        }
    }
}

/// POST /api/campaigns
#[derive(Debug, Clone, Deserialize)]
pub struct CampaignRequest {
    /// Teléfonos de las cuentas seleccionadas
    pub phones: Vec<String>,
    /// Destinos en línea (uno por elemento) ...
    pub targets: Option<Vec<String>>,
    /// ... o el nombre de un archivo dentro de `{data_dir}/targets`,
    /// un destino por línea (primer campo CSV)
    pub target_file: Option<String>,
    pub action: CampaignAction,
    #[serde(default)]
    pub async_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CampaignResponse {
    pub success: bool,
    pub run_id: String,
    pub message: String,
    pub report: Option<CampaignReport>,
}

/// POST /api/campaigns/partition
#[derive(Debug, Clone, Deserialize)]
pub struct PartitionRequest {
    pub targets: Vec<String>,
    pub accounts: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PartitionResponse {
    pub slices: Vec<Vec<TargetIdentity>>,
}

/// POST /api/groups/join
#[derive(Debug, Clone, Deserialize)]
pub struct JoinGroupsRequest {
    pub phone: String,
    pub groups: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JoinGroupsResponse {
    pub phone: String,
    pub joined: usize,
    pub requested: usize,
}

/// POST /api/groups/members
#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeMembersRequest {
    pub phone: String,
    pub group: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScrapeMembersResponse {
    pub phone: String,
    pub group: String,
    /// Nombre del archivo en `{data_dir}/targets`, usable como `target_file`
    pub file: String,
    pub count: usize,
}

/// POST /api/groups/broadcast
#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastRequest {
    pub phone: String,
    pub groups: Vec<String>,
    pub text: String,
    pub passes: Option<u32>,
}

/// Resultado de una difusión a grupos desde una cuenta.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BroadcastReport {
    pub phone: String,
    pub passes_completed: u32,
    pub sent: usize,
    pub failed: usize,
    pub interrupted: bool,
    pub error: Option<String>,
}

impl BroadcastReport {
    pub fn new(phone: &str) -> Self {
        BroadcastReport {
            phone: phone.to_string(),
            ..Default::default()
        }
    }
}
