use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registro de una corrida de campaña
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignRunRecord {
    pub id: String,
    pub action_type: String, // "invite", "direct_message"
    pub status: String,      // "pending", "running", "done", "failed"
    pub error_message: Option<String>,
    pub total_sent: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub report: Option<serde_json::Value>, // CampaignReport serializado
}

/// Para listar corridas con paginación
#[derive(Debug, Clone, Serialize)]
pub struct ListRunsResponse {
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub items: Vec<CampaignRunRecord>,
}
