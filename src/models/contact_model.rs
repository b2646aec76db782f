use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Evidencia de contacto exitoso. Se escribe una sola vez y nunca se actualiza.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContactRecord {
    pub target_id: String,
    pub contacted_at: DateTime<Utc>,
}

/// GET /api/accounts/{phone}/contacts/{target}
#[derive(Debug, Clone, Serialize)]
pub struct ContactStatusResponse {
    pub phone: String,
    pub target_id: String,
    pub contacted: bool,
    pub contacted_at: Option<DateTime<Utc>>,
}
