//! tests/support.rs
//! Helpers compartidos por las pruebas.

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;

use crate::config::pacing_config::PacingConfig;
use crate::models::account_model::AccountSession;
use crate::models::campaign_model::TargetIdentity;
use crate::services::campaign_service::CampaignService;
use crate::services::ledger_service::LedgerService;
use crate::services::pacer_service::shutdown_channel;
use crate::services::simulated_platform::SimulatedPlatform;

pub fn account(phone: &str) -> AccountSession {
    AccountSession {
        phone: phone.to_string(),
        api_id: 12345,
        api_hash: "0123456789abcdef".to_string(),
        session_path: format!("sessions/{0}/{0}", phone),
    }
}

pub fn ids(values: &[i64]) -> Vec<TargetIdentity> {
    values.iter().map(|v| TargetIdentity::Id(*v)).collect()
}

/// Servicio con pacing inmediato sobre un directorio temporal.
pub fn campaign_service(
    platform: &SimulatedPlatform,
    data_dir: &Path,
) -> (CampaignService, watch::Sender<bool>) {
    let (tx, rx) = shutdown_channel();
    let service = CampaignService::new(
        Arc::new(platform.clone()),
        LedgerService::new(data_dir),
        PacingConfig::immediate(),
        rx,
    );
    (service, tx)
}

pub async fn service_pool(data_dir: &Path) -> Pool<Sqlite> {
    let options = SqliteConnectOptions::new()
        .filename(data_dir.join("service.db"))
        .create_if_missing(true);
    let pool = Pool::<Sqlite>::connect_with(options)
        .await
        .expect("Failed to open test database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}
