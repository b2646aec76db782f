use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::models::campaign_model::CampaignReport;
use crate::models::run_model::{CampaignRunRecord, ListRunsResponse};

/// Seguimiento de corridas de campaña (tabla `campaign_runs`).
#[derive(Clone, Debug)]
pub struct CampaignRunService {
    db_pool: Pool<Sqlite>,
}

type RunRow = (
    String,
    String,
    String,
    Option<String>,
    i64,
    Option<String>,
    String,
    String,
);

const MAX_PAGE_SIZE: u64 = 100;

const RUN_COLUMNS: &str =
    "id, action_type, status, error_message, total_sent, report, created_at, updated_at";

impl CampaignRunService {
    pub fn new(db_pool: Pool<Sqlite>) -> Self {
        CampaignRunService { db_pool }
    }

    /// Corre migraciones con sqlx
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.db_pool).await?;
        Ok(())
    }

    /// Crea la corrida en DB con estado "pending"
    pub async fn create_run(&self, action_type: &str) -> Result<String> {
        let run_id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO campaign_runs (
                id, action_type, status, error_message,
                total_sent, report, created_at, updated_at
            )
            VALUES (?1, ?2, 'pending', NULL, 0, NULL, ?3, ?3)
            "#,
        )
        .bind(&run_id)
        .bind(action_type)
        .bind(now)
        .execute(&self.db_pool)
        .await
        .context("Fallo al insertar campaign_run")?;

        Ok(run_id)
    }

    pub async fn mark_running(&self, run_id: &str) -> Result<()> {
        self.update_status(run_id, "running", None).await
    }

    pub async fn mark_failed(&self, run_id: &str, error: &str) -> Result<()> {
        self.update_status(run_id, "failed", Some(error)).await
    }

    /// Guarda el reporte final y marca "done"
    pub async fn mark_done(&self, run_id: &str, report: &CampaignReport) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let report_json = serde_json::to_string(report)?;
        sqlx::query(
            r#"
            UPDATE campaign_runs
            SET status = 'done',
                error_message = NULL,
                total_sent = ?2,
                report = ?3,
                updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(run_id)
        .bind(report.total_sent as i64)
        .bind(report_json)
        .bind(now)
        .execute(&self.db_pool)
        .await
        .context("Fallo al cerrar campaign_run")?;
        Ok(())
    }

    async fn update_status(&self, run_id: &str, status: &str, error: Option<&str>) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"UPDATE campaign_runs SET status = ?2, error_message = ?3, updated_at = ?4 WHERE id = ?1"#,
        )
        .bind(run_id)
        .bind(status)
        .bind(error)
        .bind(now)
        .execute(&self.db_pool)
        .await
        .context("Fallo al actualizar el estado de campaign_run")?;
        Ok(())
    }

    pub async fn get_run(&self, run_id: &str) -> Result<CampaignRunRecord> {
        let row: RunRow = sqlx::query_as(&format!(
            "SELECT {} FROM campaign_runs WHERE id = ?1",
            RUN_COLUMNS
        ))
        .bind(run_id)
        .fetch_one(&self.db_pool)
        .await
        .context("No se encontró corrida con ese id")?;

        to_record(row)
    }

    /// Lista corridas con paginación (page empieza en 1, page_size entre 1 y 100)
    pub async fn list_runs(&self, page: u64, page_size: u64) -> Result<ListRunsResponse> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        let offset = i64::try_from((page - 1).saturating_mul(page_size)).unwrap_or(i64::MAX);

        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM campaign_runs")
            .fetch_one(&self.db_pool)
            .await?;

        let rows: Vec<RunRow> = sqlx::query_as(&format!(
            "SELECT {} FROM campaign_runs ORDER BY created_at DESC LIMIT ?1 OFFSET ?2",
            RUN_COLUMNS
        ))
        .bind(page_size as i64)
        .bind(offset)
        .fetch_all(&self.db_pool)
        .await?;

        let items = rows
            .into_iter()
            .map(to_record)
            .collect::<Result<Vec<_>>>()?;

        Ok(ListRunsResponse {
            total: total as u64,
            page,
            page_size,
            items,
        })
    }
}

fn to_record(row: RunRow) -> Result<CampaignRunRecord> {
    let (id, action_type, status, error_message, total_sent, report, created_at, updated_at) = row;
    let report = match report {
        Some(raw) => Some(serde_json::from_str(&raw).context("Reporte corrupto")?),
        None => None,
    };
    Ok(CampaignRunRecord {
        id,
        action_type,
        status,
        error_message,
        total_sent,
        report,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("Timestamp inválido: {}", raw))?
        .with_timezone(&Utc))
}
