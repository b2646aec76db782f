//! services/ledger_service.rs
//! Ledger de contactos por cuenta: una base SQLite por teléfono en
//! `{data_dir}/sessions/{phone}/contacts.db`.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Pool, Sqlite};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::account_model::is_valid_phone;
use crate::models::campaign_model::TargetIdentity;
use crate::models::contact_model::ContactRecord;

/// Abre ledgers por cuenta. No comparte conexiones entre cuentas.
#[derive(Clone, Debug)]
pub struct LedgerService {
    data_dir: PathBuf,
}

impl LedgerService {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        LedgerService {
            data_dir: data_dir.into(),
        }
    }

    pub fn ledger_path(&self, phone: &str) -> Result<PathBuf> {
        if !is_valid_phone(phone) {
            return Err(anyhow!("Teléfono inválido para ledger: '{}'", phone));
        }
        Ok(self
            .data_dir
            .join("sessions")
            .join(phone)
            .join("contacts.db"))
    }

    /// Abre (o crea) el ledger de la cuenta.
    pub async fn open(&self, phone: &str) -> Result<ContactLedger> {
        let path = self.ledger_path(phone)?;
        ContactLedger::open(phone, &path).await
    }

    /// Consulta puntual para mostrar estado, abre y cierra el ledger.
    pub async fn get_record(
        &self,
        phone: &str,
        target: &TargetIdentity,
    ) -> Result<Option<ContactRecord>> {
        let ledger = self.open(phone).await?;
        let record = ledger.get_record(target).await;
        ledger.close().await;
        record
    }
}

#[derive(Clone, Debug)]
pub struct ContactLedger {
    phone: String,
    db_pool: Pool<Sqlite>,
}

impl ContactLedger {
    pub async fn open(phone: &str, path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("No se pudo crear {}", parent.display()))?;
        }

        // synchronous=FULL: el insert está en disco antes de devolver
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Full)
            .busy_timeout(Duration::from_secs(30));

        let db_pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .with_context(|| format!("No se pudo abrir el ledger {}", path.display()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS contacted_targets (
                target_id    TEXT PRIMARY KEY NOT NULL,
                contacted_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&db_pool)
        .await
        .context("Fallo creando tabla contacted_targets")?;

        log::debug!("(ContactLedger::open) Ledger de {} en {}", phone, path.display());

        Ok(ContactLedger {
            phone: phone.to_string(),
            db_pool,
        })
    }

    pub async fn has_contacted(&self, target: &TargetIdentity) -> Result<bool> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM contacted_targets WHERE target_id = ?1")
                .bind(target.key())
                .fetch_optional(&self.db_pool)
                .await
                .with_context(|| format!("Fallo consultando ledger de {}", self.phone))?;
        Ok(row.is_some())
    }

    pub async fn get_record(&self, target: &TargetIdentity) -> Result<Option<ContactRecord>> {
        let row: Option<(String, String)> = sqlx::query_as(
            "SELECT target_id, contacted_at FROM contacted_targets WHERE target_id = ?1",
        )
        .bind(target.key())
        .fetch_optional(&self.db_pool)
        .await
        .with_context(|| format!("Fallo consultando ledger de {}", self.phone))?;

        row.map(to_record).transpose()
    }

    /// Idempotente: si ya existe el registro no toca el timestamp.
    /// Devuelve `true` si insertó una fila nueva.
    pub async fn record_contacted(
        &self,
        target: &TargetIdentity,
        at_time: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO contacted_targets (target_id, contacted_at)
            VALUES (?1, ?2)
            "#,
        )
        .bind(target.key())
        .bind(at_time.to_rfc3339())
        .execute(&self.db_pool)
        .await
        .with_context(|| format!("Fallo al registrar contacto en ledger de {}", self.phone))?;

        Ok(result.rows_affected() == 1)
    }

    /// Contactos más recientes primero
    pub async fn list_contacts(&self, limit: u32) -> Result<Vec<ContactRecord>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT target_id, contacted_at
            FROM contacted_targets
            ORDER BY contacted_at DESC
            LIMIT ?1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.db_pool)
        .await
        .context("Fallo listando contactos")?;

        rows.into_iter().map(to_record).collect()
    }

    pub async fn count(&self) -> Result<u64> {
        let (cnt,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM contacted_targets")
            .fetch_one(&self.db_pool)
            .await?;
        Ok(cnt as u64)
    }

    pub async fn close(&self) {
        self.db_pool.close().await;
    }
}

fn to_record((target_id, contacted_at): (String, String)) -> Result<ContactRecord> {
    let contacted_at = DateTime::parse_from_rfc3339(&contacted_at)
        .with_context(|| format!("Timestamp inválido en ledger: {}", contacted_at))?
        .with_timezone(&Utc);
    Ok(ContactRecord {
        target_id,
        contacted_at,
    })
}
