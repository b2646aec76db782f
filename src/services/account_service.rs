//! services/account_service.rs
//! Almacén de credenciales de cuentas (tabla `accounts`).

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use sqlx::{Pool, Sqlite};
use std::path::PathBuf;

use crate::models::account_model::{is_valid_phone, AccountSession, AddAccountRequest};
use crate::models::platform_model::{CampaignError, CampaignResult};

#[derive(Clone, Debug)]
pub struct AccountService {
    db_pool: Pool<Sqlite>,
    data_dir: PathBuf,
}

type AccountRow = (String, i64, String, String);

impl AccountService {
    pub fn new(db_pool: Pool<Sqlite>, data_dir: impl Into<PathBuf>) -> Self {
        AccountService {
            db_pool,
            data_dir: data_dir.into(),
        }
    }

    /// Registra (o reemplaza) una cuenta y crea su carpeta de sesión.
    pub async fn add_account(&self, req: AddAccountRequest) -> Result<AccountSession> {
        if !is_valid_phone(&req.phone) {
            return Err(anyhow!("Teléfono inválido: '{}'", req.phone));
        }
        let session_dir = self.data_dir.join("sessions").join(&req.phone);
        tokio::fs::create_dir_all(&session_dir)
            .await
            .with_context(|| format!("No se pudo crear {}", session_dir.display()))?;
        let session_path = session_dir.join(&req.phone).to_string_lossy().to_string();

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO accounts (phone, api_id, api_hash, session_path, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&req.phone)
        .bind(req.api_id)
        .bind(&req.api_hash)
        .bind(&session_path)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.db_pool)
        .await
        .context("Fallo al insertar cuenta")?;

        log::info!("(add_account) Cuenta {} registrada", req.phone);
        Ok(AccountSession {
            phone: req.phone,
            api_id: req.api_id,
            api_hash: req.api_hash,
            session_path,
        })
    }

    /// Devuelve `true` si existía.
    pub async fn delete_account(&self, phone: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM accounts WHERE phone = ?1")
            .bind(phone)
            .execute(&self.db_pool)
            .await
            .context("Fallo al borrar cuenta")?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_accounts(&self) -> Result<Vec<AccountSession>> {
        let rows: Vec<AccountRow> = sqlx::query_as(
            "SELECT phone, api_id, api_hash, session_path FROM accounts ORDER BY created_at",
        )
        .fetch_all(&self.db_pool)
        .await
        .context("Fallo listando cuentas")?;

        Ok(rows.into_iter().map(to_account).collect())
    }

    /// Cuentas seleccionadas, en el orden pedido. Un teléfono desconocido es error.
    pub async fn get_accounts(&self, phones: &[String]) -> CampaignResult<Vec<AccountSession>> {
        let all = self.list_accounts().await?;
        phones
            .iter()
            .map(|phone| {
                all.iter()
                    .find(|a| &a.phone == phone)
                    .cloned()
                    .ok_or_else(|| {
                        CampaignError::InvalidInput(format!("Cuenta no registrada: {}", phone))
                    })
            })
            .collect()
    }
}

fn to_account((phone, api_id, api_hash, session_path): AccountRow) -> AccountSession {
    AccountSession {
        phone,
        api_id,
        api_hash,
        session_path,
    }
}
