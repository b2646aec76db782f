//! config/app_config.rs
//! Configuración leída de variables de entorno (con `.env` cargado por dotenv).

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::config::pacing_config::PacingConfig;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub pacing: PacingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            data_dir: PathBuf::from("data"),
            host: "0.0.0.0".to_string(),
            port: 5022,
            pacing: PacingConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = AppConfig::default();
        let pacing_defaults = PacingConfig::default();

        let pacing = PacingConfig {
            invite_delay: Duration::from_secs(env_or(
                "PACING_INVITE_SECS",
                pacing_defaults.invite_delay.as_secs(),
            )),
            message_delay: Duration::from_secs(env_or(
                "PACING_MESSAGE_SECS",
                pacing_defaults.message_delay.as_secs(),
            )),
            join_delay: Duration::from_secs(env_or(
                "PACING_JOIN_SECS",
                pacing_defaults.join_delay.as_secs(),
            )),
            member_page_delay: Duration::from_secs(env_or(
                "PACING_MEMBER_PAGE_SECS",
                pacing_defaults.member_page_delay.as_secs(),
            )),
            broadcast_message_delay: Duration::from_secs(env_or(
                "PACING_BROADCAST_SECS",
                pacing_defaults.broadcast_message_delay.as_secs(),
            )),
            broadcast_interval: Duration::from_secs(env_or(
                "BROADCAST_INTERVAL_SECS",
                pacing_defaults.broadcast_interval.as_secs(),
            )),
            max_retries: env_or("FLOOD_MAX_RETRIES", pacing_defaults.max_retries),
            member_page_size: env_or("MEMBER_PAGE_SIZE", pacing_defaults.member_page_size),
        };

        AppConfig {
            data_dir: env::var("APP_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            host: env::var("APP_HOST").unwrap_or(defaults.host),
            port: env_or("APP_PORT", defaults.port),
            pacing,
        }
    }

    /// Base de datos del servicio (cuentas y corridas de campañas)
    pub fn service_db_path(&self) -> PathBuf {
        self.data_dir.join("service.db")
    }

    /// Raíz de ledgers en modo simulado, separada de `{data_dir}/sessions`
    /// para que un envío ficticio nunca cuente como contacto real.
    pub fn dry_run_dir(&self) -> PathBuf {
        self.data_dir.join("dry_run")
    }

    /// Archivos de destinos y miembros exportados.
    pub fn targets_dir(&self) -> PathBuf {
        self.data_dir.join("targets")
    }
}

/// Lee una variable numérica; si no existe o no parsea, usa el default.
fn env_or<T: FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                log::warn!(
                    "(env_or) Valor inválido para {}='{}', usando {}",
                    key,
                    raw,
                    default
                );
                default
            }
        },
        Err(_) => default,
    }
}
