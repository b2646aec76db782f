use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Pool, Sqlite};
use std::sync::Arc;

use crate::config::app_config::AppConfig;
use crate::logger::init_logger;
use crate::services::account_service::AccountService;
use crate::services::campaign_service::CampaignService;
use crate::services::ledger_service::LedgerService;
use crate::services::pacer_service::shutdown_channel;
use crate::services::run_service::CampaignRunService;
use crate::services::simulated_platform::SimulatedPlatform;
use crate::services::target_service::TargetStore;

mod app;
mod config;
mod handlers;
mod logger;
mod models;
mod services;

#[cfg(test)]
mod tests;

async fn setup_database(config: &AppConfig) -> Pool<Sqlite> {
    // 1) Crear carpeta de datos
    std::fs::create_dir_all(&config.data_dir).expect("No se pudo crear el directorio de datos");

    // 2) Ruta final: {data_dir}/service.db
    let db_path = config.service_db_path();
    log::info!("Conectando a SQLite en {}", db_path.display());

    let options = SqliteConnectOptions::new()
        .filename(&db_path)
        .create_if_missing(true);

    Pool::<Sqlite>::connect_with(options)
        .await
        .expect("No se pudo conectar a la base de datos SQLite.")
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok(); // Cargar .env al inicio
    init_logger();

    let config = AppConfig::from_env();
    log::info!("Configuración de ritmo: {:?}", config.pacing);

    let db_pool = setup_database(&config).await;

    // Corridas de campañas (también aplica las migraciones de cuentas)
    let run_service = CampaignRunService::new(db_pool.clone());
    if let Err(e) = run_service.run_migrations().await {
        panic!("Fallo en migraciones: {:?}", e);
    }

    let account_service = AccountService::new(db_pool.clone(), config.data_dir.clone());
    let target_store = TargetStore::new(config.targets_dir());

    // Ctrl-C: abandonar esperas en curso y desconectar cuentas antes de salir
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Señal de interrupción recibida, deteniendo campañas...");
            let _ = shutdown_tx.send(true);
        }
    });

    // El transporte real de la plataforma se conecta vía `PlatformConnector`;
    // este binario corre en modo simulado, con ledgers aparte de los reales.
    let ledger_service = LedgerService::new(config.dry_run_dir());
    log::info!(
        "Usando plataforma simulada (dry run), ledgers en {}",
        config.dry_run_dir().display()
    );
    let campaign_service = CampaignService::new(
        Arc::new(SimulatedPlatform::new()),
        ledger_service.clone(),
        config.pacing.clone(),
        shutdown_rx,
    );

    // Levantar servidor
    log::info!("Levantando servidor en {}:{}", config.host, config.port);
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(account_service.clone()))
            .app_data(web::Data::new(ledger_service.clone()))
            .app_data(web::Data::new(run_service.clone()))
            .app_data(web::Data::new(campaign_service.clone()))
            .app_data(web::Data::new(target_store.clone()))
            .configure(app::init_app)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
