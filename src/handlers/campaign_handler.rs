//! handlers/campaign_handler.rs
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::models::account_model::AccountSession;
use crate::models::campaign_model::{
    CampaignAction, CampaignReport, CampaignRequest, CampaignResponse, PartitionRequest,
    PartitionResponse, TargetIdentity,
};
use crate::models::platform_model::CampaignError;
use crate::services::account_service::AccountService;
use crate::services::campaign_service::CampaignService;
use crate::services::partition_service::partition;
use crate::services::run_service::CampaignRunService;
use crate::services::target_service::{parse_targets, TargetStore};

#[derive(Deserialize)]
pub struct PaginationQuery {
    page: Option<u64>,
    page_size: Option<u64>,
}

pub(crate) fn campaign_error_response(e: CampaignError) -> HttpResponse {
    match e {
        CampaignError::InvalidInput(msg) => HttpResponse::BadRequest().json(json!({
            "success": false,
            "error": msg
        })),
        other => HttpResponse::InternalServerError().json(json!({
            "success": false,
            "error": format!("{:#}", other)
        })),
    }
}

async fn resolve_targets(
    req: &CampaignRequest,
    store: &TargetStore,
) -> Result<Vec<TargetIdentity>, CampaignError> {
    match (&req.targets, &req.target_file) {
        (Some(inline), _) => Ok(parse_targets(&inline.join("\n"))),
        (None, Some(name)) => store.load(name).await,
        (None, None) => Err(CampaignError::InvalidInput(
            "Se requiere 'targets' o 'target_file'".to_string(),
        )),
    }
}

/// Corre la campaña y deja el resultado en `campaign_runs`.
async fn execute_run(
    campaigns: &CampaignService,
    runs: &CampaignRunService,
    run_id: &str,
    accounts: &[AccountSession],
    targets: &[TargetIdentity],
    action: &CampaignAction,
) -> Result<CampaignReport, CampaignError> {
    runs.mark_running(run_id).await?;
    match campaigns.run_campaign(accounts, targets, action).await {
        Ok(report) => {
            runs.mark_done(run_id, &report).await?;
            Ok(report)
        }
        Err(e) => {
            if let Err(mark_err) = runs.mark_failed(run_id, &e.to_string()).await {
                log::error!(
                    "(execute_run) No se pudo marcar la corrida {} como fallida: {:?}",
                    run_id,
                    mark_err
                );
            }
            Err(e)
        }
    }
}

/// POST /api/campaigns
pub async fn start_campaign_endpoint(
    body: web::Json<CampaignRequest>,
    campaigns: web::Data<CampaignService>,
    runs: web::Data<CampaignRunService>,
    accounts: web::Data<AccountService>,
    store: web::Data<TargetStore>,
) -> HttpResponse {
    let req = body.into_inner();

    let selected = match accounts.get_accounts(&req.phones).await {
        Ok(selected) if !selected.is_empty() => selected,
        Ok(_) => {
            return campaign_error_response(CampaignError::InvalidInput(
                "Seleccione al menos una cuenta".to_string(),
            ))
        }
        Err(e) => return campaign_error_response(e),
    };
    let targets = match resolve_targets(&req, &store).await {
        Ok(targets) => targets,
        Err(e) => return campaign_error_response(e),
    };

    let run_id = match runs.create_run(req.action.action_type()).await {
        Ok(id) => id,
        Err(e) => {
            return HttpResponse::InternalServerError().json(json!({
                "success": false,
                "error": format!("Run creation failed: {}", e)
            }))
        }
    };

    // Asíncrono o síncrono
    if req.async_run {
        let campaigns = campaigns.get_ref().clone();
        let runs = runs.get_ref().clone();
        let run_id_clone = run_id.clone();
        let action = req.action.clone();

        tokio::spawn(async move {
            if let Err(e) =
                execute_run(&campaigns, &runs, &run_id_clone, &selected, &targets, &action).await
            {
                log::error!(
                    "(start_campaign_endpoint) Corrida {} falló: {}",
                    run_id_clone,
                    e
                );
            }
        });

        HttpResponse::Accepted().json(CampaignResponse {
            success: true,
            run_id,
            message: "Campaign queued for async processing".to_string(),
            report: None,
        })
    } else {
        match execute_run(&campaigns, &runs, &run_id, &selected, &targets, &req.action).await {
            Ok(report) => HttpResponse::Ok().json(CampaignResponse {
                success: true,
                run_id,
                message: format!("Campaign finished, sent to {} targets", report.total_sent),
                report: Some(report),
            }),
            Err(e) => campaign_error_response(e),
        }
    }
}

/// GET /api/campaigns
pub async fn list_runs_endpoint(
    runs: web::Data<CampaignRunService>,
    query: web::Query<PaginationQuery>,
) -> HttpResponse {
    let page = query.page.unwrap_or(1);
    let page_size = query.page_size.unwrap_or(10);

    match runs.list_runs(page, page_size).await {
        Ok(list) => HttpResponse::Ok().json(list),
        Err(e) => HttpResponse::InternalServerError().json(json!({
            "error": "Internal server error",
            "details": format!("{:?}", e)
        })),
    }
}

/// GET /api/campaigns/{id}
pub async fn get_run_endpoint(
    runs: web::Data<CampaignRunService>,
    path: web::Path<String>,
) -> HttpResponse {
    let run_id = path.into_inner();

    match runs.get_run(&run_id).await {
        Ok(record) => HttpResponse::Ok().json(record),
        Err(e) => HttpResponse::NotFound().json(json!({
            "error": "Campaign run not found",
            "details": format!("{:?}", e)
        })),
    }
}

/// POST /api/campaigns/partition
pub async fn partition_preview_endpoint(body: web::Json<PartitionRequest>) -> HttpResponse {
    let req = body.into_inner();
    let targets = parse_targets(&req.targets.join("\n"));

    match partition(&targets, req.accounts) {
        Ok(slices) => HttpResponse::Ok().json(PartitionResponse { slices }),
        Err(e) => campaign_error_response(e),
    }
}
