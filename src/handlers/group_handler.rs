//! handlers/group_handler.rs
use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::handlers::campaign_handler::campaign_error_response;
use crate::models::account_model::AccountSession;
use crate::models::campaign_model::{
    BroadcastRequest, JoinGroupsRequest, JoinGroupsResponse, ScrapeMembersRequest,
    ScrapeMembersResponse,
};
use crate::models::platform_model::{CampaignError, CampaignResult};
use crate::services::account_service::AccountService;
use crate::services::campaign_service::CampaignService;
use crate::services::target_service::TargetStore;

async fn single_account(accounts: &AccountService, phone: &str) -> CampaignResult<AccountSession> {
    accounts
        .get_accounts(&[phone.to_string()])
        .await?
        .pop()
        .ok_or_else(|| CampaignError::InvalidInput("Cuenta no registrada".to_string()))
}

/// POST /api/groups/join
pub async fn join_groups_endpoint(
    body: web::Json<JoinGroupsRequest>,
    campaigns: web::Data<CampaignService>,
    accounts: web::Data<AccountService>,
) -> HttpResponse {
    let req = body.into_inner();
    let account = match single_account(&accounts, &req.phone).await {
        Ok(account) => account,
        Err(e) => return campaign_error_response(e),
    };

    match campaigns.join_groups(&account, &req.groups).await {
        Ok(joined) => HttpResponse::Ok().json(JoinGroupsResponse {
            phone: req.phone,
            joined,
            requested: req.groups.len(),
        }),
        Err(e) => campaign_error_response(e),
    }
}

/// POST /api/groups/members
/// Exporta los miembros del grupo a `{data_dir}/targets`.
pub async fn scrape_members_endpoint(
    body: web::Json<ScrapeMembersRequest>,
    campaigns: web::Data<CampaignService>,
    accounts: web::Data<AccountService>,
    store: web::Data<TargetStore>,
) -> HttpResponse {
    let req = body.into_inner();
    let account = match single_account(&accounts, &req.phone).await {
        Ok(account) => account,
        Err(e) => return campaign_error_response(e),
    };

    let members = match campaigns.scrape_members(&account, &req.group).await {
        Ok(members) => members,
        Err(e) => return campaign_error_response(e),
    };

    match store.save_members(&req.group, &members).await {
        Ok(file) => HttpResponse::Ok().json(ScrapeMembersResponse {
            phone: req.phone,
            group: req.group,
            file,
            count: members.len(),
        }),
        Err(e) => HttpResponse::InternalServerError().json(json!({
            "success": false,
            "error": format!("{:#}", e)
        })),
    }
}

/// POST /api/groups/broadcast
pub async fn broadcast_endpoint(
    body: web::Json<BroadcastRequest>,
    campaigns: web::Data<CampaignService>,
    accounts: web::Data<AccountService>,
) -> HttpResponse {
    let req = body.into_inner();
    let account = match single_account(&accounts, &req.phone).await {
        Ok(account) => account,
        Err(e) => return campaign_error_response(e),
    };

    let passes = req.passes.unwrap_or(1);
    match campaigns
        .broadcast(&account, &req.groups, &req.text, passes)
        .await
    {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(e) => campaign_error_response(e),
    }
}
