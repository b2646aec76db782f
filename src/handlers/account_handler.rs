//! handlers/account_handler.rs
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::models::account_model::AddAccountRequest;
use crate::models::campaign_model::TargetIdentity;
use crate::models::contact_model::ContactStatusResponse;
use crate::services::account_service::AccountService;
use crate::services::ledger_service::LedgerService;

#[derive(Deserialize)]
pub struct ContactsQuery {
    limit: Option<u32>,
}

/// GET /api/accounts
pub async fn list_accounts_endpoint(accounts: web::Data<AccountService>) -> HttpResponse {
    match accounts.list_accounts().await {
        Ok(list) => HttpResponse::Ok().json(list),
        Err(e) => HttpResponse::InternalServerError().json(json!({
            "error": "Internal server error",
            "details": format!("{:?}", e)
        })),
    }
}

/// POST /api/accounts
pub async fn add_account_endpoint(
    accounts: web::Data<AccountService>,
    body: web::Json<AddAccountRequest>,
) -> HttpResponse {
    match accounts.add_account(body.into_inner()).await {
        Ok(account) => HttpResponse::Ok().json(account),
        Err(e) => HttpResponse::BadRequest().json(json!({
            "error": "Could not add account",
            "details": format!("{:#}", e)
        })),
    }
}

/// DELETE /api/accounts/{phone}
pub async fn delete_account_endpoint(
    accounts: web::Data<AccountService>,
    path: web::Path<String>,
) -> HttpResponse {
    let phone = path.into_inner();
    match accounts.delete_account(&phone).await {
        Ok(true) => HttpResponse::Ok().json(json!({ "deleted": phone })),
        Ok(false) => HttpResponse::NotFound().json(json!({
            "error": "Account not found",
            "phone": phone
        })),
        Err(e) => HttpResponse::InternalServerError().json(json!({
            "error": "Internal server error",
            "details": format!("{:?}", e)
        })),
    }
}

/// GET /api/accounts/{phone}/contacts
pub async fn list_contacts_endpoint(
    ledgers: web::Data<LedgerService>,
    path: web::Path<String>,
    query: web::Query<ContactsQuery>,
) -> HttpResponse {
    let phone = path.into_inner();
    let limit = query.limit.unwrap_or(100);

    let ledger = match ledgers.open(&phone).await {
        Ok(ledger) => ledger,
        Err(e) => {
            return HttpResponse::BadRequest().json(json!({
                "error": "Could not open ledger",
                "details": format!("{:#}", e)
            }))
        }
    };
    let result = match ledger.count().await {
        Ok(total) => ledger
            .list_contacts(limit)
            .await
            .map(|items| json!({ "phone": phone, "total": total, "items": items })),
        Err(e) => Err(e),
    };
    ledger.close().await;

    match result {
        Ok(body) => HttpResponse::Ok().json(body),
        Err(e) => HttpResponse::InternalServerError().json(json!({
            "error": "Internal server error",
            "details": format!("{:?}", e)
        })),
    }
}

/// GET /api/accounts/{phone}/contacts/{target}
pub async fn contact_status_endpoint(
    ledgers: web::Data<LedgerService>,
    path: web::Path<(String, String)>,
) -> HttpResponse {
    let (phone, raw_target) = path.into_inner();
    let target = match TargetIdentity::parse(&raw_target) {
        Some(t) => t,
        None => {
            return HttpResponse::BadRequest().json(json!({
                "error": "Invalid target identity",
                "target": raw_target
            }))
        }
    };

    match ledgers.get_record(&phone, &target).await {
        Ok(record) => HttpResponse::Ok().json(ContactStatusResponse {
            phone,
            target_id: target.key(),
            contacted: record.is_some(),
            contacted_at: record.map(|r| r.contacted_at),
        }),
        Err(e) => HttpResponse::BadRequest().json(json!({
            "error": "Could not query ledger",
            "details": format!("{:#}", e)
        })),
    }
}
