//! app.rs
use crate::handlers::{account_handler, campaign_handler, group_handler};
use actix_web::web;

pub fn init_app(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(
                web::scope("/accounts")
                    .route("", web::get().to(account_handler::list_accounts_endpoint))
                    .route("", web::post().to(account_handler::add_account_endpoint))
                    .route(
                        "/{phone}",
                        web::delete().to(account_handler::delete_account_endpoint),
                    )
                    .route(
                        "/{phone}/contacts",
                        web::get().to(account_handler::list_contacts_endpoint),
                    )
                    .route(
                        "/{phone}/contacts/{target}",
                        web::get().to(account_handler::contact_status_endpoint),
                    ),
            )
            .service(
                web::scope("/campaigns")
                    .route(
                        "",
                        web::post().to(campaign_handler::start_campaign_endpoint),
                    )
                    .route("", web::get().to(campaign_handler::list_runs_endpoint))
                    .route(
                        "/partition",
                        web::post().to(campaign_handler::partition_preview_endpoint),
                    )
                    .route("/{id}", web::get().to(campaign_handler::get_run_endpoint)),
            )
            .service(
                web::scope("/groups")
                    .route("/join", web::post().to(group_handler::join_groups_endpoint))
                    .route(
                        "/members",
                        web::post().to(group_handler::scrape_members_endpoint),
                    )
                    .route(
                        "/broadcast",
                        web::post().to(group_handler::broadcast_endpoint),
                    ),
            ),
    );
}
