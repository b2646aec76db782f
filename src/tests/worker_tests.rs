//! tests/worker_tests.rs
//! Pruebas del worker por cuenta contra la plataforma simulada.

#[cfg(test)]
mod tests {
    use actix_rt::test;
    use chrono::Utc;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
    use std::path::Path;
    use std::time::Duration;
    use tempfile::tempdir;
    use tokio::sync::watch;
    use tokio::time::Instant;

    use crate::config::pacing_config::PacingConfig;
    use crate::models::campaign_model::{ActionOutcome, CampaignAction, TargetIdentity};
    use crate::models::platform_model::{EntityHandle, PlatformError};
    use crate::services::ledger_service::LedgerService;
    use crate::services::pacer_service::{shutdown_channel, RatePacer};
    use crate::services::platform_client::PlatformConnector;
    use crate::services::simulated_platform::{PlatformCall, SimulatedPlatform};
    use crate::services::worker_service::AccountWorker;
    use crate::tests::support::{account, ids};

    const PHONE: &str = "+5550001";

    async fn build_worker(
        platform: &SimulatedPlatform,
        dir: &Path,
        shutdown: watch::Receiver<bool>,
    ) -> AccountWorker {
        build_paced_worker(platform, dir, shutdown, PacingConfig::immediate()).await
    }

    async fn build_paced_worker(
        platform: &SimulatedPlatform,
        dir: &Path,
        shutdown: watch::Receiver<bool>,
        pacing: PacingConfig,
    ) -> AccountWorker {
        let client = platform.connect(&account(PHONE)).await.unwrap();
        let ledger = LedgerService::new(dir).open(PHONE).await.unwrap();
        AccountWorker::new(PHONE, client, ledger, RatePacer::new(shutdown), pacing)
    }

    fn message_pacing(delay: Duration) -> PacingConfig {
        PacingConfig {
            message_delay: delay,
            ..PacingConfig::immediate()
        }
    }

    /// Hace fallar la escritura del ledger para un destino (disco lleno simulado).
    async fn fail_ledger_writes_for(dir: &Path, target_id: &str) {
        let path = LedgerService::new(dir).ledger_path(PHONE).unwrap();
        let pool = SqlitePool::connect_with(SqliteConnectOptions::new().filename(&path))
            .await
            .unwrap();
        sqlx::query(&format!(
            "CREATE TRIGGER fail_insert BEFORE INSERT ON contacted_targets \
             WHEN NEW.target_id = '{}' BEGIN SELECT RAISE(ABORT, 'disk full'); END",
            target_id
        ))
        .execute(&pool)
        .await
        .unwrap();
        pool.close().await;
    }

    fn dm() -> CampaignAction {
        CampaignAction::DirectMessage {
            text: "hola".to_string(),
        }
    }

    fn outcomes(report: &crate::models::campaign_model::WorkerReport) -> Vec<ActionOutcome> {
        report.outcomes.iter().map(|o| o.outcome).collect()
    }

    #[test]
    async fn test_already_contacted_target_is_skipped_without_outbound_action() {
        let dir = tempdir().unwrap();
        let ledgers = LedgerService::new(dir.path());
        let seed = ledgers.open(PHONE).await.unwrap();
        seed.record_contacted(&TargetIdentity::Id(1), Utc::now())
            .await
            .unwrap();
        seed.close().await;

        let platform = SimulatedPlatform::new();
        let (_tx, rx) = shutdown_channel();
        let worker = build_worker(&platform, dir.path(), rx).await;

        let report = worker.run(&ids(&[1, 2]), &dm()).await;

        assert_eq!(
            outcomes(&report),
            vec![ActionOutcome::SkippedAlreadyContacted, ActionOutcome::Sent]
        );
        assert_eq!(report.sent, 1);
        assert_eq!(platform.outbound_count(1), 0);
        assert_eq!(platform.outbound_count(2), 1);
    }

    #[test]
    async fn test_unresolvable_target_fails_and_queue_continues() {
        let dir = tempdir().unwrap();
        let platform = SimulatedPlatform::new().with_unknown_target(999);
        let (_tx, rx) = shutdown_channel();
        let worker = build_worker(&platform, dir.path(), rx).await;

        let report = worker.run(&ids(&[1, 999, 3]), &dm()).await;

        assert_eq!(
            outcomes(&report),
            vec![
                ActionOutcome::Sent,
                ActionOutcome::Failed,
                ActionOutcome::Sent
            ]
        );
        assert_eq!(report.sent, 2);
        assert!(report.outcomes[1].detail.is_some());
        assert_eq!(platform.outbound_count(999), 0);
    }

    #[test]
    async fn test_two_rate_limits_give_single_deferred_outcome() {
        let dir = tempdir().unwrap();
        let platform = SimulatedPlatform::new()
            .script_reply(5, Err(PlatformError::RateLimited(0)))
            .script_reply(5, Err(PlatformError::RateLimited(0)));
        let (_tx, rx) = shutdown_channel();
        let worker = build_worker(&platform, dir.path(), rx).await;

        let report = worker.run(&ids(&[5, 6]), &dm()).await;

        assert_eq!(
            outcomes(&report),
            vec![ActionOutcome::DeferredFloodWait, ActionOutcome::Sent]
        );
        // primer intento + un único reintento
        assert_eq!(platform.outbound_count(5), 2);

        let ledger = LedgerService::new(dir.path()).open(PHONE).await.unwrap();
        assert!(!ledger.has_contacted(&TargetIdentity::Id(5)).await.unwrap());
    }

    #[test]
    async fn test_rate_limit_then_success_is_sent_after_one_retry() {
        let dir = tempdir().unwrap();
        let platform =
            SimulatedPlatform::new().script_reply(8, Err(PlatformError::RateLimited(0)));
        let (_tx, rx) = shutdown_channel();
        let worker = build_worker(&platform, dir.path(), rx).await;

        let report = worker.run(&ids(&[8]), &dm()).await;

        assert_eq!(outcomes(&report), vec![ActionOutcome::Sent]);
        assert_eq!(platform.outbound_count(8), 2);
    }

    #[test]
    async fn test_privacy_restricted_is_not_recorded() {
        let dir = tempdir().unwrap();
        let platform =
            SimulatedPlatform::new().script_reply(4, Err(PlatformError::PrivacyRestricted));
        let (_tx, rx) = shutdown_channel();
        let worker = build_worker(&platform, dir.path(), rx).await;

        let invite = CampaignAction::Invite {
            group: "target_group".to_string(),
        };
        let report = worker.run(&ids(&[4]), &invite).await;

        assert_eq!(
            outcomes(&report),
            vec![ActionOutcome::SkippedPrivacyRestricted]
        );
        let ledger = LedgerService::new(dir.path()).open(PHONE).await.unwrap();
        assert!(!ledger.has_contacted(&TargetIdentity::Id(4)).await.unwrap());
    }

    #[test]
    async fn test_other_error_fails_target_only() {
        let dir = tempdir().unwrap();
        let platform = SimulatedPlatform::new()
            .script_reply(2, Err(PlatformError::Other("peer flood".to_string())));
        let (_tx, rx) = shutdown_channel();
        let worker = build_worker(&platform, dir.path(), rx).await;

        let report = worker.run(&ids(&[1, 2, 3]), &dm()).await;

        assert_eq!(
            outcomes(&report),
            vec![
                ActionOutcome::Sent,
                ActionOutcome::Failed,
                ActionOutcome::Sent
            ]
        );
        // exactamente una escritura por cada Sent
        let ledger = LedgerService::new(dir.path()).open(PHONE).await.unwrap();
        assert_eq!(ledger.count().await.unwrap(), 2);
    }

    #[test]
    async fn test_invite_skips_current_members() {
        let dir = tempdir().unwrap();
        let platform = SimulatedPlatform::new().with_member_ids("club", &[2]);
        let (_tx, rx) = shutdown_channel();
        let worker = build_worker(&platform, dir.path(), rx).await;

        let invite = CampaignAction::Invite {
            group: "club".to_string(),
        };
        let report = worker.run(&ids(&[1, 2, 3]), &invite).await;

        assert_eq!(
            outcomes(&report),
            vec![
                ActionOutcome::Sent,
                ActionOutcome::SkippedAlreadyMember,
                ActionOutcome::Sent
            ]
        );
        let calls = platform.calls();
        assert!(calls.contains(&PlatformCall::Join {
            phone: PHONE.to_string(),
            group: "club".to_string()
        }));
        assert_eq!(platform.outbound_count(2), 0);
    }

    #[test]
    async fn test_unknown_group_aborts_worker_and_disconnects() {
        let dir = tempdir().unwrap();
        let platform = SimulatedPlatform::new().with_unknown_group("ghost");
        let (_tx, rx) = shutdown_channel();
        let worker = build_worker(&platform, dir.path(), rx).await;

        let invite = CampaignAction::Invite {
            group: "ghost".to_string(),
        };
        let report = worker.run(&ids(&[1, 2]), &invite).await;

        assert!(report.error.is_some());
        assert!(report.outcomes.is_empty());
        assert_eq!(report.sent, 0);
        assert_eq!(
            platform.calls().last(),
            Some(&PlatformCall::Disconnect {
                phone: PHONE.to_string()
            })
        );
    }

    #[test]
    async fn test_shutdown_stops_before_next_target() {
        let dir = tempdir().unwrap();
        let platform = SimulatedPlatform::new();
        let (tx, rx) = shutdown_channel();
        let worker = build_worker(&platform, dir.path(), rx).await;
        tx.send(true).unwrap();

        let report = worker.run(&ids(&[1, 2, 3]), &dm()).await;

        assert!(report.interrupted);
        assert!(report.outcomes.is_empty());
        assert!(platform.calls().contains(&PlatformCall::Disconnect {
            phone: PHONE.to_string()
        }));
    }

    #[test]
    async fn test_handle_targets_resolve_by_username() {
        let dir = tempdir().unwrap();
        let platform = SimulatedPlatform::new();
        let (_tx, rx) = shutdown_channel();
        let worker = build_worker(&platform, dir.path(), rx).await;

        let targets = vec![TargetIdentity::Handle("alice".to_string())];
        let report = worker.run(&targets, &dm()).await;
        assert_eq!(report.sent, 1);

        let ledger = LedgerService::new(dir.path()).open(PHONE).await.unwrap();
        assert!(ledger
            .has_contacted(&TargetIdentity::Handle("alice".to_string()))
            .await
            .unwrap());
    }

    #[test]
    async fn test_join_groups_counts_successes() {
        let dir = tempdir().unwrap();
        let platform = SimulatedPlatform::new().with_failing_join("b");
        let (_tx, rx) = shutdown_channel();
        let worker = build_worker(&platform, dir.path(), rx).await;

        let groups = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(worker.join_groups(&groups).await, 2);
    }

    #[test]
    async fn test_ledger_write_failure_fails_target_and_queue_continues() {
        let dir = tempdir().unwrap();
        let platform = SimulatedPlatform::new();
        let (_tx, rx) = shutdown_channel();
        let worker = build_worker(&platform, dir.path(), rx).await;
        fail_ledger_writes_for(dir.path(), "1").await;

        let report = worker.run(&ids(&[1, 2]), &dm()).await;

        assert_eq!(
            outcomes(&report),
            vec![ActionOutcome::Failed, ActionOutcome::Sent]
        );
        assert_eq!(report.sent, 1);
        assert!(report.outcomes[0]
            .detail
            .as_deref()
            .unwrap()
            .contains("ledger"));
        let ledger = LedgerService::new(dir.path()).open(PHONE).await.unwrap();
        assert!(!ledger.has_contacted(&TargetIdentity::Id(1)).await.unwrap());
        assert!(ledger.has_contacted(&TargetIdentity::Id(2)).await.unwrap());
    }

    #[test]
    async fn test_performed_action_is_paced_even_if_ledger_fails() {
        let dir = tempdir().unwrap();
        let delay = Duration::from_millis(300);
        let platform = SimulatedPlatform::new();
        let (_tx, rx) = shutdown_channel();
        let worker = build_paced_worker(&platform, dir.path(), rx, message_pacing(delay)).await;
        fail_ledger_writes_for(dir.path(), "1").await;

        let report = worker.run(&ids(&[1, 2]), &dm()).await;

        assert_eq!(
            outcomes(&report),
            vec![ActionOutcome::Failed, ActionOutcome::Sent]
        );
        let sends = platform.outbound();
        assert_eq!(sends.len(), 2);
        assert!(sends[1].1 - sends[0].1 >= delay);
    }

    #[test]
    async fn test_sends_keep_order_with_delay_and_skips_are_not_paced() {
        let dir = tempdir().unwrap();
        let seed = LedgerService::new(dir.path()).open(PHONE).await.unwrap();
        seed.record_contacted(&TargetIdentity::Id(1), Utc::now())
            .await
            .unwrap();
        seed.close().await;

        let delay = Duration::from_millis(300);
        let platform = SimulatedPlatform::new();
        let (_tx, rx) = shutdown_channel();
        let worker = build_paced_worker(&platform, dir.path(), rx, message_pacing(delay)).await;

        let start = Instant::now();
        let report = worker.run(&ids(&[1, 2, 3]), &dm()).await;

        assert_eq!(
            outcomes(&report),
            vec![
                ActionOutcome::SkippedAlreadyContacted,
                ActionOutcome::Sent,
                ActionOutcome::Sent
            ]
        );
        let sends = platform.outbound();
        let order: Vec<i64> = sends.iter().map(|(id, _)| *id).collect();
        assert_eq!(order, vec![2, 3]);
        // El destino omitido no agrega espera antes del primer envío
        assert!(sends[0].1 - start < delay);
        assert!(sends[1].1 - sends[0].1 >= delay);
    }

    #[test]
    async fn test_connection_loss_stops_worker() {
        let dir = tempdir().unwrap();
        let platform = SimulatedPlatform::new()
            .script_reply(2, Err(PlatformError::Connection("socket closed".to_string())));
        let (_tx, rx) = shutdown_channel();
        let worker = build_worker(&platform, dir.path(), rx).await;

        let report = worker.run(&ids(&[1, 2, 3]), &dm()).await;

        assert_eq!(outcomes(&report), vec![ActionOutcome::Sent]);
        assert_eq!(report.sent, 1);
        assert!(report.error.as_deref().unwrap().contains("socket closed"));
        assert_eq!(platform.outbound_count(3), 0);
        assert_eq!(
            platform.calls().last(),
            Some(&PlatformCall::Disconnect {
                phone: PHONE.to_string()
            })
        );
    }

    #[test]
    async fn test_scrape_members_reads_every_page() {
        let dir = tempdir().unwrap();
        let members: Vec<EntityHandle> = (1..=5).map(EntityHandle::new).collect();
        let platform = SimulatedPlatform::new().with_members("club", members.clone());
        let (_tx, rx) = shutdown_channel();
        let pacing = PacingConfig {
            member_page_size: 2,
            ..PacingConfig::immediate()
        };
        let worker = build_paced_worker(&platform, dir.path(), rx, pacing).await;

        let scraped = worker.scrape_members("club").await.unwrap();

        assert_eq!(scraped, members);
        let offsets: Vec<usize> = platform
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                PlatformCall::ListMembers { offset, .. } => Some(offset),
                _ => None,
            })
            .collect();
        assert_eq!(offsets, vec![0, 2, 4, 5]);
    }

    #[test]
    async fn test_scrape_members_of_unknown_group_is_an_error() {
        let dir = tempdir().unwrap();
        let platform = SimulatedPlatform::new().with_unknown_group("ghost");
        let (_tx, rx) = shutdown_channel();
        let worker = build_worker(&platform, dir.path(), rx).await;

        assert!(worker.scrape_members("ghost").await.is_err());
        assert!(platform.calls().contains(&PlatformCall::Disconnect {
            phone: PHONE.to_string()
        }));
    }

    #[test]
    async fn test_broadcast_runs_bounded_passes_and_survives_group_errors() {
        let dir = tempdir().unwrap();
        let platform = SimulatedPlatform::new();
        let failing = platform.group_id("b");
        let platform = platform.script_reply(failing, Err(PlatformError::Other("muted".into())));
        let (_tx, rx) = shutdown_channel();
        let worker = build_worker(&platform, dir.path(), rx).await;

        let groups = vec!["a".to_string(), "b".to_string()];
        let report = worker.broadcast(&groups, "hola grupo", 2).await;

        assert_eq!(report.passes_completed, 2);
        assert_eq!(report.sent, 3);
        assert_eq!(report.failed, 1);
        assert!(report.error.is_none());
        assert_eq!(platform.outbound_count(failing), 2);
    }

    #[test]
    async fn test_broadcast_stops_on_connection_loss() {
        let dir = tempdir().unwrap();
        let platform = SimulatedPlatform::new();
        let first = platform.group_id("a");
        let platform =
            platform.script_reply(first, Err(PlatformError::Connection("reset".into())));
        let (_tx, rx) = shutdown_channel();
        let worker = build_worker(&platform, dir.path(), rx).await;

        let groups = vec!["a".to_string(), "b".to_string()];
        let report = worker.broadcast(&groups, "hola grupo", 3).await;

        assert_eq!(report.sent, 0);
        assert_eq!(report.passes_completed, 0);
        assert!(report.error.is_some());
        assert_eq!(platform.outbound_count(platform.group_id("b")), 0);
    }

    #[test]
    async fn test_broadcast_waits_interval_between_passes() {
        let dir = tempdir().unwrap();
        let platform = SimulatedPlatform::new();
        let (_tx, rx) = shutdown_channel();
        let pacing = PacingConfig {
            broadcast_message_delay: Duration::from_millis(50),
            broadcast_interval: Duration::from_millis(300),
            ..PacingConfig::immediate()
        };
        let worker = build_paced_worker(&platform, dir.path(), rx, pacing).await;

        let groups = vec!["a".to_string(), "b".to_string()];
        let report = worker.broadcast(&groups, "hola grupo", 2).await;
        assert_eq!(report.sent, 4);

        let sends = platform.outbound();
        assert!(sends[1].1 - sends[0].1 >= Duration::from_millis(50));
        assert!(sends[2].1 - sends[1].1 >= Duration::from_millis(350));
    }
}
