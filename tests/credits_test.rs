mod common;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{TimeZone, Utc};
use common::{SESSION, ctx, seed_account, test_service, test_service_with};
use pennywise::application::{AppError, CreditError, FinanceService, FixedClock, RequestContext};
use pennywise::config::LedgerConfig;
use pennywise::domain::{EntryStatus, SYSTEM_ACTOR};
use pennywise::storage::Repository;

#[tokio::test]
async fn test_deduct_then_insufficient() -> Result<()> {
    let (service, _temp) = test_service().await?;
    seed_account(&service, "u1", 5).await?;
    let ledger = service.credits();

    let receipt = ledger
        .try_deduct(&ctx(), "u1", 3, "create_budget", Some("b-1"))
        .await?;
    assert_eq!(receipt.previous_balance(), 5);
    assert_eq!(receipt.new_balance(), 2);
    assert_eq!(receipt.attempts, 1);
    assert_eq!(ledger.balance("u1").await?, 2);

    let entries = service.ledger_entries("u1").await?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].amount, -3);
    assert_eq!(entries[0].status, EntryStatus::Completed);
    assert_eq!(entries[0].action, "create_budget");
    assert_eq!(entries[0].reference_id.as_deref(), Some("b-1"));
    assert_eq!(entries[0].session_id, SESSION);

    let err = ledger
        .try_deduct(&ctx(), "u1", 3, "create_budget", None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CreditError::InsufficientBalance {
            balance: 2,
            required: 3,
            ..
        }
    ));
    assert_eq!(ledger.balance("u1").await?, 2);
    assert_eq!(service.ledger_entries("u1").await?.len(), 1);
    assert_eq!(service.audit_entries("u1").await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_deduct_writes_audit_entry() -> Result<()> {
    let (service, _temp) = test_service().await?;
    seed_account(&service, "u1", 4).await?;

    service
        .credits()
        .try_deduct(&ctx(), "u1", 2, "export_shopping_list", Some("list-9"))
        .await?;

    let audit = service.audit_entries("u1").await?;
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].actor, SYSTEM_ACTOR);
    assert_eq!(audit[0].action, "deduct_credits_export_shopping_list");
    assert_eq!(audit[0].details.user_id, "u1");
    assert_eq!(audit[0].details.amount, 2);
    assert_eq!(audit[0].details.reference_id.as_deref(), Some("list-9"));
    assert_eq!(audit[0].details.previous_balance, 4);
    assert_eq!(audit[0].details.new_balance, 2);

    Ok(())
}

#[tokio::test]
async fn test_non_positive_amount_is_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    seed_account(&service, "u1", 5).await?;
    let ledger = service.credits();

    for amount in [0, -1] {
        let err = ledger
            .try_deduct(&ctx(), "u1", amount, "create_budget", None)
            .await
            .unwrap_err();
        assert!(matches!(err, CreditError::InvalidArgument(_)));
        assert!(!ledger.deduct(&ctx(), "u1", amount, "create_budget", None).await);
    }

    assert_eq!(ledger.balance("u1").await?, 5);
    assert!(service.ledger_entries("u1").await?.is_empty());
    assert!(service.audit_entries("u1").await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_empty_user_id_is_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let err = service
        .credits()
        .try_deduct(&ctx(), "  ", 1, "create_budget", None)
        .await
        .unwrap_err();
    assert!(matches!(err, CreditError::InvalidArgument(_)));

    Ok(())
}

#[tokio::test]
async fn test_unknown_user_fails_independently() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let ledger = service.credits();

    for _ in 0..2 {
        let err = ledger
            .try_deduct(&ctx(), "u404", 1, "create_budget", None)
            .await
            .unwrap_err();
        assert!(matches!(err, CreditError::NotFound(ref id) if id == "u404"));
        assert!(err.is_expected());
    }
    assert!(!ledger.deduct(&ctx(), "u404", 1, "create_budget", None).await);

    let repo = service.repository();
    assert!(repo.list_ledger_entries("u404").await?.is_empty());
    assert!(repo.list_audit_entries("u404").await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_deduct_reports_success_as_bool() -> Result<()> {
    let (service, _temp) = test_service().await?;
    seed_account(&service, "u1", 1).await?;
    let ledger = service.credits();

    assert!(ledger.deduct(&ctx(), "u1", 1, "delete_budget", None).await);
    assert!(!ledger.deduct(&ctx(), "u1", 1, "delete_budget", None).await);
    assert_eq!(ledger.balance("u1").await?, 0);
    assert!(!ledger.has_balance("u1", 1).await?);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_deductions_never_overdraw() -> Result<()> {
    let (service, _temp) = test_service().await?;
    seed_account(&service, "u1", 7).await?;

    let mut handles = Vec::new();
    for i in 0..10 {
        let ledger = service.credits().clone();
        handles.push(tokio::spawn(async move {
            let ctx = RequestContext::new(format!("session-{}", i));
            ledger
                .try_deduct(&ctx, "u1", 2, "save_shopping_list", None)
                .await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => successes += 1,
            Err(err) => assert!(
                matches!(err, CreditError::InsufficientBalance { .. }),
                "unexpected failure: {}",
                err
            ),
        }
    }

    assert_eq!(successes, 3);
    assert_eq!(service.credits().balance("u1").await?, 1);

    let completed = service
        .ledger_entries("u1")
        .await?
        .into_iter()
        .filter(|e| e.is_completed())
        .count();
    assert_eq!(completed, 3);
    assert_eq!(service.audit_entries("u1").await?.len(), 3);

    Ok(())
}

#[tokio::test]
async fn test_lock_contention_is_retried_then_reported() -> Result<()> {
    let config = LedgerConfig::default()
        .with_max_attempts(3)
        .with_busy_timeout(Duration::from_millis(50))
        .with_retry_backoff(Duration::from_millis(1));
    let (service, _temp) = test_service_with(config).await?;
    seed_account(&service, "u1", 5).await?;

    // Another writer holds the database write lock
    let mut blocker = service.repository().pool().acquire().await?;
    sqlx::query("BEGIN IMMEDIATE").execute(&mut *blocker).await?;

    let err = service
        .credits()
        .try_deduct(&ctx(), "u1", 1, "create_budget", None)
        .await
        .unwrap_err();
    assert!(matches!(err, CreditError::TransientStorage { attempts: 3, .. }));
    assert!(!err.is_expected());

    sqlx::query("ROLLBACK").execute(&mut *blocker).await?;
    drop(blocker);

    let receipt = service
        .credits()
        .try_deduct(&ctx(), "u1", 1, "create_budget", None)
        .await?;
    assert_eq!(receipt.attempts, 1);
    assert_eq!(receipt.new_balance(), 4);
    assert_eq!(service.ledger_entries("u1").await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_permanent_storage_error_rolls_back_without_retry() -> Result<()> {
    let (service, _temp) = test_service().await?;
    seed_account(&service, "u1", 5).await?;

    sqlx::query("DROP TABLE audit_logs")
        .execute(service.repository().pool())
        .await?;

    let err = service
        .credits()
        .try_deduct(&ctx(), "u1", 2, "create_budget", None)
        .await
        .unwrap_err();
    assert!(matches!(err, CreditError::Storage(_)));

    // Decrement and ledger entry were both undone
    assert_eq!(service.credits().balance("u1").await?, 5);
    assert!(service.repository().list_ledger_entries("u1").await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_grant_adds_credits() -> Result<()> {
    let (service, _temp) = test_service().await?;
    seed_account(&service, "u1", 1).await?;

    let receipt = service.grant(&ctx(), "u1", 4, Some("payment-7")).await?;
    assert_eq!(receipt.previous_balance(), 1);
    assert_eq!(receipt.new_balance(), 5);
    assert_eq!(receipt.entry.amount, 4);
    assert_eq!(receipt.audit.action, "grant_credits_top_up");

    let entries = service.ledger_entries("u1").await?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].amount, 4);
    assert!(entries[0].is_completed());

    assert!(matches!(
        service.grant(&ctx(), "u404", 4, None).await,
        Err(AppError::AccountNotFound(_))
    ));
    assert!(matches!(
        service.grant(&ctx(), "u1", 0, None).await,
        Err(AppError::InvalidAmount(_))
    ));
    assert_eq!(service.balance("u1").await?, 5);

    Ok(())
}

#[tokio::test]
async fn test_grant_that_would_overflow_is_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    seed_account(&service, "u1", 5).await?;

    let result = service.grant(&ctx(), "u1", i64::MAX, None).await;
    assert!(matches!(result, Err(AppError::InvalidAmount(_))));

    let err = service
        .credits()
        .try_grant(&ctx(), "u1", i64::MAX - 4, "top_up", None)
        .await
        .unwrap_err();
    assert!(matches!(err, CreditError::InvalidArgument(_)));
    assert!(err.is_expected());

    assert_eq!(service.balance("u1").await?, 5);
    assert!(service.ledger_entries("u1").await?.is_empty());
    assert!(service.audit_entries("u1").await?.is_empty());

    // Filling the balance exactly to the limit is still allowed
    let receipt = service.grant(&ctx(), "u1", i64::MAX - 5, None).await?;
    assert_eq!(receipt.new_balance(), i64::MAX);

    Ok(())
}

#[tokio::test]
async fn test_entries_use_injected_clock() -> Result<()> {
    let temp = tempfile::TempDir::new()?;
    let db_url = format!("sqlite:{}?mode=rwc", temp.path().join("clock.db").display());
    let config = LedgerConfig::default();
    let repo = Repository::init(&db_url, config.busy_timeout).await?;

    let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
    let service = FinanceService::with_clock(repo, config, Arc::new(FixedClock(now)));
    seed_account(&service, "u1", 3).await?;

    let receipt = service
        .credits()
        .try_deduct(&ctx(), "u1", 1, "delete_budget", None)
        .await?;
    assert_eq!(receipt.entry.timestamp, now);
    assert_eq!(receipt.audit.timestamp, now);
    assert_eq!(service.ledger_entries("u1").await?[0].timestamp, now);

    Ok(())
}
