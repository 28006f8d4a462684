// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::time::Duration;

use anyhow::Result;
use pennywise::application::{FinanceService, RequestContext};
use pennywise::config::LedgerConfig;
use pennywise::domain::{Account, Credits, Role};
use tempfile::TempDir;

pub const SESSION: &str = "test-session";

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(FinanceService, TempDir)> {
    test_service_with(LedgerConfig::default().with_retry_backoff(Duration::from_millis(1))).await
}

/// Helper to create a test service with custom ledger settings
pub async fn test_service_with(config: LedgerConfig) -> Result<(FinanceService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = FinanceService::init(db_path.to_str().unwrap(), config).await?;
    Ok((service, temp_dir))
}

pub fn ctx() -> RequestContext {
    RequestContext::new(SESSION)
}

/// Insert an account holding `balance` credits directly, leaving the ledger empty.
pub async fn seed_account(service: &FinanceService, id: &str, balance: Credits) -> Result<Account> {
    let mut account = Account::new(format!("{}@example.com", id), Role::Personal).with_id(id);
    account.credit_balance = balance;
    service.repository().save_account(&account).await?;
    Ok(account)
}

/// Open a personal account through the service, granting `credits` as a sign-up bonus.
pub async fn personal_account(service: &FinanceService, id: &str, credits: Credits) -> Result<Account> {
    let account = Account::new(format!("{}@example.com", id), Role::Personal).with_id(id);
    Ok(service.open_account(&ctx(), account, credits).await?)
}

pub async fn admin_account(service: &FinanceService, id: &str) -> Result<Account> {
    let account = Account::new(format!("{}@example.com", id), Role::Admin).with_id(id);
    Ok(service.open_account(&ctx(), account, 0).await?)
}

/// Break credit writes by removing a ledger table, so charges fail after the pre-check passes.
pub async fn break_ledger(service: &FinanceService) -> Result<()> {
    sqlx::query("DROP TABLE credit_transactions")
        .execute(service.repository().pool())
        .await?;
    Ok(())
}
