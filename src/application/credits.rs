use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::config::LedgerConfig;
use crate::domain::{AuditDetails, AuditEntry, Credits, EntryStatus, LedgerEntry};
use crate::storage::{Repository, WriteTransaction, is_storage_error, is_transient};

use super::{Clock, RequestContext, SystemClock};

#[derive(Error, Debug)]
pub enum CreditError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Account not found: {0}")]
    NotFound(String),

    #[error("Insufficient credits for {user_id}: balance {balance}, required {required}")]
    InsufficientBalance {
        user_id: String,
        balance: Credits,
        required: Credits,
    },

    #[error("Storage contention persisted after {attempts} attempt(s): {source:#}")]
    TransientStorage {
        attempts: u32,
        #[source]
        source: anyhow::Error,
    },

    #[error("Storage error: {0:#}")]
    Storage(#[source] anyhow::Error),

    #[error("Unexpected error: {0:#}")]
    Unexpected(#[source] anyhow::Error),
}

impl CreditError {
    /// Business outcomes the caller should expect, as opposed to faults.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            CreditError::InvalidArgument(_)
                | CreditError::NotFound(_)
                | CreditError::InsufficientBalance { .. }
        )
    }

    fn classify(err: anyhow::Error, attempts: u32) -> Self {
        if is_transient(&err) {
            CreditError::TransientStorage {
                attempts,
                source: err,
            }
        } else if is_storage_error(&err) {
            CreditError::Storage(err)
        } else {
            CreditError::Unexpected(err)
        }
    }
}

/// Outcome of a successful balance change.
#[derive(Debug, Clone)]
pub struct CreditReceipt {
    pub entry: LedgerEntry,
    pub audit: AuditEntry,
    /// Attempts it took to commit (1 unless contention forced retries)
    pub attempts: u32,
}

impl CreditReceipt {
    pub fn previous_balance(&self) -> Credits {
        self.audit.details.previous_balance
    }

    pub fn new_balance(&self) -> Credits {
        self.audit.details.new_balance
    }
}

/// What one transactional attempt ended with, when storage itself didn't fail.
enum Applied {
    Committed(CreditReceipt),
    Rejected(CreditError),
}

/// The single place credit balances change.
///
/// A deduction goes `Checking -> Rejected` when a precondition fails, otherwise
/// `Mutating -> Committed`. Storage contention aborts the attempt and re-enters
/// `Mutating` until `max_attempts` is spent; any other storage error aborts for good.
#[derive(Clone)]
pub struct CreditLedger {
    repo: Repository,
    config: LedgerConfig,
    clock: Arc<dyn Clock>,
}

impl CreditLedger {
    pub fn new(repo: Repository, config: LedgerConfig) -> Self {
        Self::with_clock(repo, config, Arc::new(SystemClock))
    }

    pub fn with_clock(repo: Repository, config: LedgerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            repo,
            config,
            clock,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Deduct credits, reporting only success or failure. The reason is logged.
    pub async fn deduct(
        &self,
        ctx: &RequestContext,
        user_id: &str,
        amount: Credits,
        action: &str,
        reference_id: Option<&str>,
    ) -> bool {
        match self
            .try_deduct(ctx, user_id, amount, action, reference_id)
            .await
        {
            Ok(_) => true,
            Err(err) if err.is_expected() => {
                warn!(session_id = %ctx.session_id, user_id, action, error = %err, "Credit deduction rejected");
                false
            }
            Err(err) => {
                error!(session_id = %ctx.session_id, user_id, action, error = %err, "Credit deduction failed");
                false
            }
        }
    }

    /// Deduct `amount` credits for `action`, all-or-nothing.
    #[instrument(name = "deduct_credits", skip(self, ctx), fields(session_id = %ctx.session_id))]
    pub async fn try_deduct(
        &self,
        ctx: &RequestContext,
        user_id: &str,
        amount: Credits,
        action: &str,
        reference_id: Option<&str>,
    ) -> Result<CreditReceipt, CreditError> {
        if user_id.trim().is_empty() {
            return Err(CreditError::InvalidArgument(
                "user_id must not be empty".to_string(),
            ));
        }
        if amount <= 0 {
            return Err(CreditError::InvalidArgument(format!(
                "deduction amount must be positive, got {}",
                amount
            )));
        }

        // Advisory only: the conditional decrement is what actually guards the balance
        let balance = self.balance(user_id).await?;
        debug!(balance, "Checked balance before deduction");
        if balance < amount {
            return Err(CreditError::InsufficientBalance {
                user_id: user_id.to_string(),
                balance,
                required: amount,
            });
        }

        let receipt = self
            .with_retries(move || async move {
                let mut tx = self.repo.begin_write().await?;
                let applied = self
                    .deduct_in(&mut tx, ctx, user_id, amount, action, reference_id)
                    .await;
                finish(tx, applied).await
            })
            .await?;

        info!(
            new_balance = receipt.new_balance(),
            attempts = receipt.attempts,
            "Deducted credits"
        );
        Ok(receipt)
    }

    /// Add `amount` credits (top-ups, sign-up bonuses).
    #[instrument(name = "grant_credits", skip(self, ctx), fields(session_id = %ctx.session_id))]
    pub async fn try_grant(
        &self,
        ctx: &RequestContext,
        user_id: &str,
        amount: Credits,
        action: &str,
        reference_id: Option<&str>,
    ) -> Result<CreditReceipt, CreditError> {
        if user_id.trim().is_empty() {
            return Err(CreditError::InvalidArgument(
                "user_id must not be empty".to_string(),
            ));
        }
        if amount <= 0 {
            return Err(CreditError::InvalidArgument(format!(
                "grant amount must be positive, got {}",
                amount
            )));
        }

        let receipt = self
            .with_retries(move || async move {
                let mut tx = self.repo.begin_write().await?;
                let applied = self
                    .grant_in(&mut tx, ctx, user_id, amount, action, reference_id)
                    .await;
                finish(tx, applied).await
            })
            .await?;

        info!(new_balance = receipt.new_balance(), "Granted credits");
        Ok(receipt)
    }

    /// Current balance of an account.
    pub async fn balance(&self, user_id: &str) -> Result<Credits, CreditError> {
        self.repo
            .get_credit_balance(user_id)
            .await
            .map_err(|err| CreditError::classify(err, 1))?
            .ok_or_else(|| CreditError::NotFound(user_id.to_string()))
    }

    /// Advisory check that an account could currently afford `required` credits.
    pub async fn has_balance(&self, user_id: &str, required: Credits) -> Result<bool, CreditError> {
        Ok(self.balance(user_id).await? >= required)
    }

    async fn with_retries<F, Fut>(&self, mut attempt_once: F) -> Result<CreditReceipt, CreditError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<Applied>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match attempt_once().await {
                Ok(Applied::Committed(mut receipt)) => {
                    receipt.attempts = attempt;
                    return Ok(receipt);
                }
                Ok(Applied::Rejected(err)) => return Err(err),
                Err(err) if is_transient(&err) && attempt < max_attempts => {
                    warn!(attempt, max_attempts, error = %format!("{:#}", err), "Transient storage error, retrying");
                    tokio::time::sleep(self.config.retry_backoff * attempt).await;
                    attempt += 1;
                }
                Err(err) => return Err(CreditError::classify(err, attempt)),
            }
        }
    }

    async fn deduct_in(
        &self,
        tx: &mut WriteTransaction,
        ctx: &RequestContext,
        user_id: &str,
        amount: Credits,
        action: &str,
        reference_id: Option<&str>,
    ) -> anyhow::Result<Applied> {
        let now = self.clock.now();

        let Some(new_balance) = Repository::decrement_credits(tx.conn()?, user_id, amount).await?
        else {
            // The balance moved (or the account vanished) since the pre-check
            let current = Repository::fetch_credit_balance(tx.conn()?, user_id).await?;
            let entry = LedgerEntry::deduction(
                user_id,
                action,
                amount,
                now,
                &ctx.session_id,
                EntryStatus::Failed,
            )
            .with_reference(reference_id);
            Repository::insert_ledger_entry(tx.conn()?, &entry).await?;

            warn!(?current, amount, "Conditional decrement matched no account");
            let err = match current {
                Some(balance) => CreditError::InsufficientBalance {
                    user_id: user_id.to_string(),
                    balance,
                    required: amount,
                },
                None => CreditError::NotFound(user_id.to_string()),
            };
            return Ok(Applied::Rejected(err));
        };

        let entry = LedgerEntry::deduction(
            user_id,
            action,
            amount,
            now,
            &ctx.session_id,
            EntryStatus::Completed,
        )
        .with_reference(reference_id);
        let audit = AuditEntry::deduction(
            action,
            AuditDetails {
                user_id: user_id.to_string(),
                amount,
                reference_id: reference_id.map(str::to_string),
                previous_balance: new_balance + amount,
                new_balance,
            },
            now,
        );

        Repository::insert_ledger_entry(tx.conn()?, &entry).await?;
        Repository::insert_audit_entry(tx.conn()?, &audit).await?;

        Ok(Applied::Committed(CreditReceipt {
            entry,
            audit,
            attempts: 1,
        }))
    }

    async fn grant_in(
        &self,
        tx: &mut WriteTransaction,
        ctx: &RequestContext,
        user_id: &str,
        amount: Credits,
        action: &str,
        reference_id: Option<&str>,
    ) -> anyhow::Result<Applied> {
        let now = self.clock.now();

        let Some(new_balance) = Repository::increment_credits(tx.conn()?, user_id, amount).await?
        else {
            let err = match Repository::fetch_credit_balance(tx.conn()?, user_id).await? {
                Some(balance) => CreditError::InvalidArgument(format!(
                    "grant of {} would overflow the balance of {}",
                    amount, balance
                )),
                None => CreditError::NotFound(user_id.to_string()),
            };
            return Ok(Applied::Rejected(err));
        };

        let entry = LedgerEntry::grant(user_id, action, amount, now, &ctx.session_id)
            .with_reference(reference_id);
        let audit = AuditEntry::grant(
            action,
            AuditDetails {
                user_id: user_id.to_string(),
                amount,
                reference_id: reference_id.map(str::to_string),
                previous_balance: new_balance - amount,
                new_balance,
            },
            now,
        );

        Repository::insert_ledger_entry(tx.conn()?, &entry).await?;
        Repository::insert_audit_entry(tx.conn()?, &audit).await?;

        Ok(Applied::Committed(CreditReceipt {
            entry,
            audit,
            attempts: 1,
        }))
    }
}

/// Commit what an attempt wrote, or roll it back if the attempt errored.
async fn finish(
    tx: WriteTransaction,
    applied: anyhow::Result<Applied>,
) -> anyhow::Result<Applied> {
    match applied {
        Ok(applied) => {
            tx.commit().await?;
            Ok(applied)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                error!(error = %format!("{:#}", rollback_err), "Failed to abort credit transaction");
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Account, Role};
    use tempfile::TempDir;

    async fn ledger_with_account(balance: Credits) -> anyhow::Result<(CreditLedger, TempDir)> {
        let temp_dir = TempDir::new()?;
        let db_url = format!("sqlite:{}?mode=rwc", temp_dir.path().join("ledger.db").display());
        let config = LedgerConfig::default();
        let repo = Repository::init(&db_url, config.busy_timeout).await?;

        let mut account = Account::new("u1@example.com", Role::Personal).with_id("u1");
        account.credit_balance = balance;
        repo.save_account(&account).await?;

        Ok((CreditLedger::new(repo, config), temp_dir))
    }

    // Skips the advisory check, as a deduction that lost a race after it would.
    #[tokio::test]
    async fn test_lost_race_records_failed_entry_only() -> anyhow::Result<()> {
        let (ledger, _temp) = ledger_with_account(1).await?;
        let ctx = RequestContext::new("race");

        let mut tx = ledger.repo.begin_write().await?;
        let applied = ledger
            .deduct_in(&mut tx, &ctx, "u1", 3, "export_shopping_list", Some("list-1"))
            .await;
        let applied = finish(tx, applied).await?;

        assert!(matches!(
            applied,
            Applied::Rejected(CreditError::InsufficientBalance {
                balance: 1,
                required: 3,
                ..
            })
        ));
        assert_eq!(ledger.balance("u1").await?, 1);

        let entries = ledger.repo.list_ledger_entries("u1").await?;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, EntryStatus::Failed);
        assert_eq!(entries[0].amount, -3);
        assert_eq!(entries[0].session_id, "race");
        assert_eq!(entries[0].reference_id.as_deref(), Some("list-1"));
        assert!(ledger.repo.list_audit_entries("u1").await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_lost_race_against_deleted_account() -> anyhow::Result<()> {
        let (ledger, _temp) = ledger_with_account(5).await?;
        let ctx = RequestContext::new("race");

        let mut tx = ledger.repo.begin_write().await?;
        let applied = ledger
            .deduct_in(&mut tx, &ctx, "gone", 1, "create_budget", None)
            .await;

        assert!(matches!(
            finish(tx, applied).await?,
            Applied::Rejected(CreditError::NotFound(ref id)) if id == "gone"
        ));
        assert!(ledger.repo.list_audit_entries("gone").await?.is_empty());
        assert_eq!(ledger.balance("u1").await?, 5);

        Ok(())
    }
}
