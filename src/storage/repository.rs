use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqliteConnection, SqliteExecutor, SqlitePool};
use uuid::Uuid;

use crate::domain::{
    Account, AuditDetails, AuditEntry, Budget, BudgetId, Credits, EntryStatus, ItemCategory,
    ItemStatus, LedgerEntry, ListStatus, Role, ShoppingItem, ShoppingItemId, ShoppingList,
    ShoppingListId, Unit,
};

use super::{
    MIGRATION_001_INITIAL, MIGRATION_002_BUDGETS, MIGRATION_003_SHOPPING, WriteTransaction,
};

/// Repository for persisting and querying accounts, the credit ledger, budgets and shopping lists.
///
/// Cloning is cheap: clones share the same connection pool.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database.
    /// `busy_timeout` bounds how long a statement waits on another writer's lock.
    pub async fn connect(database_url: &str, busy_timeout: Duration) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context("Invalid database URL")?
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(busy_timeout);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;

        sqlx::query(MIGRATION_002_BUDGETS)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 002")?;

        sqlx::query(MIGRATION_003_SHOPPING)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 003")?;

        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str, busy_timeout: Duration) -> Result<Self> {
        let repo = Self::connect(database_url, busy_timeout).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// The underlying pool, for callers that need raw access (tests, maintenance).
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Open a write transaction holding SQLite's write lock.
    pub async fn begin_write(&self) -> Result<WriteTransaction> {
        let conn = self
            .pool
            .acquire()
            .await
            .context("Failed to acquire connection")?;
        WriteTransaction::begin(conn).await
    }

    // ========================
    // Account operations
    // ========================

    /// Save a new account.
    pub async fn save_account(&self, account: &Account) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, email, role, credit_balance, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&account.id)
        .bind(&account.email)
        .bind(account.role.as_str())
        .bind(account.credit_balance)
        .bind(account.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save account")?;
        Ok(())
    }

    /// Get an account by ID.
    pub async fn get_account(&self, id: &str) -> Result<Option<Account>> {
        let row = sqlx::query(
            "SELECT id, email, role, credit_balance, created_at FROM accounts WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account")?;

        row.as_ref().map(Self::row_to_account).transpose()
    }

    /// Get an account by e-mail address.
    pub async fn get_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        let row = sqlx::query(
            "SELECT id, email, role, credit_balance, created_at FROM accounts WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account by email")?;

        row.as_ref().map(Self::row_to_account).transpose()
    }

    /// List all accounts.
    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query(
            "SELECT id, email, role, credit_balance, created_at FROM accounts ORDER BY email",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list accounts")?;

        rows.iter().map(Self::row_to_account).collect()
    }

    /// Read a credit balance. Works on the pool or inside a transaction.
    pub async fn fetch_credit_balance<'e, E>(executor: E, user_id: &str) -> Result<Option<Credits>>
    where
        E: SqliteExecutor<'e>,
    {
        let row = sqlx::query("SELECT credit_balance FROM accounts WHERE id = ?")
            .bind(user_id)
            .fetch_optional(executor)
            .await
            .context("Failed to fetch credit balance")?;

        row.map(|row| row.try_get("credit_balance"))
            .transpose()
            .context("Invalid credit balance")
    }

    /// Current credit balance, or `None` if the account doesn't exist.
    pub async fn get_credit_balance(&self, user_id: &str) -> Result<Option<Credits>> {
        Self::fetch_credit_balance(&self.pool, user_id).await
    }

    fn row_to_account(row: &SqliteRow) -> Result<Account> {
        let role_str: String = row.get("role");
        Ok(Account {
            id: row.get("id"),
            email: row.get("email"),
            role: Role::from_str(&role_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid role: {}", role_str))?,
            credit_balance: row.get("credit_balance"),
            created_at: parse_timestamp(row, "created_at")?,
        })
    }

    // ========================
    // Credit ledger operations (run inside a write transaction)
    // ========================

    /// Subtract `amount` only if the balance covers it.
    /// Returns the new balance, or `None` when no row qualified.
    pub async fn decrement_credits(
        conn: &mut SqliteConnection,
        user_id: &str,
        amount: Credits,
    ) -> Result<Option<Credits>> {
        let row = sqlx::query(
            r#"
            UPDATE accounts
            SET credit_balance = credit_balance - ?
            WHERE id = ? AND credit_balance >= ?
            RETURNING credit_balance
            "#,
        )
        .bind(amount)
        .bind(user_id)
        .bind(amount)
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to decrement credit balance")?;

        row.map(|row| row.try_get("credit_balance"))
            .transpose()
            .context("Invalid credit balance")
    }

    /// Add a positive `amount` only if the new balance still fits in `Credits`.
    /// Returns the new balance, or `None` when no row qualified.
    pub async fn increment_credits(
        conn: &mut SqliteConnection,
        user_id: &str,
        amount: Credits,
    ) -> Result<Option<Credits>> {
        let headroom = Credits::MAX
            .checked_sub(amount)
            .ok_or_else(|| anyhow::anyhow!("Grant amount must be positive: {}", amount))?;

        let row = sqlx::query(
            r#"
            UPDATE accounts
            SET credit_balance = credit_balance + ?
            WHERE id = ? AND credit_balance <= ?
            RETURNING credit_balance
            "#,
        )
        .bind(amount)
        .bind(user_id)
        .bind(headroom)
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to increment credit balance")?;

        row.map(|row| row.try_get("credit_balance"))
            .transpose()
            .context("Invalid credit balance")
    }

    /// Append a ledger entry.
    pub async fn insert_ledger_entry(conn: &mut SqliteConnection, entry: &LedgerEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO credit_transactions (id, user_id, action, amount, reference_id, timestamp, session_id, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(&entry.user_id)
        .bind(&entry.action)
        .bind(entry.amount)
        .bind(&entry.reference_id)
        .bind(entry.timestamp.to_rfc3339())
        .bind(&entry.session_id)
        .bind(entry.status.as_str())
        .execute(&mut *conn)
        .await
        .context("Failed to insert ledger entry")?;
        Ok(())
    }

    /// Append an audit entry.
    pub async fn insert_audit_entry(conn: &mut SqliteConnection, entry: &AuditEntry) -> Result<()> {
        let details_json = serde_json::to_string(&entry.details)?;

        sqlx::query(
            r#"
            INSERT INTO audit_logs (id, actor, action, user_id, details, timestamp)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(&entry.actor)
        .bind(&entry.action)
        .bind(&entry.details.user_id)
        .bind(&details_json)
        .bind(entry.timestamp.to_rfc3339())
        .execute(&mut *conn)
        .await
        .context("Failed to insert audit entry")?;
        Ok(())
    }

    /// Ledger entries for a user, newest first.
    pub async fn list_ledger_entries(&self, user_id: &str) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, action, amount, reference_id, timestamp, session_id, status
            FROM credit_transactions
            WHERE user_id = ?
            ORDER BY timestamp DESC, rowid DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list ledger entries")?;

        rows.iter().map(Self::row_to_ledger_entry).collect()
    }

    /// Audit entries concerning a user, newest first.
    pub async fn list_audit_entries(&self, user_id: &str) -> Result<Vec<AuditEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, actor, action, details, timestamp
            FROM audit_logs
            WHERE user_id = ?
            ORDER BY timestamp DESC, rowid DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list audit entries")?;

        rows.iter().map(Self::row_to_audit_entry).collect()
    }

    fn row_to_ledger_entry(row: &SqliteRow) -> Result<LedgerEntry> {
        let id_str: String = row.get("id");
        let status_str: String = row.get("status");

        Ok(LedgerEntry {
            id: Uuid::parse_str(&id_str).context("Invalid ledger entry ID")?,
            user_id: row.get("user_id"),
            action: row.get("action"),
            amount: row.get("amount"),
            reference_id: row.get("reference_id"),
            timestamp: parse_timestamp(row, "timestamp")?,
            session_id: row.get("session_id"),
            status: EntryStatus::from_str(&status_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid entry status: {}", status_str))?,
        })
    }

    fn row_to_audit_entry(row: &SqliteRow) -> Result<AuditEntry> {
        let id_str: String = row.get("id");
        let details_json: String = row.get("details");
        let details: AuditDetails =
            serde_json::from_str(&details_json).context("Invalid audit details")?;

        Ok(AuditEntry {
            id: Uuid::parse_str(&id_str).context("Invalid audit entry ID")?,
            actor: row.get("actor"),
            action: row.get("action"),
            details,
            timestamp: parse_timestamp(row, "timestamp")?,
        })
    }

    // ========================
    // Budget operations
    // ========================

    /// Save a budget to the database.
    pub async fn save_budget(&self, budget: &Budget) -> Result<()> {
        let categories_json = serde_json::to_string(&budget.custom_categories)?;

        sqlx::query(
            r#"
            INSERT INTO budgets (id, user_id, session_id, income, housing, food, transport, dependents,
                                 miscellaneous, others, savings_goal, custom_categories, fixed_expenses,
                                 surplus_deficit, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(budget.id.to_string())
        .bind(&budget.user_id)
        .bind(&budget.session_id)
        .bind(budget.income)
        .bind(budget.housing)
        .bind(budget.food)
        .bind(budget.transport)
        .bind(budget.dependents)
        .bind(budget.miscellaneous)
        .bind(budget.others)
        .bind(budget.savings_goal)
        .bind(&categories_json)
        .bind(budget.fixed_expenses)
        .bind(budget.surplus_deficit)
        .bind(budget.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save budget")?;
        Ok(())
    }

    /// Get a budget by ID.
    pub async fn get_budget(&self, id: BudgetId) -> Result<Option<Budget>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_BUDGETS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch budget")?;

        row.as_ref().map(Self::row_to_budget).transpose()
    }

    /// List budgets newest first, for one user or (with `None`) for everyone.
    pub async fn list_budgets(&self, user_id: Option<&str>, limit: usize) -> Result<Vec<Budget>> {
        let mut query = String::from(SELECT_BUDGETS);
        if user_id.is_some() {
            query.push_str(" WHERE user_id = ?");
        }
        query.push_str(&format!(" ORDER BY created_at DESC, rowid DESC LIMIT {}", limit));

        let mut sql_query = sqlx::query(&query);
        if let Some(user_id) = user_id {
            sql_query = sql_query.bind(user_id);
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to list budgets")?;

        rows.iter().map(Self::row_to_budget).collect()
    }

    /// Delete a budget. Returns whether a row was removed.
    pub async fn delete_budget(&self, id: BudgetId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM budgets WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete budget")?;
        Ok(result.rows_affected() > 0)
    }

    fn row_to_budget(row: &SqliteRow) -> Result<Budget> {
        let id_str: String = row.get("id");
        let categories_json: String = row.get("custom_categories");

        Ok(Budget {
            id: Uuid::parse_str(&id_str).context("Invalid budget ID")?,
            user_id: row.get("user_id"),
            session_id: row.get("session_id"),
            income: row.get("income"),
            housing: row.get("housing"),
            food: row.get("food"),
            transport: row.get("transport"),
            dependents: row.get("dependents"),
            miscellaneous: row.get("miscellaneous"),
            others: row.get("others"),
            savings_goal: row.get("savings_goal"),
            custom_categories: serde_json::from_str(&categories_json)
                .context("Invalid custom categories")?,
            fixed_expenses: row.get("fixed_expenses"),
            surplus_deficit: row.get("surplus_deficit"),
            created_at: parse_timestamp(row, "created_at")?,
        })
    }

    // ========================
    // Shopping list operations
    // ========================

    /// Save a shopping list.
    pub async fn save_shopping_list(&self, list: &ShoppingList) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO shopping_lists (id, user_id, session_id, name, budget_cents, total_spent, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(list.id.to_string())
        .bind(&list.user_id)
        .bind(&list.session_id)
        .bind(&list.name)
        .bind(list.budget_cents)
        .bind(list.total_spent)
        .bind(list.status.as_str())
        .bind(list.created_at.to_rfc3339())
        .bind(list.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save shopping list")?;
        Ok(())
    }

    /// Get a shopping list by ID.
    pub async fn get_shopping_list(&self, id: ShoppingListId) -> Result<Option<ShoppingList>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, session_id, name, budget_cents, total_spent, status, created_at, updated_at
            FROM shopping_lists
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch shopping list")?;

        row.as_ref().map(Self::row_to_shopping_list).transpose()
    }

    /// List shopping lists newest first, for one user or (with `None`) for everyone.
    pub async fn list_shopping_lists(&self, user_id: Option<&str>) -> Result<Vec<ShoppingList>> {
        let mut query = String::from(
            "SELECT id, user_id, session_id, name, budget_cents, total_spent, status, created_at, updated_at FROM shopping_lists",
        );
        if user_id.is_some() {
            query.push_str(" WHERE user_id = ?");
        }
        query.push_str(" ORDER BY created_at DESC, rowid DESC");

        let mut sql_query = sqlx::query(&query);
        if let Some(user_id) = user_id {
            sql_query = sql_query.bind(user_id);
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to list shopping lists")?;

        rows.iter().map(Self::row_to_shopping_list).collect()
    }

    /// Store a recomputed total for a list.
    pub async fn update_list_total(
        &self,
        id: ShoppingListId,
        total_spent: i64,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query("UPDATE shopping_lists SET total_spent = ?, updated_at = ? WHERE id = ?")
            .bind(total_spent)
            .bind(updated_at.to_rfc3339())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to update list total")?;
        Ok(())
    }

    /// Change a list's status.
    pub async fn set_list_status(
        &self,
        id: ShoppingListId,
        status: ListStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query("UPDATE shopping_lists SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(updated_at.to_rfc3339())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to update list status")?;
        Ok(())
    }

    /// Rename a list and change its budget.
    pub async fn update_list_details(
        &self,
        id: ShoppingListId,
        name: &str,
        budget_cents: i64,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query("UPDATE shopping_lists SET name = ?, budget_cents = ?, updated_at = ? WHERE id = ?")
            .bind(name)
            .bind(budget_cents)
            .bind(updated_at.to_rfc3339())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to update shopping list")?;
        Ok(())
    }

    /// Delete a list together with its items. Returns whether the list existed.
    pub async fn delete_shopping_list(&self, id: ShoppingListId) -> Result<bool> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        sqlx::query("DELETE FROM shopping_items WHERE list_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .context("Failed to delete shopping items")?;

        let result = sqlx::query("DELETE FROM shopping_lists WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .context("Failed to delete shopping list")?;

        tx.commit().await.context("Failed to commit list deletion")?;
        Ok(result.rows_affected() > 0)
    }

    /// Save a shopping item.
    pub async fn save_shopping_item(&self, item: &ShoppingItem) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO shopping_items (id, list_id, name, quantity, price_cents, unit, store, category, status, frequency_days, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(item.id.to_string())
        .bind(item.list_id.to_string())
        .bind(&item.name)
        .bind(item.quantity)
        .bind(item.price_cents)
        .bind(item.unit.as_str())
        .bind(&item.store)
        .bind(item.category.as_str())
        .bind(item.status.as_str())
        .bind(item.frequency_days)
        .bind(item.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save shopping item")?;
        Ok(())
    }

    /// Get a shopping item by ID.
    pub async fn get_shopping_item(&self, id: ShoppingItemId) -> Result<Option<ShoppingItem>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_ITEMS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch shopping item")?;

        row.as_ref().map(Self::row_to_shopping_item).transpose()
    }

    /// Items of a list in insertion order.
    pub async fn list_shopping_items(&self, list_id: ShoppingListId) -> Result<Vec<ShoppingItem>> {
        let rows = sqlx::query(&format!("{} WHERE list_id = ? ORDER BY rowid", SELECT_ITEMS))
            .bind(list_id.to_string())
            .fetch_all(&self.pool)
            .await
            .context("Failed to list shopping items")?;

        rows.iter().map(Self::row_to_shopping_item).collect()
    }

    /// Change an item's status.
    pub async fn set_item_status(&self, id: ShoppingItemId, status: ItemStatus) -> Result<()> {
        sqlx::query("UPDATE shopping_items SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to update item status")?;
        Ok(())
    }

    /// Overwrite an item's editable fields. Returns whether the item exists.
    pub async fn update_shopping_item(&self, item: &ShoppingItem) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE shopping_items
            SET name = ?, quantity = ?, price_cents = ?, unit = ?, store = ?, category = ?,
                status = ?, frequency_days = ?
            WHERE id = ?
            "#,
        )
        .bind(&item.name)
        .bind(item.quantity)
        .bind(item.price_cents)
        .bind(item.unit.as_str())
        .bind(&item.store)
        .bind(item.category.as_str())
        .bind(item.status.as_str())
        .bind(item.frequency_days)
        .bind(item.id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to update shopping item")?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete an item. Returns whether a row was removed.
    pub async fn delete_shopping_item(&self, id: ShoppingItemId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM shopping_items WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete shopping item")?;
        Ok(result.rows_affected() > 0)
    }

    fn row_to_shopping_list(row: &SqliteRow) -> Result<ShoppingList> {
        let id_str: String = row.get("id");
        let status_str: String = row.get("status");

        Ok(ShoppingList {
            id: Uuid::parse_str(&id_str).context("Invalid shopping list ID")?,
            user_id: row.get("user_id"),
            session_id: row.get("session_id"),
            name: row.get("name"),
            budget_cents: row.get("budget_cents"),
            total_spent: row.get("total_spent"),
            status: ListStatus::from_str(&status_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid list status: {}", status_str))?,
            created_at: parse_timestamp(row, "created_at")?,
            updated_at: parse_timestamp(row, "updated_at")?,
        })
    }

    fn row_to_shopping_item(row: &SqliteRow) -> Result<ShoppingItem> {
        let id_str: String = row.get("id");
        let list_id_str: String = row.get("list_id");
        let unit_str: String = row.get("unit");
        let category_str: String = row.get("category");
        let status_str: String = row.get("status");

        Ok(ShoppingItem {
            id: Uuid::parse_str(&id_str).context("Invalid shopping item ID")?,
            list_id: Uuid::parse_str(&list_id_str).context("Invalid shopping list ID")?,
            name: row.get("name"),
            quantity: row.get("quantity"),
            price_cents: row.get("price_cents"),
            unit: Unit::from_str(&unit_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid unit: {}", unit_str))?,
            store: row.get("store"),
            category: ItemCategory::from_str(&category_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid item category: {}", category_str))?,
            status: ItemStatus::from_str(&status_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid item status: {}", status_str))?,
            frequency_days: row.get("frequency_days"),
            created_at: parse_timestamp(row, "created_at")?,
        })
    }
}

const SELECT_BUDGETS: &str = "SELECT id, user_id, session_id, income, housing, food, transport, dependents, miscellaneous, others, savings_goal, custom_categories, fixed_expenses, surplus_deficit, created_at FROM budgets";

const SELECT_ITEMS: &str = "SELECT id, list_id, name, quantity, price_cents, unit, store, category, status, frequency_days, created_at FROM shopping_items";

fn parse_timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>> {
    let value: String = row.get(column);
    Ok(DateTime::parse_from_rfc3339(&value)
        .with_context(|| format!("Invalid {} timestamp", column))?
        .with_timezone(&Utc))
}
