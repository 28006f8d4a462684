use std::io::Write;
use std::sync::Arc;

use tracing::{debug, error, info, instrument};

use crate::config::LedgerConfig;
use crate::domain::{
    Account, AuditEntry, BUDGET_TIPS, BillableAction, Budget, BudgetId, BudgetInput,
    BudgetInsight, Cents, Credits, DashboardInsight, ItemCategory, ItemStatus, LedgerEntry,
    ListInsight, ListStatus, NewItem, Role, SHOPPING_TIPS, ShoppingItem, ShoppingItemId,
    ShoppingList, ShoppingListId, ValidationError, dashboard_insights, name_taken,
    spending_by_category, total_spent,
};
use crate::io::{write_budgets_csv, write_shopping_list_csv};
use crate::storage::Repository;

use super::{AppError, Clock, CreditLedger, CreditReceipt, RequestContext, SystemClock};

/// How many budgets a listing returns.
pub const BUDGET_LIST_LIMIT: usize = 10;

/// Application service providing the budget planner and shopping lists on top of
/// the credit ledger. This is the primary interface for any client (CLI, tests).
pub struct FinanceService {
    repo: Repository,
    credits: CreditLedger,
    clock: Arc<dyn Clock>,
}

/// Latest budget with its breakdown.
pub struct BudgetDashboard {
    pub budget: Option<Budget>,
    pub categories: Vec<(String, Cents)>,
    pub insights: Vec<BudgetInsight>,
    pub tips: &'static [&'static str],
}

/// A shopping list with its items and derived figures.
pub struct ListSummary {
    pub list: ShoppingList,
    pub items: Vec<ShoppingItem>,
    pub by_category: Vec<(ItemCategory, Cents)>,
    pub insights: Vec<ListInsight>,
}

/// Totals across every list visible to an account.
pub struct ShoppingDashboard {
    pub lists: Vec<ShoppingList>,
    pub total_budget: Cents,
    pub total_spent: Cents,
    pub active_lists: usize,
    pub by_category: Vec<(ItemCategory, Cents)>,
    pub insights: Vec<DashboardInsight>,
    pub tips: &'static [&'static str],
}

impl FinanceService {
    pub fn new(repo: Repository, config: LedgerConfig) -> Self {
        Self::with_clock(repo, config, Arc::new(SystemClock))
    }

    pub fn with_clock(repo: Repository, config: LedgerConfig, clock: Arc<dyn Clock>) -> Self {
        let credits = CreditLedger::with_clock(repo.clone(), config, clock.clone());
        Self {
            repo,
            credits,
            clock,
        }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str, config: LedgerConfig) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url, config.busy_timeout).await?;
        Ok(Self::new(repo, config))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str, config: LedgerConfig) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url, config.busy_timeout).await?;
        Ok(Self::new(repo, config))
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    pub fn credits(&self) -> &CreditLedger {
        &self.credits
    }

    // ========================
    // Account operations
    // ========================

    /// Create an account with a generated id.
    pub async fn create_account(
        &self,
        ctx: &RequestContext,
        email: &str,
        role: Role,
        initial_credits: Credits,
    ) -> Result<Account, AppError> {
        self.open_account(ctx, Account::new(email.trim(), role), initial_credits)
            .await
    }

    /// Persist a prepared account and grant its starting credits.
    pub async fn open_account(
        &self,
        ctx: &RequestContext,
        mut account: Account,
        initial_credits: Credits,
    ) -> Result<Account, AppError> {
        if account.email.trim().is_empty() {
            return Err(ValidationError::Required { field: "email" }.into());
        }
        if initial_credits < 0 {
            return Err(AppError::InvalidAmount(format!(
                "initial credits cannot be negative, got {}",
                initial_credits
            )));
        }
        if self.repo.get_account(&account.id).await?.is_some() {
            return Err(AppError::AccountAlreadyExists(account.id));
        }
        if self.repo.get_account_by_email(&account.email).await?.is_some() {
            return Err(AppError::AccountAlreadyExists(account.email));
        }

        account.credit_balance = 0;
        account.created_at = self.clock.now();
        self.repo.save_account(&account).await?;

        if initial_credits > 0 {
            let receipt = self
                .credits
                .try_grant(ctx, &account.id, initial_credits, "signup_bonus", None)
                .await?;
            account.credit_balance = receipt.new_balance();
        }

        info!(user_id = %account.id, role = %account.role, "Created account");
        Ok(account)
    }

    /// Get an account by id.
    pub async fn get_account(&self, user_id: &str) -> Result<Account, AppError> {
        self.repo
            .get_account(user_id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(user_id.to_string()))
    }

    /// Get an account by id, falling back to e-mail.
    pub async fn find_account(&self, id_or_email: &str) -> Result<Account, AppError> {
        if let Some(account) = self.repo.get_account(id_or_email).await? {
            return Ok(account);
        }
        self.repo
            .get_account_by_email(id_or_email)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(id_or_email.to_string()))
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>, AppError> {
        Ok(self.repo.list_accounts().await?)
    }

    pub async fn balance(&self, user_id: &str) -> Result<Credits, AppError> {
        Ok(self.credits.balance(user_id).await?)
    }

    pub async fn has_balance(&self, user_id: &str, required: Credits) -> Result<bool, AppError> {
        Ok(self.credits.has_balance(user_id, required).await?)
    }

    /// Top up an account.
    pub async fn grant(
        &self,
        ctx: &RequestContext,
        user_id: &str,
        amount: Credits,
        reference_id: Option<&str>,
    ) -> Result<CreditReceipt, AppError> {
        Ok(self
            .credits
            .try_grant(ctx, user_id, amount, "top_up", reference_id)
            .await?)
    }

    /// Ledger history of an account, newest first.
    pub async fn ledger_entries(&self, user_id: &str) -> Result<Vec<LedgerEntry>, AppError> {
        self.get_account(user_id).await?;
        Ok(self.repo.list_ledger_entries(user_id).await?)
    }

    /// Audit trail of an account, newest first.
    pub async fn audit_entries(&self, user_id: &str) -> Result<Vec<AuditEntry>, AppError> {
        self.get_account(user_id).await?;
        Ok(self.repo.list_audit_entries(user_id).await?)
    }

    // ========================
    // Budget operations
    // ========================

    /// Validate and store a budget, charging for it.
    #[instrument(skip(self, ctx, input), fields(session_id = %ctx.session_id))]
    pub async fn create_budget(
        &self,
        ctx: &RequestContext,
        user_id: &str,
        input: BudgetInput,
    ) -> Result<Budget, AppError> {
        let account = self.get_account(user_id).await?;
        input.validate()?;
        self.ensure_credits(&account, BillableAction::CreateBudget)
            .await?;

        let budget = Budget::new(&account.id, &ctx.session_id, input, self.clock.now());
        self.repo.save_budget(&budget).await?;

        let reference_id = budget.id.to_string();
        if let Err(err) = self
            .charge(ctx, &account, BillableAction::CreateBudget, &reference_id)
            .await
        {
            log_compensation(
                BillableAction::CreateBudget,
                self.repo.delete_budget(budget.id).await,
            );
            return Err(err);
        }

        info!(budget_id = %budget.id, surplus_deficit = budget.surplus_deficit, "Created budget");
        Ok(budget)
    }

    /// Newest budgets visible to the account.
    pub async fn list_budgets(&self, user_id: &str) -> Result<Vec<Budget>, AppError> {
        let account = self.get_account(user_id).await?;
        Ok(self
            .repo
            .list_budgets(scope(&account), BUDGET_LIST_LIMIT)
            .await?)
    }

    pub async fn get_budget(&self, user_id: &str, budget_id: BudgetId) -> Result<Budget, AppError> {
        let account = self.get_account(user_id).await?;
        self.repo
            .get_budget(budget_id)
            .await?
            .filter(|budget| visible_to(&account, &budget.user_id))
            .ok_or_else(|| AppError::BudgetNotFound(budget_id.to_string()))
    }

    pub async fn budget_dashboard(&self, user_id: &str) -> Result<BudgetDashboard, AppError> {
        let account = self.get_account(user_id).await?;
        let latest = self
            .repo
            .list_budgets(scope(&account), 1)
            .await?
            .into_iter()
            .next();

        let (categories, insights) = match &latest {
            Some(budget) => (budget.categories(), budget.insights()),
            None => (Vec::new(), Vec::new()),
        };

        Ok(BudgetDashboard {
            budget: latest,
            categories,
            insights,
            tips: &BUDGET_TIPS,
        })
    }

    /// Delete a budget, charging for it. The budget is restored if the charge fails.
    #[instrument(skip(self, ctx), fields(session_id = %ctx.session_id))]
    pub async fn delete_budget(
        &self,
        ctx: &RequestContext,
        user_id: &str,
        budget_id: BudgetId,
    ) -> Result<(), AppError> {
        let account = self.get_account(user_id).await?;
        let budget = self.get_budget(user_id, budget_id).await?;
        self.ensure_credits(&account, BillableAction::DeleteBudget)
            .await?;

        if !self.repo.delete_budget(budget.id).await? {
            return Err(AppError::BudgetNotFound(budget_id.to_string()));
        }

        if let Err(err) = self
            .charge(ctx, &account, BillableAction::DeleteBudget, &budget_id.to_string())
            .await
        {
            log_compensation(
                BillableAction::DeleteBudget,
                self.repo.save_budget(&budget).await,
            );
            return Err(err);
        }

        info!(%budget_id, "Deleted budget");
        Ok(())
    }

    /// Export the visible budgets as CSV, charging for it. Nothing reaches `writer`
    /// unless the charge succeeds.
    #[instrument(skip(self, ctx, writer), fields(session_id = %ctx.session_id))]
    pub async fn export_budgets<W: Write>(
        &self,
        ctx: &RequestContext,
        user_id: &str,
        mut writer: W,
    ) -> Result<usize, AppError> {
        let account = self.get_account(user_id).await?;
        self.ensure_credits(&account, BillableAction::ExportBudgets)
            .await?;

        let budgets = self
            .repo
            .list_budgets(scope(&account), BUDGET_LIST_LIMIT)
            .await?;
        let mut rendered = Vec::new();
        let count = write_budgets_csv(&budgets, &mut rendered)?;

        self.charge(ctx, &account, BillableAction::ExportBudgets, &account.id)
            .await?;

        writer.write_all(&rendered)?;
        writer.flush()?;
        info!(count, "Exported budgets");
        Ok(count)
    }

    // ========================
    // Shopping list operations
    // ========================

    pub async fn create_list(
        &self,
        ctx: &RequestContext,
        user_id: &str,
        name: &str,
        budget_cents: Cents,
    ) -> Result<ShoppingList, AppError> {
        let account = self.get_account(user_id).await?;
        ShoppingList::validate(name, budget_cents)?;

        let list = ShoppingList::new(
            &account.id,
            &ctx.session_id,
            name.trim(),
            budget_cents,
            self.clock.now(),
        );
        self.repo.save_shopping_list(&list).await?;

        info!(list_id = %list.id, session_id = %ctx.session_id, "Created shopping list");
        Ok(list)
    }

    pub async fn get_list(
        &self,
        user_id: &str,
        list_id: ShoppingListId,
    ) -> Result<ShoppingList, AppError> {
        let account = self.get_account(user_id).await?;
        self.visible_list(&account, list_id).await
    }

    /// Lists visible to the account, newest first.
    pub async fn list_shopping_lists(&self, user_id: &str) -> Result<Vec<ShoppingList>, AppError> {
        let account = self.get_account(user_id).await?;
        Ok(self.repo.list_shopping_lists(scope(&account)).await?)
    }

    /// Add an item to a list and refresh the list total.
    pub async fn add_item(
        &self,
        user_id: &str,
        list_id: ShoppingListId,
        input: NewItem,
    ) -> Result<ShoppingItem, AppError> {
        let account = self.get_account(user_id).await?;
        let list = self.visible_list(&account, list_id).await?;
        input.validate()?;

        let existing = self.repo.list_shopping_items(list.id).await?;
        if name_taken(&existing, &input.name, None) {
            return Err(ValidationError::DuplicateItem(input.name.trim().to_string()).into());
        }

        let item = ShoppingItem::new(list.id, input, self.clock.now());
        self.repo.save_shopping_item(&item).await?;
        self.refresh_total(list.id).await?;

        debug!(item_id = %item.id, category = %item.category, "Added shopping item");
        Ok(item)
    }

    pub async fn get_item(
        &self,
        user_id: &str,
        item_id: ShoppingItemId,
    ) -> Result<ShoppingItem, AppError> {
        let account = self.get_account(user_id).await?;
        self.visible_item(&account, item_id).await
    }

    pub async fn update_item_status(
        &self,
        user_id: &str,
        item_id: ShoppingItemId,
        status: ItemStatus,
    ) -> Result<ShoppingItem, AppError> {
        let account = self.get_account(user_id).await?;
        let mut item = self.visible_item(&account, item_id).await?;

        self.repo.set_item_status(item.id, status).await?;
        item.status = status;
        Ok(item)
    }

    /// Rename a list or change its budget, charging for it when anything changed.
    /// The previous details are restored if the charge fails.
    #[instrument(skip(self, ctx), fields(session_id = %ctx.session_id))]
    pub async fn update_list(
        &self,
        ctx: &RequestContext,
        user_id: &str,
        list_id: ShoppingListId,
        name: &str,
        budget_cents: Cents,
    ) -> Result<ShoppingList, AppError> {
        let account = self.get_account(user_id).await?;
        let mut list = self.visible_list(&account, list_id).await?;
        ShoppingList::validate(name, budget_cents)?;

        let name = name.trim();
        if list.name == name && list.budget_cents == budget_cents {
            debug!(%list_id, "List unchanged, not charged");
            return Ok(list);
        }
        self.ensure_credits(&account, BillableAction::SaveShoppingListChanges)
            .await?;

        let now = self.clock.now();
        self.repo
            .update_list_details(list.id, name, budget_cents, now)
            .await?;

        if let Err(err) = self
            .charge(
                ctx,
                &account,
                BillableAction::SaveShoppingListChanges,
                &list_id.to_string(),
            )
            .await
        {
            log_compensation(
                BillableAction::SaveShoppingListChanges,
                self.repo
                    .update_list_details(list.id, &list.name, list.budget_cents, list.updated_at)
                    .await,
            );
            return Err(err);
        }

        list.name = name.to_string();
        list.budget_cents = budget_cents;
        list.updated_at = now;
        info!(%list_id, "Updated shopping list");
        Ok(list)
    }

    /// Replace an item's details, charging for it when anything changed.
    /// The previous details are restored if the charge fails.
    #[instrument(skip(self, ctx, input), fields(session_id = %ctx.session_id))]
    pub async fn update_item(
        &self,
        ctx: &RequestContext,
        user_id: &str,
        item_id: ShoppingItemId,
        input: NewItem,
    ) -> Result<ShoppingItem, AppError> {
        let account = self.get_account(user_id).await?;
        let item = self.visible_item(&account, item_id).await?;
        input.validate()?;

        let siblings = self.repo.list_shopping_items(item.list_id).await?;
        if name_taken(&siblings, &input.name, Some(item.id)) {
            return Err(ValidationError::DuplicateItem(input.name.trim().to_string()).into());
        }

        let updated = item.with_details(input);
        if updated == item {
            debug!(%item_id, "Item unchanged, not charged");
            return Ok(item);
        }
        self.ensure_credits(&account, BillableAction::SaveShoppingListChanges)
            .await?;

        if !self.repo.update_shopping_item(&updated).await? {
            return Err(AppError::ShoppingItemNotFound(item_id.to_string()));
        }

        if let Err(err) = self
            .charge(
                ctx,
                &account,
                BillableAction::SaveShoppingListChanges,
                &item.list_id.to_string(),
            )
            .await
        {
            log_compensation(
                BillableAction::SaveShoppingListChanges,
                self.repo.update_shopping_item(&item).await,
            );
            return Err(err);
        }

        self.refresh_total(item.list_id).await?;
        info!(%item_id, "Updated shopping item");
        Ok(updated)
    }

    /// Remove an item, charging for it. The item is restored if the charge fails.
    #[instrument(skip(self, ctx), fields(session_id = %ctx.session_id))]
    pub async fn delete_item(
        &self,
        ctx: &RequestContext,
        user_id: &str,
        item_id: ShoppingItemId,
    ) -> Result<(), AppError> {
        let account = self.get_account(user_id).await?;
        let item = self.visible_item(&account, item_id).await?;
        self.ensure_credits(&account, BillableAction::DeleteShoppingItem)
            .await?;

        if !self.repo.delete_shopping_item(item.id).await? {
            return Err(AppError::ShoppingItemNotFound(item_id.to_string()));
        }

        if let Err(err) = self
            .charge(
                ctx,
                &account,
                BillableAction::DeleteShoppingItem,
                &item_id.to_string(),
            )
            .await
        {
            log_compensation(
                BillableAction::DeleteShoppingItem,
                self.repo.save_shopping_item(&item).await,
            );
            return Err(err);
        }

        self.refresh_total(item.list_id).await?;
        info!(%item_id, "Deleted shopping item");
        Ok(())
    }

    /// Mark a list as saved, charging for it. The previous status is restored if the charge fails.
    #[instrument(skip(self, ctx), fields(session_id = %ctx.session_id))]
    pub async fn save_list(
        &self,
        ctx: &RequestContext,
        user_id: &str,
        list_id: ShoppingListId,
    ) -> Result<ShoppingList, AppError> {
        let account = self.get_account(user_id).await?;
        let mut list = self.visible_list(&account, list_id).await?;
        self.ensure_credits(&account, BillableAction::SaveShoppingList)
            .await?;

        let previous = list.status;
        let now = self.clock.now();
        self.repo
            .set_list_status(list.id, ListStatus::Saved, now)
            .await?;

        if let Err(err) = self
            .charge(
                ctx,
                &account,
                BillableAction::SaveShoppingList,
                &list_id.to_string(),
            )
            .await
        {
            log_compensation(
                BillableAction::SaveShoppingList,
                self.repo
                    .set_list_status(list.id, previous, list.updated_at)
                    .await,
            );
            return Err(err);
        }

        list.status = ListStatus::Saved;
        list.updated_at = now;
        info!(%list_id, "Saved shopping list");
        Ok(list)
    }

    /// Delete a list and its items, charging for it. Everything is restored if the charge fails.
    #[instrument(skip(self, ctx), fields(session_id = %ctx.session_id))]
    pub async fn delete_list(
        &self,
        ctx: &RequestContext,
        user_id: &str,
        list_id: ShoppingListId,
    ) -> Result<(), AppError> {
        let account = self.get_account(user_id).await?;
        let list = self.visible_list(&account, list_id).await?;
        self.ensure_credits(&account, BillableAction::DeleteShoppingList)
            .await?;

        let items = self.repo.list_shopping_items(list.id).await?;
        if !self.repo.delete_shopping_list(list.id).await? {
            return Err(AppError::ShoppingListNotFound(list_id.to_string()));
        }

        if let Err(err) = self
            .charge(
                ctx,
                &account,
                BillableAction::DeleteShoppingList,
                &list_id.to_string(),
            )
            .await
        {
            log_compensation(
                BillableAction::DeleteShoppingList,
                self.restore_list(&list, &items).await,
            );
            return Err(err);
        }

        info!(%list_id, items = items.len(), "Deleted shopping list");
        Ok(())
    }

    /// Export a list as CSV, charging for it. Nothing reaches `writer` unless the charge succeeds.
    #[instrument(skip(self, ctx, writer), fields(session_id = %ctx.session_id))]
    pub async fn export_list<W: Write>(
        &self,
        ctx: &RequestContext,
        user_id: &str,
        list_id: ShoppingListId,
        mut writer: W,
    ) -> Result<usize, AppError> {
        let account = self.get_account(user_id).await?;
        let list = self.visible_list(&account, list_id).await?;
        self.ensure_credits(&account, BillableAction::ExportShoppingList)
            .await?;

        let items = self.repo.list_shopping_items(list.id).await?;
        let mut rendered = Vec::new();
        let count = write_shopping_list_csv(&list, &items, &mut rendered)?;

        self.charge(
            ctx,
            &account,
            BillableAction::ExportShoppingList,
            &list_id.to_string(),
        )
        .await?;

        writer.write_all(&rendered)?;
        writer.flush()?;
        Ok(count)
    }

    pub async fn list_summary(
        &self,
        user_id: &str,
        list_id: ShoppingListId,
    ) -> Result<ListSummary, AppError> {
        let account = self.get_account(user_id).await?;
        let list = self.visible_list(&account, list_id).await?;
        let items = self.repo.list_shopping_items(list.id).await?;

        Ok(ListSummary {
            by_category: spending_by_category(&items),
            insights: list.insights(),
            list,
            items,
        })
    }

    pub async fn shopping_dashboard(&self, user_id: &str) -> Result<ShoppingDashboard, AppError> {
        let account = self.get_account(user_id).await?;
        let lists = self.repo.list_shopping_lists(scope(&account)).await?;

        let mut items = Vec::new();
        for list in &lists {
            items.extend(self.repo.list_shopping_items(list.id).await?);
        }

        let total_budget: Cents = lists.iter().map(|l| l.budget_cents).sum();
        let total_spent: Cents = lists.iter().map(|l| l.total_spent).sum();
        let active_lists = lists
            .iter()
            .filter(|l| l.status == ListStatus::Active)
            .count();

        Ok(ShoppingDashboard {
            total_budget,
            total_spent,
            active_lists,
            by_category: spending_by_category(&items),
            insights: dashboard_insights(total_budget, total_spent, active_lists),
            tips: &SHOPPING_TIPS,
            lists,
        })
    }

    // ========================
    // Internal helpers
    // ========================

    /// Advisory check before doing business work. Admins are never charged.
    async fn ensure_credits(&self, account: &Account, action: BillableAction) -> Result<(), AppError> {
        if account.is_admin() {
            return Ok(());
        }
        let balance = self.credits.balance(&account.id).await?;
        let required = action.cost();
        if balance < required {
            return Err(AppError::InsufficientCredits {
                user_id: account.id.clone(),
                balance,
                required,
            });
        }
        Ok(())
    }

    async fn charge(
        &self,
        ctx: &RequestContext,
        account: &Account,
        action: BillableAction,
        reference_id: &str,
    ) -> Result<Option<CreditReceipt>, AppError> {
        if account.is_admin() {
            debug!(user_id = %account.id, %action, "Admin account, not charged");
            return Ok(None);
        }
        let receipt = self
            .credits
            .try_deduct(
                ctx,
                &account.id,
                action.cost(),
                action.as_str(),
                Some(reference_id),
            )
            .await?;
        Ok(Some(receipt))
    }

    async fn visible_list(
        &self,
        account: &Account,
        list_id: ShoppingListId,
    ) -> Result<ShoppingList, AppError> {
        self.repo
            .get_shopping_list(list_id)
            .await?
            .filter(|list| visible_to(account, &list.user_id))
            .ok_or_else(|| AppError::ShoppingListNotFound(list_id.to_string()))
    }

    async fn visible_item(
        &self,
        account: &Account,
        item_id: ShoppingItemId,
    ) -> Result<ShoppingItem, AppError> {
        let item = self
            .repo
            .get_shopping_item(item_id)
            .await?
            .ok_or_else(|| AppError::ShoppingItemNotFound(item_id.to_string()))?;

        match self.visible_list(account, item.list_id).await {
            Ok(_) => Ok(item),
            Err(AppError::ShoppingListNotFound(_)) => {
                Err(AppError::ShoppingItemNotFound(item_id.to_string()))
            }
            Err(err) => Err(err),
        }
    }

    async fn refresh_total(&self, list_id: ShoppingListId) -> Result<Cents, AppError> {
        let items = self.repo.list_shopping_items(list_id).await?;
        let total = total_spent(&items);
        self.repo
            .update_list_total(list_id, total, self.clock.now())
            .await?;
        Ok(total)
    }

    async fn restore_list(&self, list: &ShoppingList, items: &[ShoppingItem]) -> anyhow::Result<()> {
        self.repo.save_shopping_list(list).await?;
        for item in items {
            self.repo.save_shopping_item(item).await?;
        }
        Ok(())
    }
}

fn visible_to(account: &Account, owner: &str) -> bool {
    account.is_admin() || account.id == owner
}

/// Owner filter for listings: admins see every user's records.
fn scope(account: &Account) -> Option<&str> {
    (!account.is_admin()).then_some(account.id.as_str())
}

fn log_compensation<T>(action: BillableAction, result: anyhow::Result<T>) {
    if let Err(err) = result {
        error!(%action, error = %format!("{:#}", err), "Failed to undo after a failed charge");
    }
}
