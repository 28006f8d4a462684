use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::time::Duration;
use uuid::Uuid;

use crate::application::{FinanceService, RequestContext};
use crate::config::{DEFAULT_BUSY_TIMEOUT, DEFAULT_MAX_ATTEMPTS, LedgerConfig};
use crate::domain::{
    BudgetInput, CustomCategory, ItemCategory, ItemStatus, NewItem, Role, Unit, format_cents,
    parse_cents,
};

/// Pennywise - budgets and shopping lists paid for with credits
#[derive(Parser)]
#[command(name = "pennywise")]
#[command(about = "A personal finance tool whose premium actions are paid for with credits")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "PENNYWISE_DB", default_value = "pennywise.db")]
    pub database: String,

    /// Account (id or e-mail) acting in budget and shopping commands
    #[arg(short, long, env = "PENNYWISE_USER", global = true)]
    pub user: Option<String>,

    /// Session id recorded on ledger entries (defaults to a fresh one per invocation)
    #[arg(long, global = true)]
    pub session: Option<String>,

    /// Attempts per credit deduction under storage contention
    #[arg(long, env = "PENNYWISE_MAX_ATTEMPTS", default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,

    /// How long to wait on another writer's lock, in milliseconds
    #[arg(long, env = "PENNYWISE_BUSY_TIMEOUT_MS", default_value_t = DEFAULT_BUSY_TIMEOUT.as_millis() as u64)]
    pub busy_timeout_ms: u64,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Account management commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// Credit ledger commands
    #[command(subcommand)]
    Credits(CreditCommands),

    /// Budget planner commands
    #[command(subcommand)]
    Budget(BudgetCommands),

    /// Shopping list commands
    #[command(subcommand)]
    Shopping(ShoppingCommands),
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Create a new account
    Create {
        /// E-mail address
        email: String,

        /// Role: personal or admin
        #[arg(short, long, default_value = "personal")]
        role: String,

        /// Starting credits
        #[arg(short, long, default_value_t = 0)]
        credits: i64,

        /// Use this id instead of a generated one
        #[arg(long)]
        id: Option<String>,
    },

    /// Show account details
    Show {
        /// Account id or e-mail
        account: String,
    },

    /// List all accounts
    List,

    /// Add credits to an account
    Grant {
        /// Account id or e-mail
        account: String,

        /// Number of credits
        amount: i64,

        /// Correlation id (e.g. a payment reference)
        #[arg(long)]
        reference: Option<String>,
    },

    /// Show credit ledger entries
    History {
        /// Account id or e-mail
        account: String,
    },

    /// Show audit log entries
    Audit {
        /// Account id or e-mail
        account: String,
    },
}

#[derive(Subcommand)]
pub enum CreditCommands {
    /// Show an account's credit balance
    Balance {
        /// Account id or e-mail
        account: String,
    },

    /// Deduct credits for an action
    Deduct {
        /// Account id or e-mail
        account: String,

        /// Number of credits
        amount: i64,

        /// Action label recorded on the ledger entry
        #[arg(short, long, default_value = "manual")]
        action: String,

        /// Correlation id
        #[arg(long)]
        reference: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum BudgetCommands {
    /// Create a monthly budget (1 credit)
    Create {
        /// Monthly income (e.g., "2500.00")
        #[arg(long)]
        income: String,

        #[arg(long, default_value = "0")]
        housing: String,

        #[arg(long, default_value = "0")]
        food: String,

        #[arg(long, default_value = "0")]
        transport: String,

        /// Number of dependents
        #[arg(long, default_value_t = 0)]
        dependents: u32,

        #[arg(long, default_value = "0")]
        miscellaneous: String,

        #[arg(long, default_value = "0")]
        others: String,

        #[arg(long, default_value = "0")]
        savings_goal: String,

        /// Custom category as NAME=AMOUNT (repeatable)
        #[arg(short, long = "category")]
        categories: Vec<String>,
    },

    /// List recent budgets
    List,

    /// Show the latest budget with insights
    Dashboard,

    /// Delete a budget (1 credit)
    Delete {
        /// Budget ID
        id: String,
    },

    /// Export recent budgets to CSV on stdout (2 credits)
    Export,
}

#[derive(Subcommand)]
pub enum ShoppingCommands {
    /// Create a shopping list
    Create {
        /// List name
        name: String,

        /// Budget for the list (e.g., "150.00")
        #[arg(short, long)]
        budget: String,
    },

    /// List shopping lists
    Lists,

    /// Add an item to a list
    Add {
        /// List ID
        list: String,

        /// Item name
        name: String,

        /// Price per unit
        #[arg(short, long)]
        price: String,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,

        /// piece, carton, kg, liter, pack or other
        #[arg(long, default_value = "piece")]
        unit: String,

        #[arg(long, default_value = "Unknown")]
        store: String,

        /// Category (derived from the name when omitted)
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Rename a list or change its budget (1 credit when something changes)
    Edit {
        /// List ID
        list: String,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long)]
        budget: Option<String>,
    },

    /// Change an item's details (1 credit when something changes)
    EditItem {
        /// Item ID
        item: String,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long)]
        price: Option<String>,

        #[arg(short, long)]
        quantity: Option<u32>,

        #[arg(long)]
        unit: Option<String>,

        #[arg(long)]
        store: Option<String>,

        #[arg(short, long)]
        category: Option<String>,
    },

    /// Show a list with its items and insights
    Show {
        /// List ID
        list: String,
    },

    /// Mark an item as bought
    Bought {
        /// Item ID
        item: String,
    },

    /// Mark an item as still to buy
    Unbought {
        /// Item ID
        item: String,
    },

    /// Remove an item (1 credit)
    RemoveItem {
        /// Item ID
        item: String,
    },

    /// Save a list (1 credit)
    Save {
        /// List ID
        list: String,
    },

    /// Delete a list and its items (1 credit)
    Delete {
        /// List ID
        list: String,
    },

    /// Export a list to CSV (2 credits)
    Export {
        /// List ID
        list: String,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Show totals across all lists
    Dashboard,
}

impl Cli {
    fn config(&self) -> LedgerConfig {
        LedgerConfig::default()
            .with_max_attempts(self.max_attempts)
            .with_busy_timeout(Duration::from_millis(self.busy_timeout_ms))
    }

    fn context(&self) -> RequestContext {
        match &self.session {
            Some(session_id) => RequestContext::new(session_id.clone()),
            None => RequestContext::generate(),
        }
    }

    async fn acting_user(&self, service: &FinanceService) -> Result<String> {
        let user = self
            .user
            .as_deref()
            .context("No acting account. Pass --user or set PENNYWISE_USER")?;
        Ok(service.find_account(user).await?.id)
    }

    pub async fn run(self) -> Result<()> {
        let config = self.config();
        let ctx = self.context();

        if matches!(self.command, Commands::Init) {
            FinanceService::init(&self.database, config).await?;
            println!("Database initialized: {}", self.database);
            return Ok(());
        }

        let service = FinanceService::connect(&self.database, config).await?;
        match &self.command {
            Commands::Init => {}
            Commands::Account(cmd) => run_account_command(&service, &ctx, cmd).await?,
            Commands::Credits(cmd) => run_credit_command(&service, &ctx, cmd).await?,
            Commands::Budget(cmd) => {
                let user_id = self.acting_user(&service).await?;
                run_budget_command(&service, &ctx, &user_id, cmd).await?;
            }
            Commands::Shopping(cmd) => {
                let user_id = self.acting_user(&service).await?;
                run_shopping_command(&service, &ctx, &user_id, cmd).await?;
            }
        }
        Ok(())
    }
}

async fn run_account_command(
    service: &FinanceService,
    ctx: &RequestContext,
    cmd: &AccountCommands,
) -> Result<()> {
    match cmd {
        AccountCommands::Create {
            email,
            role,
            credits,
            id,
        } => {
            let role = Role::from_str(role).with_context(|| {
                format!("Invalid role '{}'. Valid roles: personal, admin", role)
            })?;

            let mut account = crate::domain::Account::new(email.trim(), role);
            if let Some(id) = id {
                account = account.with_id(id.clone());
            }
            let account = service.open_account(ctx, account, *credits).await?;
            println!(
                "Created account: {} ({}, {} credits)",
                account.email, account.id, account.credit_balance
            );
        }

        AccountCommands::Show { account } => {
            let account = service.find_account(account).await?;
            println!("Account: {}", account.email);
            println!("  ID:       {}", account.id);
            println!("  Role:     {}", account.role);
            println!("  Credits:  {}", account.credit_balance);
            println!(
                "  Created:  {}",
                account.created_at.format("%Y-%m-%d %H:%M:%S")
            );
        }

        AccountCommands::List => {
            let accounts = service.list_accounts().await?;
            if accounts.is_empty() {
                println!("No accounts found.");
            } else {
                println!("{:<38} {:<30} {:<9} {:>8}", "ID", "EMAIL", "ROLE", "CREDITS");
                println!("{}", "-".repeat(88));
                for account in accounts {
                    println!(
                        "{:<38} {:<30} {:<9} {:>8}",
                        account.id,
                        truncate(&account.email, 30),
                        account.role,
                        account.credit_balance
                    );
                }
            }
        }

        AccountCommands::Grant {
            account,
            amount,
            reference,
        } => {
            let account = service.find_account(account).await?;
            let receipt = service
                .grant(ctx, &account.id, *amount, reference.as_deref())
                .await?;
            println!(
                "Granted {} credits to {}: {} -> {}",
                amount,
                account.email,
                receipt.previous_balance(),
                receipt.new_balance()
            );
        }

        AccountCommands::History { account } => {
            let account = service.find_account(account).await?;
            let entries = service.ledger_entries(&account.id).await?;
            if entries.is_empty() {
                println!("No ledger entries.");
            } else {
                println!(
                    "{:<20} {:<24} {:>7} {:<10} {}",
                    "TIMESTAMP", "ACTION", "AMOUNT", "STATUS", "REFERENCE"
                );
                println!("{}", "-".repeat(80));
                for entry in entries {
                    println!(
                        "{:<20} {:<24} {:>7} {:<10} {}",
                        entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                        truncate(&entry.action, 24),
                        entry.amount,
                        entry.status,
                        entry.reference_id.as_deref().unwrap_or("-")
                    );
                }
            }
        }

        AccountCommands::Audit { account } => {
            let account = service.find_account(account).await?;
            let entries = service.audit_entries(&account.id).await?;
            if entries.is_empty() {
                println!("No audit entries.");
            } else {
                for entry in entries {
                    println!(
                        "{}  {:<32} by {:<8} {} -> {}",
                        entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                        entry.action,
                        entry.actor,
                        entry.details.previous_balance,
                        entry.details.new_balance
                    );
                }
            }
        }
    }
    Ok(())
}

async fn run_credit_command(
    service: &FinanceService,
    ctx: &RequestContext,
    cmd: &CreditCommands,
) -> Result<()> {
    match cmd {
        CreditCommands::Balance { account } => {
            let account = service.find_account(account).await?;
            let balance = service.balance(&account.id).await?;
            println!("{}: {} credits", account.email, balance);
        }

        CreditCommands::Deduct {
            account,
            amount,
            action,
            reference,
        } => {
            let account = service.find_account(account).await?;
            let receipt = service
                .credits()
                .try_deduct(ctx, &account.id, *amount, action, reference.as_deref())
                .await?;
            println!(
                "Deducted {} credits from {} for {}: {} -> {}",
                amount,
                account.email,
                action,
                receipt.previous_balance(),
                receipt.new_balance()
            );
        }
    }
    Ok(())
}

async fn run_budget_command(
    service: &FinanceService,
    ctx: &RequestContext,
    user_id: &str,
    cmd: &BudgetCommands,
) -> Result<()> {
    match cmd {
        BudgetCommands::Create {
            income,
            housing,
            food,
            transport,
            dependents,
            miscellaneous,
            others,
            savings_goal,
            categories,
        } => {
            let input = BudgetInput {
                income: parse_money("income", income)?,
                housing: parse_money("housing", housing)?,
                food: parse_money("food", food)?,
                transport: parse_money("transport", transport)?,
                dependents: *dependents,
                miscellaneous: parse_money("miscellaneous", miscellaneous)?,
                others: parse_money("others", others)?,
                savings_goal: parse_money("savings goal", savings_goal)?,
                custom_categories: categories
                    .iter()
                    .map(|c| parse_custom_category(c))
                    .collect::<Result<_>>()?,
            };

            let budget = service.create_budget(ctx, user_id, input).await?;
            println!("Created budget: {}", budget.id);
            println!("  Income:         {}", format_cents(budget.income));
            println!("  Expenses:       {}", format_cents(budget.fixed_expenses));
            println!("  Surplus/deficit: {}", format_cents(budget.surplus_deficit));
        }

        BudgetCommands::List => {
            let budgets = service.list_budgets(user_id).await?;
            if budgets.is_empty() {
                println!("No budgets found.");
            } else {
                println!(
                    "{:<38} {:<12} {:>14} {:>14} {:>14}",
                    "ID", "CREATED", "INCOME", "EXPENSES", "SURPLUS"
                );
                println!("{}", "-".repeat(96));
                for budget in budgets {
                    println!(
                        "{:<38} {:<12} {:>14} {:>14} {:>14}",
                        budget.id,
                        budget.created_at.format("%Y-%m-%d"),
                        format_cents(budget.income),
                        format_cents(budget.fixed_expenses),
                        format_cents(budget.surplus_deficit)
                    );
                }
            }
        }

        BudgetCommands::Dashboard => {
            let dashboard = service.budget_dashboard(user_id).await?;
            match &dashboard.budget {
                None => println!("No budget yet. Create one with `budget create`."),
                Some(budget) => {
                    println!("Budget of {}", budget.created_at.format("%Y-%m-%d"));
                    println!("  Income:          {}", format_cents(budget.income));
                    println!("  Expenses:        {}", format_cents(budget.fixed_expenses));
                    println!("  Surplus/deficit: {}", format_cents(budget.surplus_deficit));
                    println!("  Savings goal:    {}", format_cents(budget.savings_goal));
                    println!("  Dependents:      {}", budget.dependents);
                    println!();
                    for (name, amount) in &dashboard.categories {
                        println!("  {:<24} {:>14}", truncate(name, 24), format_cents(*amount));
                    }
                    if !dashboard.insights.is_empty() {
                        println!();
                        println!("Insights:");
                        for insight in &dashboard.insights {
                            println!("  - {}", insight);
                        }
                    }
                }
            }
            println!();
            println!("Tips:");
            for tip in dashboard.tips {
                println!("  - {}", tip);
            }
        }

        BudgetCommands::Delete { id } => {
            let budget_id = parse_id("budget", id)?;
            service.delete_budget(ctx, user_id, budget_id).await?;
            println!("Deleted budget: {}", budget_id);
        }

        BudgetCommands::Export => {
            let count = service
                .export_budgets(ctx, user_id, std::io::stdout().lock())
                .await?;
            eprintln!("Exported {} budget(s)", count);
        }
    }
    Ok(())
}

async fn run_shopping_command(
    service: &FinanceService,
    ctx: &RequestContext,
    user_id: &str,
    cmd: &ShoppingCommands,
) -> Result<()> {
    match cmd {
        ShoppingCommands::Create { name, budget } => {
            let budget = parse_money("budget", budget)?;
            let list = service.create_list(ctx, user_id, name, budget).await?;
            println!(
                "Created list: {} ({}, budget {})",
                list.name,
                list.id,
                format_cents(list.budget_cents)
            );
        }

        ShoppingCommands::Lists => {
            let lists = service.list_shopping_lists(user_id).await?;
            if lists.is_empty() {
                println!("No shopping lists found.");
            } else {
                println!(
                    "{:<38} {:<20} {:<7} {:>12} {:>12}",
                    "ID", "NAME", "STATUS", "BUDGET", "SPENT"
                );
                println!("{}", "-".repeat(93));
                for list in lists {
                    println!(
                        "{:<38} {:<20} {:<7} {:>12} {:>12}",
                        list.id,
                        truncate(&list.name, 20),
                        list.status,
                        format_cents(list.budget_cents),
                        format_cents(list.total_spent)
                    );
                }
            }
        }

        ShoppingCommands::Add {
            list,
            name,
            price,
            quantity,
            unit,
            store,
            category,
        } => {
            let list_id = parse_id("list", list)?;
            let unit = Unit::from_str(unit).with_context(|| {
                format!(
                    "Invalid unit '{}'. Valid units: piece, carton, kg, liter, pack, other",
                    unit
                )
            })?;

            let mut input = NewItem::new(name.clone(), *quantity, parse_money("price", price)?)
                .with_unit(unit)
                .with_store(store.clone());
            if let Some(category) = category {
                let category = ItemCategory::from_str(category)
                    .with_context(|| format!("Invalid category '{}'", category))?;
                input = input.with_category(category);
            }

            let item = service.add_item(user_id, list_id, input).await?;
            println!(
                "Added {} x{} ({}) to list: {}",
                item.name, item.quantity, item.category, item.id
            );
        }

        ShoppingCommands::Edit { list, name, budget } => {
            let current = service.get_list(user_id, parse_id("list", list)?).await?;
            let name = name.as_deref().unwrap_or(&current.name);
            let budget = match budget {
                Some(budget) => parse_money("budget", budget)?,
                None => current.budget_cents,
            };

            let list = service
                .update_list(ctx, user_id, current.id, name, budget)
                .await?;
            println!(
                "Updated list: {} (budget {})",
                list.name,
                format_cents(list.budget_cents)
            );
        }

        ShoppingCommands::EditItem {
            item,
            name,
            price,
            quantity,
            unit,
            store,
            category,
        } => {
            let current = service.get_item(user_id, parse_id("item", item)?).await?;
            let mut input = NewItem::from(&current);
            if let Some(name) = name {
                input.name = name.clone();
                // A renamed item is re-categorized unless a category is given
                input.category = None;
            }
            if let Some(price) = price {
                input.price_cents = parse_money("price", price)?;
            }
            if let Some(quantity) = quantity {
                input.quantity = *quantity;
            }
            if let Some(unit) = unit {
                input.unit = Unit::from_str(unit)
                    .with_context(|| format!("Invalid unit '{}'", unit))?;
            }
            if let Some(store) = store {
                input.store = store.clone();
            }
            if let Some(category) = category {
                let category = ItemCategory::from_str(category)
                    .with_context(|| format!("Invalid category '{}'", category))?;
                input = input.with_category(category);
            }

            let item = service.update_item(ctx, user_id, current.id, input).await?;
            println!(
                "Updated {} x{} ({}) at {}",
                item.name,
                item.quantity,
                item.category,
                format_cents(item.price_cents)
            );
        }

        ShoppingCommands::Show { list } => {
            let summary = service.list_summary(user_id, parse_id("list", list)?).await?;
            let list = &summary.list;

            println!("List: {} ({})", list.name, list.status);
            println!("  Budget: {}", format_cents(list.budget_cents));
            println!("  Spent:  {}", format_cents(list.total_spent));
            if let Some(over) = list.over_budget_by() {
                println!("  Over budget by {}", format_cents(over));
            }
            println!();

            if summary.items.is_empty() {
                println!("No items.");
            } else {
                println!(
                    "{:<38} {:<20} {:>5} {:>12} {:<10} {:<7}",
                    "ID", "ITEM", "QTY", "TOTAL", "CATEGORY", "STATUS"
                );
                println!("{}", "-".repeat(97));
                for item in &summary.items {
                    println!(
                        "{:<38} {:<20} {:>5} {:>12} {:<10} {:<7}",
                        item.id,
                        truncate(&item.name, 20),
                        item.quantity,
                        format_cents(item.line_total()),
                        item.category,
                        item.status
                    );
                }
            }

            if !summary.by_category.is_empty() {
                println!();
                for (category, amount) in &summary.by_category {
                    println!("  {:<12} {:>12}", category, format_cents(*amount));
                }
            }
            for insight in &summary.insights {
                println!("  - {}", insight.message());
            }
        }

        ShoppingCommands::Bought { item } => {
            let item = service
                .update_item_status(user_id, parse_id("item", item)?, ItemStatus::Bought)
                .await?;
            println!("Marked as bought: {}", item.name);
        }

        ShoppingCommands::Unbought { item } => {
            let item = service
                .update_item_status(user_id, parse_id("item", item)?, ItemStatus::ToBuy)
                .await?;
            println!("Marked as to buy: {}", item.name);
        }

        ShoppingCommands::RemoveItem { item } => {
            let item_id = parse_id("item", item)?;
            service.delete_item(ctx, user_id, item_id).await?;
            println!("Removed item: {}", item_id);
        }

        ShoppingCommands::Save { list } => {
            let list = service.save_list(ctx, user_id, parse_id("list", list)?).await?;
            println!("Saved list: {}", list.name);
        }

        ShoppingCommands::Delete { list } => {
            let list_id = parse_id("list", list)?;
            service.delete_list(ctx, user_id, list_id).await?;
            println!("Deleted list: {}", list_id);
        }

        ShoppingCommands::Export { list, output } => {
            let list_id = parse_id("list", list)?;
            let count = match output {
                Some(path) => {
                    let mut rendered = Vec::new();
                    let count = service
                        .export_list(ctx, user_id, list_id, &mut rendered)
                        .await?;
                    std::fs::write(path, rendered)
                        .with_context(|| format!("Failed to write {}", path))?;
                    count
                }
                None => {
                    service
                        .export_list(ctx, user_id, list_id, std::io::stdout().lock())
                        .await?
                }
            };
            eprintln!("Exported {} item(s)", count);
        }

        ShoppingCommands::Dashboard => {
            let dashboard = service.shopping_dashboard(user_id).await?;
            println!("Lists:        {}", dashboard.lists.len());
            println!("Active lists: {}", dashboard.active_lists);
            println!("Total budget: {}", format_cents(dashboard.total_budget));
            println!("Total spent:  {}", format_cents(dashboard.total_spent));

            if !dashboard.by_category.is_empty() {
                println!();
                for (category, amount) in &dashboard.by_category {
                    println!("  {:<12} {:>12}", category, format_cents(*amount));
                }
            }
            if !dashboard.insights.is_empty() {
                println!();
                println!("Insights:");
                for insight in &dashboard.insights {
                    println!("  - {}", insight.message());
                }
            }
            println!();
            println!("Tips:");
            for tip in dashboard.tips {
                println!("  - {}", tip);
            }
        }
    }
    Ok(())
}

fn parse_money(field: &str, value: &str) -> Result<i64> {
    parse_cents(value)
        .with_context(|| format!("Invalid {} '{}'. Use '50.00' or '50'", field, value))
}

fn parse_id(what: &str, value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).with_context(|| format!("Invalid {} ID '{}'", what, value))
}

/// Parse `NAME=AMOUNT` into a custom budget category.
fn parse_custom_category(value: &str) -> Result<CustomCategory> {
    let (name, amount) = value
        .rsplit_once('=')
        .with_context(|| format!("Invalid category '{}'. Use NAME=AMOUNT", value))?;
    Ok(CustomCategory::new(
        name.trim(),
        parse_money("category amount", amount)?,
    ))
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}
