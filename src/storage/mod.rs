mod repository;
mod transaction;

pub use repository::*;
pub use transaction::*;

/// SQL migration for accounts, the credit ledger and the audit log
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");

/// SQL migration for budgets
pub const MIGRATION_002_BUDGETS: &str = include_str!("migrations/002_budgets.sql");

/// SQL migration for shopping lists and items
pub const MIGRATION_003_SHOPPING: &str = include_str!("migrations/003_shopping.sql");
