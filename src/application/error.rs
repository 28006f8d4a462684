use thiserror::Error;

use crate::domain::{Credits, ValidationError};

use super::CreditError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Account already exists: {0}")]
    AccountAlreadyExists(String),

    #[error("Budget not found: {0}")]
    BudgetNotFound(String),

    #[error("Shopping list not found: {0}")]
    ShoppingListNotFound(String),

    #[error("Shopping item not found: {0}")]
    ShoppingItemNotFound(String),

    #[error("Insufficient credits for {user_id}: balance {balance}, required {required}")]
    InsufficientCredits {
        user_id: String,
        balance: Credits,
        required: Credits,
    },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("Credit ledger error: {0}")]
    Credit(CreditError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0:#}")]
    Database(#[from] anyhow::Error),
}

impl From<CreditError> for AppError {
    fn from(err: CreditError) -> Self {
        match err {
            CreditError::NotFound(user_id) => AppError::AccountNotFound(user_id),
            CreditError::InsufficientBalance {
                user_id,
                balance,
                required,
            } => AppError::InsufficientCredits {
                user_id,
                balance,
                required,
            },
            CreditError::InvalidArgument(msg) => AppError::InvalidAmount(msg),
            other => AppError::Credit(other),
        }
    }
}
