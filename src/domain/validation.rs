use thiserror::Error;

use super::{Cents, format_cents};

/// Input rejected before anything is persisted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: String,
        max: String,
    },

    #[error("{field} must be {max} characters or less")]
    TooLong { field: &'static str, max: usize },

    #[error("Custom category names must be unique (duplicate: {0})")]
    DuplicateCategory(String),

    #[error("Item name already exists in this list: {0}")]
    DuplicateItem(String),

    #[error("At most {0} custom categories are allowed")]
    TooManyCategories(usize),
}

pub(crate) fn check_money(
    field: &'static str,
    value: Cents,
    min: Cents,
    max: Cents,
) -> Result<(), ValidationError> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field,
            min: format_cents(min),
            max: format_cents(max),
        });
    }
    Ok(())
}

pub(crate) fn check_count(
    field: &'static str,
    value: u32,
    min: u32,
    max: u32,
) -> Result<(), ValidationError> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field,
            min: min.to_string(),
            max: max.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn check_required(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required { field });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_range_message_uses_formatted_amounts() {
        let err = check_money("price", -1, 0, 100_000_000).unwrap_err();
        assert_eq!(err.to_string(), "price must be between 0.00 and 1,000,000.00");
    }

    #[test]
    fn test_required_rejects_whitespace() {
        assert!(check_required("name", "   ").is_err());
        assert!(check_required("name", "milk").is_ok());
    }
}
