use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Internal metering unit debited per billable action.
pub type Credits = i64;

pub type EntryId = Uuid;

/// Actor recorded on audit entries written by the ledger itself.
pub const SYSTEM_ACTOR: &str = "system";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Completed,
    Failed,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Completed => "completed",
            EntryStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(EntryStatus::Completed),
            "failed" => Some(EntryStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An append-only record of a balance change (or of a deduction that lost a race).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub user_id: String,
    pub action: String,
    /// Signed change: negative for deductions, positive for grants
    pub amount: Credits,
    /// Correlation id of the resource being charged for
    pub reference_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub status: EntryStatus,
}

impl LedgerEntry {
    /// Entry for a deduction of `amount` credits. The stored amount is negated.
    pub fn deduction(
        user_id: impl Into<String>,
        action: impl Into<String>,
        amount: Credits,
        timestamp: DateTime<Utc>,
        session_id: impl Into<String>,
        status: EntryStatus,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            action: action.into(),
            amount: -amount,
            reference_id: None,
            timestamp,
            session_id: session_id.into(),
            status,
        }
    }

    /// Entry for a completed grant of `amount` credits.
    pub fn grant(
        user_id: impl Into<String>,
        action: impl Into<String>,
        amount: Credits,
        timestamp: DateTime<Utc>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            amount,
            ..Self::deduction(
                user_id,
                action,
                0,
                timestamp,
                session_id,
                EntryStatus::Completed,
            )
        }
    }

    pub fn with_reference(mut self, reference_id: Option<&str>) -> Self {
        self.reference_id = reference_id.map(str::to_string);
        self
    }

    pub fn is_completed(&self) -> bool {
        self.status == EntryStatus::Completed
    }
}

/// Before/after snapshot stored with every successful balance change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditDetails {
    pub user_id: String,
    /// Unsigned amount moved
    pub amount: Credits,
    pub reference_id: Option<String>,
    pub previous_balance: Credits,
    pub new_balance: Credits,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: EntryId,
    pub actor: String,
    pub action: String,
    pub details: AuditDetails,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn deduction(action: &str, details: AuditDetails, timestamp: DateTime<Utc>) -> Self {
        Self::system(format!("deduct_credits_{}", action), details, timestamp)
    }

    pub fn grant(action: &str, details: AuditDetails, timestamp: DateTime<Utc>) -> Self {
        Self::system(format!("grant_credits_{}", action), details, timestamp)
    }

    fn system(action: String, details: AuditDetails, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor: SYSTEM_ACTOR.to_string(),
            action,
            details,
            timestamp,
        }
    }
}

/// Actions that cost credits, with their fixed price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillableAction {
    CreateBudget,
    DeleteBudget,
    SaveShoppingList,
    DeleteShoppingList,
    DeleteShoppingItem,
    ExportShoppingList,
    SaveShoppingListChanges,
    ExportBudgets,
}

impl BillableAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillableAction::CreateBudget => "create_budget",
            BillableAction::DeleteBudget => "delete_budget",
            BillableAction::SaveShoppingList => "save_shopping_list",
            BillableAction::DeleteShoppingList => "delete_shopping_list",
            BillableAction::DeleteShoppingItem => "delete_shopping_item",
            BillableAction::ExportShoppingList => "export_shopping_list",
            BillableAction::SaveShoppingListChanges => "save_shopping_list_changes",
            BillableAction::ExportBudgets => "export_budgets",
        }
    }

    pub fn cost(&self) -> Credits {
        match self {
            BillableAction::ExportShoppingList | BillableAction::ExportBudgets => 2,
            _ => 1,
        }
    }
}

impl std::fmt::Display for BillableAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deduction_entry_is_negative() {
        let entry = LedgerEntry::deduction(
            "u1",
            "create_budget",
            3,
            Utc::now(),
            "s1",
            EntryStatus::Completed,
        );
        assert_eq!(entry.amount, -3);
        assert!(entry.is_completed());
        assert_eq!(entry.reference_id, None);
    }

    #[test]
    fn test_grant_entry_is_positive_and_completed() {
        let entry = LedgerEntry::grant("u1", "top_up", 10, Utc::now(), "s1")
            .with_reference(Some("order-7"));
        assert_eq!(entry.amount, 10);
        assert_eq!(entry.status, EntryStatus::Completed);
        assert_eq!(entry.reference_id.as_deref(), Some("order-7"));
    }

    #[test]
    fn test_audit_action_labels() {
        let details = AuditDetails {
            user_id: "u1".into(),
            amount: 1,
            reference_id: None,
            previous_balance: 5,
            new_balance: 4,
        };
        let entry = AuditEntry::deduction("delete_budget", details.clone(), Utc::now());
        assert_eq!(entry.action, "deduct_credits_delete_budget");
        assert_eq!(entry.actor, SYSTEM_ACTOR);

        let entry = AuditEntry::grant("top_up", details, Utc::now());
        assert_eq!(entry.action, "grant_credits_top_up");
    }

    #[test]
    fn test_entry_status_roundtrip() {
        for status in [EntryStatus::Completed, EntryStatus::Failed] {
            assert_eq!(EntryStatus::from_str(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_export_costs_two_credits() {
        assert_eq!(BillableAction::ExportShoppingList.cost(), 2);
        assert_eq!(BillableAction::ExportBudgets.cost(), 2);
        assert_eq!(BillableAction::CreateBudget.cost(), 1);
        assert_eq!(BillableAction::SaveShoppingListChanges.cost(), 1);
        assert_eq!(BillableAction::DeleteShoppingItem.as_str(), "delete_shopping_item");
    }
}
