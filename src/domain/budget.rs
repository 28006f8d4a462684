use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::{check_count, check_money, check_required};
use super::{Cents, MAX_AMOUNT_CENTS, ValidationError};

pub type BudgetId = Uuid;

pub const MAX_CUSTOM_CATEGORIES: usize = 20;
pub const MAX_CATEGORY_NAME_LEN: usize = 50;
pub const MAX_DEPENDENTS: u32 = 100;

/// Housing above this share of income triggers an insight (numerator / denominator = 40%).
const HOUSING_SHARE: (i64, i64) = (4, 10);

pub const BUDGET_TIPS: [&str; 4] = [
    "Track your expenses daily to stay within budget.",
    "Contribute to a rotating savings group for financial discipline.",
    "Optimize data subscriptions to reduce costs.",
    "Plan for dependents' expenses in advance.",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomCategory {
    pub name: String,
    pub amount_cents: Cents,
}

impl CustomCategory {
    pub fn new(name: impl Into<String>, amount_cents: Cents) -> Self {
        Self {
            name: name.into(),
            amount_cents,
        }
    }
}

/// Monthly figures submitted by a user, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BudgetInput {
    pub income: Cents,
    pub housing: Cents,
    pub food: Cents,
    pub transport: Cents,
    /// Number of dependents supported
    pub dependents: u32,
    pub miscellaneous: Cents,
    pub others: Cents,
    pub savings_goal: Cents,
    pub custom_categories: Vec<CustomCategory>,
}

impl BudgetInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("income", self.income),
            ("housing", self.housing),
            ("food", self.food),
            ("transport", self.transport),
            ("miscellaneous", self.miscellaneous),
            ("others", self.others),
            ("savings goal", self.savings_goal),
        ] {
            check_money(field, value, 0, MAX_AMOUNT_CENTS)?;
        }
        check_count("dependents", self.dependents, 0, MAX_DEPENDENTS)?;

        if self.custom_categories.len() > MAX_CUSTOM_CATEGORIES {
            return Err(ValidationError::TooManyCategories(MAX_CUSTOM_CATEGORIES));
        }

        let mut seen = HashSet::new();
        for category in &self.custom_categories {
            check_required("category name", &category.name)?;
            if category.name.chars().count() > MAX_CATEGORY_NAME_LEN {
                return Err(ValidationError::TooLong {
                    field: "category name",
                    max: MAX_CATEGORY_NAME_LEN,
                });
            }
            check_money("category amount", category.amount_cents, 0, MAX_AMOUNT_CENTS)?;
            if !seen.insert(category.name.trim().to_lowercase()) {
                return Err(ValidationError::DuplicateCategory(category.name.clone()));
            }
        }

        Ok(())
    }

    /// Sum of every expense line, custom categories included.
    pub fn fixed_expenses(&self) -> Cents {
        self.housing
            + self.food
            + self.transport
            + self.miscellaneous
            + self.others
            + self
                .custom_categories
                .iter()
                .map(|c| c.amount_cents)
                .sum::<Cents>()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub id: BudgetId,
    pub user_id: String,
    pub session_id: String,
    pub income: Cents,
    pub housing: Cents,
    pub food: Cents,
    pub transport: Cents,
    pub dependents: u32,
    pub miscellaneous: Cents,
    pub others: Cents,
    pub savings_goal: Cents,
    pub custom_categories: Vec<CustomCategory>,
    pub fixed_expenses: Cents,
    /// Positive for a surplus, negative for a deficit
    pub surplus_deficit: Cents,
    pub created_at: DateTime<Utc>,
}

impl Budget {
    pub fn new(
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        input: BudgetInput,
        created_at: DateTime<Utc>,
    ) -> Self {
        let fixed_expenses = input.fixed_expenses();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            session_id: session_id.into(),
            income: input.income,
            housing: input.housing,
            food: input.food,
            transport: input.transport,
            dependents: input.dependents,
            miscellaneous: input.miscellaneous,
            others: input.others,
            savings_goal: input.savings_goal,
            custom_categories: input.custom_categories,
            fixed_expenses,
            surplus_deficit: input.income - fixed_expenses,
            created_at,
        }
    }

    /// Non-zero expense lines, built-in categories first.
    pub fn categories(&self) -> Vec<(String, Cents)> {
        let builtin = [
            ("Housing/Rent", self.housing),
            ("Food", self.food),
            ("Transport", self.transport),
            ("Miscellaneous", self.miscellaneous),
            ("Others", self.others),
        ];

        builtin
            .into_iter()
            .map(|(name, amount)| (name.to_string(), amount))
            .chain(
                self.custom_categories
                    .iter()
                    .map(|c| (c.name.clone(), c.amount_cents)),
            )
            .filter(|(_, amount)| *amount > 0)
            .collect()
    }

    pub fn insights(&self) -> Vec<BudgetInsight> {
        let mut insights = Vec::new();
        if self.income <= 0 {
            return insights;
        }

        if self.surplus_deficit < 0 {
            insights.push(BudgetInsight::Deficit);
        } else if self.surplus_deficit > 0 {
            insights.push(BudgetInsight::Surplus);
        }
        if self.savings_goal == 0 {
            insights.push(BudgetInsight::SetSavingsGoal);
        }
        let (num, den) = HOUSING_SHARE;
        if self.housing * den > self.income * num {
            insights.push(BudgetInsight::HighHousing);
        }

        insights
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetInsight {
    Deficit,
    Surplus,
    SetSavingsGoal,
    HighHousing,
}

impl BudgetInsight {
    pub fn message(&self) -> &'static str {
        match self {
            BudgetInsight::Deficit => "Your expenses exceed your income. Consider reducing costs.",
            BudgetInsight::Surplus => "You have a surplus. Consider increasing savings.",
            BudgetInsight::SetSavingsGoal => "Set a savings goal to build financial security.",
            BudgetInsight::HighHousing => {
                "Housing costs exceed 40% of income. Consider cost-saving measures."
            }
        }
    }
}

impl std::fmt::Display for BudgetInsight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> BudgetInput {
        BudgetInput {
            income: 500_000,
            housing: 150_000,
            food: 80_000,
            transport: 30_000,
            dependents: 2,
            miscellaneous: 10_000,
            others: 5_000,
            savings_goal: 50_000,
            custom_categories: vec![CustomCategory::new("Gym", 5_000)],
        }
    }

    #[test]
    fn test_totals() {
        let budget = Budget::new("u1", "s1", input(), Utc::now());
        assert_eq!(budget.fixed_expenses, 280_000);
        assert_eq!(budget.surplus_deficit, 220_000);
    }

    #[test]
    fn test_dependents_are_not_money() {
        let mut with_more = input();
        with_more.dependents = 90;
        assert_eq!(with_more.fixed_expenses(), input().fixed_expenses());
    }

    #[test]
    fn test_surplus_insights() {
        let budget = Budget::new("u1", "s1", input(), Utc::now());
        assert_eq!(budget.insights(), vec![BudgetInsight::Surplus]);
    }

    #[test]
    fn test_deficit_high_housing_and_missing_goal() {
        let input = BudgetInput {
            income: 100_000,
            housing: 60_000,
            food: 50_000,
            savings_goal: 0,
            ..Default::default()
        };
        let budget = Budget::new("u1", "s1", input, Utc::now());
        assert_eq!(
            budget.insights(),
            vec![
                BudgetInsight::Deficit,
                BudgetInsight::SetSavingsGoal,
                BudgetInsight::HighHousing
            ]
        );
    }

    #[test]
    fn test_housing_at_exactly_forty_percent_is_fine() {
        let input = BudgetInput {
            income: 100_000,
            housing: 40_000,
            savings_goal: 1,
            ..Default::default()
        };
        let budget = Budget::new("u1", "s1", input, Utc::now());
        assert!(!budget.insights().contains(&BudgetInsight::HighHousing));
    }

    #[test]
    fn test_no_insights_without_income() {
        let budget = Budget::new("u1", "s1", BudgetInput::default(), Utc::now());
        assert!(budget.insights().is_empty());
    }

    #[test]
    fn test_categories_skip_zero_lines() {
        let input = BudgetInput {
            income: 100_000,
            food: 20_000,
            custom_categories: vec![
                CustomCategory::new("Pets", 0),
                CustomCategory::new("Books", 1_500),
            ],
            ..Default::default()
        };
        let budget = Budget::new("u1", "s1", input, Utc::now());
        assert_eq!(
            budget.categories(),
            vec![("Food".to_string(), 20_000), ("Books".to_string(), 1_500)]
        );
    }

    #[test]
    fn test_validate_rejects_duplicates_case_insensitively() {
        let mut input = input();
        input.custom_categories.push(CustomCategory::new("gym", 100));
        assert_eq!(
            input.validate(),
            Err(ValidationError::DuplicateCategory("gym".into()))
        );
    }

    #[test]
    fn test_validate_bounds() {
        let mut bad = input();
        bad.dependents = 101;
        assert!(bad.validate().is_err());

        let mut bad = input();
        bad.food = -1;
        assert!(bad.validate().is_err());

        let mut bad = input();
        bad.custom_categories = (0..21)
            .map(|i| CustomCategory::new(format!("c{}", i), 1))
            .collect();
        assert_eq!(bad.validate(), Err(ValidationError::TooManyCategories(20)));

        let mut bad = input();
        bad.custom_categories = vec![CustomCategory::new("x".repeat(51), 1)];
        assert!(matches!(
            bad.validate(),
            Err(ValidationError::TooLong { .. })
        ));

        assert!(input().validate().is_ok());
    }
}
