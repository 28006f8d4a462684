use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::{check_count, check_money, check_required};
use super::{Cents, MAX_AMOUNT_CENTS, ValidationError};

pub type ShoppingListId = Uuid;
pub type ShoppingItemId = Uuid;

pub const MAX_ITEM_PRICE_CENTS: Cents = 1_000_000 * 100;
pub const MAX_ITEM_QUANTITY: u32 = 1000;
pub const MAX_FREQUENCY_DAYS: u32 = 365;
/// More active lists than this earns a consolidation hint.
pub const MANY_ACTIVE_LISTS: usize = 5;

pub const SHOPPING_TIPS: [&str; 4] = [
    "Plan your shopping list ahead to avoid impulse buys.",
    "Compare prices across stores to save money.",
    "Buy non-perishable items in bulk to reduce costs.",
    "Check for sales or discounts before shopping.",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemCategory {
    Fruits,
    Vegetables,
    Dairy,
    Meat,
    Grains,
    Beverages,
    Household,
    Other,
}

/// Keyword table consulted in order; the first category with a substring hit wins.
const CATEGORY_KEYWORDS: [(ItemCategory, &[&str]); 7] = [
    (
        ItemCategory::Fruits,
        &["apple", "banana", "orange", "mango", "pineapple", "berry", "grape"],
    ),
    (
        ItemCategory::Vegetables,
        &["carrot", "potato", "tomato", "onion", "spinach", "lettuce"],
    ),
    (
        ItemCategory::Dairy,
        &["milk", "cheese", "yogurt", "butter", "cream"],
    ),
    (
        ItemCategory::Meat,
        &["chicken", "beef", "pork", "fish", "egg"],
    ),
    (
        ItemCategory::Grains,
        &["rice", "bread", "pasta", "flour", "cereal"],
    ),
    (
        ItemCategory::Beverages,
        &["juice", "soda", "water", "tea", "coffee"],
    ),
    (
        ItemCategory::Household,
        &["detergent", "soap", "tissue", "paper towel"],
    ),
];

/// Guess a category from an item name by keyword substring match.
pub fn auto_categorize(item_name: &str) -> ItemCategory {
    let name = item_name.trim().to_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| name.contains(k)))
        .map(|(category, _)| *category)
        .unwrap_or(ItemCategory::Other)
}

impl ItemCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemCategory::Fruits => "fruits",
            ItemCategory::Vegetables => "vegetables",
            ItemCategory::Dairy => "dairy",
            ItemCategory::Meat => "meat",
            ItemCategory::Grains => "grains",
            ItemCategory::Beverages => "beverages",
            ItemCategory::Household => "household",
            ItemCategory::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "fruits" => Some(ItemCategory::Fruits),
            "vegetables" => Some(ItemCategory::Vegetables),
            "dairy" => Some(ItemCategory::Dairy),
            "meat" => Some(ItemCategory::Meat),
            "grains" => Some(ItemCategory::Grains),
            "beverages" => Some(ItemCategory::Beverages),
            "household" => Some(ItemCategory::Household),
            "other" => Some(ItemCategory::Other),
            _ => None,
        }
    }
}

impl std::fmt::Display for ItemCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Piece,
    Carton,
    Kg,
    Liter,
    Pack,
    Other,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Piece => "piece",
            Unit::Carton => "carton",
            Unit::Kg => "kg",
            Unit::Liter => "liter",
            Unit::Pack => "pack",
            Unit::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "piece" => Some(Unit::Piece),
            "carton" => Some(Unit::Carton),
            "kg" => Some(Unit::Kg),
            "liter" => Some(Unit::Liter),
            "pack" => Some(Unit::Pack),
            "other" => Some(Unit::Other),
            _ => None,
        }
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    ToBuy,
    Bought,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::ToBuy => "to_buy",
            ItemStatus::Bought => "bought",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "to_buy" => Some(ItemStatus::ToBuy),
            "bought" => Some(ItemStatus::Bought),
            _ => None,
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListStatus {
    Active,
    Saved,
}

impl ListStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListStatus::Active => "active",
            ListStatus::Saved => "saved",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(ListStatus::Active),
            "saved" => Some(ListStatus::Saved),
            _ => None,
        }
    }
}

impl std::fmt::Display for ListStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShoppingList {
    pub id: ShoppingListId,
    pub user_id: String,
    pub session_id: String,
    pub name: String,
    pub budget_cents: Cents,
    /// Cached sum of price x quantity over the list's items
    pub total_spent: Cents,
    pub status: ListStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ShoppingList {
    pub fn new(
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        name: impl Into<String>,
        budget_cents: Cents,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            session_id: session_id.into(),
            name: name.into(),
            budget_cents,
            total_spent: 0,
            status: ListStatus::Active,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn validate(name: &str, budget_cents: Cents) -> Result<(), ValidationError> {
        check_required("list name", name)?;
        check_money("budget", budget_cents, 1, MAX_AMOUNT_CENTS)
    }

    /// Amount by which the list exceeds its budget, if it does.
    pub fn over_budget_by(&self) -> Option<Cents> {
        (self.total_spent > self.budget_cents).then(|| self.total_spent - self.budget_cents)
    }

    pub fn insights(&self) -> Vec<ListInsight> {
        list_insights(self.budget_cents, self.total_spent)
    }
}

/// Item details as entered by the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    pub quantity: u32,
    pub price_cents: Cents,
    pub unit: Unit,
    pub store: String,
    /// Derived from the name when absent
    pub category: Option<ItemCategory>,
    pub status: ItemStatus,
    pub frequency_days: u32,
}

impl NewItem {
    pub fn new(name: impl Into<String>, quantity: u32, price_cents: Cents) -> Self {
        Self {
            name: name.into(),
            quantity,
            price_cents,
            unit: Unit::Piece,
            store: "Unknown".to_string(),
            category: None,
            status: ItemStatus::ToBuy,
            frequency_days: 7,
        }
    }

    pub fn with_store(mut self, store: impl Into<String>) -> Self {
        self.store = store.into();
        self
    }

    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }

    pub fn with_category(mut self, category: ItemCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_required("item name", &self.name)?;
        check_required("store", &self.store)?;
        check_count("quantity", self.quantity, 1, MAX_ITEM_QUANTITY)?;
        check_money("price", self.price_cents, 0, MAX_ITEM_PRICE_CENTS)?;
        check_count("frequency", self.frequency_days, 1, MAX_FREQUENCY_DAYS)
    }
}

impl From<&ShoppingItem> for NewItem {
    fn from(item: &ShoppingItem) -> Self {
        Self {
            name: item.name.clone(),
            quantity: item.quantity,
            price_cents: item.price_cents,
            unit: item.unit,
            store: item.store.clone(),
            category: Some(item.category),
            status: item.status,
            frequency_days: item.frequency_days,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingItem {
    pub id: ShoppingItemId,
    pub list_id: ShoppingListId,
    pub name: String,
    pub quantity: u32,
    pub price_cents: Cents,
    pub unit: Unit,
    pub store: String,
    pub category: ItemCategory,
    pub status: ItemStatus,
    pub frequency_days: u32,
    pub created_at: DateTime<Utc>,
}

impl ShoppingItem {
    pub fn new(list_id: ShoppingListId, input: NewItem, created_at: DateTime<Utc>) -> Self {
        let category = input
            .category
            .unwrap_or_else(|| auto_categorize(&input.name));
        Self {
            id: Uuid::new_v4(),
            list_id,
            name: input.name.trim().to_string(),
            quantity: input.quantity,
            price_cents: input.price_cents,
            unit: input.unit,
            store: input.store.trim().to_string(),
            category,
            status: input.status,
            frequency_days: input.frequency_days,
            created_at,
        }
    }

    /// The same item with its editable details replaced by `input`.
    pub fn with_details(&self, input: NewItem) -> Self {
        Self {
            id: self.id,
            ..Self::new(self.list_id, input, self.created_at)
        }
    }

    pub fn line_total(&self) -> Cents {
        self.price_cents * Cents::from(self.quantity)
    }
}

/// Whether another item in `items` already uses `name`, ignoring case.
pub fn name_taken(items: &[ShoppingItem], name: &str, except: Option<ShoppingItemId>) -> bool {
    let name = name.trim().to_lowercase();
    items
        .iter()
        .filter(|item| Some(item.id) != except)
        .any(|item| item.name.to_lowercase() == name)
}

pub fn total_spent(items: &[ShoppingItem]) -> Cents {
    items.iter().map(ShoppingItem::line_total).sum()
}

/// Spending per category, largest first.
pub fn spending_by_category(items: &[ShoppingItem]) -> Vec<(ItemCategory, Cents)> {
    let mut totals: std::collections::BTreeMap<ItemCategory, Cents> = Default::default();
    for item in items {
        *totals.entry(item.category).or_insert(0) += item.line_total();
    }

    let mut totals: Vec<_> = totals.into_iter().collect();
    totals.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    totals
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListInsight {
    OverBudget,
    UnderBudget,
}

impl ListInsight {
    pub fn message(&self) -> &'static str {
        match self {
            ListInsight::OverBudget => {
                "You are over budget. Consider removing non-essential items."
            }
            ListInsight::UnderBudget => {
                "You are under budget. Consider allocating funds to savings."
            }
        }
    }
}

pub fn list_insights(budget_cents: Cents, total_spent: Cents) -> Vec<ListInsight> {
    if budget_cents <= 0 {
        return Vec::new();
    }
    if total_spent > budget_cents {
        vec![ListInsight::OverBudget]
    } else if total_spent * 2 < budget_cents {
        vec![ListInsight::UnderBudget]
    } else {
        Vec::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DashboardInsight {
    OverTotalBudget,
    ManyActiveLists,
}

impl DashboardInsight {
    pub fn message(&self) -> &'static str {
        match self {
            DashboardInsight::OverTotalBudget => {
                "You are spending more than your budget. Consider reviewing your shopping habits."
            }
            DashboardInsight::ManyActiveLists => {
                "You have many active lists. Consider consolidating them for better organization."
            }
        }
    }
}

pub fn dashboard_insights(
    total_budget: Cents,
    total_spent: Cents,
    active_lists: usize,
) -> Vec<DashboardInsight> {
    let mut insights = Vec::new();
    if total_budget > 0 && total_spent > total_budget {
        insights.push(DashboardInsight::OverTotalBudget);
    }
    if active_lists > MANY_ACTIVE_LISTS {
        insights.push(DashboardInsight::ManyActiveLists);
    }
    insights
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, quantity: u32, price_cents: Cents) -> ShoppingItem {
        ShoppingItem::new(
            Uuid::new_v4(),
            NewItem::new(name, quantity, price_cents),
            Utc::now(),
        )
    }

    #[test]
    fn test_auto_categorize_keywords() {
        assert_eq!(auto_categorize("Green Apples"), ItemCategory::Fruits);
        assert_eq!(auto_categorize("  SPINACH "), ItemCategory::Vegetables);
        assert_eq!(auto_categorize("oat milk"), ItemCategory::Dairy);
        assert_eq!(auto_categorize("eggs"), ItemCategory::Meat);
        assert_eq!(auto_categorize("Brown rice"), ItemCategory::Grains);
        assert_eq!(auto_categorize("green tea"), ItemCategory::Beverages);
        assert_eq!(auto_categorize("Paper Towel roll"), ItemCategory::Household);
        assert_eq!(auto_categorize("batteries"), ItemCategory::Other);
    }

    #[test]
    fn test_auto_categorize_first_match_wins() {
        // "pineapple juice" hits fruits before beverages
        assert_eq!(auto_categorize("pineapple juice"), ItemCategory::Fruits);
        // "buttermilk" hits dairy once, whichever keyword matches
        assert_eq!(auto_categorize("buttermilk"), ItemCategory::Dairy);
    }

    #[test]
    fn test_explicit_category_overrides_guess() {
        let input = NewItem::new("apple cider", 1, 500).with_category(ItemCategory::Beverages);
        let item = ShoppingItem::new(Uuid::new_v4(), input, Utc::now());
        assert_eq!(item.category, ItemCategory::Beverages);
    }

    #[test]
    fn test_totals() {
        let items = vec![item("milk", 2, 350), item("bread", 1, 400), item("cheese", 3, 1000)];
        assert_eq!(total_spent(&items), 4100);
        assert_eq!(
            spending_by_category(&items),
            vec![(ItemCategory::Dairy, 3700), (ItemCategory::Grains, 400)]
        );
    }

    #[test]
    fn test_list_insights() {
        assert_eq!(list_insights(10_000, 10_001), vec![ListInsight::OverBudget]);
        assert_eq!(list_insights(10_000, 4_999), vec![ListInsight::UnderBudget]);
        assert!(list_insights(10_000, 5_000).is_empty());
        assert!(list_insights(10_000, 10_000).is_empty());
    }

    #[test]
    fn test_dashboard_insights() {
        assert!(dashboard_insights(0, 500, 1).is_empty());
        assert_eq!(
            dashboard_insights(1000, 1500, 6),
            vec![
                DashboardInsight::OverTotalBudget,
                DashboardInsight::ManyActiveLists
            ]
        );
        assert!(dashboard_insights(1000, 900, 5).is_empty());
    }

    #[test]
    fn test_over_budget_by() {
        let mut list = ShoppingList::new("u1", "s1", "Weekly", 10_000, Utc::now());
        assert_eq!(list.over_budget_by(), None);
        list.total_spent = 12_500;
        assert_eq!(list.over_budget_by(), Some(2_500));
    }

    #[test]
    fn test_item_validation() {
        assert!(NewItem::new("milk", 1, 0).validate().is_ok());
        assert!(NewItem::new("milk", 0, 100).validate().is_err());
        assert!(NewItem::new("milk", 1001, 100).validate().is_err());
        assert!(NewItem::new("milk", 1, MAX_ITEM_PRICE_CENTS + 1).validate().is_err());
        assert!(NewItem::new("", 1, 100).validate().is_err());
        assert!(NewItem::new("milk", 1, 100).with_store(" ").validate().is_err());

        let mut input = NewItem::new("milk", 1, 100);
        input.frequency_days = 366;
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_list_validation() {
        assert!(ShoppingList::validate("Groceries", 1).is_ok());
        assert!(ShoppingList::validate("Groceries", 0).is_err());
        assert!(ShoppingList::validate("  ", 500).is_err());
    }

    #[test]
    fn test_name_taken_ignores_case_and_the_edited_item() {
        let milk = item("Whole Milk", 1, 350);
        let items = vec![milk.clone(), item("Bread", 1, 200)];

        assert!(name_taken(&items, " whole milk ", None));
        assert!(!name_taken(&items, "whole milk", Some(milk.id)));
        assert!(!name_taken(&items, "Eggs", None));
    }

    #[test]
    fn test_with_details_keeps_identity() {
        let original = item("Rice", 1, 300);
        let edited = original.with_details(NewItem::new("Basmati rice", 2, 450));

        assert_eq!(edited.id, original.id);
        assert_eq!(edited.list_id, original.list_id);
        assert_eq!(edited.created_at, original.created_at);
        assert_eq!(edited.line_total(), 900);
        assert_ne!(edited, original);
    }
}
