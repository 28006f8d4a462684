use anyhow::Result;
use std::io::Write;

use crate::domain::{Budget, ShoppingItem, ShoppingList, format_cents};

/// Write a shopping list's items as CSV, followed by a totals row.
/// Returns the number of item rows written.
pub fn write_shopping_list_csv<W: Write>(
    list: &ShoppingList,
    items: &[ShoppingItem],
    writer: W,
) -> Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer.write_record([
        "item",
        "quantity",
        "unit",
        "price",
        "total",
        "category",
        "store",
        "status",
    ])?;

    for item in items {
        csv_writer.write_record([
            item.name.as_str(),
            &item.quantity.to_string(),
            item.unit.as_str(),
            &format_cents(item.price_cents),
            &format_cents(item.line_total()),
            item.category.as_str(),
            &item.store,
            item.status.as_str(),
        ])?;
    }

    csv_writer.write_record([
        list.name.as_str(),
        "",
        "",
        "",
        &format_cents(list.total_spent),
        "",
        "",
        &format!("budget {}", format_cents(list.budget_cents)),
    ])?;

    csv_writer.flush()?;
    Ok(items.len())
}

/// Write budgets as CSV, one row per budget. Returns the number of rows written.
pub fn write_budgets_csv<W: Write>(budgets: &[Budget], writer: W) -> Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer.write_record([
        "id",
        "created_at",
        "income",
        "fixed_expenses",
        "surplus_deficit",
        "savings_goal",
        "dependents",
    ])?;

    for budget in budgets {
        csv_writer.write_record([
            budget.id.to_string(),
            budget.created_at.to_rfc3339(),
            format_cents(budget.income),
            format_cents(budget.fixed_expenses),
            format_cents(budget.surplus_deficit),
            format_cents(budget.savings_goal),
            budget.dependents.to_string(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(budgets.len())
}
