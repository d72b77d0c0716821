//! Text rendering for the pages.

use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, ContentArrangement, Table};
use tallybook_core::models::{category_title, BudgetStatus, Category, Summary, Transaction, TransactionPage};
use tallybook_core::utils::{bar, format_currency, format_date, truncate_string};

/// Width of the bar chart at full scale
const CHART_WIDTH: usize = 30;

/// Maximum description length in the transaction table
const MAX_DESCRIPTION_LEN: usize = 40;

fn table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn amount_cell(amount: f64) -> Cell {
    Cell::new(format_currency(amount)).set_alignment(CellAlignment::Right)
}

/// Label/value pairs as horizontal bars.
pub fn chart(data: &[(&str, f64)]) -> String {
    let max = data.iter().map(|(_, v)| v.abs()).fold(0.0, f64::max);
    let label_width = data.iter().map(|(l, _)| l.len()).max().unwrap_or(0);
    data.iter()
        .map(|(label, value)| {
            format!(
                "{:<width$}  {:>14}  {}",
                label,
                format_currency(*value),
                bar(value.abs(), max, CHART_WIDTH),
                width = label_width
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn summary(summary: &Summary) -> String {
    format!("Financial Summary\n\n{}", chart(&summary.chart_data()))
}

pub fn categories(categories: &[Category]) -> String {
    if categories.is_empty() {
        return "No categories found".to_string();
    }
    let mut t = table();
    t.set_header(vec!["ID", "Title"]);
    for category in categories {
        t.add_row(vec![category.id.as_str(), category.title.as_str()]);
    }
    t.to_string()
}

pub fn transactions(page: &TransactionPage, categories: &[Category]) -> String {
    if page.records.is_empty() {
        return "No transactions found".to_string();
    }
    let mut t = table();
    t.set_header(vec!["ID", "Date", "Type", "Category", "Amount", "Description"]);
    for tx in &page.records {
        let category = tx
            .category
            .as_deref()
            .map(|c| category_title(categories, c).to_string())
            .unwrap_or_default();
        t.add_row(vec![
            Cell::new(&tx.id),
            Cell::new(tx.date.as_deref().map(format_date).unwrap_or_default()),
            Cell::new(tx.transaction_type),
            Cell::new(category),
            amount_cell(tx.signed_amount()),
            Cell::new(truncate_string(
                tx.description.as_deref().unwrap_or_default(),
                MAX_DESCRIPTION_LEN,
            )),
        ]);
    }
    format!("{}\nPage {} of {}", t, page.page, page.num_pages)
}

pub fn transaction(tx: &Transaction, categories: &[Category]) -> String {
    let category = tx
        .category
        .as_deref()
        .map(|c| category_title(categories, c))
        .unwrap_or("-");
    format!(
        "Transaction {}\n  Type:        {}\n  Amount:      {}\n  Category:    {}\n  Date:        {}\n  Description: {}",
        tx.id,
        tx.transaction_type,
        format_currency(tx.amount),
        category,
        tx.date.as_deref().map(format_date).unwrap_or_else(|| "-".to_string()),
        tx.description.as_deref().filter(|d| !d.is_empty()).unwrap_or("-"),
    )
}

pub fn budget(status: &BudgetStatus) -> String {
    let heading = format!("Budget for {}", status.month.format("%B %Y"));
    let Some(budget) = status.budget else {
        return format!(
            "{}\n\nNo budget set. Spent so far: {}",
            heading,
            format_currency(status.expenses)
        );
    };

    let mut out = format!(
        "{}\n\n{}",
        heading,
        chart(&[("Budget", budget), ("Expenses", status.expenses)])
    );
    if let Some(percent) = status.percent_used() {
        out.push_str(&format!("\n\n{:.0}% of budget used", percent));
    }
    if let Some(remaining) = status.remaining() {
        if status.is_over_budget() {
            out.push_str(&format!("\nOver budget by {}", format_currency(-remaining)));
        } else {
            out.push_str(&format!("\nRemaining: {}", format_currency(remaining)));
        }
    }
    out
}
