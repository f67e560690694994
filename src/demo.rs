//! Sample book used to seed new accounts and by the report binary

use crate::models::{RecordDraft, RecordKind};
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;

/// (days ago, kind, amount, category, description)
const DEMO_TRANSACTIONS: &[(i64, RecordKind, i64, &str, &str)] = &[
    (20, RecordKind::Inflow, 50_000, "Sales Revenue", "Product sales"),
    (15, RecordKind::Inflow, 25_000, "Consulting", "Consulting services"),
    (35, RecordKind::Outflow, 15_000, "Rent", "Office rent"),
    (30, RecordKind::Outflow, 8_000, "Salaries", "Employee salaries"),
    (28, RecordKind::Outflow, 3_000, "GST", "GST payment"),
    (22, RecordKind::Outflow, 5_000, "Software", "Software subscriptions"),
    (5, RecordKind::Inflow, 30_000, "Sales Revenue", "Monthly sales"),
    (1, RecordKind::Outflow, 2_000, "Marketing", "Ad spend"),
];

/// Demo drafts dated relative to `today`
pub fn demo_drafts(today: NaiveDate) -> Vec<RecordDraft> {
    DEMO_TRANSACTIONS
        .iter()
        .map(|&(days_ago, kind, amount, category, description)| {
            let date = today - Duration::days(days_ago);
            RecordDraft::new(kind, Decimal::from(amount))
                .category(category)
                .description(description)
                .date(date.format("%Y-%m-%d").to_string())
        })
        .collect()
}
