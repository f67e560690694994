//! Dashboard chart series
//!
//! Monthly inflow/outflow trend, expense breakdown by category and the
//! balance health badge.

use crate::models::{FinancialSummary, RecordKind, RiskTier, TransactionRecord};
use crate::risk::RiskLadder;
use crate::summary::compute_summary;
use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_TREND_MONTHS: usize = 6;
pub const MAX_TREND_MONTHS: usize = 24;

const CRITICAL_BALANCE: i64 = 1_000;
const WARNING_BALANCE: i64 = 3_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthlyFlow {
    /// `YYYY-MM`
    pub month: String,
    pub inflow: Decimal,
    pub outflow: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryTotal {
    pub category: String,
    pub total: Decimal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}

impl HealthStatus {
    pub fn from_balance(balance: Decimal) -> Self {
        if balance < Decimal::from(CRITICAL_BALANCE) {
            HealthStatus::Critical
        } else if balance < Decimal::from(WARNING_BALANCE) {
            HealthStatus::Warning
        } else {
            HealthStatus::Healthy
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dashboard {
    pub summary: FinancialSummary,
    pub risk_tier: RiskTier,
    pub health: HealthStatus,
    pub trend: Vec<MonthlyFlow>,
    pub expenses: Vec<CategoryTotal>,
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Inflow/outflow per calendar month for the last `months` months, oldest
/// first, ending with the month of `now`. Months without records are zero.
pub fn monthly_trend(
    records: &[TransactionRecord],
    months: usize,
    now: DateTime<Utc>,
) -> Vec<MonthlyFlow> {
    let months = months.clamp(1, MAX_TREND_MONTHS);
    let current = month_start(now.date_naive());

    let mut buckets: BTreeMap<NaiveDate, (Decimal, Decimal)> = (0..months)
        .filter_map(|back| current.checked_sub_months(Months::new(back as u32)))
        .map(|m| (m, (Decimal::ZERO, Decimal::ZERO)))
        .collect();

    for record in records {
        let key = month_start(record.occurred_at.date_naive());
        if let Some((inflow, outflow)) = buckets.get_mut(&key) {
            match record.kind {
                RecordKind::Inflow => *inflow += record.amount,
                RecordKind::Outflow => *outflow += record.amount,
            }
        }
    }

    buckets
        .into_iter()
        .map(|(month, (inflow, outflow))| MonthlyFlow {
            month: month.format("%Y-%m").to_string(),
            inflow,
            outflow,
        })
        .collect()
}

/// All-time outflow per category, largest first, ties by name
pub fn expense_breakdown(records: &[TransactionRecord]) -> Vec<CategoryTotal> {
    let mut totals: BTreeMap<&str, Decimal> = BTreeMap::new();

    for record in records.iter().filter(|r| r.kind == RecordKind::Outflow) {
        *totals.entry(record.category.as_str()).or_default() += record.amount;
    }

    let mut out: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(category, total)| CategoryTotal {
            category: category.to_string(),
            total,
        })
        .collect();

    out.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.category.cmp(&b.category)));
    out
}

pub fn build_dashboard(
    records: &[TransactionRecord],
    months: usize,
    now: DateTime<Utc>,
    ladder: &RiskLadder,
) -> Dashboard {
    let summary = compute_summary(records, now);

    Dashboard {
        risk_tier: ladder.classify(&summary),
        health: HealthStatus::from_balance(summary.balance),
        trend: monthly_trend(records, months, now),
        expenses: expense_breakdown(records),
        summary,
    }
}
