//! Financial summary engine
//!
//! Pure function of `(records, now)`. Input is assumed well-formed:
//! validation happens when records enter the store.

use crate::models::{FinancialSummary, RecordKind, TransactionRecord};
use chrono::{DateTime, Months, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Runway reported when there is no burn to divide by
pub const RUNWAY_SENTINEL_DAYS: i64 = 999;

/// Days in the runway projection month
const DAYS_PER_MONTH: i64 = 30;

/// Start of the trailing window: midnight UTC one calendar month before `now`.
///
/// When the previous month is shorter (e.g. 31 March), the day is clamped to
/// the last day of that month.
pub fn window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.date_naive();
    let start = today.checked_sub_months(Months::new(1)).unwrap_or(today);
    start
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .unwrap_or(now)
}

#[derive(Default)]
struct Totals {
    inflow: Decimal,
    outflow: Decimal,
}

impl Totals {
    fn add(&mut self, record: &TransactionRecord) {
        match record.kind {
            RecordKind::Inflow => self.inflow += record.amount,
            RecordKind::Outflow => self.outflow += record.amount,
        }
    }
}

/// Aggregate a user's records into a [`FinancialSummary`]
pub fn compute_summary(records: &[TransactionRecord], now: DateTime<Utc>) -> FinancialSummary {
    let boundary = window_start(now);

    let mut all_time = Totals::default();
    let mut monthly = Totals::default();

    for record in records {
        all_time.add(record);
        if record.occurred_at >= boundary {
            monthly.add(record);
        }
    }

    let balance = all_time.inflow - all_time.outflow;
    let burn_rate = monthly.outflow;

    FinancialSummary {
        balance,
        total_inflow: all_time.inflow,
        total_outflow: all_time.outflow,
        monthly_inflow: monthly.inflow,
        monthly_outflow: monthly.outflow,
        burn_rate,
        runway_days: runway_days(balance, burn_rate),
        as_of: now,
    }
}

/// Summary of an empty book, used when there is no owner to look up
pub fn empty_summary(now: DateTime<Utc>) -> FinancialSummary {
    compute_summary(&[], now)
}

/// `round(balance / burn_rate * 30)`, or the sentinel when nothing is burning.
///
/// Halves round up, matching how the dashboard has always displayed runway.
pub fn runway_days(balance: Decimal, burn_rate: Decimal) -> i64 {
    if burn_rate <= Decimal::ZERO {
        return RUNWAY_SENTINEL_DAYS;
    }

    let Some(projected) = balance
        .checked_mul(Decimal::from(DAYS_PER_MONTH))
        .and_then(|scaled| scaled.checked_div(burn_rate))
    else {
        return if balance.is_sign_negative() {
            i64::MIN
        } else {
            i64::MAX
        };
    };

    (projected + Decimal::new(5, 1))
        .floor()
        .to_i64()
        .unwrap_or(if projected.is_sign_negative() {
            i64::MIN
        } else {
            i64::MAX
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn record(kind: RecordKind, amount: i64, occurred_at: DateTime<Utc>) -> TransactionRecord {
        TransactionRecord {
            id: Uuid::new_v4(),
            owner_id: Uuid::nil(),
            kind,
            amount: Decimal::from(amount),
            category: "General".to_string(),
            description: String::new(),
            occurred_at,
            created_at: occurred_at,
        }
    }

    #[test]
    fn test_recent_inflow_and_outflow() {
        let records = vec![
            record(RecordKind::Inflow, 50_000, at(2024, 6, 1)),
            record(RecordKind::Outflow, 15_000, at(2024, 6, 5)),
        ];

        let summary = compute_summary(&records, at(2024, 6, 10));

        assert_eq!(summary.balance, Decimal::from(35_000));
        assert_eq!(summary.monthly_inflow, Decimal::from(50_000));
        assert_eq!(summary.monthly_outflow, Decimal::from(15_000));
        assert_eq!(summary.burn_rate, Decimal::from(15_000));
        assert_eq!(summary.runway_days, 70);
    }

    #[test]
    fn test_empty_records() {
        let summary = compute_summary(&[], at(2024, 6, 10));

        assert_eq!(summary.balance, Decimal::ZERO);
        assert_eq!(summary.total_inflow, Decimal::ZERO);
        assert_eq!(summary.total_outflow, Decimal::ZERO);
        assert_eq!(summary.burn_rate, Decimal::ZERO);
        assert_eq!(summary.runway_days, RUNWAY_SENTINEL_DAYS);
        assert_eq!(summary, empty_summary(at(2024, 6, 10)));
    }

    #[test]
    fn test_negative_balance_is_not_floored() {
        let records = vec![
            record(RecordKind::Inflow, 1_000, at(2024, 6, 2)),
            record(RecordKind::Outflow, 1_500, at(2024, 6, 3)),
        ];

        let summary = compute_summary(&records, at(2024, 6, 10));

        assert_eq!(summary.balance, Decimal::from(-500));
        assert_eq!(summary.runway_days, -10);
    }

    #[test]
    fn test_old_records_only_count_all_time() {
        let records = vec![
            record(RecordKind::Inflow, 80_000, at(2024, 1, 15)),
            record(RecordKind::Outflow, 20_000, at(2024, 2, 1)),
            record(RecordKind::Outflow, 5_000, at(2024, 6, 1)),
        ];

        let summary = compute_summary(&records, at(2024, 6, 10));

        assert_eq!(summary.total_inflow, Decimal::from(80_000));
        assert_eq!(summary.total_outflow, Decimal::from(25_000));
        assert_eq!(summary.monthly_inflow, Decimal::ZERO);
        assert_eq!(summary.monthly_outflow, Decimal::from(5_000));
        // 55000 / 5000 * 30
        assert_eq!(summary.runway_days, 330);
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 15, 45, 0).unwrap();
        assert_eq!(window_start(now), at(2024, 5, 10));

        let records = vec![
            record(RecordKind::Outflow, 100, at(2024, 5, 10)),
            record(
                RecordKind::Outflow,
                900,
                Utc.with_ymd_and_hms(2024, 5, 9, 23, 59, 59).unwrap(),
            ),
        ];

        let summary = compute_summary(&records, now);
        assert_eq!(summary.monthly_outflow, Decimal::from(100));
    }

    #[test]
    fn test_window_clamps_short_month() {
        assert_eq!(window_start(at(2024, 3, 31)), at(2024, 2, 29));
    }

    #[test]
    fn test_balance_identity() {
        let records: Vec<_> = (1..=25)
            .map(|i| {
                let kind = if i % 3 == 0 {
                    RecordKind::Outflow
                } else {
                    RecordKind::Inflow
                };
                let mut r = record(kind, i * 137, at(2024, 1 + (i as u32 % 6), 1));
                r.amount += Decimal::new(i * 7, 2);
                r
            })
            .collect();

        for take in 0..records.len() {
            let summary = compute_summary(&records[..take], at(2024, 6, 20));
            assert_eq!(summary.total_inflow - summary.total_outflow, summary.balance);
            assert!(summary.total_inflow >= Decimal::ZERO);
            assert!(summary.total_outflow >= Decimal::ZERO);
        }
    }

    #[test]
    fn test_summary_is_idempotent() {
        let records = vec![
            record(RecordKind::Inflow, 12_345, at(2024, 6, 1)),
            record(RecordKind::Outflow, 2_345, at(2024, 4, 1)),
        ];
        let now = at(2024, 6, 10);

        assert_eq!(compute_summary(&records, now), compute_summary(&records, now));
    }

    #[test]
    fn test_runway_rounding() {
        // 20000 / 10000 * 30
        assert_eq!(runway_days(Decimal::from(20_000), Decimal::from(10_000)), 60);
        // 1 / 60 * 30 = 0.5 rounds up
        assert_eq!(runway_days(Decimal::from(1), Decimal::from(60)), 1);
        // 10 / 7 * 30 = 42.857...
        assert_eq!(runway_days(Decimal::from(10), Decimal::from(7)), 43);
        assert_eq!(runway_days(Decimal::from(-1), Decimal::ZERO), RUNWAY_SENTINEL_DAYS);
    }
}
