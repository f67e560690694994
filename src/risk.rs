//! Risk classifier
//!
//! Maps a summary to a risk tier through an ordered threshold ladder.
//! First match wins: cash-negative, then each runway rung from the
//! shortest threshold up, then the catch-all.

use crate::error::CashflowError;
use crate::models::{FinancialSummary, RiskTier};
use crate::Result;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::OnceLock;

/// One step of the ladder
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskRung {
    /// Exclusive upper bound on runway days; `None` for the negative and
    /// catch-all rungs
    pub max_runway_days: Option<i64>,
    pub tier: RiskTier,
    /// Short description of the position ("tight runway")
    pub label: String,
    /// Recommendation shown to the user for this rung
    pub advice: String,
}

impl RiskRung {
    pub fn new(
        max_runway_days: Option<i64>,
        tier: RiskTier,
        label: &str,
        advice: &str,
    ) -> Self {
        Self {
            max_runway_days,
            tier,
            label: label.to_string(),
            advice: advice.to_string(),
        }
    }
}

/// Named ladder presets selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LadderPreset {
    /// Four rungs: negative, < 30, < 60, otherwise
    #[default]
    Standard,
    /// Three runway rungs with an extra High tier below 15 days
    Escalating,
}

impl FromStr for LadderPreset {
    type Err = CashflowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "standard" | "default" => Ok(LadderPreset::Standard),
            "escalating" | "strict" => Ok(LadderPreset::Escalating),
            other => Err(CashflowError::ConfigError(format!(
                "Unknown risk ladder '{}', expected 'standard' or 'escalating'",
                other
            ))),
        }
    }
}

/// Unvalidated ladder as read from a serialized table
#[derive(Debug, Clone, Deserialize)]
pub struct LadderTable {
    pub negative: RiskRung,
    pub rungs: Vec<RiskRung>,
    pub otherwise: RiskRung,
}

/// Threshold table shared by every caller that needs a risk tier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "LadderTable")]
pub struct RiskLadder {
    negative: RiskRung,
    rungs: Vec<RiskRung>,
    otherwise: RiskRung,
}

impl RiskLadder {
    /// Build a ladder, rejecting tables that could break monotonicity.
    ///
    /// Runway rungs must have strictly ascending thresholds and
    /// non-increasing severity; the negative rung must be at least as severe
    /// as every other rung, and the catch-all no more severe than the last
    /// runway rung.
    pub fn new(negative: RiskRung, rungs: Vec<RiskRung>, otherwise: RiskRung) -> Result<Self> {
        let mut previous: Option<&RiskRung> = None;

        for rung in &rungs {
            let Some(max_days) = rung.max_runway_days else {
                return Err(CashflowError::ConfigError(format!(
                    "Runway rung '{}' has no threshold",
                    rung.label
                )));
            };

            if let Some(prev) = previous {
                let prev_days = prev.max_runway_days.unwrap_or(i64::MIN);
                if max_days <= prev_days {
                    return Err(CashflowError::ConfigError(format!(
                        "Thresholds must ascend: {} after {}",
                        max_days, prev_days
                    )));
                }
                if rung.tier > prev.tier {
                    return Err(CashflowError::ConfigError(format!(
                        "Rung '{}' ({}) is more severe than the shorter-runway rung '{}' ({})",
                        rung.label, rung.tier, prev.label, prev.tier
                    )));
                }
            }

            previous = Some(rung);
        }

        if let Some(last) = rungs.last() {
            if otherwise.tier > last.tier {
                return Err(CashflowError::ConfigError(format!(
                    "Catch-all tier {} is more severe than rung '{}' ({})",
                    otherwise.tier, last.label, last.tier
                )));
            }
        }

        let most_severe = rungs
            .iter()
            .map(|r| r.tier)
            .chain(std::iter::once(otherwise.tier))
            .max()
            .unwrap_or(RiskTier::Low);

        if negative.tier < most_severe {
            return Err(CashflowError::ConfigError(format!(
                "Cash-negative tier {} must be the most severe (found {})",
                negative.tier, most_severe
            )));
        }

        Ok(Self {
            negative,
            rungs,
            otherwise,
        })
    }

    /// Canonical four-rung ladder
    pub fn standard() -> Self {
        Self {
            negative: RiskRung::new(
                None,
                RiskTier::Critical,
                "cash negative",
                "Immediate action required: You are cash negative. Delay non-essential payments and follow up on outstanding invoices to recover positive cash flow.",
            ),
            rungs: vec![
                RiskRung::new(
                    Some(30),
                    RiskTier::Medium,
                    "tight runway",
                    "Caution advised: Your cash runway is tight. Consider delaying non-essential spending and following up on pending payments to extend your runway.",
                ),
                RiskRung::new(
                    Some(60),
                    RiskTier::Medium,
                    "stable, monitor",
                    "Stable but monitor closely: You have a reasonable buffer, but watch your expense trends. Consider building a 3-month reserve.",
                ),
            ],
            otherwise: RiskRung::new(
                None,
                RiskTier::Low,
                "strong position",
                "Strong financial position: You have a healthy cash balance. Consider reinvesting surplus cash into growth opportunities or building an emergency fund.",
            ),
        }
    }

    /// Ladder with an urgent High rung under 15 days of runway
    pub fn escalating() -> Self {
        Self {
            negative: RiskRung::new(
                None,
                RiskTier::Critical,
                "cash negative",
                "CRITICAL: You are cash negative. Immediate funds are needed; pause all discretionary payments and chase every outstanding invoice.",
            ),
            rungs: vec![
                RiskRung::new(
                    Some(15),
                    RiskTier::High,
                    "urgent",
                    "Urgent: You have less than 15 days of cash coverage. Secure short-term funding and defer every payment that can wait.",
                ),
                RiskRung::new(
                    Some(30),
                    RiskTier::Medium,
                    "tight runway",
                    "Caution: Your cash buffer is tight for the coming month. Review recent expenses to find savings.",
                ),
            ],
            otherwise: RiskRung::new(
                None,
                RiskTier::Low,
                "stable",
                "Your cash position looks stable. Keep reviewing expenses and build toward a 3-month reserve.",
            ),
        }
    }

    pub fn from_preset(preset: LadderPreset) -> Self {
        match preset {
            LadderPreset::Standard => Self::standard(),
            LadderPreset::Escalating => Self::escalating(),
        }
    }

    /// Rung matching the summary
    pub fn assess(&self, summary: &FinancialSummary) -> &RiskRung {
        self.assess_position(summary.balance, summary.runway_days)
    }

    pub fn assess_position(&self, balance: Decimal, runway_days: i64) -> &RiskRung {
        if balance < Decimal::ZERO {
            return &self.negative;
        }

        self.rungs
            .iter()
            .find(|rung| matches!(rung.max_runway_days, Some(max) if runway_days < max))
            .unwrap_or(&self.otherwise)
    }

    pub fn classify(&self, summary: &FinancialSummary) -> RiskTier {
        self.assess(summary).tier
    }

}

impl TryFrom<LadderTable> for RiskLadder {
    type Error = CashflowError;

    fn try_from(table: LadderTable) -> Result<Self> {
        Self::new(table.negative, table.rungs, table.otherwise)
    }
}

impl Default for RiskLadder {
    fn default() -> Self {
        Self::standard()
    }
}

fn standard_ladder() -> &'static RiskLadder {
    static STANDARD: OnceLock<RiskLadder> = OnceLock::new();
    STANDARD.get_or_init(RiskLadder::standard)
}

/// Classify with the standard ladder
pub fn classify_risk(summary: &FinancialSummary) -> RiskTier {
    standard_ladder().classify(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::{runway_days, RUNWAY_SENTINEL_DAYS};
    use chrono::Utc;

    fn summary(balance: i64, burn_rate: i64) -> FinancialSummary {
        let balance = Decimal::from(balance);
        let burn_rate = Decimal::from(burn_rate);
        FinancialSummary {
            balance,
            total_inflow: Decimal::ZERO,
            total_outflow: Decimal::ZERO,
            monthly_inflow: Decimal::ZERO,
            monthly_outflow: burn_rate,
            burn_rate,
            runway_days: runway_days(balance, burn_rate),
            as_of: Utc::now(),
        }
    }

    #[test]
    fn test_standard_ladder_rungs() {
        // runway 70
        assert_eq!(classify_risk(&summary(35_000, 15_000)), RiskTier::Low);
        // runway 45
        let rung = RiskLadder::standard().assess(&summary(15_000, 10_000)).clone();
        assert_eq!(rung.tier, RiskTier::Medium);
        assert_eq!(rung.label, "stable, monitor");
        // runway 15
        let rung = RiskLadder::standard().assess(&summary(5_000, 10_000)).clone();
        assert_eq!(rung.tier, RiskTier::Medium);
        assert_eq!(rung.label, "tight runway");
    }

    #[test]
    fn test_empty_book_is_low() {
        let s = summary(0, 0);
        assert_eq!(s.runway_days, RUNWAY_SENTINEL_DAYS);
        assert_eq!(classify_risk(&s), RiskTier::Low);
    }

    #[test]
    fn test_thresholds_are_exclusive() {
        let ladder = RiskLadder::standard();
        assert_eq!(ladder.assess_position(Decimal::ONE, 29).label, "tight runway");
        assert_eq!(ladder.assess_position(Decimal::ONE, 30).label, "stable, monitor");
        assert_eq!(ladder.assess_position(Decimal::ONE, 60).tier, RiskTier::Low);
    }

    #[test]
    fn test_negative_balance_is_most_severe() {
        for ladder in [RiskLadder::standard(), RiskLadder::escalating()] {
            for runway in [-10, 0, 45, 999, i64::MAX] {
                let rung = ladder.assess_position(Decimal::from(-500), runway);
                assert_eq!(rung.tier, RiskTier::Critical);
                assert!(rung.advice.to_lowercase().contains("cash negative"));
            }
        }
    }

    #[test]
    fn test_escalating_ladder() {
        let ladder = RiskLadder::escalating();
        assert_eq!(ladder.assess_position(Decimal::ONE, 14).tier, RiskTier::High);
        assert_eq!(ladder.assess_position(Decimal::ONE, 15).tier, RiskTier::Medium);
        assert_eq!(ladder.assess_position(Decimal::ONE, 30).tier, RiskTier::Low);
    }

    #[test]
    fn test_lower_balance_never_lowers_severity() {
        for ladder in [RiskLadder::standard(), RiskLadder::escalating()] {
            for burn in [1, 2_500, 10_000] {
                let mut previous = RiskTier::Low;
                for balance in (-20_000..=100_000).rev().step_by(250) {
                    let tier = ladder.classify(&summary(balance, burn));
                    assert!(
                        tier >= previous,
                        "balance {} burn {}: {} < {}",
                        balance,
                        burn,
                        tier,
                        previous
                    );
                    previous = tier;
                }
            }
        }
    }

    #[test]
    fn test_custom_ladder_validation() {
        let negative = RiskRung::new(None, RiskTier::Critical, "negative", "act");
        let low = RiskRung::new(None, RiskTier::Low, "fine", "relax");

        let unordered = RiskLadder::new(
            negative.clone(),
            vec![
                RiskRung::new(Some(30), RiskTier::Medium, "a", ""),
                RiskRung::new(Some(10), RiskTier::High, "b", ""),
            ],
            low.clone(),
        );
        assert!(unordered.is_err());

        let severity_rises = RiskLadder::new(
            negative.clone(),
            vec![
                RiskRung::new(Some(10), RiskTier::Medium, "a", ""),
                RiskRung::new(Some(30), RiskTier::High, "b", ""),
            ],
            low.clone(),
        );
        assert!(severity_rises.is_err());

        let weak_negative = RiskLadder::new(
            RiskRung::new(None, RiskTier::Medium, "negative", ""),
            vec![RiskRung::new(Some(10), RiskTier::High, "a", "")],
            low.clone(),
        );
        assert!(weak_negative.is_err());

        let ok = RiskLadder::new(
            negative,
            vec![RiskRung::new(Some(7), RiskTier::High, "week", "")],
            low,
        )
        .unwrap();
        assert_eq!(ok.assess_position(Decimal::ONE, 3).label, "week");
    }

    #[test]
    fn test_presets_pass_validation() {
        for ladder in [RiskLadder::standard(), RiskLadder::escalating()] {
            let rebuilt = RiskLadder::new(
                ladder.negative.clone(),
                ladder.rungs.clone(),
                ladder.otherwise.clone(),
            );
            assert_eq!(rebuilt.unwrap(), ladder);
        }
    }

    #[test]
    fn test_deserialized_ladder_is_validated() {
        let json = serde_json::to_value(RiskLadder::escalating()).unwrap();
        let parsed: RiskLadder = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(parsed, RiskLadder::escalating());

        let mut unordered = json;
        unordered["rungs"][0]["max_runway_days"] = serde_json::json!(45);
        let err = serde_json::from_value::<RiskLadder>(unordered).unwrap_err();
        assert!(err.to_string().contains("Thresholds must ascend"), "{}", err);
    }

    #[test]
    fn test_preset_parsing() {
        assert_eq!("standard".parse::<LadderPreset>().unwrap(), LadderPreset::Standard);
        assert_eq!(" Escalating ".parse::<LadderPreset>().unwrap(), LadderPreset::Escalating);
        assert!("aggressive".parse::<LadderPreset>().is_err());
    }
}
