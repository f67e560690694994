//! Narrative formatter
//!
//! Deterministic CFO answer built from the summary, the matching risk rung
//! and the detected intent. Nothing here can fail: missing inputs fall back
//! to a static advisory message.

use crate::intent::{detect_intent, Intent};
use crate::models::FinancialSummary;
use crate::risk::{RiskLadder, RiskRung};
use rust_decimal::Decimal;

/// Returned whenever no summary could be derived for the user
pub const FALLBACK_MESSAGE: &str = "I am having trouble accessing your financial data right now. \
As a rule of thumb, keep at least 3 months of operating expenses (and never less than $10,000) \
in reserve, and keep monthly expenses below monthly income. Please try again shortly.";

const CASH_NEGATIVE_NOTICE: &str =
    "Your balance is cash negative, so immediate action is required.";

const HIRING_BALANCE_FLOOR: i64 = 50_000;
const HIRING_RUNWAY_FLOOR: i64 = 90;
const SPENDING_BALANCE_FLOOR: i64 = 30_000;
const SPENDING_RUNWAY_FLOOR: i64 = 60;

/// Render a money amount as `$12,345.67`, `-$500` or `$0`
pub fn format_money(amount: Decimal) -> String {
    let rounded = amount.round_dp(2).normalize();
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };

    let digits = rounded.abs().to_string();
    let (whole, fraction) = match digits.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (digits.as_str(), None),
    };

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match fraction {
        Some(f) => format!("{}${}.{}", sign, grouped, f),
        None => format!("{}${}", sign, grouped),
    }
}

/// Net position with an explicit `+` only when inflow exceeds outflow
fn format_net(inflow: Decimal, outflow: Decimal) -> String {
    let net = inflow - outflow;
    if inflow > outflow {
        format!("+{}", format_money(net))
    } else {
        format_money(net)
    }
}

/// Opening sentence for the detected intent
pub fn opening_for(intent: Intent, summary: &FinancialSummary) -> String {
    let balance = summary.balance;
    let runway = summary.runway_days;

    match intent {
        Intent::Balance => format!(
            "Your current cash balance is {}.",
            format_money(balance)
        ),
        Intent::Runway if summary.burn_rate <= Decimal::ZERO => format!(
            "Based on your monthly burn rate of {}, your runway is effectively unlimited ({}+ days): no expenses were recorded in the last 30 days.",
            format_money(summary.burn_rate),
            runway
        ),
        Intent::Runway => format!(
            "Based on your monthly burn rate of {}, you have approximately {} days of runway.",
            format_money(summary.burn_rate),
            runway
        ),
        Intent::Hiring => {
            if balance > Decimal::from(HIRING_BALANCE_FLOOR) && runway > HIRING_RUNWAY_FLOOR {
                "Yes, your financial position supports hiring. Ensure the new hire contributes to revenue growth.".to_string()
            } else {
                "I recommend waiting until your cash position improves. Focus on revenue growth first.".to_string()
            }
        }
        Intent::Spending => {
            if balance > Decimal::from(SPENDING_BALANCE_FLOOR) && runway > SPENDING_RUNWAY_FLOOR {
                "You have room for strategic purchases. Prioritize expenses that generate ROI.".to_string()
            } else {
                "I recommend delaying non-essential purchases until your cash buffer improves.".to_string()
            }
        }
        Intent::General => "I've analyzed your financial position.".to_string(),
    }
}

/// Render the full narrative for a message, summary and assessed rung
pub fn format_narrative(user_message: &str, summary: &FinancialSummary, rung: &RiskRung) -> String {
    let mut opening = opening_for(detect_intent(user_message), summary);
    if summary.balance < Decimal::ZERO {
        opening.push(' ');
        opening.push_str(CASH_NEGATIVE_NOTICE);
    }

    format!(
        "{opening}\n\n\
         {marker} **Risk Assessment (30 Days):** {tier}\n\n\
         **Financial Summary:**\n\
         • Monthly Revenue: {revenue}\n\
         • Monthly Expenses: {expenses}\n\
         • Net Position: {net}\n\n\
         **Recommendation:**\n\
         {advice}",
        opening = opening,
        marker = rung.tier.marker(),
        tier = rung.tier,
        revenue = format_money(summary.monthly_inflow),
        expenses = format_money(summary.monthly_outflow),
        net = format_net(summary.monthly_inflow, summary.monthly_outflow),
        advice = rung.advice,
    )
}

/// Classify and format in one step; a missing summary yields [`FALLBACK_MESSAGE`]
pub fn narrate(user_message: &str, summary: Option<&FinancialSummary>, ladder: &RiskLadder) -> String {
    match summary {
        Some(summary) => format_narrative(user_message, summary, ladder.assess(summary)),
        None => FALLBACK_MESSAGE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RiskTier;
    use crate::summary::runway_days;
    use chrono::Utc;

    fn summary(balance: i64, inflow: i64, outflow: i64) -> FinancialSummary {
        let balance = Decimal::from(balance);
        let outflow = Decimal::from(outflow);
        FinancialSummary {
            balance,
            total_inflow: Decimal::ZERO,
            total_outflow: Decimal::ZERO,
            monthly_inflow: Decimal::from(inflow),
            monthly_outflow: outflow,
            burn_rate: outflow,
            runway_days: runway_days(balance, outflow),
            as_of: Utc::now(),
        }
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(Decimal::ZERO), "$0");
        assert_eq!(format_money(Decimal::from(999)), "$999");
        assert_eq!(format_money(Decimal::from(1_000)), "$1,000");
        assert_eq!(format_money(Decimal::from(35_000)), "$35,000");
        assert_eq!(format_money(Decimal::from(1_234_567)), "$1,234,567");
        assert_eq!(format_money(Decimal::new(123_456, 2)), "$1,234.56");
        assert_eq!(format_money(Decimal::new(15_000_00, 2)), "$15,000");
        assert_eq!(format_money(Decimal::new(-5_000_5, 1)), "-$5,000.5");
    }

    #[test]
    fn test_full_template() {
        let s = summary(35_000, 50_000, 15_000);
        let ladder = RiskLadder::standard();
        let text = format_narrative("give me an overview", &s, ladder.assess(&s));

        let expected = "I've analyzed your financial position.\n\n\
            🟢 **Risk Assessment (30 Days):** Low\n\n\
            **Financial Summary:**\n\
            • Monthly Revenue: $50,000\n\
            • Monthly Expenses: $15,000\n\
            • Net Position: +$35,000\n\n\
            **Recommendation:**\n\
            Strong financial position: You have a healthy cash balance. Consider reinvesting surplus cash into growth opportunities or building an emergency fund.";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_net_position_sign() {
        let ladder = RiskLadder::standard();

        let losing = summary(10_000, 5_000, 8_000);
        let text = format_narrative("overview", &losing, ladder.assess(&losing));
        assert!(text.contains("• Net Position: -$3,000"));
        assert!(!text.contains("+-"));
        assert!(!text.contains("--"));
        assert!(!text.contains("$-"));

        let even = summary(10_000, 5_000, 5_000);
        let text = format_narrative("overview", &even, ladder.assess(&even));
        assert!(text.contains("• Net Position: $0"));
    }

    #[test]
    fn test_runway_question() {
        let s = summary(20_000, 0, 10_000);
        assert_eq!(s.runway_days, 60);

        let text = narrate("What's my runway?", Some(&s), &RiskLadder::standard());
        assert!(text.starts_with(
            "Based on your monthly burn rate of $10,000, you have approximately 60 days of runway."
        ));
    }

    #[test]
    fn test_runway_question_without_burn() {
        let s = summary(20_000, 1_000, 0);
        let text = narrate("how long will we survive", Some(&s), &RiskLadder::standard());
        assert!(text.starts_with(
            "Based on your monthly burn rate of $0, your runway is effectively unlimited (999+ days)"
        ));
    }

    #[test]
    fn test_balance_question() {
        let s = summary(35_000, 50_000, 15_000);
        let text = narrate("What is my cash balance?", Some(&s), &RiskLadder::standard());
        assert!(text.starts_with("Your current cash balance is $35,000."));
    }

    #[test]
    fn test_cash_negative_opening() {
        let s = summary(-500, 1_000, 1_500);
        let ladder = RiskLadder::standard();
        assert_eq!(ladder.classify(&s), RiskTier::Critical);

        for message in ["hello", "should I hire?", "what's my runway"] {
            let text = narrate(message, Some(&s), &ladder);
            let opening = text.lines().next().unwrap();
            assert!(opening.contains("cash negative"), "opening: {}", opening);
            assert!(opening.contains("immediate action"), "opening: {}", opening);
            assert!(text.contains("🔴 **Risk Assessment (30 Days):** Critical"));
        }
    }

    #[test]
    fn test_hiring_gate() {
        let ladder = RiskLadder::standard();

        // runway 300
        let rich = summary(100_000, 20_000, 10_000);
        assert!(narrate("can I hire someone?", Some(&rich), &ladder)
            .starts_with("Yes, your financial position supports hiring."));

        // runway 90 is not strictly above the floor
        let borderline = summary(60_000, 0, 20_000);
        assert_eq!(borderline.runway_days, 90);
        assert!(narrate("new employee?", Some(&borderline), &ladder)
            .starts_with("I recommend waiting"));
    }

    #[test]
    fn test_spending_gate() {
        let ladder = RiskLadder::standard();

        // runway 70
        let ok = summary(35_000, 50_000, 15_000);
        assert!(narrate("should I buy a van?", Some(&ok), &ladder)
            .starts_with("You have room for strategic purchases."));

        let thin = summary(25_000, 0, 5_000);
        assert!(narrate("can we spend on ads", Some(&thin), &ladder)
            .starts_with("I recommend delaying non-essential purchases"));
    }

    #[test]
    fn test_missing_summary_falls_back() {
        let text = narrate("anything", None, &RiskLadder::standard());
        assert_eq!(text, FALLBACK_MESSAGE);
        assert!(text.contains("3 months"));
    }
}
