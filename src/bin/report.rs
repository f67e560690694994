use cashflow_os::{
    config::AppConfig,
    dashboard::{build_dashboard, DEFAULT_TREND_MONTHS},
    demo::demo_drafts,
    narrative::{format_money, narrate},
    risk::RiskLadder,
    store::{JsonStore, RecordStore},
    summary::compute_summary,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

const SAMPLE_QUESTIONS: &[&str] = &[
    "What's my balance?",
    "How long is my runway?",
    "Can I afford to hire someone?",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = AppConfig::from_env()?;
    let ladder = RiskLadder::from_preset(config.risk_ladder);

    // Questions from the command line replace the samples
    let args: Vec<String> = std::env::args().skip(1).collect();
    let questions: Vec<&str> = if args.is_empty() {
        SAMPLE_QUESTIONS.to_vec()
    } else {
        args.iter().map(String::as_str).collect()
    };

    let now = Utc::now();
    let owner = Uuid::new_v4();
    let store = JsonStore::in_memory();
    store.add_many(owner, demo_drafts(now.date_naive()), now).await?;

    let records = store.list(owner).await?;
    info!(records = records.len(), ladder = ?config.risk_ladder, "Demo book loaded");

    let summary = compute_summary(&records, now);
    let rung = ladder.assess(&summary);
    let dashboard = build_dashboard(&records, DEFAULT_TREND_MONTHS, now, &ladder);

    println!("\n=== CASH POSITION ===");
    println!("Balance:        {}", format_money(summary.balance));
    println!("Monthly in:     {}", format_money(summary.monthly_inflow));
    println!("Monthly out:    {}", format_money(summary.monthly_outflow));
    println!("Runway:         {} days", summary.runway_days);
    println!("Risk:           {} {} ({})", rung.tier.marker(), rung.tier, rung.label);
    println!("Health:         {:?}", dashboard.health);

    println!("\nTrend:");
    for month in &dashboard.trend {
        println!(
            "  {}  in {:>12}  out {:>12}",
            month.month,
            format_money(month.inflow),
            format_money(month.outflow)
        );
    }

    println!("\nExpenses:");
    for category in &dashboard.expenses {
        println!("  {:<16} {}", category.category, format_money(category.total));
    }

    for question in questions {
        println!("\n=== Q: {} ===", question);
        println!("{}", narrate(question, Some(&summary), &ladder));
    }

    Ok(())
}
