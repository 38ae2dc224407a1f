// Screening demo - seeds an in-memory ledger with a few customer stories and
// runs them through fraud scoring, AML screening, KYC limits and SAR drafting.
//
// Optional configuration:
//   DALEPAY_RISK_CONFIG  path to a risk-engine TOML file
//   DALEPAY_AML_CONFIG   path to an AML TOML file
//   RUST_LOG             tracing filter (default: info)

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Timelike, Utc};
use colored::Colorize;
use compliance_service::{
    AmlConfig, AmlFlagEvaluator, AmlStatus, SanctionsEngine, SarGenerator, TransactionRequest,
    UserProfile,
};
use ledger_core::{KycLevel, MemoryLedger, Transaction, UserId};
use risk_engine::{
    LimitChecker, RapidTransferScanner, RiskConfig, RiskLevel, RiskMetrics, RiskScoringEngine,
    TracingAlertSink,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

struct Story {
    title: &'static str,
    profile: UserProfile,
    amount: Decimal,
    at: DateTime<Utc>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok()))
        .init();

    let risk_config = match std::env::var("DALEPAY_RISK_CONFIG") {
        Ok(path) => RiskConfig::from_file(&path).with_context(|| format!("loading {}", path))?,
        Err(_) => RiskConfig::from_env()?,
    };
    let aml_config = match std::env::var("DALEPAY_AML_CONFIG") {
        Ok(path) => AmlConfig::from_file(&path).with_context(|| format!("loading {}", path))?,
        Err(_) => AmlConfig::from_env()?,
    };
    let scan_rules = risk_config.rapid_transfer.clone();
    let history_timeout = risk_config.history_timeout();

    // Pin "now" to mid-afternoon so only the stories that ask for it fall at night
    let now = Utc::now()
        .with_hour(15)
        .and_then(|t| t.with_minute(0))
        .context("building reference time")?;

    let ledger = MemoryLedger::new();
    seed(&ledger, now)?;

    let metrics = RiskMetrics::new()?;
    let engine = RiskScoringEngine::new(Arc::new(ledger.clone()), risk_config)?
        .with_metrics(metrics.clone());
    let aml = AmlFlagEvaluator::new(
        Arc::new(ledger.clone()),
        Arc::new(SanctionsEngine::with_mock_list()),
        aml_config,
    )?;

    println!("\n{}", "=== DalePay screening demo ===".bold());
    println!("Ledger seeded with {} transactions\n", ledger.len());

    let alerts = TracingAlertSink;
    for story in stories(now) {
        println!("{} {}", "▶".cyan(), story.title.bold());

        let assessment = engine
            .evaluate_and_alert(&story.profile.user_id, story.amount, Some(story.at), &alerts)
            .await?;
        let level = match assessment.risk_level {
            RiskLevel::Minimal | RiskLevel::Low => assessment.risk_level.to_string().green(),
            RiskLevel::Medium => assessment.risk_level.to_string().yellow(),
            RiskLevel::High => assessment.risk_level.to_string().red(),
        };
        println!(
            "  fraud: score {} level {} -> {} flags {:?}",
            assessment.score, level, assessment.recommendation, assessment.flags
        );

        let screening = aml
            .evaluate_aml(
                &story.profile,
                Some(&TransactionRequest::new(story.amount).at(story.at)),
            )
            .await?;
        let status = match screening.status {
            AmlStatus::Clear => "clear".green(),
            AmlStatus::Blocked => "blocked".red().bold(),
        };
        println!(
            "  aml:   {} risk {:?} flags {:?}\n",
            status, screening.risk_level, screening.flags
        );
    }

    // KYC tier limits
    println!("{}", "KYC limits".bold());
    let bob = UserId::new("bob");
    for level in KycLevel::ALL {
        let outcome = LimitChecker::new(level)
            .check(&ledger, &bob, dec!(9999), now, history_timeout)
            .await;
        match outcome {
            Ok(usage) => println!(
                "  {:<8} {} (daily remaining {})",
                level.to_string(),
                "within limits".green(),
                usage.daily_remaining
            ),
            Err(e) => println!("  {:<8} {}", level.to_string(), e.to_string().yellow()),
        }
    }

    // Admin rapid-transfer sweep
    println!("\n{}", "Rapid-transfer scan".bold());
    let scanner = RapidTransferScanner::new(scan_rules);
    let recent = ledger.transactions_since(scanner.window_start(now));
    for activity in scanner.scan(&recent, now) {
        println!(
            "  {} {} transfers totaling ${} ({:?})",
            activity.user_id.to_string().red(),
            activity.transfer_count,
            activity.total_amount,
            activity.severity
        );
    }

    // Draft a SAR for the structuring story
    let bob_history = ledger.window(&bob, now - Duration::days(7));
    let bob_profile = UserProfile {
        ssn_last_4: Some("4821".to_string()),
        phone: Some("+1-787-555-0134".to_string()),
        ..UserProfile::new("bob", "Bob Ortega")
    };
    let sar = SarGenerator::default().generate(&bob_profile, bob_history.transactions(), now)?;
    println!("\n{}", "Draft SAR".bold());
    println!("{}", sar.to_json()?);

    println!("\n{}", "Metrics".bold());
    print!("{}", metrics.gather_text());

    Ok(())
}

/// `RUST_LOG` when it parses, `info` otherwise
fn log_filter(rust_log: Option<String>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn seed(ledger: &MemoryLedger, now: DateTime<Utc>) -> Result<()> {
    let merchant = UserId::new("merchant");

    // Alice: occasional small payments
    for day in [2, 5, 9] {
        ledger.record(Transaction::completed(
            UserId::new("alice"),
            merchant.clone(),
            dec!(42.50),
            now - Duration::days(day),
        ))?;
    }

    // Bob: just-under-threshold amounts over the week
    for day in 1..=4 {
        ledger.record(Transaction::completed(
            UserId::new("bob"),
            merchant.clone(),
            dec!(9999),
            now - Duration::days(day),
        ))?;
    }

    // Carol: a burst of small transfers in the last few minutes
    for minute in 1..=12 {
        ledger.record(Transaction::completed(
            UserId::new("carol"),
            UserId::new(format!("mule-{}", minute % 3)),
            dec!(480),
            now - Duration::minutes(minute),
        ))?;
    }

    // A pending transfer never counts
    ledger.record(Transaction::new(
        UserId::new("carol"),
        merchant,
        dec!(5000),
        now - Duration::minutes(2),
    ))?;

    Ok(())
}

fn stories(now: DateTime<Utc>) -> Vec<Story> {
    let night = now - Duration::hours(12);
    vec![
        Story {
            title: "Everyday payment",
            profile: UserProfile::new("alice", "Alice Baez"),
            amount: dec!(50.00),
            at: now,
        },
        Story {
            title: "Structuring at night",
            profile: UserProfile::new("bob", "Bob Ortega"),
            amount: dec!(9999),
            at: night,
        },
        Story {
            title: "Rapid burst",
            profile: UserProfile::new("carol", "Carol Ruiz"),
            amount: dec!(480),
            at: now,
        },
        Story {
            title: "Sanctioned sender",
            profile: UserProfile::new("jd", "John Doe"),
            amount: dec!(2000),
            at: now,
        },
        Story {
            title: "Politically exposed sender",
            profile: UserProfile::new("gov", "Mayor Elena Cruz"),
            amount: dec!(12000),
            at: now,
        },
    ]
}
