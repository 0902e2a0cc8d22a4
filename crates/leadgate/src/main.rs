//! LeadGate CLI: exercise the qualification pipeline against the in-memory
//! reference store.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};

use leadgate::{run_driver, QualificationService};
use leadgate_engine::{PolicySet, TransitionRequest};
use leadgate_logging::{init_logging, LogConfig};
use leadgate_protocol::{
    Intent, LeadAttrs, Market, PolicyRule, RuleAction, RuleKind, RuleLevel, ServiceConfig, Urgency,
};
use leadgate_store::MemoryStore;

/// Built-in rule hierarchy used when no rules file is supplied.
fn demo_rules() -> Vec<PolicyRule> {
    vec![
        PolicyRule::new(
            RuleLevel::Brand,
            RuleKind::Constraint,
            RuleAction::MaxDiscount {
                percent: 3.0,
                model: "City".to_string(),
            },
        ),
        PolicyRule::new(
            RuleLevel::Group,
            RuleKind::Incentive,
            RuleAction::SpiffBonus {
                amount: 2000,
                condition: "LOAN".to_string(),
            },
        ),
        PolicyRule::new(
            RuleLevel::Manager,
            RuleKind::Process,
            RuleAction::ApprovalRequired { threshold: 50_000 },
        ),
    ]
}

#[derive(Parser)]
#[command(name = "leadgate", about = "Confidence-gated lead qualification pipeline")]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a JSON policy rule set (defaults to the built-in demo rules)
    #[arg(long, global = true, env = "LEADGATE_RULES")]
    rules: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Seed demo leads, run them through the pipeline, print the results
    Demo,
    /// Seed demo leads and print dashboard stats
    Stats,
    /// Preview one calibration cycle against explicit 24h counts
    Calibrate {
        /// Corrections recorded in the trailing 24h
        #[arg(long)]
        corrections: u64,
        /// Leads created in the trailing 24h
        #[arg(long)]
        leads: u64,
    },
    /// Run the periodic driver loop
    Drive {
        /// Stop after this many cycles (default: run until killed)
        #[arg(long)]
        cycles: Option<u64>,
    },
}

fn build_service(rules_path: Option<&std::path::Path>) -> Result<QualificationService<MemoryStore>> {
    let policy = match rules_path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read rules file: {}", path.display()))?;
            PolicySet::from_json_str(&raw).context("invalid policy rule set")?
        }
        None => PolicySet::new(demo_rules()).context("invalid demo rule set")?,
    };
    Ok(QualificationService::new(
        Arc::new(MemoryStore::new()),
        policy,
        ServiceConfig::default(),
        Utc::now(),
    ))
}

fn seed_demo(service: &QualificationService<MemoryStore>) -> Result<()> {
    let now = Utc::now();

    let rahul = service.resolve_identity(
        "+919876543210",
        LeadAttrs {
            name: Some("Rahul Sharma".to_string()),
            market: Some(Market::In),
            product_interest: Some("City".to_string()),
            budget: Some(1_500_000),
            email: Some("rahul@example.com".to_string()),
        },
        now,
    )?;
    let budi = service.resolve_identity(
        "+62812345678",
        LeadAttrs {
            name: Some("Budi Santoso".to_string()),
            market: Some(Market::Id),
            budget: Some(450_000_000),
            ..Default::default()
        },
        now,
    )?;
    let sarah = service.resolve_identity(
        "+6591234567",
        LeadAttrs {
            name: Some("Sarah Chen".to_string()),
            market: Some(Market::Sg),
            product_interest: Some("Vios".to_string()),
            budget: Some(85_000),
            email: Some("sarah@example.com".to_string()),
        },
        now,
    )?;
    let ahmad = service.resolve_identity(
        "+971501234567",
        LeadAttrs {
            name: Some("Ahmad Al-Rashid".to_string()),
            market: Some(Market::Ae),
            budget: Some(180_000),
            ..Default::default()
        },
        now,
    )?;

    // High-confidence booking auto-proceeds
    service.transition(
        rahul.lead.id,
        &TransitionRequest::new(Intent::BookTestDrive, 0.92),
        &Default::default(),
        now,
    )?;
    // Price talk gets guardrailed regardless of confidence
    service.transition(
        budi.lead.id,
        &TransitionRequest::new(Intent::NegotiatePrice, 0.92),
        &Default::default(),
        now,
    )?;
    // Interest advances Sarah
    service.transition(
        sarah.lead.id,
        &TransitionRequest::new(Intent::ShowInterest, 0.88),
        &Default::default(),
        now,
    )?;
    // Ahmad goes straight to a human
    service.escalate(ahmad.lead.id, "customer requested manager", Urgency::High, now)?;
    // One human correction feeds the calibrator
    service.record_correction(rahul.lead.id, "budget", "15000", "1500000", now)?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(LogConfig {
        app_name: "leadgate",
        verbose: cli.verbose,
    })?;

    match cli.command {
        Command::Demo => {
            let service = build_service(cli.rules.as_deref())?;
            seed_demo(&service)?;
            let report = service.drive(Utc::now())?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            let stats = service.stats(Utc::now())?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
            for event in service.audit_trail(20)?.iter().rev() {
                println!(
                    "{} {} {} {}",
                    event.created_at.to_rfc3339(),
                    event.action,
                    event.entity_id,
                    event.details
                );
            }
        }
        Command::Stats => {
            let service = build_service(cli.rules.as_deref())?;
            seed_demo(&service)?;
            let stats = service.stats(Utc::now())?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Calibrate {
            corrections,
            leads,
        } => {
            let service = build_service(cli.rules.as_deref())?;
            let state = service.preview_calibration(corrections, leads, Utc::now());
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
        Command::Drive { cycles } => {
            let service = Arc::new(build_service(cli.rules.as_deref())?);
            seed_demo(&service)?;
            run_driver(service, cycles).await;
        }
    }

    Ok(())
}
