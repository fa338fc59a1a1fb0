//! EVOLV compliance core: demo CLI
//!
//! Drives the agents against a file-backed audit ledger and the mock GAMP 5
//! knowledge base.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- assess --cr-id CR-1 --criticality critical --change-type normal
//!   cargo run -p demo -- verify demo/data/urs_batch.json
//!   cargo run -p demo -- sign-off --document report.txt --signer "Dana Reviewer" --meaning "Review and Approval"
//!   cargo run -p demo -- check-trail
//!   cargo run -p demo -- find-archive 3fa9c2

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

use evolv_agents::{
    mock_data::{sample_requirements, MockKnowledgeBase},
    ChangeRequest, RiskStrategist, SignOff, VerificationAgent,
};
use evolv_audit::{AuditLedger, LedgerConfig};
use evolv_contracts::{
    audit::{AuditAction, AuditEntry},
    error::{EvolvError, EvolvResult},
    verify::VerificationResult,
};
use evolv_core::{traits::AuditSink, DecisionRecorder};
use evolv_verify::{ComplianceRuleEngine, RuleTables};

// ── CLI definition ────────────────────────────────────────────────────────────

/// EVOLV: audited GAMP 5 risk and requirement verification demo.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "EVOLV compliance core demo",
    long_about = "Runs the EVOLV agents against a tamper-evident CSV audit trail,\n\
                  writing a reasoning archive for every traced decision."
)]
struct Cli {
    /// Ledger configuration TOML. Defaults to output/audit_trail.csv.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Rule tables TOML for the verification engine. Defaults to GAMP 5.
    #[arg(long, global = true)]
    rules: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Assess a change request and recommend a testing strategy.
    Assess {
        #[arg(long)]
        cr_id: String,
        #[arg(long)]
        criticality: String,
        #[arg(long)]
        change_type: String,
        #[arg(long, default_value = "medium")]
        detectability: String,
        /// Requesting user recorded on the audit rows.
        #[arg(long)]
        user: Option<String>,
    },
    /// Verify a requirement document (object) or batch (array) from a JSON file.
    Verify { file: PathBuf },
    /// Electronically sign a document.
    SignOff {
        #[arg(long)]
        document: PathBuf,
        #[arg(long)]
        signer: String,
        #[arg(long)]
        meaning: String,
    },
    /// Recompute every row hash and check archive pairing.
    CheckTrail,
    /// List archives whose cross-reference hash starts with a prefix.
    FindArchive { prefix: String },
    /// Assess, verify the sample batch, sign the report, check the trail.
    RunAll,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Set RUST_LOG=info to see every appended row.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    print_banner();

    match run(cli) {
        Ok(()) => println!("Done."),
        Err(e) => {
            eprintln!("Demo error: {}", e);
            std::process::exit(1);
        }
    }
}

// ── Wiring ────────────────────────────────────────────────────────────────────

struct Runtime {
    config: LedgerConfig,
    ledger: Arc<AuditLedger>,
    recorder: DecisionRecorder,
    engine: ComplianceRuleEngine,
}

impl Runtime {
    fn new(config_path: Option<&Path>, rules_path: Option<&Path>) -> EvolvResult<Self> {
        let config = match config_path {
            Some(path) => LedgerConfig::from_file(path)?,
            None => LedgerConfig::default(),
        };
        let tables = match rules_path {
            Some(path) => RuleTables::from_file(path)?,
            None => RuleTables::gamp5(),
        };
        let ledger = Arc::new(AuditLedger::open(&config)?);
        let sink: Arc<dyn AuditSink> = ledger.clone();

        Ok(Self {
            config,
            ledger,
            recorder: DecisionRecorder::new(sink),
            engine: ComplianceRuleEngine::new(tables),
        })
    }

    fn verification_agent(&self) -> VerificationAgent {
        VerificationAgent::new(
            self.engine.clone(),
            Arc::new(MockKnowledgeBase::gamp5()),
            self.recorder.clone(),
        )
    }
}

fn run(cli: Cli) -> EvolvResult<()> {
    let runtime = Runtime::new(cli.config.as_deref(), cli.rules.as_deref())?;

    match cli.command {
        Command::Assess {
            cr_id,
            criticality,
            change_type,
            detectability,
            user,
        } => {
            let mut request =
                ChangeRequest::new(&cr_id, &criticality, &change_type).with_detectability(&detectability);
            if let Some(user) = user {
                request = request.requested_by(&user);
            }
            assess(&runtime, &request)
        }
        Command::Verify { file } => verify_file(&runtime, &file),
        Command::SignOff {
            document,
            signer,
            meaning,
        } => sign_off(&runtime, &document, &signer, &meaning),
        Command::CheckTrail => check_trail(&runtime),
        Command::FindArchive { prefix } => find_archive(&runtime, &prefix),
        Command::RunAll => run_all(&runtime),
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

fn assess(runtime: &Runtime, request: &ChangeRequest) -> EvolvResult<()> {
    let strategist = RiskStrategist::new(runtime.recorder.clone());
    let assessed = strategist.process_change_request(request)?;
    let strategy = strategist.determine_strategy(assessed.value.risk_level)?;
    let a = &assessed.value;

    println!("Risk assessment: {}", request.cr_id);
    println!(
        "  Severity {:?} x Occurrence {:?} x Detectability {:?} = RPN {}",
        a.severity, a.occurrence, a.detectability, a.priority_number
    );
    if a.severity_override {
        println!("  Risk level:  {} (patient-safety override)", a.risk_level);
    } else {
        println!("  Risk level:  {}", a.risk_level);
    }
    println!("  Strategy:    {}", strategy.value);
    println!("  Audit hash:  {}", assessed.receipt.integrity_hash());
    if let Some(location) = &assessed.receipt.archive {
        println!("  Archive:     {}", location);
    }
    println!();
    Ok(())
}

fn verify_file(runtime: &Runtime, file: &Path) -> EvolvResult<()> {
    let text = fs::read_to_string(file).map_err(|e| EvolvError::InvalidDocument {
        fields: vec!["document".to_string()],
        reason: format!("cannot read '{}': {e}", file.display()),
    })?;
    let raw: Value = serde_json::from_str(&text).map_err(|e| EvolvError::InvalidDocument {
        fields: vec!["document".to_string()],
        reason: format!("'{}' is not valid JSON: {e}", file.display()),
    })?;

    let agent = runtime.verification_agent();
    match raw {
        Value::Array(docs) => verify_batch(&agent, &docs),
        single => {
            let audited = agent.verify(&single)?;
            print_result(&audited.value);
            println!("  Audit hash: {}", audited.receipt.integrity_hash());
            println!();
            Ok(())
        }
    }
}

fn verify_batch(agent: &VerificationAgent, docs: &[Value]) -> EvolvResult<()> {
    let batch = agent.verify_batch(docs)?;
    for (idx, result) in batch.value.results.iter().enumerate() {
        match result {
            Ok(audited) => print_result(&audited.value),
            Err(e) => println!("Document #{}: no verdict: {}", idx + 1, e),
        }
    }
    println!(
        "Batch: {} approved, {} rejected, {} without verdict",
        batch.value.approved, batch.value.rejected, batch.value.errored
    );
    println!();
    Ok(())
}

fn print_result(result: &VerificationResult) {
    println!("{}: {:?}", result.document_id, result.verdict);
    for finding in &result.findings {
        println!("  [{:?}] {}: {}", finding.status, finding.check_name, finding.detail);
        if let Some(citation) = &finding.citation {
            println!("         {}", citation);
        }
    }
}

fn sign_off(runtime: &Runtime, document: &Path, signer: &str, meaning: &str) -> EvolvResult<()> {
    let signed = SignOff::new(runtime.recorder.clone()).sign_file(document, signer, meaning)?;
    let s = &signed.value;
    println!("Sign-off recorded");
    println!("  Document:   {}", s.document);
    println!("  SHA-256:    {}", s.document_sha256);
    println!("  Signer:     {}", s.signer);
    println!("  Meaning:    {}", s.meaning);
    println!("  Signature:  {}", s.signature_id);
    println!("  Timestamp:  {}", signed.receipt.record.timestamp);
    println!("  Audit hash: {}", signed.receipt.integrity_hash());
    println!();
    Ok(())
}

fn check_trail(runtime: &Runtime) -> EvolvResult<()> {
    let integrity = runtime.ledger.verify_integrity()?;
    let pairing = runtime.ledger.verify_pairing()?;

    println!("Audit trail: {}", runtime.config.ledger.trail_path.display());
    println!("  Rows checked:      {}", integrity.rows_checked);
    for row in &integrity.tampered {
        println!(
            "  TAMPERED row {}: stored {} recomputed {}",
            row.index, row.stored_hash, row.recomputed_hash
        );
    }
    println!("  Archives checked:  {}", pairing.archives_checked);
    for name in &pairing.orphaned {
        println!("  ORPHANED archive:  {}", name);
    }
    for name in &pairing.ambiguous {
        println!("  AMBIGUOUS archive: {}", name);
    }
    for name in &pairing.tampered {
        println!("  TAMPERED archive:  {}", name);
    }
    println!();

    if integrity.is_intact() && pairing.is_consistent() {
        println!("Trail integrity: VERIFIED");
        Ok(())
    } else {
        Err(EvolvError::AuditReadFailed {
            reason: format!(
                "{} tampered row(s), {} inconsistent archive(s)",
                integrity.tampered.len(),
                pairing.orphaned.len() + pairing.ambiguous.len() + pairing.tampered.len()
            ),
        })
    }
}

fn find_archive(runtime: &Runtime, prefix: &str) -> EvolvResult<()> {
    let names = runtime.ledger.find_archives(prefix)?;
    if names.is_empty() {
        println!("No archive matches '{}'", prefix);
    }
    for name in names {
        let archive = runtime.ledger.load_archive(&name)?;
        let status = if archive.is_intact() { "intact" } else { "TAMPERED" };
        println!("{} [{}]", name, status);
        println!("  {} {} by {} at {}", archive.action, archive.compliance_impact, archive.agent_name, archive.timestamp);
        for step in &archive.steps {
            println!("  - {}", step);
        }
    }
    println!();
    Ok(())
}

fn run_all(runtime: &Runtime) -> EvolvResult<()> {
    assess(runtime, &ChangeRequest::new("CR-2001", "critical", "normal"))?;
    verify_batch(&runtime.verification_agent(), &sample_requirements())?;

    let report = runtime
        .config
        .ledger
        .trail_path
        .with_file_name("Verification_Report.txt");
    fs::write(&report, "EVOLV verification report\nURS-7.1 Approved\nURS-7.2 Rejected\nURS-9.3 Approved\n")
        .map_err(|e| EvolvError::InvalidDocument {
            fields: vec!["document".to_string()],
            reason: format!("cannot write '{}': {e}", report.display()),
        })?;
    sign_off(runtime, &report, "Demo Reviewer", "Review and Approval")?;

    runtime.recorder.note(AuditEntry::new(
        "Demo",
        AuditAction::parse("DEMO_RUN_COMPLETED"),
        "Assessed 1 change request, verified 3 requirements, signed 1 report",
    ))?;
    info!("demo run complete");

    check_trail(runtime)
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("EVOLV: Audited GxP Compliance Core");
    println!("==================================");
    println!();
    println!("Every decision below is released only after its audit row is written:");
    println!("  [1] RiskStrategist    GAMP 5 RPN with patient-safety override");
    println!("  [2] VerificationAgent criticality, relevance and contradiction checks");
    println!("  [3] SignOff           SHA-256 sealed electronic signature");
    println!("  [4] AuditLedger       SHA-256 row hash + paired reasoning archive");
    println!();
}
