//! Concurrent appends must keep every archive paired with exactly one row.

use std::{collections::HashMap, sync::Arc, thread};

use serde_json::json;

use evolv_audit::{AuditLedger, LedgerConfig};
use evolv_contracts::{
    audit::{AuditAction, AuditEntry},
    trace::ReasoningTrace,
};
use evolv_core::traits::AuditSink;

const CALLERS: usize = 100;

fn traced_entry(i: usize) -> AuditEntry {
    let trace = ReasoningTrace::from_value(json!({
        "inputs": { "caller": i },
        "steps": [format!("caller {i} decided")],
        "outputs": { "caller": i }
    }))
    .unwrap();
    AuditEntry::new("LoadAgent", AuditAction::RiskAssessmentCompleted, format!("traced {i}"))
        .with_trace(trace)
}

fn plain_entry(i: usize) -> AuditEntry {
    AuditEntry::new("LoadAgent", AuditAction::UrsVerified, format!("plain {i}"))
}

fn run_callers(ledger: Arc<AuditLedger>) -> Vec<(usize, evolv_contracts::audit::AppendReceipt)> {
    let handles: Vec<_> = (0..CALLERS)
        .map(|i| {
            let sink: Arc<dyn AuditSink> = ledger.clone();
            thread::spawn(move || {
                let entry = if i % 2 == 0 { traced_entry(i) } else { plain_entry(i) };
                (i, sink.append(&entry).unwrap())
            })
        })
        .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

#[test]
fn concurrent_file_appends_pair_every_archive_with_one_row() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(AuditLedger::open(&LedgerConfig::default().rooted_at(dir.path())).unwrap());

    let receipts = run_callers(ledger.clone());

    let rows = ledger.records().unwrap();
    assert_eq!(rows.len(), CALLERS);

    let traced = receipts.iter().filter(|(_, r)| r.archive.is_some()).count();
    assert_eq!(traced, CALLERS / 2);

    let names = ledger.find_archives("").unwrap();
    assert_eq!(names.len(), traced);

    let mut row_counts: HashMap<&str, usize> = HashMap::new();
    for row in &rows {
        *row_counts.entry(row.integrity_hash.as_str()).or_default() += 1;
    }
    for name in &names {
        let archive = ledger.load_archive(name).unwrap();
        assert_eq!(row_counts.get(archive.audit_trail_hash.as_str()), Some(&1), "{name}");

        let row = rows
            .iter()
            .find(|r| r.integrity_hash == archive.audit_trail_hash)
            .unwrap();
        assert_eq!(row.decision_logic, archive.decision_logic_summary);
        assert_eq!(archive.inputs["caller"], archive.outputs["caller"]);
    }

    assert!(ledger.verify_pairing().unwrap().is_consistent());
    assert!(ledger.verify_integrity().unwrap().is_intact());
}

#[test]
fn concurrent_memory_appends_return_matching_receipts() {
    let ledger = Arc::new(AuditLedger::in_memory());
    let receipts = run_callers(ledger.clone());

    for (i, receipt) in &receipts {
        assert_eq!(receipt.archive.is_some(), i % 2 == 0);
        let names = ledger.find_archives(receipt.integrity_hash()).unwrap();
        assert_eq!(names.len(), usize::from(receipt.archive.is_some()));
    }

    let report = ledger.verify_pairing().unwrap();
    assert_eq!(report.archives_checked, CALLERS / 2);
    assert!(report.is_consistent());
}
