#![forbid(unsafe_code)]

use std::sync::Arc;
use std::thread;

use docanchor::core::registry::audit::audit_ledger;
use docanchor::core::registry::ledger::RegistryError;
use docanchor::core::registry::store::{PersistentRegistry, StoreError};
use docanchor::core::types::{AnchorId, DocumentId, FrameworkAnchorPolicy};

fn owner() -> AnchorId {
    AnchorId(vec![0x44; 4])
}

fn open(path: &str) -> Result<PersistentRegistry, StoreError> {
    PersistentRegistry::open(path, owner(), FrameworkAnchorPolicy::Open)
}

#[test]
fn reopen_rebuilds_identical_state() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().to_str().unwrap();

    let reg = open(path).expect("open");
    reg.anchor_document(&owner(), "Charter", "QmCharter", "{\"v\":1}").unwrap();
    reg.anchor_document(&AnchorId(vec![9]), "Minutes", "QmMinutes", "").unwrap();
    reg.anchor_document(&owner(), "Ledger", "QmLedger", "x").unwrap();

    let before = reg.snapshot().expect("snapshot");
    let report_before = audit_ledger(&before).expect("audit");
    drop(reg);

    let reg = open(path).expect("reopen");
    assert_eq!(reg.document_count().unwrap(), 3);
    assert_eq!(reg.stats().unwrap(), before.stats());

    for id in 1..=3 {
        let doc = reg.get_document(DocumentId(id)).expect("get after reopen");
        assert_eq!(&doc, before.get_document(DocumentId(id)).unwrap());
    }

    let report_after = audit_ledger(&reg.snapshot().unwrap()).expect("audit after reopen");
    assert_eq!(report_after, report_before);
}

#[test]
fn failed_batch_leaves_no_trace_on_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().to_str().unwrap();

    let reg = open(path).expect("open");
    reg.anchor_document(&owner(), "Prior", "Qm3", "").unwrap();
    let err = reg
        .anchor_framework_core(&owner(), &["Qm1", "Qm2", "Qm3", "Qm4", "Qm5"])
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Registry(RegistryError::DuplicateCid)
    ));
    drop(reg);

    let reg = open(path).expect("reopen");
    assert_eq!(reg.document_count().unwrap(), 1);
    for cid in ["Qm1", "Qm2", "Qm4", "Qm5"] {
        assert_eq!(reg.verify_document(cid).unwrap(), (false, DocumentId::NONE));
    }
    audit_ledger(&reg.snapshot().unwrap()).expect("clean after rejected batch");
}

#[test]
fn reopen_with_a_different_owner_is_refused() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().to_str().unwrap();

    drop(open(path).expect("create"));
    let err =
        PersistentRegistry::open(path, AnchorId(vec![0x55]), FrameworkAnchorPolicy::Open)
            .err()
            .expect("owner mismatch must refuse the open");
    assert!(matches!(err, StoreError::OwnerMismatch));
}

#[test]
fn concurrent_distinct_anchors_all_receive_unique_ids() {
    let dir = tempfile::tempdir().expect("tempdir");
    let reg = Arc::new(open(dir.path().to_str().unwrap()).expect("open"));

    let threads = 8;
    let per_thread = 16;
    let mut handles = Vec::new();
    for t in 0..threads {
        let reg = Arc::clone(&reg);
        handles.push(thread::spawn(move || {
            let caller = AnchorId(vec![t as u8]);
            let mut ids = Vec::new();
            for i in 0..per_thread {
                let cid = format!("Qm-{t}-{i}");
                let ev = reg.anchor_document(&caller, "doc", &cid, "").expect("anchor");
                ids.push(ev.id.as_u64());
            }
            ids
        }));
    }

    let mut all_ids: Vec<u64> = handles
        .into_iter()
        .flat_map(|h| h.join().expect("thread"))
        .collect();
    all_ids.sort_unstable();
    all_ids.dedup();

    let expected = (threads * per_thread) as u64;
    assert_eq!(all_ids.len() as u64, expected, "no id was lost or reused");
    assert_eq!(all_ids.first(), Some(&1));
    assert_eq!(all_ids.last(), Some(&expected));
    assert_eq!(reg.document_count().unwrap(), expected);
    audit_ledger(&reg.snapshot().unwrap()).expect("clean after concurrent anchoring");
}

#[test]
fn concurrent_same_cid_has_exactly_one_winner() {
    let dir = tempfile::tempdir().expect("tempdir");
    let reg = Arc::new(open(dir.path().to_str().unwrap()).expect("open"));

    let mut handles = Vec::new();
    for t in 0..8u8 {
        let reg = Arc::clone(&reg);
        handles.push(thread::spawn(move || {
            reg.anchor_document(&AnchorId(vec![t]), "contested", "QmContested", "")
        }));
    }

    let mut wins = 0;
    let mut duplicates = 0;
    for h in handles {
        match h.join().expect("thread") {
            Ok(ev) => {
                assert_eq!(ev.id, DocumentId(1));
                wins += 1;
            }
            Err(StoreError::Registry(RegistryError::DuplicateCid)) => duplicates += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(wins, 1);
    assert_eq!(duplicates, 7);
    assert_eq!(reg.document_count().unwrap(), 1);
}
