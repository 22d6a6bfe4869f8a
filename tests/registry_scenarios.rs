#![forbid(unsafe_code)]

use docanchor::core::registry::ledger::{RegistryError, FRAMEWORK_CORE_NAMES};
use docanchor::core::registry::store::{PersistentRegistry, StoreError};
use docanchor::core::types::{AnchorId, DocumentId, FrameworkAnchorPolicy, RegistryStats};

fn owner() -> AnchorId {
    AnchorId(vec![0x11; 8])
}

fn open_registry(dir: &tempfile::TempDir, policy: FrameworkAnchorPolicy) -> PersistentRegistry {
    PersistentRegistry::open(dir.path().to_str().unwrap(), owner(), policy).expect("open registry")
}

#[test]
fn fresh_registry_is_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    let reg = open_registry(&dir, FrameworkAnchorPolicy::Open);

    assert_eq!(reg.document_count().unwrap(), 0);
    assert_eq!(
        reg.stats().unwrap(),
        RegistryStats {
            total: 0,
            unique_anchors: 0
        }
    );
    assert_eq!(
        reg.verify_document("QmNonExistent").unwrap(),
        (false, DocumentId::NONE)
    );
    assert_eq!(reg.owner().unwrap(), owner());
}

#[test]
fn single_anchor_assigns_id_one() {
    let dir = tempfile::tempdir().expect("tempdir");
    let reg = open_registry(&dir, FrameworkAnchorPolicy::Open);

    let ev = reg
        .anchor_document(&owner(), "Test Document", "QmTestCID123456789", "{\"test\":true}")
        .expect("anchor");
    assert_eq!(ev.id, DocumentId(1));

    let doc = reg.get_document(DocumentId(1)).expect("get");
    assert_eq!(doc.cid, "QmTestCID123456789");
    assert_eq!(doc.name, "Test Document");
    assert_eq!(doc.metadata, "{\"test\":true}");
    assert_eq!(doc.anchored_by, owner());
    assert_eq!(ev.timestamp_ms, doc.timestamp_ms);

    for bad in [0u64, 2, 99] {
        assert!(matches!(
            reg.get_document(DocumentId(bad)),
            Err(StoreError::Registry(RegistryError::NotFound))
        ));
    }
}

#[test]
fn duplicate_cid_fails_and_leaves_count_unchanged() {
    let dir = tempfile::tempdir().expect("tempdir");
    let reg = open_registry(&dir, FrameworkAnchorPolicy::Open);

    reg.anchor_document(&owner(), "Doc 1", "QmSameCID", "{}").expect("first anchor");
    let err = reg
        .anchor_document(&owner(), "Doc 2", "QmSameCID", "{}")
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Registry(RegistryError::DuplicateCid)
    ));
    assert_eq!(reg.document_count().unwrap(), 1);
    assert_eq!(reg.verify_document("QmSameCID").unwrap(), (true, DocumentId(1)));
}

#[test]
fn empty_inputs_are_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let reg = open_registry(&dir, FrameworkAnchorPolicy::Open);

    for (name, cid) in [("", "QmX"), ("Doc", ""), ("   ", "QmX"), ("Doc", "  ")] {
        let err = reg.anchor_document(&owner(), name, cid, "").unwrap_err();
        assert!(matches!(
            err,
            StoreError::Registry(RegistryError::InvalidInput)
        ));
    }
    assert_eq!(reg.document_count().unwrap(), 0);
}

#[test]
fn framework_core_batch_lands_in_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let reg = open_registry(&dir, FrameworkAnchorPolicy::Open);

    let cids = ["Qm1", "Qm2", "Qm3", "Qm4", "Qm5"];
    let events = reg.anchor_framework_core(&owner(), &cids).expect("batch");

    assert_eq!(events.len(), 5);
    for (i, ev) in events.iter().enumerate() {
        assert_eq!(ev.id, DocumentId(i as u64 + 1));
        assert_eq!(ev.name, FRAMEWORK_CORE_NAMES[i]);
        assert_eq!(ev.cid, cids[i]);
    }
    assert_eq!(reg.document_count().unwrap(), 5);
    for (i, cid) in cids.iter().enumerate() {
        assert_eq!(
            reg.verify_document(cid).unwrap(),
            (true, DocumentId(i as u64 + 1))
        );
        assert_eq!(reg.get_document(DocumentId(i as u64 + 1)).unwrap().metadata, "");
    }
}

#[test]
fn framework_core_batch_is_all_or_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let reg = open_registry(&dir, FrameworkAnchorPolicy::Open);

    reg.anchor_document(&owner(), "Prior", "Qm3", "").expect("anchor");
    let err = reg
        .anchor_framework_core(&owner(), &["Qm1", "Qm2", "Qm3", "Qm4", "Qm5"])
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Registry(RegistryError::DuplicateCid)
    ));

    assert_eq!(reg.document_count().unwrap(), 1);
    for cid in ["Qm1", "Qm2", "Qm4", "Qm5"] {
        assert_eq!(reg.verify_document(cid).unwrap(), (false, DocumentId::NONE));
    }
}

#[test]
fn framework_core_policy_is_a_configuration_choice() {
    let stranger = AnchorId(vec![0x22; 8]);
    let cids = ["Qa1", "Qa2", "Qa3", "Qa4", "Qa5"];

    let dir = tempfile::tempdir().expect("tempdir");
    let restricted = open_registry(&dir, FrameworkAnchorPolicy::Owner);
    let err = restricted.anchor_framework_core(&stranger, &cids).unwrap_err();
    assert!(matches!(err, StoreError::Registry(RegistryError::NotOwner)));
    assert_eq!(restricted.document_count().unwrap(), 0);
    restricted
        .anchor_framework_core(&owner(), &cids)
        .expect("owner may anchor under the restricted policy");

    let dir2 = tempfile::tempdir().expect("tempdir");
    let open = open_registry(&dir2, FrameworkAnchorPolicy::Open);
    open.anchor_framework_core(&stranger, &cids)
        .expect("any caller may anchor under the open policy");
    assert_eq!(open.stats().unwrap().unique_anchors, 1);
}

#[test]
fn stats_count_distinct_identities() {
    let dir = tempfile::tempdir().expect("tempdir");
    let reg = open_registry(&dir, FrameworkAnchorPolicy::Open);

    let a = AnchorId(vec![1]);
    let b = AnchorId(vec![2]);
    reg.anchor_document(&a, "one", "Qm1", "").unwrap();
    reg.anchor_document(&a, "two", "Qm2", "").unwrap();
    reg.anchor_document(&b, "three", "Qm3", "").unwrap();

    assert_eq!(
        reg.stats().unwrap(),
        RegistryStats {
            total: 3,
            unique_anchors: 2
        }
    );
}
