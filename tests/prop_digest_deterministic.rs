// Copyright (c) 2026 Docanchor
// Licensed under the Apache License, Version 2.0

#![forbid(unsafe_code)]

use proptest::prelude::*;

use docanchor::core::registry::audit::audit_ledger;
use docanchor::core::registry::ledger::RegistryLedger;
use docanchor::core::registry::store::PersistentRegistry;
use docanchor::core::types::{AnchorId, FrameworkAnchorPolicy};

proptest! {
    #[test]
    fn identical_histories_share_a_digest(
        cids in prop::collection::btree_set("[a-z0-9]{1,16}", 1..40)
    ) {
        let owner = AnchorId(vec![0x66; 4]);
        let mut a = RegistryLedger::new(owner.clone(), FrameworkAnchorPolicy::Open);
        let mut b = RegistryLedger::new(owner.clone(), FrameworkAnchorPolicy::Open);

        for (i, cid) in cids.iter().enumerate() {
            let ts = 1_000 + i as u64;
            a.anchor_document(&owner, "doc", cid, "m", ts).unwrap();
            b.anchor_document(&owner, "doc", cid, "m", ts).unwrap();
        }

        let ra = audit_ledger(&a).unwrap();
        let rb = audit_ledger(&b).unwrap();
        prop_assert_eq!(ra, rb);
    }

    #[test]
    fn digest_survives_store_reopen(
        cids in prop::collection::btree_set("[a-z0-9]{1,16}", 1..24)
    ) {
        let owner = AnchorId(vec![0x77; 4]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_str().unwrap();

        let reg = PersistentRegistry::open(path, owner.clone(), FrameworkAnchorPolicy::Open).unwrap();
        for cid in cids.iter() {
            reg.anchor_document(&owner, "doc", cid, "").unwrap();
        }
        let before = audit_ledger(&reg.snapshot().unwrap()).unwrap();
        drop(reg);

        let reg = PersistentRegistry::open(path, owner, FrameworkAnchorPolicy::Open).unwrap();
        let after = audit_ledger(&reg.snapshot().unwrap()).unwrap();
        prop_assert_eq!(after, before);
    }
}
