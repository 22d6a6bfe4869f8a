// Copyright (c) 2026 Docanchor
// Licensed under the Apache-2.0 License.

#![no_main]
#![forbid(unsafe_code)]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use docanchor::core::registry::ledger::RegistryLedger;
use docanchor::core::types::{AnchorId, DocumentId, FrameworkAnchorPolicy};

#[derive(Arbitrary, Debug)]
enum Op {
    Anchor {
        name: String,
        cid: String,
        metadata: String,
        caller: u8,
        now_ms: u64,
    },
    Batch {
        cids: [String; 5],
        caller: u8,
        now_ms: u64,
    },
    Get {
        id: u64,
    },
    Verify {
        cid: String,
    },
}

fuzz_target!(|ops: Vec<Op>| {
    // Best-effort: arbitrary call sequences must never panic and must keep
    // the count invariant intact. Semantic coverage lives in the test suite.
    let mut reg = RegistryLedger::new(AnchorId(vec![0]), FrameworkAnchorPolicy::Open);
    let mut accepted = 0u64;

    for op in ops {
        match op {
            Op::Anchor {
                name,
                cid,
                metadata,
                caller,
                now_ms,
            } => {
                if reg
                    .anchor_document(&AnchorId(vec![caller]), &name, &cid, &metadata, now_ms)
                    .is_ok()
                {
                    accepted += 1;
                }
            }
            Op::Batch {
                cids,
                caller,
                now_ms,
            } => {
                let refs: [&str; 5] = [&cids[0], &cids[1], &cids[2], &cids[3], &cids[4]];
                if reg
                    .anchor_framework_core(&AnchorId(vec![caller]), &refs, now_ms)
                    .is_ok()
                {
                    accepted += 5;
                }
            }
            Op::Get { id } => {
                let _ = reg.get_document(DocumentId(id));
            }
            Op::Verify { cid } => {
                let _ = reg.verify_document(&cid);
            }
        }
    }

    assert_eq!(reg.document_count(), accepted);
    assert_eq!(reg.stats().total, accepted);
});
