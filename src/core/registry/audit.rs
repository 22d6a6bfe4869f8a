// Copyright (c) 2026 Docanchor
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Read-side integrity sweep over a registry snapshot.
//!
//! Walks every id from 1 to the document count, cross-checks the cid index in
//! both directions, recounts the statistics the ledger maintains
//! incrementally, and folds a chained digest over the canonical record bytes:
//!
//! ```text
//! d_0 = 0^32
//! d_i = H( "Docanchor-Anchor-Chain-v1" || d_{i-1} || H("Docanchor-Anchor-Leaf-v1" || record_i) )
//! ```
//!
//! A `NotFound` inside the id range is corruption worth surfacing, never a
//! condition to retry.

use crate::core::registry::ledger::RegistryLedger;
use crate::core::types::{encode_canonical, DocumentId};
use ring::digest;
use std::collections::BTreeSet;
use thiserror::Error;

/// 32-byte digest.
pub type Digest32 = [u8; 32];

const LEAF_DOMAIN: &[u8] = b"Docanchor-Anchor-Leaf-v1";
const CHAIN_DOMAIN: &[u8] = b"Docanchor-Anchor-Chain-v1";

/// Integrity violations, naming the first offending record.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuditError {
    /// An id inside 1..=count resolved to nothing.
    #[error("missing document at id {0}")]
    MissingDocument(u64),
    /// A record carries an id other than its position.
    #[error("id mismatch at position {position}: found {found}")]
    IdMismatch {
        /// Position in the append log (1-based).
        position: u64,
        /// Id stored in the record.
        found: u64,
    },
    /// The cid index disagrees with the log for this id.
    #[error("cid index disagrees with the log at id {0}")]
    IndexMismatch(u64),
    /// The cid index and the log differ in size.
    #[error("cid index holds {index} entries for {documents} documents")]
    IndexSize {
        /// Entries in the cid index.
        index: u64,
        /// Documents in the log.
        documents: u64,
    },
    /// Incrementally maintained statistics disagree with a full recount.
    #[error("incremental stats disagree with recount")]
    StatsMismatch,
    /// A record could not be canonically encoded for digesting.
    #[error("undigestable record at id {0}")]
    Codec(u64),
}

/// Outcome of a completed sweep.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditReport {
    /// Documents walked.
    pub total: u64,
    /// Distinct anchoring identities, recounted from scratch.
    pub unique_anchors: u64,
    /// Chained digest over canonical record bytes in id order.
    pub digest: Digest32,
    /// Records whose timestamp precedes their predecessor's. Reported, not
    /// failed: commit ordering is external and monotonicity is not enforced.
    pub timestamp_regressions: u64,
}

impl AuditReport {
    /// Digest as lowercase hex.
    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest)
    }
}

fn h(data: &[u8]) -> Digest32 {
    let d = digest::digest(&digest::SHA256, data);
    let mut out = [0u8; 32];
    out.copy_from_slice(d.as_ref());
    out
}

fn leaf_hash(record: &[u8]) -> Digest32 {
    let mut buf = Vec::with_capacity(LEAF_DOMAIN.len() + record.len());
    buf.extend_from_slice(LEAF_DOMAIN);
    buf.extend_from_slice(record);
    h(&buf)
}

fn chain_hash(prev: Digest32, leaf: Digest32) -> Digest32 {
    let mut buf = Vec::with_capacity(CHAIN_DOMAIN.len() + 32 + 32);
    buf.extend_from_slice(CHAIN_DOMAIN);
    buf.extend_from_slice(&prev);
    buf.extend_from_slice(&leaf);
    h(&buf)
}

/// Sweep a registry snapshot. Returns the report for a clean registry and the
/// first violation otherwise.
pub fn audit_ledger(ledger: &RegistryLedger) -> Result<AuditReport, AuditError> {
    let total = ledger.document_count();
    let mut seen = BTreeSet::new();
    let mut digest = [0u8; 32];
    let mut regressions = 0u64;
    let mut prev_ts = 0u64;

    for position in 1..=total {
        let doc = ledger
            .get_document(DocumentId(position))
            .map_err(|_| AuditError::MissingDocument(position))?;
        if doc.id.as_u64() != position {
            return Err(AuditError::IdMismatch {
                position,
                found: doc.id.as_u64(),
            });
        }
        match ledger.verify_document(&doc.cid) {
            (true, got) if got.as_u64() == position => {}
            _ => return Err(AuditError::IndexMismatch(position)),
        }
        seen.insert(doc.anchored_by.clone());
        if doc.timestamp_ms < prev_ts {
            regressions += 1;
        }
        prev_ts = doc.timestamp_ms;

        let record = encode_canonical(doc).map_err(|_| AuditError::Codec(position))?;
        digest = chain_hash(digest, leaf_hash(&record));
    }

    if ledger.cid_index_len() != total {
        return Err(AuditError::IndexSize {
            index: ledger.cid_index_len(),
            documents: total,
        });
    }

    let stats = ledger.stats();
    let unique_anchors = seen.len() as u64;
    if stats.total != total || stats.unique_anchors != unique_anchors {
        return Err(AuditError::StatsMismatch);
    }

    Ok(AuditReport {
        total,
        unique_anchors,
        digest,
        timestamp_regressions: regressions,
    })
}
