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

//! Persistent registry over sled: an append log of canonical document records
//! plus a cid index, committed through atomic multi-tree transactions.
//!
//! The shared handle serializes mutating operations behind a write lock, so
//! the uniqueness check and the insertion are indivisible; readers observe a
//! consistent snapshot and never see a partially applied batch. The store
//! performs no retries and no local recovery.

use crate::core::registry::ledger::{RegistryError, RegistryLedger, FRAMEWORK_CORE_ARITY, FRAMEWORK_CORE_NAMES};
use crate::core::types::{
    decode_canonical_limited, encode_canonical, AnchorId, CodecError, Document, DocumentAnchored,
    DocumentId, FrameworkAnchorPolicy, RegistryStats, MAX_DOCUMENT_ENCODED_BYTES,
};
use sled::transaction::TransactionError;
use sled::Transactional;
use std::sync::{RwLock, RwLockReadGuard};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{info, warn};

const TREE_DOCUMENTS: &str = "documents";
const TREE_CID_INDEX: &str = "cid_index";
const TREE_META: &str = "meta";

const META_SCHEMA_VERSION: &[u8] = b"schema_version";
const META_OWNER: &[u8] = b"owner";

const SCHEMA_VERSION: u32 = 1;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database cannot be opened.
    #[error("db open")]
    DbOpen,
    /// Underlying storage I/O failure.
    #[error("db io")]
    DbIo,
    /// Shared state lock was poisoned by a panicking writer.
    #[error("lock poisoned")]
    Poisoned,
    /// On-disk schema version is not supported.
    #[error("unsupported schema version")]
    UnsupportedVersion,
    /// Stored owner does not match the configured owner.
    #[error("registry owner mismatch")]
    OwnerMismatch,
    /// Persisted state contradicts the registry invariants.
    #[error("corrupt registry state: {0}")]
    Corrupt(String),
    /// Canonical encoding failure.
    #[error("codec")]
    Codec(#[from] CodecError),
    /// Registry-level rejection (no state was mutated).
    #[error("{0}")]
    Registry(#[from] RegistryError),
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Shared handle to the persistent registry.
///
/// Cheap accessors go through the in-memory ledger; every mutation first
/// commits a sled transaction and only then updates the ledger, so a failed
/// commit leaves both layers untouched.
pub struct PersistentRegistry {
    _db: sled::Db,
    documents: sled::Tree,
    cid_index: sled::Tree,
    state: RwLock<RegistryLedger>,
}

impl PersistentRegistry {
    /// Open (or create) a registry at `path`.
    ///
    /// A fresh open records the schema version and `owner`; a reopen verifies
    /// both and rebuilds the in-memory ledger from the append log, refusing
    /// any state that contradicts the registry invariants. `policy` is a
    /// runtime choice and is not persisted.
    pub fn open(
        path: &str,
        owner: AnchorId,
        policy: FrameworkAnchorPolicy,
    ) -> Result<Self, StoreError> {
        let db = sled::open(path).map_err(|_| StoreError::DbOpen)?;
        let documents = db.open_tree(TREE_DOCUMENTS).map_err(|_| StoreError::DbOpen)?;
        let cid_index = db.open_tree(TREE_CID_INDEX).map_err(|_| StoreError::DbOpen)?;
        let meta = db.open_tree(TREE_META).map_err(|_| StoreError::DbOpen)?;

        match meta.get(META_SCHEMA_VERSION).map_err(|_| StoreError::DbIo)? {
            None => {
                // Fresh registry: this is the creation moment that fixes the owner.
                meta.insert(META_SCHEMA_VERSION, &SCHEMA_VERSION.to_be_bytes()[..])
                    .map_err(|_| StoreError::DbIo)?;
                meta.insert(META_OWNER, owner.0.as_slice())
                    .map_err(|_| StoreError::DbIo)?;
                meta.flush().map_err(|_| StoreError::DbIo)?;
                info!(owner = %owner, "registry created");
            }
            Some(v) => {
                if v.as_ref() != &SCHEMA_VERSION.to_be_bytes()[..] {
                    return Err(StoreError::UnsupportedVersion);
                }
                let stored = meta
                    .get(META_OWNER)
                    .map_err(|_| StoreError::DbIo)?
                    .ok_or_else(|| StoreError::Corrupt("missing owner record".to_string()))?;
                if stored.as_ref() != owner.0.as_slice() {
                    return Err(StoreError::OwnerMismatch);
                }
            }
        }

        let ledger = rebuild_ledger(&documents, &cid_index, owner, policy)?;
        info!(documents = ledger.document_count(), "registry opened");
        Ok(Self {
            _db: db,
            documents,
            cid_index,
            state: RwLock::new(ledger),
        })
    }

    /// Anchor a single document. The commit timestamp is assigned here.
    pub fn anchor_document(
        &self,
        caller: &AnchorId,
        name: &str,
        cid: &str,
        metadata: &str,
    ) -> Result<DocumentAnchored, StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::Poisoned)?;
        let id = match state.check_anchor(name, cid) {
            Ok(id) => id,
            Err(e) => {
                warn!(cid, %e, "anchor rejected");
                return Err(e.into());
            }
        };
        let doc = Document {
            id,
            name: name.to_string(),
            cid: cid.to_string(),
            metadata: metadata.to_string(),
            timestamp_ms: now_ms(),
            anchored_by: caller.clone(),
        };
        let value = encode_canonical(&doc)?;
        self.commit(&[(doc.id, doc.cid.clone(), value)])?;
        let event = state.apply(doc);
        info!(id = event.id.as_u64(), cid = %event.cid, by = %event.anchored_by, "document anchored");
        Ok(event)
    }

    /// Anchor the five framework-core documents in one atomic commit.
    ///
    /// All five land together or not at all; the sled transaction and the
    /// in-memory apply both happen under the same write lock, so no reader
    /// observes a partial batch.
    pub fn anchor_framework_core(
        &self,
        caller: &AnchorId,
        cids: &[&str; FRAMEWORK_CORE_ARITY],
    ) -> Result<Vec<DocumentAnchored>, StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::Poisoned)?;
        if let Err(e) = state.check_framework_core(caller, cids) {
            warn!(%e, "framework core batch rejected");
            return Err(e.into());
        }

        let now = now_ms();
        let base = state.document_count();
        let mut docs = Vec::with_capacity(FRAMEWORK_CORE_ARITY);
        let mut records = Vec::with_capacity(FRAMEWORK_CORE_ARITY);
        for (slot, cid) in cids.iter().enumerate() {
            let doc = Document {
                id: DocumentId(base + slot as u64 + 1),
                name: FRAMEWORK_CORE_NAMES[slot].to_string(),
                cid: (*cid).to_string(),
                metadata: String::new(),
                timestamp_ms: now,
                anchored_by: caller.clone(),
            };
            records.push((doc.id, doc.cid.clone(), encode_canonical(&doc)?));
            docs.push(doc);
        }

        self.commit(&records)?;
        let events: Vec<DocumentAnchored> = docs.into_iter().map(|d| state.apply(d)).collect();
        info!(
            first = events[0].id.as_u64(),
            last = events[FRAMEWORK_CORE_ARITY - 1].id.as_u64(),
            by = %caller,
            "framework core anchored"
        );
        Ok(events)
    }

    /// Fetch a committed document by id.
    pub fn get_document(&self, id: DocumentId) -> Result<Document, StoreError> {
        let state = self.read()?;
        Ok(state.get_document(id)?.clone())
    }

    /// Look up a cid; `(true, id)` when anchored, `(false, 0)` otherwise.
    pub fn verify_document(&self, cid: &str) -> Result<(bool, DocumentId), StoreError> {
        Ok(self.read()?.verify_document(cid))
    }

    /// Current document count.
    pub fn document_count(&self) -> Result<u64, StoreError> {
        Ok(self.read()?.document_count())
    }

    /// Aggregate counters.
    pub fn stats(&self) -> Result<RegistryStats, StoreError> {
        Ok(self.read()?.stats())
    }

    /// Identity recorded at registry creation.
    pub fn owner(&self) -> Result<AnchorId, StoreError> {
        Ok(self.read()?.owner().clone())
    }

    /// Consistent point-in-time copy of the ledger, for audit sweeps.
    pub fn snapshot(&self) -> Result<RegistryLedger, StoreError> {
        Ok(self.read()?.clone())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, RegistryLedger>, StoreError> {
        self.state.read().map_err(|_| StoreError::Poisoned)
    }

    /// Atomic commit of document records plus their index entries.
    fn commit(&self, records: &[(DocumentId, String, Vec<u8>)]) -> Result<(), StoreError> {
        let res: Result<(), TransactionError<StoreError>> =
            (&self.documents, &self.cid_index).transaction(|(docs, cids)| {
                for (id, cid, value) in records.iter() {
                    let key = id.as_u64().to_be_bytes();
                    docs.insert(&key[..], value.as_slice())?;
                    cids.insert(cid.as_bytes(), &key[..])?;
                }
                Ok(())
            });
        match res {
            Ok(()) => Ok(()),
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(_)) => Err(StoreError::DbIo),
        }
    }
}

/// Rebuild the in-memory ledger from the append log, re-running the same
/// validation every record passed when it was first committed.
fn rebuild_ledger(
    documents: &sled::Tree,
    cid_index: &sled::Tree,
    owner: AnchorId,
    policy: FrameworkAnchorPolicy,
) -> Result<RegistryLedger, StoreError> {
    let mut ledger = RegistryLedger::new(owner, policy);

    for (i, item) in documents.iter().enumerate() {
        let (key, value) = item.map_err(|_| StoreError::DbIo)?;
        let expected = i as u64 + 1;
        let doc: Document = decode_canonical_limited(&value, MAX_DOCUMENT_ENCODED_BYTES)
            .map_err(|_| StoreError::Corrupt(format!("undecodable record at id {expected}")))?;
        if key.as_ref() != &expected.to_be_bytes()[..] || doc.id.as_u64() != expected {
            return Err(StoreError::Corrupt(format!("id sequence broken at {expected}")));
        }
        ledger
            .check_anchor(&doc.name, &doc.cid)
            .map_err(|e| StoreError::Corrupt(format!("record {expected}: {e}")))?;
        ledger.apply(doc);
    }

    // The index tree must agree with the log in both directions.
    if cid_index.len() as u64 != ledger.document_count() {
        return Err(StoreError::Corrupt(format!(
            "cid index holds {} entries for {} documents",
            cid_index.len(),
            ledger.document_count()
        )));
    }
    for item in cid_index.iter() {
        let (cid, id_bytes) = item.map_err(|_| StoreError::DbIo)?;
        let cid = std::str::from_utf8(&cid)
            .map_err(|_| StoreError::Corrupt("non-utf8 cid in index".to_string()))?;
        let id = id_bytes
            .as_ref()
            .try_into()
            .map(u64::from_be_bytes)
            .map_err(|_| StoreError::Corrupt(format!("malformed index entry for cid {cid}")))?;
        match ledger.verify_document(cid) {
            (true, got) if got.as_u64() == id => {}
            _ => {
                return Err(StoreError::Corrupt(format!(
                    "index entry for cid {cid} does not match the log"
                )));
            }
        }
    }

    Ok(ledger)
}
