// Copyright (c) 2026 Docanchor
// Licensed under the Apache License, Version 2.0

//! Deterministic anchoring ledger: the append-only registry state machine.
//!
//! Sequential 1-based id assignment, cid uniqueness enforcement, atomic
//! fixed-arity batch anchoring, and read-side verification/statistics.
//! Commit timestamps are passed in by the substrate that owns the clock;
//! nothing here reads wall time.

#![forbid(unsafe_code)]

use crate::core::types::{
    AnchorId, Document, DocumentAnchored, DocumentId, FrameworkAnchorPolicy, RegistryStats,
};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Number of documents in a framework-core batch.
pub const FRAMEWORK_CORE_ARITY: usize = 5;

/// Slot names used by the framework-core batch, stable across callers.
pub const FRAMEWORK_CORE_NAMES: [&str; FRAMEWORK_CORE_ARITY] = [
    "Core Document 1",
    "Core Document 2",
    "Core Document 3",
    "Core Document 4",
    "Core Document 5",
];

/// Registry errors. All are raised before any state mutation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A required field (name or cid) is empty.
    #[error("empty required field")]
    InvalidInput,
    /// The cid is already anchored.
    #[error("cid already anchored")]
    DuplicateCid,
    /// Id is outside 1..=document_count.
    #[error("document not found")]
    NotFound,
    /// Framework-core anchoring is restricted to the owner.
    #[error("framework anchoring restricted to owner")]
    NotOwner,
}

/// Append-only registry state.
///
/// Documents are write-once: there is no update or delete path, and
/// `document_count` only ever grows. Mutating operations validate fully
/// before touching state, so a failed call leaves the ledger unchanged.
#[derive(Clone, Debug)]
pub struct RegistryLedger {
    owner: AnchorId,
    policy: FrameworkAnchorPolicy,
    /// Append log; id `i` lives at index `i - 1`.
    documents: Vec<Document>,
    /// cid -> id, one entry per document ever anchored.
    cid_index: BTreeMap<String, DocumentId>,
    /// anchored_by -> number of documents, kept incrementally for O(1) stats.
    anchor_counts: BTreeMap<AnchorId, u64>,
}

impl RegistryLedger {
    /// Fresh registry with zero documents, owned by `owner`.
    pub fn new(owner: AnchorId, policy: FrameworkAnchorPolicy) -> Self {
        Self {
            owner,
            policy,
            documents: Vec::new(),
            cid_index: BTreeMap::new(),
            anchor_counts: BTreeMap::new(),
        }
    }

    /// Identity recorded at registry creation.
    pub fn owner(&self) -> &AnchorId {
        &self.owner
    }

    /// Gating policy for the framework-core batch.
    pub fn policy(&self) -> FrameworkAnchorPolicy {
        self.policy
    }

    /// Current document count (equals the highest assigned id).
    pub fn document_count(&self) -> u64 {
        self.documents.len() as u64
    }

    /// Fetch a committed document by id.
    pub fn get_document(&self, id: DocumentId) -> Result<&Document, RegistryError> {
        if id.0 == 0 {
            return Err(RegistryError::NotFound);
        }
        self.documents
            .get((id.0 - 1) as usize)
            .ok_or(RegistryError::NotFound)
    }

    /// Look up a cid. Returns `(true, id)` when anchored, `(false, 0)`
    /// otherwise. Never fails.
    pub fn verify_document(&self, cid: &str) -> (bool, DocumentId) {
        match self.cid_index.get(cid) {
            Some(id) => (true, *id),
            None => (false, DocumentId::NONE),
        }
    }

    /// Aggregate counters: total documents and distinct anchoring identities.
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            total: self.document_count(),
            unique_anchors: self.anchor_counts.len() as u64,
        }
    }

    /// Iterate committed documents in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.documents.iter()
    }

    pub(crate) fn cid_index_len(&self) -> u64 {
        self.cid_index.len() as u64
    }

    /// Anchor a single document. Returns the `DocumentAnchored` event, which
    /// carries the newly assigned id.
    pub fn anchor_document(
        &mut self,
        caller: &AnchorId,
        name: &str,
        cid: &str,
        metadata: &str,
        now_ms: u64,
    ) -> Result<DocumentAnchored, RegistryError> {
        let id = self.check_anchor(name, cid)?;
        let doc = Document {
            id,
            name: name.to_string(),
            cid: cid.to_string(),
            metadata: metadata.to_string(),
            timestamp_ms: now_ms,
            anchored_by: caller.clone(),
        };
        Ok(self.apply(doc))
    }

    /// Anchor exactly five framework-core documents in one atomic step, under
    /// the slot names of [`FRAMEWORK_CORE_NAMES`] and empty metadata.
    ///
    /// All-or-nothing: a policy rejection, an empty cid, a collision with an
    /// existing document, or a collision among the five arguments fails the
    /// whole batch with zero documents created. On success returns the five
    /// events in input order; ids are consecutive.
    pub fn anchor_framework_core(
        &mut self,
        caller: &AnchorId,
        cids: &[&str; FRAMEWORK_CORE_ARITY],
        now_ms: u64,
    ) -> Result<Vec<DocumentAnchored>, RegistryError> {
        self.check_framework_core(caller, cids)?;
        let mut events = Vec::with_capacity(FRAMEWORK_CORE_ARITY);
        for (slot, cid) in cids.iter().enumerate() {
            let doc = Document {
                id: DocumentId(self.document_count() + 1),
                name: FRAMEWORK_CORE_NAMES[slot].to_string(),
                cid: (*cid).to_string(),
                metadata: String::new(),
                timestamp_ms: now_ms,
                anchored_by: caller.clone(),
            };
            events.push(self.apply(doc));
        }
        Ok(events)
    }

    /// Validate a single-anchor request against current state and return the
    /// id it would be assigned. No mutation.
    pub(crate) fn check_anchor(&self, name: &str, cid: &str) -> Result<DocumentId, RegistryError> {
        if name.trim().is_empty() || cid.trim().is_empty() {
            return Err(RegistryError::InvalidInput);
        }
        if self.cid_index.contains_key(cid) {
            return Err(RegistryError::DuplicateCid);
        }
        Ok(DocumentId(self.document_count() + 1))
    }

    /// Validate a framework-core batch against current state. No mutation.
    pub(crate) fn check_framework_core(
        &self,
        caller: &AnchorId,
        cids: &[&str; FRAMEWORK_CORE_ARITY],
    ) -> Result<(), RegistryError> {
        if self.policy == FrameworkAnchorPolicy::Owner && *caller != self.owner {
            return Err(RegistryError::NotOwner);
        }
        let mut batch = BTreeSet::new();
        for cid in cids.iter() {
            if cid.trim().is_empty() {
                return Err(RegistryError::InvalidInput);
            }
            if self.cid_index.contains_key(*cid) || !batch.insert(*cid) {
                return Err(RegistryError::DuplicateCid);
            }
        }
        Ok(())
    }

    /// Insert a validated document. Callers must have passed the matching
    /// `check_*` against the same state; `doc.id` must be the next id.
    pub(crate) fn apply(&mut self, doc: Document) -> DocumentAnchored {
        debug_assert_eq!(doc.id.0, self.document_count() + 1);
        let event = DocumentAnchored::of(&doc);
        self.cid_index.insert(doc.cid.clone(), doc.id);
        *self.anchor_counts.entry(doc.anchored_by.clone()).or_insert(0) += 1;
        self.documents.push(doc);
        event
    }
}
