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

//! Core registry types, canonical encoding helpers, and service configuration.

use bincode::Options;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Canonical serialization error.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("serialization")]
    Serialize,
    #[error("deserialization")]
    Deserialize,
    #[error("size limit exceeded")]
    TooLarge,
}

/// Hard cap on a single encoded document record.
pub const MAX_DOCUMENT_ENCODED_BYTES: usize = 1 << 20;

/// Canonical bincode options (deterministic).
fn bincode_opts() -> impl Options {
    // Fixint encoding provides a stable integer representation.
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .reject_trailing_bytes()
}

/// Encode with deterministic rules.
pub fn encode_canonical<T: Serialize>(v: &T) -> Result<Vec<u8>, CodecError> {
    bincode_opts()
        .serialize(v)
        .map_err(|_| CodecError::Serialize)
}

/// Decode with a hard size cap.
pub fn decode_canonical_limited<T: DeserializeOwned>(
    bytes: &[u8],
    max: usize,
) -> Result<T, CodecError> {
    // Fast-path cap on the raw stored payload.
    if bytes.len() > max {
        return Err(CodecError::TooLarge);
    }
    bincode_opts()
        .with_limit(max as u64)
        .deserialize(bytes)
        .map_err(|_| CodecError::Deserialize)
}

/// Sequential document identifier. Ids are 1-based and never reused; 0 is the
/// sentinel returned by cid verification when nothing is anchored.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct DocumentId(pub u64);

impl DocumentId {
    /// Sentinel for "no such document".
    pub const NONE: DocumentId = DocumentId(0);

    /// Raw integer value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Caller identity performing an anchor (opaque bytes).
///
/// Always injected by the boundary layer that authenticated the caller, never
/// derived inside the registry core.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AnchorId(pub Vec<u8>);

impl AnchorId {
    /// Parse from hex. Returns `None` on malformed or empty input.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s.trim()).ok()?;
        if bytes.is_empty() {
            return None;
        }
        Some(Self(bytes))
    }

    /// Hex rendition for logs and API responses.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Display for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// A single anchored record. Write-once: committed fields never change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Sequential id assigned by the registry.
    pub id: DocumentId,
    /// Free-form label (not required unique).
    pub name: String,
    /// Content identifier; globally unique across all documents ever anchored.
    pub cid: String,
    /// Opaque free-form text; may be empty.
    pub metadata: String,
    /// Commit time in ms since Unix epoch, assigned by the substrate.
    pub timestamp_ms: u64,
    /// Identity that performed the anchoring.
    pub anchored_by: AnchorId,
}

/// Event record emitted for each committed document, in creation order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentAnchored {
    /// Assigned id.
    pub id: DocumentId,
    /// Document label.
    pub name: String,
    /// Anchored content identifier.
    pub cid: String,
    /// Identity that performed the anchoring.
    pub anchored_by: AnchorId,
    /// Commit time in ms since Unix epoch.
    pub timestamp_ms: u64,
}

impl DocumentAnchored {
    /// Build the event for a committed document.
    pub fn of(doc: &Document) -> Self {
        Self {
            id: doc.id,
            name: doc.name.clone(),
            cid: doc.cid.clone(),
            anchored_by: doc.anchored_by.clone(),
            timestamp_ms: doc.timestamp_ms,
        }
    }
}

/// Registry-level aggregate counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    /// Documents anchored (equals the highest assigned id).
    pub total: u64,
    /// Distinct anchoring identities across all documents.
    pub unique_anchors: u64,
}

/// Who may invoke the fixed-arity framework-core batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameworkAnchorPolicy {
    /// Only the registry owner.
    Owner,
    /// Any authenticated caller.
    Open,
}

/// Service configuration root.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service settings.
    pub service: ServiceSettings,
    /// HTTP endpoint.
    pub http: HttpConfig,
    /// Registry settings.
    pub registry: RegistrySettings,
}

/// Service settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Human-readable name.
    pub name: String,
    /// Data directory (registry db).
    pub data_dir: String,
}

/// HTTP config.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Listen address, e.g. 127.0.0.1:9600.
    pub listen_addr: String,
}

/// Registry settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegistrySettings {
    /// Owner identity (hex bytes), recorded at registry creation.
    pub owner_hex: String,
    /// Framework-core batch gating.
    #[serde(default = "default_framework_anchor")]
    pub framework_anchor: FrameworkAnchorPolicy,
    /// Optional framework-core content identifiers to anchor at startup.
    /// When present, exactly five entries are expected.
    #[serde(default)]
    pub framework_core_cids: Vec<String>,
}

fn default_framework_anchor() -> FrameworkAnchorPolicy {
    FrameworkAnchorPolicy::Owner
}
