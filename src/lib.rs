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

//! Docanchor - append-only content-anchoring registry.
//!
//! This repository provides:
//! - A deterministic registry state machine: sequential 1-based ids, cid
//!   uniqueness, atomic fixed-arity batch anchoring, event records
//! - A sled-backed persistent store committing through atomic multi-tree
//!   transactions, with serialized writers and snapshot readers
//! - Read-side integrity sweeps with a chained, domain-separated digest
//! - Monitoring via Prometheus metrics and a read-only HTTP API

/// Read-only HTTP observability surface.
pub mod api;
/// Core registry primitives (types, ledger, persistence, audit).
pub mod core;
/// Observability (metrics, structured logging helpers).
pub mod monitoring;
