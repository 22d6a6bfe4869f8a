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

use crate::core::types::RegistryStats;
use prometheus::{IntCounter, IntGauge, Registry};
use thiserror::Error;

/// Metrics errors.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus")]
    Prom,
}

/// Metrics container.
#[derive(Clone)]
pub struct Metrics {
    /// Registry.
    pub registry: Registry,

    /// Anchored documents gauge.
    pub documents: IntGauge,
    /// Distinct anchoring identities gauge.
    pub unique_anchors: IntGauge,

    /// Documents anchored by this process.
    pub anchored_total: IntCounter,
    /// Rejected anchor attempts.
    pub anchor_rejected_total: IntCounter,
    /// Failed integrity sweeps.
    pub audit_failures_total: IntCounter,
}

impl Metrics {
    /// Create and register metrics.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let documents = IntGauge::new("docanchor_documents", "Anchored documents")
            .map_err(|_| MetricsError::Prom)?;
        let unique_anchors =
            IntGauge::new("docanchor_unique_anchors", "Distinct anchoring identities")
                .map_err(|_| MetricsError::Prom)?;

        let anchored_total = IntCounter::new(
            "docanchor_anchored_total",
            "Documents anchored by this process",
        )
        .map_err(|_| MetricsError::Prom)?;
        let anchor_rejected_total = IntCounter::new(
            "docanchor_anchor_rejected_total",
            "Rejected anchor attempts",
        )
        .map_err(|_| MetricsError::Prom)?;
        let audit_failures_total =
            IntCounter::new("docanchor_audit_failures_total", "Failed integrity sweeps")
                .map_err(|_| MetricsError::Prom)?;

        registry
            .register(Box::new(documents.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(unique_anchors.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(anchored_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(anchor_rejected_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(audit_failures_total.clone()))
            .map_err(|_| MetricsError::Prom)?;

        Ok(Self {
            registry,
            documents,
            unique_anchors,
            anchored_total,
            anchor_rejected_total,
            audit_failures_total,
        })
    }

    /// Point-in-time sync of the registry gauges.
    pub fn sync_registry(&self, stats: &RegistryStats) {
        self.documents.set(stats.total as i64);
        self.unique_anchors.set(stats.unique_anchors as i64);
    }
}
