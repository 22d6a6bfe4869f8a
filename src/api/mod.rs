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

//! Read-only HTTP observability surface.
//!
//! Anchoring happens through the library call surface; this API exposes the
//! registry for verification collaborators and operators only. Removing it
//! leaves core behavior unchanged.

use crate::core::registry::audit::{self, AuditError};
use crate::core::registry::ledger::RegistryError;
use crate::core::registry::store::{PersistentRegistry, StoreError};
use crate::core::types::{Document, DocumentId};
use crate::monitoring::metrics::Metrics;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::sync::Arc;

/// Shared handler state.
pub struct ApiContext {
    /// Service name reported in `/status`.
    pub service: String,
    /// Registry handle.
    pub registry: Arc<PersistentRegistry>,
    /// Metrics container.
    pub metrics: Arc<Metrics>,
}

/// Build the read-only router.
pub fn router(ctx: Arc<ApiContext>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/status", get(status))
        .route("/documents/:id", get(document))
        .route("/verify/:cid", get(verify))
        .route("/metrics", get(metrics_text))
        .with_state(ctx)
}

/// Handler-level errors mapped onto HTTP statuses.
#[derive(Debug)]
enum ApiError {
    NotFound,
    Integrity(AuditError),
    Internal,
}

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (code, message) = match self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, "document not found".to_string()),
            ApiError::Integrity(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("integrity sweep failed: {e}"),
            ),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error".to_string(),
            ),
        };
        let body = ErrorBody {
            status: "error",
            message,
        };
        (code, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Registry(RegistryError::NotFound) => ApiError::NotFound,
            _ => ApiError::Internal,
        }
    }
}

#[derive(Serialize)]
struct StatusBody {
    service: String,
    total: u64,
    unique_anchors: u64,
    digest: String,
    timestamp_regressions: u64,
}

#[derive(Serialize)]
struct DocumentBody {
    id: u64,
    name: String,
    cid: String,
    metadata: String,
    timestamp_ms: u64,
    anchored_by: String,
}

impl From<Document> for DocumentBody {
    fn from(doc: Document) -> Self {
        Self {
            id: doc.id.as_u64(),
            name: doc.name,
            cid: doc.cid,
            metadata: doc.metadata,
            timestamp_ms: doc.timestamp_ms,
            anchored_by: doc.anchored_by.to_hex(),
        }
    }
}

#[derive(Serialize)]
struct VerifyBody {
    exists: bool,
    id: u64,
}

async fn healthz() -> &'static str {
    "ok"
}

async fn status(State(ctx): State<Arc<ApiContext>>) -> Result<Json<StatusBody>, ApiError> {
    let snapshot = ctx.registry.snapshot()?;
    let report = audit::audit_ledger(&snapshot).map_err(|e| {
        ctx.metrics.audit_failures_total.inc();
        ApiError::Integrity(e)
    })?;
    Ok(Json(StatusBody {
        service: ctx.service.clone(),
        total: report.total,
        unique_anchors: report.unique_anchors,
        digest: report.digest_hex(),
        timestamp_regressions: report.timestamp_regressions,
    }))
}

async fn document(
    State(ctx): State<Arc<ApiContext>>,
    Path(id): Path<u64>,
) -> Result<Json<DocumentBody>, ApiError> {
    let doc = ctx.registry.get_document(DocumentId(id))?;
    Ok(Json(doc.into()))
}

async fn verify(
    State(ctx): State<Arc<ApiContext>>,
    Path(cid): Path<String>,
) -> Result<Json<VerifyBody>, ApiError> {
    let (exists, id) = ctx.registry.verify_document(&cid)?;
    Ok(Json(VerifyBody {
        exists,
        id: id.as_u64(),
    }))
}

async fn metrics_text(State(ctx): State<Arc<ApiContext>>) -> Result<String, ApiError> {
    let stats = ctx.registry.stats()?;
    ctx.metrics.sync_registry(&stats);

    let encoder = TextEncoder::new();
    let mut out = Vec::new();
    encoder
        .encode(&ctx.metrics.registry.gather(), &mut out)
        .map_err(|_| ApiError::Internal)?;
    String::from_utf8(out).map_err(|_| ApiError::Internal)
}
