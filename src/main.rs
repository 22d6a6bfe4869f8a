#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Docanchor service entrypoint (systemd-friendly).
//! Opens the registry, anchors configured framework documents, runs an
//! integrity sweep, and serves the read-only API.

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};

use docanchor::api::{self, ApiContext};
use docanchor::core::registry::audit;
use docanchor::core::registry::ledger::FRAMEWORK_CORE_ARITY;
use docanchor::core::registry::store::PersistentRegistry;
use docanchor::core::types::{
    AnchorId, FrameworkAnchorPolicy, HttpConfig, RegistrySettings, ServiceConfig, ServiceSettings,
};
use docanchor::monitoring::metrics::Metrics;

fn env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

// hex("docanchor-dev-owner"); local runs only, production sets its own.
const DEFAULT_OWNER_HEX: &str = "646f63616e63686f722d6465762d6f776e6572";

/// Resolve configuration: a TOML file named by `DOCANCHOR_CONFIG`, with
/// per-field env fallbacks otherwise.
fn load_config() -> anyhow::Result<ServiceConfig> {
    if let Ok(path) = std::env::var("DOCANCHOR_CONFIG") {
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("read config file {path}"))?;
        let cfg: ServiceConfig =
            toml::from_str(&raw).with_context(|| format!("parse config file {path}"))?;
        return Ok(cfg);
    }

    let policy = match env("DOCANCHOR_FRAMEWORK_ANCHOR", "owner").as_str() {
        "open" => FrameworkAnchorPolicy::Open,
        _ => FrameworkAnchorPolicy::Owner,
    };
    Ok(ServiceConfig {
        service: ServiceSettings {
            name: env("DOCANCHOR_SERVICE_NAME", "docanchor"),
            data_dir: env("DOCANCHOR_DATA_DIR", "./data"),
        },
        http: HttpConfig {
            listen_addr: env("DOCANCHOR_HTTP_ADDR", "127.0.0.1:9600"),
        },
        registry: RegistrySettings {
            owner_hex: env("DOCANCHOR_OWNER_HEX", DEFAULT_OWNER_HEX),
            framework_anchor: policy,
            framework_core_cids: Vec::new(),
        },
    })
}

/// Anchor the configured framework-core batch once, as the owner.
///
/// A registry that already holds all five cids is left alone; a registry
/// holding only some of them is an integrity problem surfaced as an error,
/// not something to patch around.
fn anchor_framework_core_if_configured(
    registry: &PersistentRegistry,
    owner: &AnchorId,
    cfg: &ServiceConfig,
    metrics: &Metrics,
) -> anyhow::Result<()> {
    let cids = &cfg.registry.framework_core_cids;
    if cids.is_empty() {
        return Ok(());
    }
    anyhow::ensure!(
        cids.len() == FRAMEWORK_CORE_ARITY,
        "registry.framework_core_cids expects exactly {FRAMEWORK_CORE_ARITY} entries, got {}",
        cids.len()
    );
    let batch: [&str; FRAMEWORK_CORE_ARITY] = [
        cids[0].as_str(),
        cids[1].as_str(),
        cids[2].as_str(),
        cids[3].as_str(),
        cids[4].as_str(),
    ];

    let mut already = 0usize;
    for cid in batch.iter() {
        let (exists, _) = registry.verify_document(cid)?;
        if exists {
            already += 1;
        }
    }
    if already == FRAMEWORK_CORE_ARITY {
        info!("framework core documents already anchored");
        return Ok(());
    }
    if already > 0 {
        anyhow::bail!(
            "{already} of {FRAMEWORK_CORE_ARITY} framework core cids already anchored; refusing a partial batch"
        );
    }

    let events = match registry.anchor_framework_core(owner, &batch) {
        Ok(events) => events,
        Err(e) => {
            metrics.anchor_rejected_total.inc();
            return Err(e).context("anchor framework core");
        }
    };
    metrics.anchored_total.inc_by(events.len() as u64);
    for ev in &events {
        info!(id = ev.id.as_u64(), name = %ev.name, cid = %ev.cid, "framework document anchored");
    }
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    warn!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .compact()
        .try_init();

    let cfg = load_config()?;
    let owner = AnchorId::from_hex(&cfg.registry.owner_hex)
        .context("registry.owner_hex is not valid non-empty hex")?;

    info!(service = %cfg.service.name, data_dir = %cfg.service.data_dir, owner = %owner, "docanchor starting");

    let metrics = Arc::new(Metrics::new().context("metrics init")?);
    let db_path = format!("{}/registry", cfg.service.data_dir);
    let registry = Arc::new(
        PersistentRegistry::open(&db_path, owner.clone(), cfg.registry.framework_anchor)
            .context("open registry")?,
    );

    anchor_framework_core_if_configured(&registry, &owner, &cfg, &metrics)?;

    // Startup sweep: surface corruption loudly, keep serving reads.
    let snapshot = registry.snapshot().context("registry snapshot")?;
    match audit::audit_ledger(&snapshot) {
        Ok(report) => info!(
            total = report.total,
            unique_anchors = report.unique_anchors,
            digest = %report.digest_hex(),
            timestamp_regressions = report.timestamp_regressions,
            "integrity sweep clean"
        ),
        Err(e) => {
            metrics.audit_failures_total.inc();
            error!(%e, "integrity sweep failed");
        }
    }
    metrics.sync_registry(&registry.stats().context("registry stats")?);

    let ctx = Arc::new(ApiContext {
        service: cfg.service.name.clone(),
        registry: registry.clone(),
        metrics: metrics.clone(),
    });
    let listener = tokio::net::TcpListener::bind(&cfg.http.listen_addr)
        .await
        .with_context(|| format!("bind {}", cfg.http.listen_addr))?;
    info!(addr = %cfg.http.listen_addr, "serving read-only registry API");
    axum::serve(listener, api::router(ctx))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serve")?;

    info!("shutdown complete");
    Ok(())
}
