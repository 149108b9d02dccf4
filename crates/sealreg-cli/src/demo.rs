//! # Demo Subcommand
//!
//! Runs create → disclose → finalize in process against the simulated
//! coprocessor and prints each record transition as the registry announces
//! it. A second disclosure shows the `AlreadyFinalized` outcome.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use sealreg_core::{Identity, RecordId};
use sealreg_fhe::SimulatedCoprocessor;
use sealreg_protocol::{CreationProtocol, CreationRequest, DisclosureFlow, DisclosureOutcome};
use sealreg_registry::{Registry, RegistryEvent};
use tokio::sync::broadcast::error::TryRecvError;

use crate::config::ResolvedConfig;

/// Arguments for `sealreg demo`.
#[derive(Args, Debug)]
pub struct DemoArgs {
    /// Record id. Defaults to a fresh `rec-<uuid>`.
    #[arg(long)]
    pub id: Option<String>,
    /// Owner identity.
    #[arg(long, default_value = "0xAA")]
    pub owner: String,
    /// Cleartext to encrypt and later disclose.
    #[arg(long, default_value_t = 138)]
    pub value: u32,
    /// Public `category` field of the record.
    #[arg(long, default_value = "demo")]
    pub category: String,
}

/// What the demo observed.
#[derive(Debug)]
pub struct DemoReport {
    pub record_id: RecordId,
    pub first: DisclosureOutcome,
    pub second: DisclosureOutcome,
    pub events: Vec<RegistryEvent>,
}

/// Run the scenario and collect its events.
pub async fn run_scenario(config: ResolvedConfig, args: &DemoArgs) -> Result<DemoReport> {
    let registry = Arc::new(Registry::open(config.registry_config()).context("opening registry")?);
    let coprocessor = Arc::new(SimulatedCoprocessor::new(
        config.registry_id,
        config.coprocessor_key,
        config.authority_key,
    ));
    let mut events = registry.subscribe();

    let creation = CreationProtocol::new(registry.clone(), coprocessor.clone());
    let disclosure = DisclosureFlow::new(registry.clone(), coprocessor);

    let id = args
        .id
        .clone()
        .unwrap_or_else(|| format!("rec-{}", uuid::Uuid::new_v4()));
    let record = creation
        .create(CreationRequest {
            id,
            caller: args.owner.clone(),
            value: i64::from(args.value),
            public_fields: BTreeMap::from([("category".to_string(), args.category.clone())]),
        })
        .await?;
    tracing::info!(record_id = %record.id(), "demo record created");

    let requester = Identity::new(args.owner.clone())?;
    let first = disclosure.disclose(record.id(), &requester).await?;
    let second = disclosure.disclose(record.id(), &requester).await?;

    let mut seen = Vec::new();
    loop {
        match events.try_recv() {
            Ok(event) => seen.push(event),
            Err(TryRecvError::Lagged(n)) => tracing::warn!(skipped = n, "event receiver lagged"),
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }

    Ok(DemoReport {
        record_id: record.id().clone(),
        first,
        second,
        events: seen,
    })
}

/// Execute `sealreg demo`.
pub fn run_demo(config: ResolvedConfig, args: &DemoArgs) -> Result<u8> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let report = runtime.block_on(run_scenario(config, args))?;

    for event in &report.events {
        println!("{}", serde_json::to_string(event)?);
    }
    println!(
        "record {}: first disclosure {:?}, second disclosure {:?}",
        report.record_id, report.first, report.second
    );
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CliConfig;
    use sealreg_fhe::ClearValue;
    use sealreg_registry::EventKind;

    fn args(id: &str) -> DemoArgs {
        DemoArgs {
            id: Some(id.to_string()),
            owner: "0xAA".to_string(),
            value: 138,
            category: "demo".to_string(),
        }
    }

    #[tokio::test]
    async fn scenario_finalizes_once() {
        let config = CliConfig::default().resolve().unwrap();
        let report = run_scenario(config, &args("rec-1")).await.unwrap();

        assert_eq!(report.first, DisclosureOutcome::Finalized(ClearValue::from(138)));
        assert_eq!(report.second, DisclosureOutcome::AlreadyFinalized(ClearValue::from(138)));
        assert_eq!(report.events.len(), 2);
        assert!(matches!(report.events[0].kind, EventKind::RecordCreated { .. }));
        assert!(matches!(
            report.events[1].kind,
            EventKind::Disclosed { disclosed_value, .. } if disclosed_value == ClearValue::from(138)
        ));
    }

    #[tokio::test]
    async fn scenario_persists_when_snapshot_configured() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        let config = CliConfig {
            snapshot_path: Some(path.clone()),
            ..CliConfig::default()
        };
        run_scenario(config.resolve().unwrap(), &args("rec-1")).await.unwrap();

        let snapshot = sealreg_registry::Snapshot::read(&path).unwrap();
        assert_eq!(snapshot.records.len(), 1);
        assert!(snapshot.records[0].is_finalized());
    }
}
