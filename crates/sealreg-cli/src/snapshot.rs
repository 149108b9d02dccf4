//! # Snapshot Subcommands
//!
//! `inspect` lists or shows records from a snapshot file; `verify-snapshot`
//! checks the snapshot's invariants without starting a registry.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use sealreg_core::{ContentDigest, RecordId};
use sealreg_registry::{Reader, RecordView, Snapshot};
use sealreg_state::ReaderClass;

/// Arguments for `sealreg inspect`.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Snapshot file.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
    /// Show this record instead of listing ids.
    #[arg(long)]
    pub id: Option<String>,
    /// Reader class to filter metadata for.
    #[arg(long, default_value = "auditor")]
    pub reader: String,
}

/// Arguments for `sealreg verify-snapshot`.
#[derive(Args, Debug)]
pub struct VerifySnapshotArgs {
    /// Snapshot file.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

/// Counts reported by a successful verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotSummary {
    pub records: usize,
    pub finalized: usize,
    pub last_sequence: u64,
    pub digest: ContentDigest,
}

fn load(path: &Path) -> Result<Snapshot> {
    if !path.exists() {
        bail!("snapshot file not found: {}", path.display());
    }
    Ok(Snapshot::read(path)?)
}

/// Read and validate `path`.
pub fn verify(path: &Path) -> Result<SnapshotSummary> {
    let snapshot = load(path)?;
    snapshot
        .validate()
        .with_context(|| format!("snapshot {} failed validation", path.display()))?;
    Ok(SnapshotSummary {
        records: snapshot.records.len(),
        finalized: snapshot.records.iter().filter(|r| r.is_finalized()).count(),
        last_sequence: snapshot.last_sequence,
        digest: snapshot.digest()?,
    })
}

/// Render record `id` from `path` for a reader of `class`.
pub fn view(path: &Path, id: &str, class: ReaderClass) -> Result<RecordView> {
    let snapshot = load(path)?;
    let id = RecordId::new(id)?;
    let record = snapshot
        .records
        .iter()
        .find(|r| r.id() == &id)
        .with_context(|| format!("record {id} not in snapshot"))?;
    let reader = Reader {
        class,
        identity: None,
    };
    Ok(RecordView::new(record, &reader))
}

/// Execute `sealreg inspect`.
pub fn run_inspect(args: &InspectArgs) -> Result<u8> {
    let class = args.reader.parse::<ReaderClass>().map_err(anyhow::Error::msg)?;
    match &args.id {
        Some(id) => {
            let view = view(&args.file, id, class)?;
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        None => {
            let snapshot = load(&args.file)?;
            println!(
                "registry {} ({} records, last sequence {})",
                snapshot.registry_id,
                snapshot.records.len(),
                snapshot.last_sequence
            );
            for record in &snapshot.records {
                println!("  {}  {}  owner={}", record.id(), record.status(), record.owner());
            }
        }
    }
    Ok(0)
}

/// Execute `sealreg verify-snapshot`. Exit code 1 on an invalid snapshot.
pub fn run_verify_snapshot(args: &VerifySnapshotArgs) -> Result<u8> {
    match verify(&args.file) {
        Ok(summary) => {
            println!(
                "OK: {} records ({} finalized), last sequence {}",
                summary.records, summary.finalized, summary.last_sequence
            );
            println!("digest: {}", summary.digest);
            Ok(0)
        }
        Err(e) => {
            println!("FAIL: {e:#}");
            Ok(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealreg_core::{Identity, RegistryId, Timestamp};
    use sealreg_fhe::{ClearValue, Handle};
    use sealreg_state::{PublicMetadata, Record};

    fn record(id: &str, handle: u8) -> Record {
        Record::new(
            RecordId::new(id).unwrap(),
            Identity::new("0xAA").unwrap(),
            Handle::from_bytes([handle; 32]),
            PublicMetadata::from_pairs([("category", "loan"), ("restricted.branch", "north")])
                .unwrap(),
            Timestamp::now(),
        )
    }

    fn write(dir: &Path, records: Vec<Record>) -> PathBuf {
        let path = dir.join("snap.json");
        Snapshot::new(RegistryId::new("reg").unwrap(), 3, records)
            .write(&path)
            .unwrap();
        path
    }

    #[test]
    fn verify_counts_records() {
        let dir = tempfile::tempdir().unwrap();
        let mut done = record("rec-2", 2);
        done.finalize(ClearValue::from(5), Timestamp::now()).unwrap();
        let path = write(dir.path(), vec![record("rec-1", 1), done]);

        let summary = verify(&path).unwrap();
        assert_eq!(summary.records, 2);
        assert_eq!(summary.finalized, 1);
        assert_eq!(summary.last_sequence, 3);
        assert_eq!(summary.digest, Snapshot::read(&path).unwrap().digest().unwrap());
    }

    #[test]
    fn verify_rejects_shared_handles() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), vec![record("rec-1", 7), record("rec-2", 7)]);
        assert!(verify(&path).is_err());
        assert_eq!(
            run_verify_snapshot(&VerifySnapshotArgs { file: path }).unwrap(),
            1
        );
    }

    #[test]
    fn missing_file_reported() {
        let err = verify(Path::new("/nonexistent/snap.json")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn view_filters_for_public_reader() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), vec![record("rec-1", 1)]);
        let public = view(&path, "rec-1", ReaderClass::Public).unwrap();
        assert!(!public.public_metadata.contains_key("restricted.branch"));
        let auditor = view(&path, "rec-1", ReaderClass::Auditor).unwrap();
        assert_eq!(auditor.public_metadata["restricted.branch"], "north");
        assert!(view(&path, "ghost", ReaderClass::Auditor).is_err());
    }
}
