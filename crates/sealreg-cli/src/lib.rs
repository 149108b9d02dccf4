//! # sealreg-cli — Command-Line Tool for the Sealed Registry
//!
//! ## Subcommands
//!
//! - `sealreg keygen` — fresh Ed25519 seed and public key.
//! - `sealreg demo` — create → disclose → finalize in process.
//! - `sealreg inspect` — list or show records in a snapshot file.
//! - `sealreg verify-snapshot` — check a snapshot's invariants.
//!
//! ```bash
//! sealreg keygen --output ./keys --prefix authority
//! sealreg --config registry.yaml demo --value 138
//! sealreg inspect registry.json --id rec-1 --reader public
//! sealreg verify-snapshot registry.json
//! ```

pub mod config;
pub mod demo;
pub mod keygen;
pub mod snapshot;
