//! # Keygen Subcommand
//!
//! Prints a fresh Ed25519 seed and its public key. The seed is what the
//! API's `SEALREG_*_SEED` variables and the config file's seed fields take.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use sealreg_crypto::{hex, Ed25519KeyPair};

/// Arguments for `sealreg keygen`.
#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Also write `<prefix>.seed` and `<prefix>.pub` into this directory.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
    /// Filename prefix for written keys.
    #[arg(long, default_value = "sealreg")]
    pub prefix: String,
}

/// A generated seed and its public key, both hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedKey {
    pub seed_hex: String,
    pub public_key_hex: String,
}

/// Generate a key.
pub fn generate() -> GeneratedKey {
    let seed = Ed25519KeyPair::random_seed();
    GeneratedKey {
        seed_hex: hex::encode(&seed),
        public_key_hex: Ed25519KeyPair::from_seed(&seed).public_key().to_hex(),
    }
}

/// Write `key` as `<prefix>.seed` and `<prefix>.pub` under `dir`.
pub fn write_key(key: &GeneratedKey, dir: &Path, prefix: &str) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory: {}", dir.display()))?;
    let seed_path = dir.join(format!("{prefix}.seed"));
    let pub_path = dir.join(format!("{prefix}.pub"));
    std::fs::write(&seed_path, &key.seed_hex)
        .with_context(|| format!("failed to write seed: {}", seed_path.display()))?;
    std::fs::write(&pub_path, &key.public_key_hex)
        .with_context(|| format!("failed to write public key: {}", pub_path.display()))?;
    Ok((seed_path, pub_path))
}

/// Execute `sealreg keygen`.
pub fn run_keygen(args: &KeygenArgs) -> Result<u8> {
    let key = generate();
    println!("seed:       {}", key.seed_hex);
    println!("public key: {}", key.public_key_hex);

    if let Some(dir) = &args.output {
        let (seed_path, pub_path) = write_key(&key, dir, &args.prefix)?;
        println!("OK: wrote {} and {}", seed_path.display(), pub_path.display());
    }
    Ok(0)
}
