//! # CLI Configuration
//!
//! Optional YAML file passed with `--config`. Field names match the API
//! service's environment variables:
//!
//! ```yaml
//! registryId: sealreg-local
//! coprocessorSeed: 0101…01   # 64 hex chars
//! authoritySeed: 0202…02
//! snapshotPath: ./registry.json
//! ```
//!
//! Absent seeds yield random keys for the lifetime of the command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sealreg_core::RegistryId;
use sealreg_crypto::Ed25519KeyPair;
use sealreg_registry::RegistryConfig;
use serde::{Deserialize, Serialize};

/// Registry id used when none is configured.
pub const DEFAULT_REGISTRY_ID: &str = "sealreg-local";

/// Contents of the `--config` file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CliConfig {
    #[serde(default)]
    pub registry_id: Option<String>,
    #[serde(default)]
    pub coprocessor_seed: Option<String>,
    #[serde(default)]
    pub authority_seed: Option<String>,
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
}

/// Key pairs and identifiers resolved from a [`CliConfig`].
pub struct ResolvedConfig {
    pub registry_id: RegistryId,
    pub coprocessor_key: Ed25519KeyPair,
    pub authority_key: Ed25519KeyPair,
    pub snapshot_path: Option<PathBuf>,
}

impl CliConfig {
    /// Read `path`, or the default configuration when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        serde_yaml::from_str(&text)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }

    /// Resolve identifiers and key pairs.
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        let registry_id = RegistryId::new(
            self.registry_id
                .clone()
                .unwrap_or_else(|| DEFAULT_REGISTRY_ID.to_string()),
        )
        .context("invalid registryId")?;
        Ok(ResolvedConfig {
            registry_id,
            coprocessor_key: key_pair(self.coprocessor_seed.as_deref(), "coprocessorSeed")?,
            authority_key: key_pair(self.authority_seed.as_deref(), "authoritySeed")?,
            snapshot_path: self.snapshot_path.clone(),
        })
    }
}

impl ResolvedConfig {
    /// Registry configuration trusting this configuration's public keys.
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            registry_id: self.registry_id.clone(),
            coprocessor_key: self.coprocessor_key.public_key(),
            disclosure_authority: self.authority_key.public_key(),
            snapshot_path: self.snapshot_path.clone(),
        }
    }
}

fn key_pair(seed: Option<&str>, field: &str) -> Result<Ed25519KeyPair> {
    match seed {
        Some(seed) => Ed25519KeyPair::from_seed_hex(seed).with_context(|| format!("invalid {field}")),
        None => {
            tracing::debug!(field, "no seed configured, generating a random key");
            Ok(Ed25519KeyPair::generate())
        }
    }
}
