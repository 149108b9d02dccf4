//! # Application State & Configuration
//!
//! [`AppState`] is shared with every handler through axum's `State`
//! extractor. The registry carries its own synchronization, so the state is
//! cheap to clone.
//!
//! Configuration comes from the environment:
//!
//! | variable | meaning |
//! |---|---|
//! | `PORT` | listen port, default 8080 |
//! | `AUTH_TOKEN` | bearer secret; unset disables auth |
//! | `SEALREG_REGISTRY_ID` | registry identifier, default `sealreg-local` |
//! | `SEALREG_COPROCESSOR_SEED` | 64-hex Ed25519 seed of the coprocessor key |
//! | `SEALREG_AUTHORITY_SEED` | 64-hex Ed25519 seed of the disclosure authority |
//! | `SEALREG_SNAPSHOT_PATH` | snapshot file; unset keeps state in memory |

use std::path::PathBuf;
use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use sealreg_core::RegistryId;
use sealreg_crypto::{Ed25519KeyPair, Ed25519PublicKey};
use sealreg_registry::{Registry, RegistryConfig};
use thiserror::Error;

/// Registry id used when `SEALREG_REGISTRY_ID` is unset.
pub const DEFAULT_REGISTRY_ID: &str = "sealreg-local";

/// Errors loading configuration from the environment.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A variable is set but unusable.
    #[error("{var}: {reason}")]
    Invalid {
        var: &'static str,
        reason: String,
    },
}

/// HTTP server configuration.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind.
    pub port: u16,
    /// Bearer secret. `None` disables authentication.
    pub auth_token: Option<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
        }
    }
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Load through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup("PORT") {
            Some(p) => p.trim().parse().map_err(|e| ConfigError::Invalid {
                var: "PORT",
                reason: format!("{e}"),
            })?,
            None => 8080,
        };
        let auth_token = lookup("AUTH_TOKEN").filter(|t| !t.is_empty());
        Ok(Self { port, auth_token })
    }
}

/// Build a [`RegistryConfig`] from the process environment.
pub fn registry_config_from_env() -> Result<RegistryConfig, ConfigError> {
    registry_config_from_lookup(|k| std::env::var(k).ok())
}

/// Build a [`RegistryConfig`] through `lookup`. Absent seeds produce random
/// development keys with a warning; proofs signed under them will not
/// survive a restart.
pub fn registry_config_from_lookup(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<RegistryConfig, ConfigError> {
    let registry_id = lookup("SEALREG_REGISTRY_ID").unwrap_or_else(|| DEFAULT_REGISTRY_ID.into());
    let registry_id = RegistryId::new(registry_id).map_err(|e| ConfigError::Invalid {
        var: "SEALREG_REGISTRY_ID",
        reason: e.to_string(),
    })?;

    Ok(RegistryConfig {
        registry_id,
        coprocessor_key: public_key_from_seed(&lookup, "SEALREG_COPROCESSOR_SEED")?,
        disclosure_authority: public_key_from_seed(&lookup, "SEALREG_AUTHORITY_SEED")?,
        snapshot_path: lookup("SEALREG_SNAPSHOT_PATH")
            .filter(|p| !p.is_empty())
            .map(PathBuf::from),
    })
}

fn public_key_from_seed(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Ed25519PublicKey, ConfigError> {
    match lookup(var) {
        Some(seed) => Ed25519KeyPair::from_seed_hex(&seed)
            .map(|k| k.public_key())
            .map_err(|e| ConfigError::Invalid {
                var,
                reason: e.to_string(),
            }),
        None => {
            let key = Ed25519KeyPair::generate().public_key();
            tracing::warn!(
                var,
                public_key = %key.to_hex(),
                "seed not set, using a random development key"
            );
            Ok(key)
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// The registry served by this process.
    pub registry: Arc<Registry>,
    /// Server configuration.
    pub config: AppConfig,
    /// Renders `/metrics` when a Prometheus recorder is installed.
    pub prometheus: Option<PrometheusHandle>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .field("prometheus", &self.prometheus.is_some())
            .finish()
    }
}

impl AppState {
    /// State over `registry` without a metrics recorder.
    pub fn new(registry: Arc<Registry>, config: AppConfig) -> Self {
        Self {
            registry,
            config,
            prometheus: None,
        }
    }

    /// Serve `/metrics` from `handle`.
    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| vars.get(k).cloned()
    }

    #[test]
    fn app_config_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 8080);
        assert!(config.auth_token.is_none());
    }

    #[test]
    fn app_config_reads_port_and_token() {
        let config =
            AppConfig::from_lookup(lookup(&[("PORT", "9090"), ("AUTH_TOKEN", "s3cret")])).unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.auth_token.as_deref(), Some("s3cret"));
        assert!(!format!("{config:?}").contains("s3cret"));
    }

    #[test]
    fn bad_port_rejected() {
        assert!(AppConfig::from_lookup(lookup(&[("PORT", "eighty")])).is_err());
    }

    #[test]
    fn seeds_determine_keys() {
        let seed = "11".repeat(32);
        let config = registry_config_from_lookup(lookup(&[
            ("SEALREG_REGISTRY_ID", "reg-a"),
            ("SEALREG_COPROCESSOR_SEED", &seed),
            ("SEALREG_AUTHORITY_SEED", &seed),
            ("SEALREG_SNAPSHOT_PATH", "/tmp/reg-a.json"),
        ]))
        .unwrap();
        let expected = Ed25519KeyPair::from_seed(&[0x11; 32]).public_key();
        assert_eq!(config.registry_id.as_str(), "reg-a");
        assert_eq!(config.coprocessor_key, expected);
        assert_eq!(config.disclosure_authority, expected);
        assert_eq!(config.snapshot_path, Some(PathBuf::from("/tmp/reg-a.json")));
    }

    #[test]
    fn missing_seeds_fall_back_to_random_keys() {
        let config = registry_config_from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.registry_id.as_str(), DEFAULT_REGISTRY_ID);
        assert_ne!(config.coprocessor_key, config.disclosure_authority);
        assert!(config.snapshot_path.is_none());
    }

    #[test]
    fn malformed_seed_rejected() {
        let err = registry_config_from_lookup(lookup(&[("SEALREG_AUTHORITY_SEED", "abc")]))
            .unwrap_err();
        assert!(err.to_string().starts_with("SEALREG_AUTHORITY_SEED"));
    }
}
