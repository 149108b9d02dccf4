//! # Simulated Coprocessor
//!
//! In-process [`EncryptedValueCapability`] with real Ed25519 proofs. The
//! "encryption" is a keyed mask, which is enough to keep cleartexts out of
//! the registry and out of handles while exercising every path of the
//! protocol: latency, unavailability, access control and forged proofs.
//!
//! ```text
//! nonce      16 random bytes
//! keystream  H("sealreg/sim/keystream", secret, nonce)
//! masked     value_be32 XOR keystream[..4]
//! handle     H("sealreg/sim/handle", registry, owner, nonce, masked)
//! ```
//!
//! The ciphertext table `(handle -> nonce, masked, binding)` lives here and
//! nowhere else.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use rand::RngCore;
use sealreg_core::{Identity, RegistryId};
use sealreg_crypto::{tagged_hash, Ed25519KeyPair};

use crate::capability::{
    CapabilityError, Disclosure, EncryptedInput, EncryptedValueCapability, Requester,
};
use crate::handle::{ClearValue, Handle, HandleBinding};
use crate::proof::{disclosure_statement, input_statement, DisclosureProof, InputProof, ProofVerifier};

const KEYSTREAM_DOMAIN: &str = "sealreg/sim/keystream";
const HANDLE_DOMAIN: &str = "sealreg/sim/handle";

/// Tunables for the simulated coprocessor.
#[derive(Debug, Clone, Default)]
pub struct SimulatedConfig {
    /// Delay applied before every `encrypt` and `request_disclosure`.
    pub latency: Duration,
}

/// One-shot misbehaviour applied to the next disclosure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisclosureFault {
    /// Report `value + 1` while signing the true value.
    WrongValue,
    /// Sign with a key that is not the designated authority.
    ForeignAuthority,
    /// Flip one bit of the signature.
    CorruptSignature,
    /// Fail with `Unavailable` after the latency elapses.
    Unavailable,
}

#[derive(Debug, Clone)]
struct StoredCiphertext {
    nonce: [u8; 16],
    masked: [u8; 4],
    binding: HandleBinding,
}

/// In-process coprocessor holding the coprocessor and disclosure-authority
/// key pairs.
pub struct SimulatedCoprocessor {
    registry: RegistryId,
    coprocessor_key: Ed25519KeyPair,
    authority_key: Ed25519KeyPair,
    secret: [u8; 32],
    config: SimulatedConfig,
    ciphertexts: RwLock<HashMap<Handle, StoredCiphertext>>,
    grants: RwLock<HashMap<Handle, HashSet<Identity>>>,
    fault: Mutex<Option<DisclosureFault>>,
    online: AtomicBool,
}

impl std::fmt::Debug for SimulatedCoprocessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedCoprocessor")
            .field("registry", &self.registry)
            .field("coprocessor_key", &self.coprocessor_key.public_key())
            .field("authority_key", &self.authority_key.public_key())
            .field("ciphertexts", &self.ciphertexts.read().len())
            .field("online", &self.online.load(Ordering::SeqCst))
            .finish()
    }
}

impl SimulatedCoprocessor {
    /// Coprocessor serving `registry`, signing with the given key pairs.
    pub fn new(
        registry: RegistryId,
        coprocessor_key: Ed25519KeyPair,
        authority_key: Ed25519KeyPair,
    ) -> Self {
        Self {
            registry,
            coprocessor_key,
            authority_key,
            secret: Ed25519KeyPair::random_seed(),
            config: SimulatedConfig::default(),
            ciphertexts: RwLock::new(HashMap::new()),
            grants: RwLock::new(HashMap::new()),
            fault: Mutex::new(None),
            online: AtomicBool::new(true),
        }
    }

    /// Coprocessor with fresh random key pairs.
    pub fn random(registry: RegistryId) -> Self {
        Self::new(registry, Ed25519KeyPair::generate(), Ed25519KeyPair::generate())
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: SimulatedConfig) -> Self {
        self.config = config;
        self
    }

    /// Registry this coprocessor attests disclosures for by default.
    pub fn registry_id(&self) -> &RegistryId {
        &self.registry
    }

    /// Take the coprocessor online or offline.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Apply `fault` to the next disclosure only.
    pub fn inject_fault(&self, fault: DisclosureFault) {
        *self.fault.lock() = Some(fault);
    }

    /// Permit `identity` to request disclosure of `handle`.
    pub fn allow(&self, handle: &Handle, identity: Identity) -> Result<(), CapabilityError> {
        if !self.ciphertexts.read().contains_key(handle) {
            return Err(CapabilityError::UnknownHandle(handle.short()));
        }
        self.grants.write().entry(*handle).or_default().insert(identity);
        Ok(())
    }

    /// Number of ciphertexts held.
    pub fn ciphertext_count(&self) -> usize {
        self.ciphertexts.read().len()
    }

    async fn simulate_round_trip(&self) -> Result<(), CapabilityError> {
        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }
        if !self.online.load(Ordering::SeqCst) {
            return Err(CapabilityError::Unavailable(
                "simulated coprocessor is offline".to_string(),
            ));
        }
        Ok(())
    }

    fn keystream(&self, nonce: &[u8; 16]) -> [u8; 32] {
        tagged_hash(KEYSTREAM_DOMAIN, &[&self.secret, nonce])
    }

    fn may_disclose(&self, handle: &Handle, stored: &StoredCiphertext, requester: &Requester) -> bool {
        match requester {
            Requester::Registry(registry) => *registry == stored.binding.registry,
            Requester::Identity(identity) => {
                *identity == stored.binding.owner
                    || self
                        .grants
                        .read()
                        .get(handle)
                        .is_some_and(|allowed| allowed.contains(identity))
            }
        }
    }
}

fn xor4(a: [u8; 4], key: &[u8; 32]) -> [u8; 4] {
    [a[0] ^ key[0], a[1] ^ key[1], a[2] ^ key[2], a[3] ^ key[3]]
}

#[async_trait]
impl EncryptedValueCapability for SimulatedCoprocessor {
    async fn encrypt(
        &self,
        value: ClearValue,
        binding: &HandleBinding,
    ) -> Result<EncryptedInput, CapabilityError> {
        self.simulate_round_trip().await?;

        let mut nonce = [0u8; 16];
        rand::rngs::OsRng.fill_bytes(&mut nonce);
        let masked = xor4(value.encode(), &self.keystream(&nonce));
        let handle = Handle::from_bytes(tagged_hash(
            HANDLE_DOMAIN,
            &[
                binding.registry.as_str().as_bytes(),
                binding.owner.as_str().as_bytes(),
                &nonce,
                &masked,
            ],
        ));
        if !handle.is_well_formed() {
            return Err(CapabilityError::Internal("derived the zero handle".to_string()));
        }

        let statement = input_statement(&handle, binding)
            .map_err(|e| CapabilityError::Internal(e.to_string()))?;
        let proof = InputProof(self.coprocessor_key.sign(&statement));

        self.ciphertexts.write().insert(
            handle,
            StoredCiphertext {
                nonce,
                masked,
                binding: binding.clone(),
            },
        );
        tracing::debug!(
            handle = %handle.short(),
            registry = %binding.registry,
            owner = %binding.owner,
            "simulated coprocessor issued handle"
        );
        Ok(EncryptedInput { handle, proof })
    }

    async fn request_disclosure(
        &self,
        handle: &Handle,
        requester: &Requester,
    ) -> Result<Disclosure, CapabilityError> {
        self.simulate_round_trip().await?;

        let stored = self
            .ciphertexts
            .read()
            .get(handle)
            .cloned()
            .ok_or_else(|| CapabilityError::UnknownHandle(handle.short()))?;
        if !self.may_disclose(handle, &stored, requester) {
            tracing::warn!(
                handle = %handle.short(),
                requester = %requester,
                "disclosure refused by access list"
            );
            return Err(CapabilityError::Unauthorized {
                handle: handle.short(),
                identity: requester.to_string(),
            });
        }

        let value = ClearValue::from(u32::from_be_bytes(xor4(
            stored.masked,
            &self.keystream(&stored.nonce),
        )));
        let statement = disclosure_statement(&stored.binding.registry, handle, value)
            .map_err(|e| CapabilityError::Internal(e.to_string()))?;

        let fault = self.fault.lock().take();
        let disclosure = match fault {
            None => Disclosure {
                value,
                proof: DisclosureProof {
                    authority: self.authority_key.public_key(),
                    signature: self.authority_key.sign(&statement),
                },
            },
            Some(DisclosureFault::WrongValue) => Disclosure {
                value: ClearValue::from(value.get().wrapping_add(1)),
                proof: DisclosureProof {
                    authority: self.authority_key.public_key(),
                    signature: self.authority_key.sign(&statement),
                },
            },
            Some(DisclosureFault::ForeignAuthority) => {
                let rogue = Ed25519KeyPair::generate();
                Disclosure {
                    value,
                    proof: DisclosureProof {
                        authority: rogue.public_key(),
                        signature: rogue.sign(&statement),
                    },
                }
            }
            Some(DisclosureFault::CorruptSignature) => {
                let mut signature = self.authority_key.sign(&statement);
                signature.0[0] ^= 0x01;
                Disclosure {
                    value,
                    proof: DisclosureProof {
                        authority: self.authority_key.public_key(),
                        signature,
                    },
                }
            }
            Some(DisclosureFault::Unavailable) => {
                return Err(CapabilityError::Unavailable(
                    "injected disclosure failure".to_string(),
                ));
            }
        };
        tracing::debug!(handle = %handle.short(), requester = %requester, "disclosure issued");
        Ok(disclosure)
    }

    fn proof_verifier(&self) -> ProofVerifier {
        ProofVerifier::new(
            self.coprocessor_key.public_key(),
            self.authority_key.public_key(),
        )
    }

    fn registry(&self) -> &RegistryId {
        &self.registry
    }
}
