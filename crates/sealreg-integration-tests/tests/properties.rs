//! # Property Tests
//!
//! Any value in the ciphertext domain survives create → disclose → finalize
//! unchanged, and a second finalize always reports that same value.

use proptest::prelude::*;
use sealreg_fhe::ClearValue;
use sealreg_integration_tests::{request, rid, who, Fixture};
use sealreg_protocol::DisclosureOutcome;
use sealreg_registry::RegistryError;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn round_trip(value: u32) -> (DisclosureOutcome, DisclosureOutcome) {
    runtime().block_on(async {
        let fx = Fixture::in_memory();
        fx.creation.create(request("rec-p", "0xAA", value)).await.unwrap();
        let first = fx.disclosure.disclose(&rid("rec-p"), &who("0xAA")).await.unwrap();
        let second = fx.disclosure.disclose(&rid("rec-p"), &who("0xAA")).await.unwrap();
        (first, second)
    })
}

#[test]
fn domain_bounds_round_trip() {
    for value in [0, 1, u32::MAX - 1, u32::MAX] {
        let (first, second) = round_trip(value);
        assert_eq!(first, DisclosureOutcome::Finalized(ClearValue::from(value)));
        assert_eq!(second, DisclosureOutcome::AlreadyFinalized(ClearValue::from(value)));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn disclosed_value_equals_encrypted_value(value in any::<u32>()) {
        let (first, second) = round_trip(value);
        prop_assert_eq!(first, DisclosureOutcome::Finalized(ClearValue::from(value)));
        prop_assert_eq!(second.value(), ClearValue::from(value));
    }

    #[test]
    fn wire_encoding_finalizes_same_value(value in any::<u32>()) {
        runtime().block_on(async {
            let fx = Fixture::in_memory();
            let record = fx.creation.create(request("rec-w", "0xAA", value)).await.unwrap();
            let disclosure = sealreg_fhe::EncryptedValueCapability::request_disclosure(
                fx.coprocessor.as_ref(),
                record.encrypted_field(),
                &sealreg_fhe::Requester::from(who("0xAA")),
            )
            .await
            .unwrap();

            let encoded = disclosure.value.encode();
            let proof = disclosure.proof.to_bytes();
            let finalized = fx.registry.finalize_encoded(&rid("rec-w"), &encoded, &proof).unwrap();
            assert_eq!(finalized.disclosed_value(), Some(ClearValue::from(value)));

            let again = fx.registry.finalize_encoded(&rid("rec-w"), &encoded, &proof).unwrap_err();
            assert!(matches!(again, RegistryError::AlreadyFinalized { value: v, .. } if v == ClearValue::from(value)));
        });
    }
}
