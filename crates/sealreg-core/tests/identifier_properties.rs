//! Property tests for identifier validation and canonical statement bytes.

use proptest::prelude::*;
use sealreg_core::{sha256_digest, CanonicalBytes, Identity, RecordId, RegistryId};

proptest! {
    #[test]
    fn printable_ascii_identifiers_are_accepted(s in "[!-~]{1,128}") {
        prop_assert!(RecordId::new(s.clone()).is_ok());
        prop_assert!(Identity::new(s.clone()).is_ok());
        prop_assert!(RegistryId::new(s).is_ok());
    }

    #[test]
    fn identifiers_with_spaces_are_rejected(a in "[a-z]{1,20}", b in "[a-z]{1,20}") {
        let joined = format!("{a} {b}");
        prop_assert!(RecordId::new(joined).is_err());
    }

    #[test]
    fn key_order_does_not_change_statement_digest(v in any::<u32>(), h in "[0-9a-f]{64}") {
        let forward = serde_json::json!({"handle": h, "value": v, "registry": "r"});
        let mut reversed = serde_json::Map::new();
        reversed.insert("registry".into(), serde_json::json!("r"));
        reversed.insert("value".into(), serde_json::json!(v));
        reversed.insert("handle".into(), serde_json::json!(h));
        let a = sha256_digest(&CanonicalBytes::new(&forward).unwrap());
        let b = sha256_digest(&CanonicalBytes::new(&serde_json::Value::Object(reversed)).unwrap());
        prop_assert_eq!(a, b);
    }
}
