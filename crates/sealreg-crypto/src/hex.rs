//! Lowercase hex encoding and strict decoding.

use sealreg_core::error::CryptoError;

/// Encode bytes as lowercase hex.
pub fn encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Decode a hex string (case-insensitive, optional `0x` prefix).
pub fn decode(hex: &str) -> Result<Vec<u8>, CryptoError> {
    let hex = hex.trim();
    let hex = hex
        .strip_prefix("0x")
        .or_else(|| hex.strip_prefix("0X"))
        .unwrap_or(hex);
    if hex.len() % 2 != 0 {
        return Err(CryptoError::Encoding(
            "hex string must have even length".to_string(),
        ));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            hex.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| CryptoError::Encoding(format!("invalid hex at position {i}")))
        })
        .collect()
}

/// Decode a hex string into exactly `N` bytes.
pub fn decode_array<const N: usize>(hex: &str) -> Result<[u8; N], CryptoError> {
    let bytes = decode(hex)?;
    <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| {
        CryptoError::Encoding(format!("expected {N} bytes, got {}", bytes.len()))
    })
}

/// First four bytes as hex, for log fields and `Debug` output.
pub fn prefix(bytes: &[u8]) -> String {
    encode(&bytes[..bytes.len().min(4)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode() {
        assert_eq!(encode(&[0x00, 0x8a, 0xff]), "008aff");
        assert_eq!(decode("008AFF").unwrap(), vec![0x00, 0x8a, 0xff]);
        assert_eq!(decode("0x0a").unwrap(), vec![0x0a]);
    }

    #[test]
    fn decode_rejects_bad_input() {
        assert!(decode("abc").is_err());
        assert!(decode("zz").is_err());
        assert!(decode("é1").is_err());
    }

    #[test]
    fn decode_array_checks_length() {
        let arr: [u8; 4] = decode_array("0000008a").unwrap();
        assert_eq!(u32::from_be_bytes(arr), 138);
        assert!(decode_array::<4>("00008a").is_err());
    }

    #[test]
    fn prefix_is_short() {
        assert_eq!(prefix(&[1, 2, 3, 4, 5, 6]), "01020304");
        assert_eq!(prefix(&[9]), "09");
    }
}
