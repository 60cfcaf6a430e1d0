//! Canonical text form of digest bytes as stored in realm properties: two
//! lowercase hex characters per byte, zero padded, no separators.

use super::digest::DigestError;

/// Formats raw digest bytes. Every byte is treated as an unsigned value, so
/// `0xff` renders as `"ff"` and `0x0a` as `"0a"`.
pub fn canonicalize(bytes: &[u8]) -> String {
    ::hex::encode(bytes)
}

/// Same as [`canonicalize`] for digests handed over in signed-byte form.
/// A signed `-1` is the byte `0xff`; it must not sign-extend into `ffffffff`.
pub fn canonicalize_signed(bytes: &[i8]) -> String {
    let unsigned: Vec<u8> = bytes.iter().map(|&b| b as u8).collect();
    canonicalize(&unsigned)
}

/// Parses hex text declared as an already-computed digest. Case is ignored and
/// surrounding whitespace trimmed; anything else that is not hex is rejected.
pub fn parse_digest(text: &str) -> Result<Vec<u8>, DigestError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(DigestError::MalformedDigest("empty digest".to_string()));
    }
    ::hex::decode(trimmed).map_err(|e| DigestError::MalformedDigest(format!("{e}")))
}

#[cfg(test)]
mod tests {
    use super::{canonicalize, canonicalize_signed, parse_digest};
    use crate::crypto::digest::DigestError;
    use proptest::prelude::*;

    #[test]
    fn high_byte_is_not_sign_extended() {
        assert_eq!(canonicalize(&[0xFF]), "ff");
        assert_eq!(canonicalize_signed(&[-1]), "ff");
        assert_eq!(canonicalize_signed(&[-128, 127]), "807f");
    }

    #[test]
    fn small_bytes_are_zero_padded() {
        assert_eq!(canonicalize(&[0x00, 0x0A]), "000a");
        assert_eq!(canonicalize(&[]), "");
    }

    #[test]
    fn parses_mixed_case_hex() {
        let bytes = parse_digest(" BCEEB7683a1ab35cc42e8e8bd2aea6c8\n").expect("valid hex");
        assert_eq!(canonicalize(&bytes), "bceeb7683a1ab35cc42e8e8bd2aea6c8");
    }

    #[test]
    fn rejects_non_hex_digest_text() {
        assert!(matches!(parse_digest("not-a-digest"), Err(DigestError::MalformedDigest(_))));
        assert!(matches!(parse_digest("abc"), Err(DigestError::MalformedDigest(_))));
        assert!(matches!(parse_digest("   "), Err(DigestError::MalformedDigest(_))));
    }

    proptest! {
        #[test]
        fn output_is_two_lowercase_hex_chars_per_byte(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            let text = canonicalize(&bytes);
            prop_assert_eq!(text.len(), bytes.len() * 2);
            prop_assert!(text.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
            prop_assert_eq!(parse_digest(&text).unwrap_or_default(), bytes.clone());
        }

        #[test]
        fn signed_and_unsigned_forms_agree(bytes in proptest::collection::vec(any::<i8>(), 0..32)) {
            let unsigned: Vec<u8> = bytes.iter().map(|&b| b as u8).collect();
            prop_assert_eq!(canonicalize_signed(&bytes), canonicalize(&unsigned));
        }
    }
}
