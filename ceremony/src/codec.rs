//! Binary codec for ceremony payloads.
//!
//! Challenges, user handles and credential ids travel as url-safe base64
//! without padding. Platform credential APIs want raw bytes.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use thiserror::Error;

/// Url-safe alphabet, never pads on encode, accepts input with or without
/// padding on decode.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Malformed base64url text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid base64url payload: {0}")]
pub struct CodecError(#[from] base64::DecodeError);

/// Decode url-safe base64 text into bytes.
///
/// Missing padding is tolerated. Standard-alphabet `+` and `/` are accepted
/// as well.
pub fn decode(text: &str) -> Result<Vec<u8>, CodecError> {
    let normalized: String = text
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    Ok(URL_SAFE_LENIENT.decode(normalized)?)
}

/// Encode bytes as url-safe base64 without padding.
pub fn encode(bytes: &[u8]) -> String {
    URL_SAFE_LENIENT.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_without_padding() {
        assert_eq!(encode(b"hello"), "aGVsbG8");
        assert_eq!(encode(b""), "");
        assert_eq!(encode(&[0xfb, 0xff]), "-_8");
    }

    #[test]
    fn decodes_unpadded_and_padded() {
        assert_eq!(decode("aGVsbG8").unwrap(), b"hello");
        assert_eq!(decode("aGVsbG8=").unwrap(), b"hello");
        assert_eq!(decode("-_8").unwrap(), vec![0xfb, 0xff]);
    }

    #[test]
    fn accepts_standard_alphabet_characters() {
        assert_eq!(decode("+/8").unwrap(), vec![0xfb, 0xff]);
    }

    #[test]
    fn malformed_input_fails() {
        assert!(decode("a").is_err());
        assert!(decode("not base64!").is_err());
    }
}
