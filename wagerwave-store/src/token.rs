//! Credential token codec.
//!
//! A token is `base64(shift(base64(password)))`, where `shift` rotates every
//! printable ASCII byte (32..=126) forward by three places, wrapping within
//! that range. It hides the password from a casual glance at the address
//! bar and nothing more.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;

/// Rotation applied to printable ASCII.
const SHIFT: u8 = 3;

const PRINTABLE_FIRST: u8 = 32;
const PRINTABLE_LAST: u8 = 126;
const PRINTABLE_SPAN: u8 = PRINTABLE_LAST - PRINTABLE_FIRST + 1;

/// Decoder that accepts what a browser's `atob` accepts: optional padding
/// and non-canonical trailing bits. Whitespace is stripped beforehand.
const FORGIVING: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Token is not valid base64: {0}")]
    InvalidToken(base64::DecodeError),
    #[error("Token payload is not valid base64: {0}")]
    InvalidPayload(base64::DecodeError),
    #[error("Token does not decode to text")]
    NotText,
}

/// Encode a plaintext credential into a URL token.
pub fn encode(plaintext: &str) -> String {
    let inner = STANDARD.encode(plaintext.as_bytes());
    let shifted: Vec<u8> = inner.bytes().map(shift_forward).collect();
    STANDARD.encode(shifted)
}

/// Decode a URL token back into the plaintext credential.
pub fn decode(token: &str) -> Result<String, DecodeError> {
    let shifted = forgiving_decode(token.as_bytes()).map_err(DecodeError::InvalidToken)?;
    let inner: Vec<u8> = shifted.into_iter().map(shift_back).collect();
    let plain = forgiving_decode(&inner).map_err(DecodeError::InvalidPayload)?;
    String::from_utf8(plain).map_err(|_| DecodeError::NotText)
}

fn forgiving_decode(input: &[u8]) -> Result<Vec<u8>, base64::DecodeError> {
    let compact: Vec<u8> = input
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    FORGIVING.decode(compact)
}

fn shift_forward(byte: u8) -> u8 {
    if (PRINTABLE_FIRST..=PRINTABLE_LAST).contains(&byte) {
        (byte - PRINTABLE_FIRST + SHIFT) % PRINTABLE_SPAN + PRINTABLE_FIRST
    } else {
        byte
    }
}

fn shift_back(byte: u8) -> u8 {
    if (PRINTABLE_FIRST..=PRINTABLE_LAST).contains(&byte) {
        (byte - PRINTABLE_FIRST + PRINTABLE_SPAN - SHIFT) % PRINTABLE_SPAN + PRINTABLE_FIRST
    } else {
        byte
    }
}
