//! Content-hash identifiers for detections: md5 (16 bytes) and sha256 (32 bytes).
//!
//! The hashes themselves are computed by the (out-of-scope) ingestion layer;
//! this module only owns their in-memory representation and hex round-trip.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Md5Hash(pub [u8; 16]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Sha256Hash(pub [u8; 32]);

#[derive(Debug, thiserror::Error)]
pub enum HashParseError {
    #[error("expected {expected} hex chars, got {actual}")]
    WrongLength { expected: usize, actual: usize },
    #[error("invalid hex digit in {0:?}")]
    InvalidHex(String),
}

fn decode_hex<const N: usize>(s: &str) -> Result<[u8; N], HashParseError> {
    if s.len() != N * 2 {
        return Err(HashParseError::WrongLength {
            expected: N * 2,
            actual: s.len(),
        });
    }

    let mut out = [0u8; N];
    for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
        let hi = (chunk[0] as char)
            .to_digit(16)
            .ok_or_else(|| HashParseError::InvalidHex(s.to_string()))?;
        let lo = (chunk[1] as char)
            .to_digit(16)
            .ok_or_else(|| HashParseError::InvalidHex(s.to_string()))?;
        out[i] = ((hi << 4) | lo) as u8;
    }
    Ok(out)
}

fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

impl Md5Hash {
    pub fn from_hex(s: &str) -> Result<Self, HashParseError> {
        decode_hex::<16>(s.trim().to_ascii_lowercase().as_str()).map(Md5Hash)
    }
}

impl Sha256Hash {
    pub fn from_hex(s: &str) -> Result<Self, HashParseError> {
        decode_hex::<32>(s.trim().to_ascii_lowercase().as_str()).map(Sha256Hash)
    }
}

impl fmt::Display for Md5Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", encode_hex(&self.0))
    }
}

impl fmt::Display for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", encode_hex(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn md5_round_trips_through_hex() {
        let hex = "d41d8cd98f00b204e9800998ecf8427e";
        let h = Md5Hash::from_hex(hex).unwrap();
        assert_eq!(h.to_string(), hex);
    }

    #[test]
    fn sha256_round_trips_through_hex() {
        let hex = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b85";
        let h = Sha256Hash::from_hex(hex).unwrap();
        assert_eq!(h.to_string(), hex);
    }

    #[test]
    fn wrong_length_is_rejected() {
        assert!(Md5Hash::from_hex("abcd").is_err());
    }

    #[test]
    fn invalid_hex_digit_is_rejected() {
        let bad = "zz".repeat(16);
        assert!(Md5Hash::from_hex(&bad).is_err());
    }
}
