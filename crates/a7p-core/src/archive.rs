//! Archive container codec.
//!
//! An `.a7p` file is a 32 character lowercase hex MD5 digest followed by the
//! serialized payload it covers:
//!
//! ```text
//! +----------------------------------+---------------------------+
//! | md5(payload) as 32 ASCII hex     | protobuf `Payload` bytes  |
//! +----------------------------------+---------------------------+
//! ```
//!
//! [`Archive::open`] splits the two parts without trusting either of them: a
//! prefix that is not hex is kept as a [`StoredChecksum::Malformed`] value and
//! simply never matches. Checking the digest produces a
//! [`VerificationResult`] value rather than an error so the caller decides
//! whether a mismatch is fatal or a recovery trigger.

use crate::error::{Error, Result};
use bytes::Bytes;
use md5::{Digest, Md5};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, trace};

/// Length of the hex checksum prefix in bytes
pub const CHECKSUM_HEX_LEN: usize = 32;

/// 128-bit MD5 digest of a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Checksum([u8; 16]);

impl Checksum {
    /// Computes the checksum of the exact payload byte sequence
    pub fn of(payload: &[u8]) -> Self {
        let mut hasher = Md5::new();
        hasher.update(payload);
        let mut out = [0u8; 16];
        out.copy_from_slice(&hasher.finalize());
        Self(out)
    }

    /// Wraps raw digest bytes
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Returns the raw digest bytes
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Returns the digest as 32 lowercase hex characters
    pub fn to_hex(&self) -> String {
        self.to_string()
    }

    fn from_hex(hex: &[u8]) -> Result<Self> {
        if hex.len() != CHECKSUM_HEX_LEN {
            return Err(Error::archive_format(format!(
                "checksum must be {} hex characters, got {}",
                CHECKSUM_HEX_LEN,
                hex.len()
            )));
        }

        let mut out = [0u8; 16];
        for (i, pair) in hex.chunks_exact(2).enumerate() {
            let hi = hex_value(pair[0]);
            let lo = hex_value(pair[1]);
            match (hi, lo) {
                (Some(hi), Some(lo)) => out[i] = (hi << 4) | lo,
                _ => {
                    return Err(Error::archive_format(format!(
                        "checksum prefix is not hex at offset {}",
                        i * 2
                    )))
                }
            }
        }
        Ok(Self(out))
    }
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl FromStr for Checksum {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s.as_bytes())
    }
}

/// Checksum prefix as found in an archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoredChecksum {
    /// 32 hex characters
    Digest(Checksum),
    /// Anything else, kept byte for byte
    Malformed([u8; CHECKSUM_HEX_LEN]),
}

impl StoredChecksum {
    fn parse(prefix: &[u8; CHECKSUM_HEX_LEN]) -> Self {
        match Checksum::from_hex(prefix) {
            Ok(checksum) => Self::Digest(checksum),
            Err(e) => {
                debug!("Stored checksum is malformed: {}", e);
                Self::Malformed(*prefix)
            }
        }
    }

    /// The digest, if the prefix was well-formed
    pub fn digest(&self) -> Option<Checksum> {
        match self {
            Self::Digest(checksum) => Some(*checksum),
            Self::Malformed(_) => None,
        }
    }
}

impl fmt::Display for StoredChecksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Digest(checksum) => fmt::Display::fmt(checksum, f),
            Self::Malformed(raw) => write!(f, "{}", raw.escape_ascii()),
        }
    }
}

impl From<Checksum> for StoredChecksum {
    fn from(checksum: Checksum) -> Self {
        Self::Digest(checksum)
    }
}

/// Outcome of checking a stored checksum against its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationResult {
    /// The stored checksum matches the payload
    Verified(Checksum),
    /// The payload was altered after the checksum was written
    Mismatch {
        /// Checksum carried by the archive
        stored: StoredChecksum,
        /// Checksum of the payload bytes as read
        computed: Checksum,
    },
}

impl VerificationResult {
    /// Returns true when the checksum matched
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified(_))
    }

    /// Converts a mismatch into [`Error::ChecksumMismatch`]
    pub fn into_result(self) -> Result<Checksum> {
        match self {
            Self::Verified(checksum) => Ok(checksum),
            Self::Mismatch { stored, computed } => {
                Err(Error::ChecksumMismatch { stored, computed })
            }
        }
    }
}

/// An archive split into its payload and stored checksum
#[derive(Debug, Clone)]
pub struct Archive {
    payload: Bytes,
    stored: StoredChecksum,
}

impl Archive {
    /// Splits raw file bytes into payload and stored checksum.
    ///
    /// Fails with [`Error::ArchiveFormat`] only when the input is too short
    /// to hold the checksum prefix.
    pub fn open(data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        if data.len() < CHECKSUM_HEX_LEN {
            return Err(Error::archive_format(format!(
                "input is {} bytes, checksum prefix needs {}",
                data.len(),
                CHECKSUM_HEX_LEN
            )));
        }

        let mut prefix = [0u8; CHECKSUM_HEX_LEN];
        prefix.copy_from_slice(&data[..CHECKSUM_HEX_LEN]);
        let stored = StoredChecksum::parse(&prefix);
        let payload = data.slice(CHECKSUM_HEX_LEN..);
        trace!("Opened archive: {} payload bytes, checksum {}", payload.len(), stored);

        Ok(Self { payload, stored })
    }

    /// Returns the payload bytes covered by the checksum
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Returns the checksum stored in the archive
    pub fn stored_checksum(&self) -> StoredChecksum {
        self.stored
    }

    /// Checks the stored checksum against the payload
    pub fn verify(&self) -> VerificationResult {
        let computed = Checksum::of(&self.payload);
        if self.stored.digest() == Some(computed) {
            VerificationResult::Verified(computed)
        } else {
            debug!("Checksum mismatch: stored {}, computed {}", self.stored, computed);
            VerificationResult::Mismatch {
                stored: self.stored,
                computed,
            }
        }
    }

    /// Consumes the archive and returns the payload
    pub fn into_payload(self) -> Bytes {
        self.payload
    }
}

/// Returns true iff `checksum` is the digest of `payload`
pub fn verify(payload: &[u8], checksum: &Checksum) -> bool {
    Checksum::of(payload) == *checksum
}

/// Serializes a payload into archive bytes with a freshly computed checksum
pub fn pack(payload: &[u8]) -> Vec<u8> {
    let checksum = Checksum::of(payload);
    let mut out = Vec::with_capacity(CHECKSUM_HEX_LEN + payload.len());
    out.extend_from_slice(checksum.to_hex().as_bytes());
    out.extend_from_slice(payload);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_known_digest() {
        // RFC 1321 test vector
        assert_eq!(
            Checksum::of(b"abc").to_hex(),
            "900150983cd24fb0d6963f7d28e17f72"
        );
    }

    #[test]
    fn test_pack_then_open() {
        let payload = b"\x0a\x04\x0a\x02ab".to_vec();
        let archive = Archive::open(pack(&payload)).unwrap();

        assert_eq!(archive.payload(), payload.as_slice());
        assert!(archive.verify().is_verified());
    }

    #[test]
    fn test_open_too_short() {
        let err = Archive::open(b"abcdef".to_vec()).unwrap_err();
        assert!(matches!(err, Error::ArchiveFormat { .. }));
    }

    #[test]
    fn test_non_hex_prefix_is_a_mismatch() {
        let payload = b"\x0a\x00";
        let mut data = pack(payload);
        data[5] = b'z';

        let archive = Archive::open(data.clone()).unwrap();
        assert_eq!(archive.stored_checksum().digest(), None);
        match archive.verify() {
            VerificationResult::Mismatch { stored, computed } => {
                assert_eq!(computed, Checksum::of(payload));
                assert_eq!(stored.to_string().as_bytes(), &data[..CHECKSUM_HEX_LEN]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_malformed_prefix_display_escapes_bytes() {
        let mut raw = [b'0'; CHECKSUM_HEX_LEN];
        raw[0] = 0xFF;
        let stored = StoredChecksum::Malformed(raw);
        assert!(stored.to_string().starts_with("\\xff0"));
    }

    #[test]
    fn test_empty_payload_is_a_valid_container() {
        let archive = Archive::open(pack(&[])).unwrap();
        assert!(archive.payload().is_empty());
        assert!(archive.verify().is_verified());
    }

    #[test]
    fn test_tampered_payload_mismatch() {
        let mut data = pack(b"\x0a\x02\x08\x01");
        let last = data.len() - 1;
        data[last] ^= 0x01;

        let archive = Archive::open(data).unwrap();
        let result = archive.verify();
        assert!(!result.is_verified());
        assert!(matches!(
            result.into_result(),
            Err(Error::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_checksum_parse_display() {
        let hex = "0123456789abcdef0123456789abcdef";
        let checksum: Checksum = hex.parse().unwrap();
        assert_eq!(checksum.to_string(), hex);

        let upper: Checksum = hex.to_uppercase().parse().unwrap();
        assert_eq!(upper, checksum);
    }

    #[test]
    fn test_verify_free_function() {
        let payload = b"profile bytes";
        let checksum = Checksum::of(payload);
        assert!(verify(payload, &checksum));
        assert!(!verify(b"profile bytez", &checksum));
    }
}
