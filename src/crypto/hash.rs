//! Hash primitives used by address derivation
//!
//! Bitcoin addresses are built from SHA-256 and RIPEMD-160:
//! checksums use double SHA-256, key and script fingerprints use
//! RIPEMD160(SHA256(x)).

use ripemd::Ripemd160;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::constants::{CHECKSUM_LEN, HASH160_LEN};

/// 20-byte RIPEMD160(SHA256(x)) digest
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hash160(#[serde(with = "hex::serde")] pub [u8; HASH160_LEN]);

impl Hash160 {
    /// Create hash from a slice, which must be exactly 20 bytes
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; HASH160_LEN] = bytes.try_into().ok()?;
        Some(Hash160(arr))
    }

    /// Create hash from hex string
    pub fn from_hex(hex: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(hex)?;
        Self::from_slice(&bytes).ok_or(hex::FromHexError::InvalidStringLength)
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Get as bytes
    pub fn as_bytes(&self) -> &[u8; HASH160_LEN] {
        &self.0
    }
}

impl fmt::Debug for Hash160 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash160({})", self.to_hex())
    }
}

impl fmt::Display for Hash160 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl AsRef<[u8]> for Hash160 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Single SHA-256
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// SHA-256 applied twice
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// RIPEMD160(SHA256(data))
pub fn hash160(data: &[u8]) -> Hash160 {
    Hash160(Ripemd160::digest(sha256(data)).into())
}

/// First four bytes of the double SHA-256, appended to Base58Check payloads
pub fn checksum(data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest = double_sha256(data);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest[..CHECKSUM_LEN]);
    out
}
