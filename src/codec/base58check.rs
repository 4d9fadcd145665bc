//! Base58Check encoding
//!
//! `version ++ payload ++ checksum`, where the checksum is the first four
//! bytes of SHA256(SHA256(version ++ payload)), rendered in Base58 with one
//! leading `'1'` per leading zero byte.

use thiserror::Error;

use crate::constants::{CHECKSUM_LEN, MIN_BASE58CHECK_LEN};
use crate::crypto::checksum;

/// Base58Check decoding errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid base58 character {character:?} at position {index}")]
    InvalidCharacter { character: char, index: usize },
    #[error(
        "checksum mismatch: expected {}, found {}",
        hex::encode(.expected),
        hex::encode(.found)
    )]
    ChecksumMismatch {
        expected: [u8; CHECKSUM_LEN],
        found: [u8; CHECKSUM_LEN],
    },
    #[error("decoded buffer is {len} bytes, need at least {}", MIN_BASE58CHECK_LEN)]
    TooShort { len: usize },
}

impl DecodeError {
    /// Taxonomy name reported by the driver
    pub fn kind(&self) -> &'static str {
        match self {
            DecodeError::InvalidCharacter { .. } => "InvalidCharacter",
            DecodeError::ChecksumMismatch { .. } => "ChecksumMismatch",
            DecodeError::TooShort { .. } => "TooShort",
        }
    }
}

/// A decoded Base58Check buffer whose checksum has not been enforced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inspection {
    pub version: u8,
    pub payload: Vec<u8>,
    /// Trailing four bytes carried by the address
    pub claimed: [u8; CHECKSUM_LEN],
    /// Checksum recomputed over `version ++ payload`
    pub computed: [u8; CHECKSUM_LEN],
}

impl Inspection {
    pub fn checksum_ok(&self) -> bool {
        self.claimed == self.computed
    }
}

/// Encode a version byte and payload as Base58Check
pub fn encode(version: u8, payload: &[u8]) -> String {
    let mut full = Vec::with_capacity(1 + payload.len() + CHECKSUM_LEN);
    full.push(version);
    full.extend_from_slice(payload);
    let check = checksum(&full);
    full.extend_from_slice(&check);
    bs58::encode(full).into_string()
}

/// Decode Base58Check text without rejecting a bad checksum
pub fn inspect(address: &str) -> Result<Inspection, DecodeError> {
    let full = bs58::decode(address)
        .into_vec()
        .map_err(|e| map_bs58_error(address, e))?;

    if full.len() < MIN_BASE58CHECK_LEN {
        return Err(DecodeError::TooShort { len: full.len() });
    }

    let (buf, tail) = full.split_at(full.len() - CHECKSUM_LEN);
    let mut claimed = [0u8; CHECKSUM_LEN];
    claimed.copy_from_slice(tail);

    Ok(Inspection {
        version: buf[0],
        payload: buf[1..].to_vec(),
        claimed,
        computed: checksum(buf),
    })
}

/// Decode Base58Check text into `(version, payload)`, verifying the checksum
pub fn decode(address: &str) -> Result<(u8, Vec<u8>), DecodeError> {
    let inspection = inspect(address)?;
    if !inspection.checksum_ok() {
        return Err(DecodeError::ChecksumMismatch {
            expected: inspection.computed,
            found: inspection.claimed,
        });
    }
    Ok((inspection.version, inspection.payload))
}

fn map_bs58_error(input: &str, err: bs58::decode::Error) -> DecodeError {
    match err {
        bs58::decode::Error::InvalidCharacter { character, index } => {
            DecodeError::InvalidCharacter { character, index }
        }
        bs58::decode::Error::NonAsciiCharacter { index } => DecodeError::InvalidCharacter {
            character: input[index..].chars().next().unwrap_or('\u{fffd}'),
            index,
        },
        // Only reachable with a caller-provided output buffer
        _ => DecodeError::TooShort { len: 0 },
    }
}
