//! Bitcoin address codec core
//!
//! Base58Check and Bech32/Bech32m address encoding, plus a tolerant
//! recognizer for textual locking scripts (P2PKH, P2PK, P2SH, P2WPKH,
//! P2WSH, P2TR) as they appear in puzzle write-ups and block explorers.
//!
//! Data flow: raw text -> `script::recognize` -> `ScriptDescriptor`
//! -> `address::script_address` -> address string.

pub mod crypto;
pub mod network;
pub mod codec;
pub mod script;
pub mod address;
pub mod solutions;
pub mod cli;

/// Encoding constants - fixed by the Base58Check and BIP-0173/0350 formats
pub mod constants {
    /// Base58 alphabet (no `0`, `O`, `I`, `l`)
    pub const BASE58_ALPHABET: &str =
        "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

    /// Bech32 data charset
    pub const BECH32_CHARSET: &str = "qpzry9x8gf2tvdw0s3jn54khce6mua7l";

    /// Bech32 checksum length, in data characters
    pub const BECH32_CHECKSUM_LEN: usize = 6;

    /// Base58Check checksum length (bytes of double SHA-256 kept)
    pub const CHECKSUM_LEN: usize = 4;

    /// Smallest decodable Base58Check buffer: version byte + checksum
    pub const MIN_BASE58CHECK_LEN: usize = 1 + CHECKSUM_LEN;

    /// RIPEMD160(SHA256(x)) digest length
    pub const HASH160_LEN: usize = 20;

    /// Compressed SEC1 public key length
    pub const COMPRESSED_PUBKEY_LEN: usize = 33;

    /// Uncompressed SEC1 public key length
    pub const UNCOMPRESSED_PUBKEY_LEN: usize = 65;

    /// P2WSH / P2TR witness program length
    pub const WITNESS_PROGRAM_32_LEN: usize = 32;

    /// Highest SegWit witness version
    pub const MAX_WITNESS_VERSION: u8 = 16;

    /// Witness program length bounds (BIP-0141)
    pub const MIN_WITNESS_PROGRAM_LEN: usize = 2;
    pub const MAX_WITNESS_PROGRAM_LEN: usize = 40;
}

pub use address::{
    decode_address, script_address, validate, AddressError, AddressInfo, Validation,
};
pub use network::Network;
pub use script::{recognize, RecognizeError, ScriptDescriptor, ScriptType};
