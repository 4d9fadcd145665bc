//! Address derivation and inspection
//!
//! Selects the codec for a recognized script (Base58Check for legacy
//! templates, bech32/bech32m for witness programs) and, in reverse,
//! decodes any address string into its version and payload.

use log::debug;
use serde::Serialize;
use thiserror::Error;

use crate::codec::{base58check, bech32, Bech32Error, DecodeError};
use crate::constants::{BECH32_CHARSET, BECH32_CHECKSUM_LEN, HASH160_LEN, WITNESS_PROGRAM_32_LEN};
use crate::crypto::hash160;
use crate::network::Network;
use crate::script::{pubkey, KeyMaterial, RecognizeError, ScriptDescriptor, ScriptType};

/// Address errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Bech32(#[from] Bech32Error),
    #[error(transparent)]
    Recognize(#[from] RecognizeError),
    #[error("derived address {derived} does not match expected {expected}")]
    AddressMismatch { expected: String, derived: String },
}

impl AddressError {
    /// Taxonomy name reported by the driver
    pub fn kind(&self) -> &'static str {
        match self {
            AddressError::Decode(e) => e.kind(),
            AddressError::Bech32(e) => e.kind(),
            AddressError::Recognize(e) => e.kind(),
            AddressError::AddressMismatch { .. } => "AddressMismatch",
        }
    }
}

/// How an address string is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Base58Check,
    Bech32,
    Bech32m,
}

/// Decoded view of an address
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressInfo {
    pub address: String,
    pub encoding: Encoding,
    /// Base58Check version byte, or witness version for bech32(m)
    pub version: u8,
    #[serde(with = "hex::serde")]
    pub payload: Vec<u8>,
    pub network: Option<Network>,
    pub script_type: Option<ScriptType>,
}

/// Outcome of validating an address; never an error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Validation {
    pub address: String,
    pub valid: bool,
    /// Taxonomy name of the failure
    pub error: Option<&'static str>,
    pub diagnostic: Option<String>,
}

/// Options for turning a descriptor into an address
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeriveOptions {
    /// Hash the SEC1 compressed form of a P2PK key
    pub compress_pubkey: bool,
}

/// Address implied by a recognized locking script
pub fn script_address(
    descriptor: &ScriptDescriptor,
    network: Network,
) -> Result<String, AddressError> {
    script_address_with(descriptor, network, DeriveOptions::default())
}

/// Address implied by a recognized locking script, with options
pub fn script_address_with(
    descriptor: &ScriptDescriptor,
    network: Network,
    options: DeriveOptions,
) -> Result<String, AddressError> {
    let address = match &descriptor.key {
        KeyMaterial::PubkeyHash(hash) => {
            base58check::encode(network.p2pkh_version(), hash.as_ref())
        }
        KeyMaterial::ScriptHash(hash) => {
            base58check::encode(network.p2sh_version(), hash.as_ref())
        }
        KeyMaterial::PublicKey(key) => {
            let hash = if options.compress_pubkey {
                hash160(&pubkey::compress(key)?)
            } else {
                hash160(key)
            };
            debug!("P2PK key hashes to {}", hash);
            base58check::encode(network.p2pkh_version(), hash.as_ref())
        }
        KeyMaterial::Witness(witness) => {
            bech32::encode_program(network.bech32_hrp(), witness)?
        }
    };
    Ok(address)
}

/// Compare a derived address against an expected one
pub fn check_expected(derived: &str, expected: &str) -> Result<(), AddressError> {
    if derived == expected {
        return Ok(());
    }
    Err(AddressError::AddressMismatch {
        expected: expected.to_string(),
        derived: derived.to_string(),
    })
}

/// Human-readable part of `text` if it is shaped like a bech32 string.
///
/// A known prefix (`bc1`, `tb1`, `bcrt1`) always counts, so that case
/// errors are reported by the bech32 decoder. Otherwise the text must be
/// single-case with an alphabetic hrp before the last `1` and a data part
/// of at least a checksum drawn from the bech32 charset.
fn bech32_hrp(text: &str) -> Option<&str> {
    let lower = text.to_ascii_lowercase();
    if let Some(network) = Network::ALL
        .iter()
        .find(|n| lower.starts_with(&format!("{}1", n.bech32_hrp())))
    {
        return Some(&text[..network.bech32_hrp().len()]);
    }

    let mixed_case = text.bytes().any(|b| b.is_ascii_lowercase())
        && text.bytes().any(|b| b.is_ascii_uppercase());
    let (hrp, data) = lower.rsplit_once('1')?;
    let shaped = !mixed_case
        && !hrp.is_empty()
        && hrp.bytes().all(|b| b.is_ascii_alphabetic())
        && data.len() >= BECH32_CHECKSUM_LEN
        && data.chars().all(|c| BECH32_CHARSET.contains(c));
    shaped.then(|| &text[..hrp.len()])
}

/// Decode a Base58Check or SegWit address
pub fn decode_address(text: &str) -> Result<AddressInfo, AddressError> {
    let text = text.trim();
    if let Some(hrp) = bech32_hrp(text) {
        let network = Network::from_hrp(hrp).ok_or_else(|| {
            Bech32Error::InvalidHRP(format!("unknown human-readable part {:?}", hrp))
        })?;
        let witness = bech32::decode_for(network.bech32_hrp(), text)?;
        let script_type = match (witness.version, witness.program.len()) {
            (0, HASH160_LEN) => ScriptType::P2wpkh,
            (0, WITNESS_PROGRAM_32_LEN) => ScriptType::P2wsh,
            (1, WITNESS_PROGRAM_32_LEN) => ScriptType::P2tr,
            _ => ScriptType::WitnessUnknown,
        };
        return Ok(AddressInfo {
            address: text.to_string(),
            encoding: if witness.version == 0 {
                Encoding::Bech32
            } else {
                Encoding::Bech32m
            },
            version: witness.version,
            payload: witness.program,
            network: Some(network),
            script_type: Some(script_type),
        });
    }

    let (version, payload) = base58check::decode(text)?;
    let known = Network::from_base58_version(version);
    let script_type = match known {
        Some((_, false)) if payload.len() == HASH160_LEN => Some(ScriptType::P2pkh),
        Some((_, true)) if payload.len() == HASH160_LEN => Some(ScriptType::P2sh),
        _ => None,
    };
    Ok(AddressInfo {
        address: text.to_string(),
        encoding: Encoding::Base58Check,
        version,
        payload,
        network: known.map(|(network, _)| network),
        script_type,
    })
}

/// Validate an address, reporting rather than raising failures
pub fn validate(text: &str) -> Validation {
    match decode_address(text) {
        Ok(_) => Validation {
            address: text.trim().to_string(),
            valid: true,
            error: None,
            diagnostic: None,
        },
        Err(e) => {
            debug!("address {} failed validation: {}", text, e);
            Validation {
                address: text.trim().to_string(),
                valid: false,
                error: Some(e.kind()),
                diagnostic: Some(e.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::recognize;

    #[test]
    fn test_p2pkh_address() {
        let desc = recognize(
            "OP_DUP OP_HASH160 d789f0011802bd854e5a25c0a9bd14dda3672ea4 OP_EQUALVERIFY OP_CHECKSIG",
        )
        .unwrap();
        assert_eq!(
            script_address(&desc, Network::Mainnet).unwrap(),
            "1LefXJzacHXE4jY57Nqwea6PnS1tbFGYdq"
        );
        assert_eq!(
            script_address(&desc, Network::Testnet).unwrap(),
            "n1AcpN5ZRJxUqr1gpwpKUVJieRcbT7wjLf"
        );
    }

    #[test]
    fn test_p2sh_addresses() {
        let desc =
            recognize("OP_HASH160 b2a3badd102736925c846dc3270ae1873cb205d5 OP_EQUAL").unwrap();
        assert_eq!(
            script_address(&desc, Network::Mainnet).unwrap(),
            "3HyaLqxcfDVfk4pqH6s2PRuA4umnCTgSE4"
        );
        assert_eq!(
            script_address(&desc, Network::Testnet).unwrap(),
            "2N9XnQateGg11wrTNxEUu1NtRHFywvnptxe"
        );
    }

    #[test]
    fn test_p2pk_compressed_option() {
        let g = "0479be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8";
        let desc = recognize(&format!("{} OP_CHECKSIG", g)).unwrap();
        assert_eq!(
            script_address(&desc, Network::Mainnet).unwrap(),
            "1EHNa6Q4Jz2uvNExL497mE43ikXhwF6kZm"
        );
        let compressed = script_address_with(
            &desc,
            Network::Mainnet,
            DeriveOptions { compress_pubkey: true },
        )
        .unwrap();
        assert_eq!(compressed, "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH");
    }

    #[test]
    fn test_witness_addresses_follow_network() {
        let desc = recognize("OP_0 1ab038be420532ef6419408002f21df7a79c9b9e").unwrap();
        assert_eq!(
            script_address(&desc, Network::Mainnet).unwrap(),
            "bc1qr2cr30jzq5ew7eqegzqq9usa77neexu7txc2de"
        );
        assert_eq!(
            script_address(&desc, Network::Regtest).unwrap(),
            "bcrt1qr2cr30jzq5ew7eqegzqq9usa77neexu7rf65pr"
        );
    }

    #[test]
    fn test_decode_base58_address() {
        let info = decode_address("12do7hgJxjNt3aa8CQ2MfTayhB1TjGap6k").unwrap();
        assert_eq!(info.encoding, Encoding::Base58Check);
        assert_eq!(info.version, 0x00);
        assert_eq!(hex::encode(&info.payload), "11ed988147e4760688a0df3b1df0d70fd1d4f3ec");
        assert_eq!(info.network, Some(Network::Mainnet));
        assert_eq!(info.script_type, Some(ScriptType::P2pkh));
    }

    #[test]
    fn test_decode_bech32m_address() {
        let info = decode_address(
            "bc1p0xlxvlhemja6c4dqv22uapctqupfhlxm9h8z3k2e72q4k9hcz7vqzk5jj0",
        )
        .unwrap();
        assert_eq!(info.encoding, Encoding::Bech32m);
        assert_eq!(info.version, 1);
        assert_eq!(info.script_type, Some(ScriptType::P2tr));
    }

    #[test]
    fn test_validate_reports_checksum_mismatch() {
        let validation = validate("12od7hgJxjNt3aa8CQ2MfTayhB1TjGap6k");
        assert!(!validation.valid);
        assert_eq!(validation.error, Some("ChecksumMismatch"));
        assert!(validate("12do7hgJxjNt3aa8CQ2MfTayhB1TjGap6k").valid);
    }

    #[test]
    fn test_validate_bech32_mixed_case() {
        let validation = validate("bc1Q2f60twvuwftp50dz4hmjphyw9ntwaeyhpqul99");
        assert_eq!(validation.error, Some("InvalidChecksum"));
    }

    #[test]
    fn test_unknown_hrp_is_reported() {
        let err = decode_address("ltc1qw508d6qejxtdg4y5r3zarvary0c5xw7kgmn4n9").unwrap_err();
        assert!(matches!(err, AddressError::Bech32(Bech32Error::InvalidHRP(_))));
        assert_eq!(err.kind(), "InvalidHRP");

        let validation = validate("LTC1QW508D6QEJXTDG4Y5R3ZARVARY0C5XW7KGMN4N9");
        assert_eq!(validation.error, Some("InvalidHRP"));
    }

    #[test]
    fn test_base58_is_not_routed_as_bech32() {
        for address in [
            "12do7hgJxjNt3aa8CQ2MfTayhB1TjGap6k",
            "n1AcpN5ZRJxUqr1gpwpKUVJieRcbT7wjLf",
            "1Lets1xxxx1use1xxxxxxxxxxxy2EaMkJ",
        ] {
            let info = decode_address(address).unwrap();
            assert_eq!(info.encoding, Encoding::Base58Check, "{}", address);
        }
    }

    #[test]
    fn test_decode_regtest_and_future_witness() {
        let info = decode_address("bcrt1qr2cr30jzq5ew7eqegzqq9usa77neexu7rf65pr").unwrap();
        assert_eq!(info.network, Some(Network::Regtest));

        let address = bech32::encode("bc", 2, &[0x75, 0x1e]).unwrap();
        let info = decode_address(&address).unwrap();
        assert_eq!(info.encoding, Encoding::Bech32m);
        assert_eq!(info.version, 2);
        assert_eq!(info.script_type, Some(ScriptType::WitnessUnknown));
    }

    #[test]
    fn test_future_witness_script_address() {
        let desc = recognize("OP_2 751e76e8199196d454941c45d1b3a323").unwrap();
        let address = script_address(&desc, Network::Mainnet).unwrap();
        assert!(address.starts_with("bc1z"));
        let info = decode_address(&address).unwrap();
        assert_eq!(hex::encode(info.payload), "751e76e8199196d454941c45d1b3a323");
    }

    #[test]
    fn test_check_expected() {
        assert!(check_expected("1abc", "1abc").is_ok());
        let err = check_expected("1abc", "1abd").unwrap_err();
        assert_eq!(err.kind(), "AddressMismatch");
    }
}
