//! SegWit address encoding (BIP-0173 / BIP-0350)
//!
//! Witness version 0 uses the bech32 checksum constant, versions 1 through
//! 16 use bech32m. The data part is the witness version as a single 5-bit
//! group followed by the program regrouped from 8-bit to 5-bit words.

use bech32::{FromBase32, ToBase32, Variant};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    HASH160_LEN, MAX_WITNESS_PROGRAM_LEN, MAX_WITNESS_VERSION, MIN_WITNESS_PROGRAM_LEN,
    WITNESS_PROGRAM_32_LEN,
};

/// Bech32 / Bech32m errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Bech32Error {
    #[error("invalid human-readable part: {0}")]
    InvalidHRP(String),
    #[error("invalid bech32 checksum: {0}")]
    InvalidChecksum(&'static str),
    #[error("invalid bech32 character {0:?}")]
    InvalidCharacter(char),
    #[error("invalid witness version {0} (must be 0-16)")]
    InvalidWitnessVersion(u8),
    #[error("invalid witness program length {len} for version {version}")]
    InvalidProgramLength { version: u8, len: usize },
}

impl Bech32Error {
    /// Taxonomy name reported by the driver
    pub fn kind(&self) -> &'static str {
        match self {
            Bech32Error::InvalidHRP(_) => "InvalidHRP",
            Bech32Error::InvalidChecksum(_) => "InvalidChecksum",
            Bech32Error::InvalidCharacter(_) => "InvalidCharacter",
            Bech32Error::InvalidWitnessVersion(_) => "InvalidWitnessVersion",
            Bech32Error::InvalidProgramLength { .. } => "InvalidProgramLength",
        }
    }
}

/// Witness version plus program, the SegWit analogue of a hash160
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WitnessProgram {
    pub version: u8,
    #[serde(with = "hex::serde")]
    pub program: Vec<u8>,
}

impl WitnessProgram {
    /// Create a witness program, checking version and length rules
    pub fn new(version: u8, program: Vec<u8>) -> Result<Self, Bech32Error> {
        check_program(version, program.len())?;
        Ok(Self { version, program })
    }

    /// Checksum variant mandated for this witness version
    pub fn variant(&self) -> Variant {
        variant_for(self.version)
    }

    /// Program length in bytes
    pub fn len(&self) -> usize {
        self.program.len()
    }

    pub fn is_empty(&self) -> bool {
        self.program.is_empty()
    }
}

fn variant_for(version: u8) -> Variant {
    if version == 0 {
        Variant::Bech32
    } else {
        Variant::Bech32m
    }
}

fn check_program(version: u8, len: usize) -> Result<(), Bech32Error> {
    if version > MAX_WITNESS_VERSION {
        return Err(Bech32Error::InvalidWitnessVersion(version));
    }
    if !(MIN_WITNESS_PROGRAM_LEN..=MAX_WITNESS_PROGRAM_LEN).contains(&len) {
        return Err(Bech32Error::InvalidProgramLength { version, len });
    }
    if version == 0 && len != HASH160_LEN && len != WITNESS_PROGRAM_32_LEN {
        return Err(Bech32Error::InvalidProgramLength { version, len });
    }
    Ok(())
}

fn check_hrp(hrp: &str) -> Result<(), Bech32Error> {
    if hrp.is_empty() || !hrp.bytes().all(|b| (33..=126).contains(&b)) {
        return Err(Bech32Error::InvalidHRP(hrp.to_string()));
    }
    Ok(())
}

fn map_bech32_error(err: bech32::Error) -> Bech32Error {
    match err {
        bech32::Error::MissingSeparator => {
            Bech32Error::InvalidHRP("missing separator '1'".to_string())
        }
        bech32::Error::InvalidChecksum => Bech32Error::InvalidChecksum("polymod mismatch"),
        bech32::Error::MixedCase => Bech32Error::InvalidChecksum("mixed upper and lower case"),
        bech32::Error::InvalidLength => {
            Bech32Error::InvalidChecksum("data part too short for a checksum")
        }
        bech32::Error::InvalidChar(c) => Bech32Error::InvalidCharacter(c),
        bech32::Error::InvalidData(v) => Bech32Error::InvalidWitnessVersion(v),
        bech32::Error::InvalidPadding => Bech32Error::InvalidChecksum("non-zero padding"),
        #[allow(unreachable_patterns)]
        _ => Bech32Error::InvalidChecksum("malformed bech32 string"),
    }
}

/// Encode a witness program as a SegWit address
pub fn encode(hrp: &str, witness_version: u8, program: &[u8]) -> Result<String, Bech32Error> {
    check_hrp(hrp)?;
    check_program(witness_version, program.len())?;

    let mut data = vec![bech32::u5::try_from_u8(witness_version).map_err(map_bech32_error)?];
    data.extend(program.to_base32());

    let encoded = bech32::encode(&hrp.to_ascii_lowercase(), data, variant_for(witness_version))
        .map_err(map_bech32_error)?;
    Ok(encoded)
}

/// Encode a [`WitnessProgram`] as a SegWit address
pub fn encode_program(hrp: &str, witness: &WitnessProgram) -> Result<String, Bech32Error> {
    encode(hrp, witness.version, &witness.program)
}

/// Decode a SegWit address into its human-readable part and witness program
pub fn decode(address: &str) -> Result<(String, WitnessProgram), Bech32Error> {
    let (hrp, data, variant) = bech32::decode(address).map_err(map_bech32_error)?;

    let (version, words) = match data.split_first() {
        Some((version, words)) => (version.to_u8(), words),
        None => return Err(Bech32Error::InvalidProgramLength { version: 0, len: 0 }),
    };
    if version > MAX_WITNESS_VERSION {
        return Err(Bech32Error::InvalidWitnessVersion(version));
    }
    if variant != variant_for(version) {
        return Err(Bech32Error::InvalidChecksum(if version == 0 {
            "witness version 0 requires bech32"
        } else {
            "witness version 1+ requires bech32m"
        }));
    }

    let program = Vec::<u8>::from_base32(words).map_err(|_| Bech32Error::InvalidProgramLength {
        version,
        len: words.len() * 5 / 8,
    })?;
    check_program(version, program.len())?;

    Ok((hrp, WitnessProgram { version, program }))
}

/// Decode a SegWit address, requiring a specific human-readable part
pub fn decode_for(expected_hrp: &str, address: &str) -> Result<WitnessProgram, Bech32Error> {
    let (hrp, witness) = decode(address)?;
    if !hrp.eq_ignore_ascii_case(expected_hrp) {
        return Err(Bech32Error::InvalidHRP(format!(
            "expected {}, found {}",
            expected_hrp, hrp
        )));
    }
    Ok(witness)
}

#[cfg(test)]
mod tests {
    use super::*;

    const P2WPKH_PROGRAM: &str = "5274f5b99c72561a3da2adf720dc8e2cd6eee497";
    const TAPROOT_PROGRAM: &str = "79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

    #[test]
    fn test_encode_p2wpkh() {
        let program = hex::decode(P2WPKH_PROGRAM).unwrap();
        assert_eq!(
            encode("bc", 0, &program).unwrap(),
            "bc1q2f60twvuwftp50dz4hmjphyw9ntwaeyhpqul99"
        );
        assert_eq!(
            encode("tb", 0, &program).unwrap(),
            "tb1q2f60twvuwftp50dz4hmjphyw9ntwaeyhtx8v7k"
        );
    }

    #[test]
    fn test_encode_taproot_uses_bech32m() {
        let program = hex::decode(TAPROOT_PROGRAM).unwrap();
        assert_eq!(
            encode("bc", 1, &program).unwrap(),
            "bc1p0xlxvlhemja6c4dqv22uapctqupfhlxm9h8z3k2e72q4k9hcz7vqzk5jj0"
        );
    }

    #[test]
    fn test_encode_p2wsh() {
        let program =
            hex::decode("1863143c14c5166804bd19203356da136c985678cd4d27a1b8c6329604903262")
                .unwrap();
        assert_eq!(
            encode("bc", 0, &program).unwrap(),
            "bc1qrp33g0q5c5txsp9arysrx4k6zdkfs4nce4xj0gdcccefvpysxf3qccfmv3"
        );
    }

    #[test]
    fn test_decode_p2wpkh() {
        let (hrp, witness) = decode("bc1q2f60twvuwftp50dz4hmjphyw9ntwaeyhpqul99").unwrap();
        assert_eq!(hrp, "bc");
        assert_eq!(witness.version, 0);
        assert_eq!(hex::encode(&witness.program), P2WPKH_PROGRAM);
    }

    #[test]
    fn test_decode_uppercase_is_accepted() {
        let (hrp, witness) = decode("BC1QW508D6QEJXTDG4Y5R3ZARVARY0C5XW7KV8F3T4").unwrap();
        assert_eq!(hrp, "bc");
        assert_eq!(
            hex::encode(witness.program),
            "751e76e8199196d454941c45d1b3a323f1433bd6"
        );
    }

    #[test]
    fn test_decode_rejects_mixed_case() {
        let result = decode("bc1Q2f60twvuwftp50dz4hmjphyw9ntwaeyhpqul99");
        assert!(matches!(result, Err(Bech32Error::InvalidChecksum(_))));
    }

    #[test]
    fn test_decode_rejects_bad_checksum() {
        let result = decode("bc1q2f60twvuwftp50dz4hmjphyw9ntwaeyhpqul98");
        assert!(matches!(result, Err(Bech32Error::InvalidChecksum(_))));
    }

    #[test]
    fn test_decode_rejects_wrong_variant_for_version() {
        // BIP-0350 test vector: v1 program with a bech32 checksum
        let result = decode("bc1p0xlxvlhemja6c4dqv22uapctqupfhlxm9h8z3k2e72q4k9hcz7vqh2y7hd");
        assert!(matches!(result, Err(Bech32Error::InvalidChecksum(_))));
        // v0 program with a bech32m checksum
        let result = decode("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kemeawh");
        assert!(matches!(result, Err(Bech32Error::InvalidChecksum(_))));
    }

    #[test]
    fn test_decode_missing_separator() {
        assert!(matches!(decode("pzry9x0s0muk"), Err(Bech32Error::InvalidHRP(_))));
    }

    #[test]
    fn test_decode_invalid_program_length() {
        // BIP-0173: invalid program length for witness version 0
        let result = decode("BC1QR508D6QEJXTDG4Y5R3ZARVARYV98GJ9P");
        assert!(matches!(result, Err(Bech32Error::InvalidProgramLength { version: 0, len: 16 })));
    }

    #[test]
    fn test_decode_for_checks_hrp() {
        let result = decode_for("tb", "bc1q2f60twvuwftp50dz4hmjphyw9ntwaeyhpqul99");
        assert!(matches!(result, Err(Bech32Error::InvalidHRP(_))));
        assert!(decode_for("bc", "bc1q2f60twvuwftp50dz4hmjphyw9ntwaeyhpqul99").is_ok());
    }

    #[test]
    fn test_encode_rejects_bad_inputs() {
        assert_eq!(encode("bc", 17, &[0u8; 20]), Err(Bech32Error::InvalidWitnessVersion(17)));
        assert_eq!(
            encode("bc", 0, &[0u8; 21]),
            Err(Bech32Error::InvalidProgramLength { version: 0, len: 21 })
        );
        assert_eq!(
            encode("bc", 1, &[0u8; 41]),
            Err(Bech32Error::InvalidProgramLength { version: 1, len: 41 })
        );
        assert!(matches!(encode("", 0, &[0u8; 20]), Err(Bech32Error::InvalidHRP(_))));
    }

    #[test]
    fn test_witness_program_new() {
        assert!(WitnessProgram::new(1, vec![0u8; 32]).is_ok());
        assert!(WitnessProgram::new(0, vec![0u8; 33]).is_err());
        assert_eq!(WitnessProgram::new(1, vec![0u8; 32]).unwrap().variant(), Variant::Bech32m);
    }

    #[test]
    fn test_data_part_uses_bech32_charset() {
        let program = hex::decode(TAPROOT_PROGRAM).unwrap();
        let address = encode("bc", 1, &program).unwrap();
        let (_, data) = address.split_once('1').unwrap();
        assert!(data
            .chars()
            .all(|c| crate::constants::BECH32_CHARSET.contains(c)));
    }
}
