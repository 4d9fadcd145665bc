//! Locking-script recognition
//!
//! Turns a textual (or hex-serialized) locking script into a
//! [`ScriptDescriptor`]: the matched template plus the key material the
//! address codecs need. The codecs never see raw text.

mod opcode;
mod tokenizer;
mod recognizer;
pub mod pubkey;

pub use opcode::Opcode;
pub use recognizer::{recognize, recognize_tokens};
pub use tokenizer::{normalize, Token};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::codec::WitnessProgram;
use crate::crypto::{hash160, Hash160};

/// Script recognition errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecognizeError {
    #[error("unrecognized script pattern: {0}")]
    UnrecognizedPattern(String),
    #[error("malformed hex: {0}")]
    MalformedHex(String),
    #[error("no script found in input")]
    EmptyScript,
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),
}

impl RecognizeError {
    /// Taxonomy name reported by the driver
    pub fn kind(&self) -> &'static str {
        match self {
            RecognizeError::UnrecognizedPattern(_) | RecognizeError::EmptyScript => {
                "UnrecognizedPattern"
            }
            RecognizeError::MalformedHex(_) => "MalformedHex",
            RecognizeError::InvalidPublicKey(_) => "InvalidPublicKey",
        }
    }
}

/// Output template a script matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptType {
    P2pkh,
    P2pk,
    P2sh,
    P2wpkh,
    P2wsh,
    P2tr,
    /// Witness version 2 to 16, or a version 1 program that is not 32 bytes
    #[serde(rename = "witness_unknown")]
    WitnessUnknown,
}

impl ScriptType {
    pub fn name(&self) -> &'static str {
        match self {
            ScriptType::P2pkh => "P2PKH",
            ScriptType::P2pk => "P2PK",
            ScriptType::P2sh => "P2SH",
            ScriptType::P2wpkh => "P2WPKH",
            ScriptType::P2wsh => "P2WSH",
            ScriptType::P2tr => "P2TR",
            ScriptType::WitnessUnknown => "WITNESS_UNKNOWN",
        }
    }

    /// SegWit / Taproot templates are encoded with bech32(m)
    pub fn is_witness(&self) -> bool {
        matches!(
            self,
            ScriptType::P2wpkh | ScriptType::P2wsh | ScriptType::P2tr | ScriptType::WitnessUnknown
        )
    }
}

impl fmt::Display for ScriptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Key material carried by a locking script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum KeyMaterial {
    PubkeyHash(Hash160),
    ScriptHash(Hash160),
    PublicKey(#[serde(with = "hex::serde")] Vec<u8>),
    Witness(WitnessProgram),
}

/// One element of a recognized script
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptElement {
    Op(Opcode),
    Push(Vec<u8>),
}

impl fmt::Display for ScriptElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptElement::Op(op) => write!(f, "{}", op),
            ScriptElement::Push(data) => write!(f, "{}", hex::encode(data)),
        }
    }
}

/// A recognized locking script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptDescriptor {
    pub script_type: ScriptType,
    pub key: KeyMaterial,
    /// Canonical opcode sequence of the template
    pub elements: Vec<ScriptElement>,
}

impl ScriptDescriptor {
    pub fn p2pkh(hash: Hash160) -> Self {
        Self {
            script_type: ScriptType::P2pkh,
            key: KeyMaterial::PubkeyHash(hash),
            elements: vec![
                ScriptElement::Op(Opcode::Dup),
                ScriptElement::Op(Opcode::Hash160),
                ScriptElement::Push(hash.0.to_vec()),
                ScriptElement::Op(Opcode::EqualVerify),
                ScriptElement::Op(Opcode::CheckSig),
            ],
        }
    }

    /// Caller checks the key shape
    pub fn p2pk(pubkey: Vec<u8>) -> Self {
        Self {
            script_type: ScriptType::P2pk,
            elements: vec![
                ScriptElement::Push(pubkey.clone()),
                ScriptElement::Op(Opcode::CheckSig),
            ],
            key: KeyMaterial::PublicKey(pubkey),
        }
    }

    pub fn p2sh(hash: Hash160) -> Self {
        Self {
            script_type: ScriptType::P2sh,
            key: KeyMaterial::ScriptHash(hash),
            elements: vec![
                ScriptElement::Op(Opcode::Hash160),
                ScriptElement::Push(hash.0.to_vec()),
                ScriptElement::Op(Opcode::Equal),
            ],
        }
    }

    /// `OP_n <program>` for any valid witness program
    pub fn witness(script_type: ScriptType, witness: WitnessProgram) -> Self {
        let version_op = Opcode::for_witness_version(witness.version);
        Self {
            script_type,
            elements: vec![
                ScriptElement::Op(version_op),
                ScriptElement::Push(witness.program.clone()),
            ],
            key: KeyMaterial::Witness(witness),
        }
    }

    /// Legacy hash160 implied by the key material.
    ///
    /// P2PK keys are hashed as given; witness programs have none.
    pub fn hash160(&self) -> Option<Hash160> {
        match &self.key {
            KeyMaterial::PubkeyHash(h) | KeyMaterial::ScriptHash(h) => Some(*h),
            KeyMaterial::PublicKey(pk) => Some(hash160(pk)),
            KeyMaterial::Witness(_) => None,
        }
    }

    pub fn public_key(&self) -> Option<&[u8]> {
        match &self.key {
            KeyMaterial::PublicKey(pk) => Some(pk),
            _ => None,
        }
    }

    pub fn witness_program(&self) -> Option<&WitnessProgram> {
        match &self.key {
            KeyMaterial::Witness(w) => Some(w),
            _ => None,
        }
    }

    /// Space-separated ASM rendering
    pub fn asm(&self) -> String {
        self.elements
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Serialized script bytes (direct pushes only; every template push is
    /// at most 65 bytes)
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for element in &self.elements {
            match element {
                ScriptElement::Op(op) => out.push(op.byte()),
                ScriptElement::Push(data) => {
                    out.push(data.len() as u8);
                    out.extend_from_slice(data);
                }
            }
        }
        out
    }
}

impl fmt::Display for ScriptDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.script_type, self.asm())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_p2pkh_serialization() {
        let hash = Hash160::from_hex("11ed988147e4760688a0df3b1df0d70fd1d4f3ec").unwrap();
        let desc = ScriptDescriptor::p2pkh(hash);
        assert_eq!(
            hex::encode(desc.to_bytes()),
            "76a91411ed988147e4760688a0df3b1df0d70fd1d4f3ec88ac"
        );
        assert_eq!(
            desc.asm(),
            "OP_DUP OP_HASH160 11ed988147e4760688a0df3b1df0d70fd1d4f3ec OP_EQUALVERIFY OP_CHECKSIG"
        );
        assert_eq!(desc.hash160(), Some(hash));
    }

    #[test]
    fn test_p2tr_serialization() {
        let program = vec![0xab; 32];
        let desc = ScriptDescriptor::witness(
            ScriptType::P2tr,
            WitnessProgram::new(1, program.clone()).unwrap(),
        );
        let bytes = desc.to_bytes();
        assert_eq!(&bytes[..2], &[0x51, 0x20]);
        assert_eq!(&bytes[2..], &program[..]);
        assert_eq!(desc.hash160(), None);
    }

    #[test]
    fn test_future_witness_serialization() {
        let desc = ScriptDescriptor::witness(
            ScriptType::WitnessUnknown,
            WitnessProgram::new(16, vec![0x75, 0x1e]).unwrap(),
        );
        assert_eq!(hex::encode(desc.to_bytes()), "6002751e");
        assert_eq!(desc.asm(), "OP_16 751e");
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(RecognizeError::EmptyScript.kind(), "UnrecognizedPattern");
        assert_eq!(RecognizeError::MalformedHex("x".into()).kind(), "MalformedHex");
    }

    #[test]
    fn test_script_type_display() {
        assert_eq!(ScriptType::P2wpkh.to_string(), "P2WPKH");
        assert!(ScriptType::P2tr.is_witness());
        assert!(!ScriptType::P2sh.is_witness());
        assert!(ScriptType::WitnessUnknown.is_witness());
        assert_eq!(
            serde_json::to_string(&ScriptType::WitnessUnknown).unwrap(),
            "\"witness_unknown\""
        );
    }
}
