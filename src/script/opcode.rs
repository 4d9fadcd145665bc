//! Opcodes that appear in the recognized locking-script templates
//!
//! Mnemonics are compared on a cleaned form: upper-case with `_` and `-`
//! removed, so `OP_CHECKSIG`, `op-checksig` and `OPCHECKSIG` are the same.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opcodes used by P2PKH / P2PK / P2SH / SegWit output templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    Op0,
    Op1,
    Dup,
    Hash160,
    Equal,
    EqualVerify,
    CheckSig,
    /// `OP_2` ..= `OP_16`, the future witness versions
    Num(u8),
}

/// Cleaned mnemonic -> opcode, aliases included
const MNEMONICS: &[(&str, Opcode)] = &[
    ("OP0", Opcode::Op0),
    ("OPFALSE", Opcode::Op0),
    ("OP1", Opcode::Op1),
    ("OPTRUE", Opcode::Op1),
    ("OPPUSHNUM1", Opcode::Op1),
    ("OPDUP", Opcode::Dup),
    ("OPHASH160", Opcode::Hash160),
    ("OPEQUAL", Opcode::Equal),
    ("OPEQUALVERIFY", Opcode::EqualVerify),
    ("OPCHECKSIG", Opcode::CheckSig),
];

/// Explorer-style explicit push marker, e.g. `OP_PUSHBYTES_20`
const PUSHBYTES_PREFIX: &str = "OPPUSHBYTES";

const NUM_NAMES: [&str; 15] = [
    "OP_2", "OP_3", "OP_4", "OP_5", "OP_6", "OP_7", "OP_8", "OP_9", "OP_10", "OP_11", "OP_12",
    "OP_13", "OP_14", "OP_15", "OP_16",
];

/// `OP<n>` / `OPPUSHNUM<n>` for n in 2..=16
fn small_int(clean: &str) -> Option<Opcode> {
    let digits = clean
        .strip_prefix("OPPUSHNUM")
        .or_else(|| clean.strip_prefix("OP"))?;
    if digits.starts_with('0') {
        return None;
    }
    match digits.parse::<u8>() {
        Ok(n @ 2..=16) => Some(Opcode::Num(n)),
        _ => None,
    }
}

impl Opcode {
    /// Serialized script byte
    pub fn byte(&self) -> u8 {
        match self {
            Opcode::Op0 => 0x00,
            Opcode::Op1 => 0x51,
            Opcode::Dup => 0x76,
            Opcode::Hash160 => 0xa9,
            Opcode::Equal => 0x87,
            Opcode::EqualVerify => 0x88,
            Opcode::CheckSig => 0xac,
            Opcode::Num(n) => 0x50 + n,
        }
    }

    /// Canonical mnemonic
    pub fn name(&self) -> &'static str {
        match self {
            Opcode::Op0 => "OP_0",
            Opcode::Op1 => "OP_1",
            Opcode::Dup => "OP_DUP",
            Opcode::Hash160 => "OP_HASH160",
            Opcode::Equal => "OP_EQUAL",
            Opcode::EqualVerify => "OP_EQUALVERIFY",
            Opcode::CheckSig => "OP_CHECKSIG",
            Opcode::Num(n) => n
                .checked_sub(2)
                .and_then(|i| NUM_NAMES.get(usize::from(i)))
                .copied()
                .unwrap_or("OP_UNKNOWN"),
        }
    }

    /// Opcode pushing a witness version; `version` is at most 16
    pub fn for_witness_version(version: u8) -> Opcode {
        match version {
            0 => Opcode::Op0,
            1 => Opcode::Op1,
            n => Opcode::Num(n),
        }
    }

    /// Witness version pushed by this opcode, if any
    pub fn witness_version(&self) -> Option<u8> {
        match self {
            Opcode::Op0 => Some(0),
            Opcode::Op1 => Some(1),
            Opcode::Num(n) => Some(*n),
            _ => None,
        }
    }

    /// Look up a cleaned mnemonic
    pub fn from_clean(clean: &str) -> Option<Opcode> {
        MNEMONICS
            .iter()
            .find(|(name, _)| *name == clean)
            .map(|(_, op)| *op)
            .or_else(|| small_int(clean))
    }

    /// Whether `clean` is a strict prefix of some known mnemonic, i.e. the
    /// start of a mnemonic split across words
    pub fn is_partial(clean: &str) -> bool {
        !clean.is_empty()
            && MNEMONICS
                .iter()
                .any(|(name, _)| name.len() > clean.len() && name.starts_with(clean))
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Upper-case a word and drop `_` / `-` separators
pub fn clean(word: &str) -> String {
    word.chars()
        .filter(|c| *c != '_' && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Byte count of an `OP_PUSHBYTES_<n>` marker
pub fn pushbytes_len(clean: &str) -> Option<usize> {
    clean.strip_prefix(PUSHBYTES_PREFIX)?.parse().ok()
}
