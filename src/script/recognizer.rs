//! Template matching over normalized script tokens
//!
//! Templates are checked in a fixed order and the first match wins:
//! P2PKH, P2PK, P2SH, P2WPKH / P2WSH, P2TR. A body that is one bare data
//! push is read as a hash160, a serialized script, or a public key.

use log::debug;

use super::pubkey;
use super::tokenizer::{normalize, Token};
use super::{Opcode, RecognizeError, ScriptDescriptor, ScriptType};
use crate::codec::WitnessProgram;
use crate::constants::{
    HASH160_LEN, MAX_WITNESS_PROGRAM_LEN, MIN_WITNESS_PROGRAM_LEN, WITNESS_PROGRAM_32_LEN,
};
use crate::crypto::Hash160;

/// Script element after adjacent hex fragments are joined
#[derive(Debug, Clone, PartialEq, Eq)]
enum Element {
    Op(Opcode),
    Unknown(String),
    Push(Vec<u8>),
}

/// Recognize a locking script in free-form text
pub fn recognize(text: &str) -> Result<ScriptDescriptor, RecognizeError> {
    let tokens = normalize(text)?;
    recognize_tokens(&tokens)
}

/// Recognize a locking script from already-normalized tokens
pub fn recognize_tokens(tokens: &[Token]) -> Result<ScriptDescriptor, RecognizeError> {
    let elements = coalesce(tokens)?;
    let descriptor = match_template(&elements)?;
    debug!("matched {}", descriptor);
    Ok(descriptor)
}

fn decode_push(hex_str: &str) -> Result<Vec<u8>, RecognizeError> {
    if hex_str.len() % 2 != 0 {
        return Err(RecognizeError::MalformedHex(format!(
            "odd-length data push ({} hex digits): {}",
            hex_str.len(),
            hex_str
        )));
    }
    hex::decode(hex_str).map_err(|e| RecognizeError::MalformedHex(format!("{}: {}", e, hex_str)))
}

/// Join adjacent hex fragments into pushes and resolve small-integer
/// words (`0 <program>` / `1 <program>` as printed by `decodescript`)
fn coalesce(tokens: &[Token]) -> Result<Vec<Element>, RecognizeError> {
    let mut elements = Vec::new();
    let mut data = String::new();
    let mut declared: Option<usize> = None;

    let leading_small_int = match tokens {
        [Token::Data(first), Token::Data(_), ..] if first == "0" => Some(Opcode::Op0),
        [Token::Data(first), Token::Data(_), ..] if first == "1" => Some(Opcode::Op1),
        _ => None,
    };
    let rest = match leading_small_int {
        Some(op) => {
            elements.push(Element::Op(op));
            &tokens[1..]
        }
        None => tokens,
    };

    for token in rest {
        match token {
            Token::Data(fragment) => data.push_str(fragment),
            Token::PushLen(len) => {
                flush_push(&mut data, &mut declared, &mut elements)?;
                declared = Some(*len);
            }
            Token::Op(op) => {
                flush_push(&mut data, &mut declared, &mut elements)?;
                elements.push(Element::Op(*op));
            }
            Token::UnknownOp(name) => {
                flush_push(&mut data, &mut declared, &mut elements)?;
                elements.push(Element::Unknown(name.clone()));
            }
        }
    }
    flush_push(&mut data, &mut declared, &mut elements)?;

    Ok(elements)
}

fn flush_push(
    data: &mut String,
    declared: &mut Option<usize>,
    elements: &mut Vec<Element>,
) -> Result<(), RecognizeError> {
    if data.is_empty() {
        return Ok(());
    }
    let bytes = decode_push(data)?;
    if let Some(expected) = declared.take() {
        if bytes.len() != expected {
            return Err(RecognizeError::MalformedHex(format!(
                "push declares {} bytes, found {}",
                expected,
                bytes.len()
            )));
        }
    }
    elements.push(Element::Push(bytes));
    data.clear();
    Ok(())
}

/// Strip a leading push-length byte (`14 <20 bytes>`, `41 <65 bytes>`)
/// when the push is not already one of the accepted sizes
fn payload<'a>(push: &'a [u8], accepted: &[usize]) -> &'a [u8] {
    if accepted.contains(&push.len()) {
        return push;
    }
    match push.split_first() {
        Some((&len, rest)) if len as usize == rest.len() && accepted.contains(&rest.len()) => rest,
        _ => push,
    }
}

fn hash_push(push: &[u8], what: &str) -> Result<Hash160, RecognizeError> {
    let body = payload(push, &[HASH160_LEN]);
    Hash160::from_slice(body).ok_or_else(|| {
        RecognizeError::MalformedHex(format!(
            "{} must be 20 bytes, found {}",
            what,
            body.len()
        ))
    })
}

fn key_push(push: &[u8]) -> Result<Vec<u8>, RecognizeError> {
    let body = payload(push, &[33, 65]);
    pubkey::check_shape(body)?;
    Ok(body.to_vec())
}

fn witness(version: u8, push: &[u8]) -> Result<ScriptDescriptor, RecognizeError> {
    let program = match version {
        0 => payload(push, &[HASH160_LEN, WITNESS_PROGRAM_32_LEN]),
        1 => payload(push, &[WITNESS_PROGRAM_32_LEN]),
        _ => push,
    };
    let script_type = match (version, program.len()) {
        (0, HASH160_LEN) => ScriptType::P2wpkh,
        (0, WITNESS_PROGRAM_32_LEN) => ScriptType::P2wsh,
        (1, WITNESS_PROGRAM_32_LEN) => ScriptType::P2tr,
        (2..=16, MIN_WITNESS_PROGRAM_LEN..=MAX_WITNESS_PROGRAM_LEN) => ScriptType::WitnessUnknown,
        (_, len) => {
            return Err(RecognizeError::MalformedHex(format!(
                "witness v{} program of {} bytes (expected {})",
                version,
                len,
                match version {
                    0 => "20 or 32",
                    1 => "32",
                    _ => "2 to 40",
                }
            )))
        }
    };
    let program = WitnessProgram::new(version, program.to_vec())
        .map_err(|e| RecognizeError::MalformedHex(e.to_string()))?;
    Ok(ScriptDescriptor::witness(script_type, program))
}

fn match_template(elements: &[Element]) -> Result<ScriptDescriptor, RecognizeError> {
    use Element::{Op, Push};

    if let [Op(op), Push(p)] = elements {
        if let Some(version) = op.witness_version() {
            return witness(version, p);
        }
    }

    match elements {
        [] => Err(RecognizeError::EmptyScript),
        [
            Op(Opcode::Dup),
            Op(Opcode::Hash160),
            Push(h),
            Op(Opcode::EqualVerify),
            Op(Opcode::CheckSig),
        ] => Ok(ScriptDescriptor::p2pkh(hash_push(h, "P2PKH hash160")?)),
        [Push(k), Op(Opcode::CheckSig)] => Ok(ScriptDescriptor::p2pk(key_push(k)?)),
        [Op(Opcode::Hash160), Push(h), Op(Opcode::Equal)] => {
            Ok(ScriptDescriptor::p2sh(hash_push(h, "P2SH script hash")?))
        }
        [Push(bytes)] => bare_push(bytes),
        other => Err(RecognizeError::UnrecognizedPattern(render(other))),
    }
}

/// A lone data push: bare hash160, serialized script, or bare public key
fn bare_push(bytes: &[u8]) -> Result<ScriptDescriptor, RecognizeError> {
    if let Some(hash) = Hash160::from_slice(bytes) {
        debug!("bare 20-byte push read as a P2PKH hash160");
        return Ok(ScriptDescriptor::p2pkh(hash));
    }
    if let Some(descriptor) = parse_serialized(bytes)? {
        debug!("data push parsed as a serialized script");
        return Ok(descriptor);
    }
    if pubkey::has_key_shape(bytes) {
        return Ok(ScriptDescriptor::p2pk(bytes.to_vec()));
    }
    Err(RecognizeError::UnrecognizedPattern(format!(
        "{}-byte data push is not a hash160, public key or known serialized script",
        bytes.len()
    )))
}

/// Serialized script bytes matching one of the templates
fn parse_serialized(bytes: &[u8]) -> Result<Option<ScriptDescriptor>, RecognizeError> {
    let descriptor = match bytes {
        [0x76, 0xa9, 0x14, hash @ .., 0x88, 0xac] if hash.len() == HASH160_LEN => {
            ScriptDescriptor::p2pkh(hash_push(hash, "P2PKH hash160")?)
        }
        [0xa9, 0x14, hash @ .., 0x87] if hash.len() == HASH160_LEN => {
            ScriptDescriptor::p2sh(hash_push(hash, "P2SH script hash")?)
        }
        [0x00, len, program @ ..]
            if *len as usize == program.len()
                && matches!(program.len(), HASH160_LEN | WITNESS_PROGRAM_32_LEN) =>
        {
            witness(0, program)?
        }
        [0x51, 0x20, program @ ..] if program.len() == WITNESS_PROGRAM_32_LEN => {
            witness(1, program)?
        }
        [op @ 0x52..=0x60, len, program @ ..]
            if *len as usize == program.len()
                && (MIN_WITNESS_PROGRAM_LEN..=MAX_WITNESS_PROGRAM_LEN).contains(&program.len()) =>
        {
            witness(op - 0x50, program)?
        }
        [len @ (0x21 | 0x41), key @ .., 0xac] if *len as usize == key.len() => {
            ScriptDescriptor::p2pk(key_push(key)?)
        }
        _ => return Ok(None),
    };
    Ok(Some(descriptor))
}

fn render(elements: &[Element]) -> String {
    elements
        .iter()
        .map(|e| match e {
            Element::Op(op) => op.name().to_string(),
            Element::Unknown(name) => name.clone(),
            Element::Push(data) => format!("<{} bytes>", data.len()),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
