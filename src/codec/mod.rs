//! Address text codecs
//!
//! `base58check` covers legacy P2PKH / P2SH addresses, `bech32` covers
//! SegWit v0 (bech32) and v1+ (bech32m) witness programs.

pub mod base58check;
pub mod bech32;

pub use self::base58check::DecodeError;
pub use self::bech32::{Bech32Error, WitnessProgram};
