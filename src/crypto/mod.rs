//! Cryptography module - SHA-256 / RIPEMD-160 hashing for address derivation

mod hash;

pub use hash::*;
