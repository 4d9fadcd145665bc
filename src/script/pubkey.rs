//! SEC1 public key helpers for P2PK outputs

use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::PublicKey;

use super::RecognizeError;
use crate::constants::{COMPRESSED_PUBKEY_LEN, UNCOMPRESSED_PUBKEY_LEN};

/// Whether `bytes` has the length and prefix of a SEC1 public key
pub fn has_key_shape(bytes: &[u8]) -> bool {
    match (bytes.len(), bytes.first()) {
        (COMPRESSED_PUBKEY_LEN, Some(0x02 | 0x03)) => true,
        (UNCOMPRESSED_PUBKEY_LEN, Some(0x04)) => true,
        _ => false,
    }
}

/// Check a P2PK key push: 33 bytes starting 02/03 or 65 bytes starting 04
pub fn check_shape(bytes: &[u8]) -> Result<(), RecognizeError> {
    match bytes.len() {
        COMPRESSED_PUBKEY_LEN if !matches!(bytes[0], 0x02 | 0x03) => Err(
            RecognizeError::MalformedHex("compressed public key must start with 02 or 03".into()),
        ),
        UNCOMPRESSED_PUBKEY_LEN if bytes[0] != 0x04 => Err(RecognizeError::MalformedHex(
            "uncompressed public key must start with 04".into(),
        )),
        COMPRESSED_PUBKEY_LEN | UNCOMPRESSED_PUBKEY_LEN => Ok(()),
        len => Err(RecognizeError::MalformedHex(format!(
            "public key must be 33 or 65 bytes, found {}",
            len
        ))),
    }
}

/// SEC1 compressed encoding of a public key.
///
/// Fails when the bytes are not a point on secp256k1.
pub fn compress(bytes: &[u8]) -> Result<Vec<u8>, RecognizeError> {
    let key = PublicKey::from_sec1_bytes(bytes)
        .map_err(|_| RecognizeError::InvalidPublicKey(hex::encode(bytes)))?;
    Ok(key.to_encoded_point(true).as_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    const G_UNCOMPRESSED: &str = "0479be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8";
    const G_COMPRESSED: &str = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

    #[test]
    fn test_shape_checks() {
        let g = hex::decode(G_UNCOMPRESSED).unwrap();
        assert!(has_key_shape(&g));
        assert!(check_shape(&g).is_ok());

        let mut bad = g.clone();
        bad[0] = 0x02;
        assert!(!has_key_shape(&bad));
        assert!(matches!(check_shape(&bad), Err(RecognizeError::MalformedHex(_))));
        assert!(check_shape(&[0x02; 20]).is_err());
    }

    #[test]
    fn test_compress_generator() {
        let g = hex::decode(G_UNCOMPRESSED).unwrap();
        assert_eq!(hex::encode(compress(&g).unwrap()), G_COMPRESSED);
    }

    #[test]
    fn test_compress_is_idempotent() {
        let g = hex::decode(G_COMPRESSED).unwrap();
        assert_eq!(compress(&g).unwrap(), g);
    }

    #[test]
    fn test_compress_rejects_point_off_curve() {
        let mut bytes = vec![0x04];
        bytes.extend_from_slice(&[0x01; 64]);
        assert!(matches!(compress(&bytes), Err(RecognizeError::InvalidPublicKey(_))));
    }
}
