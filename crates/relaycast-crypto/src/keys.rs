use bech32::{Bech32, Hrp};
use rand::RngCore;
use thiserror::Error;

use crate::signing::NostrSigner;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("secret must be an nsec bech32 string or 64 hex characters")]
    InvalidSecret,
    #[error("expected nsec prefix, found {0}")]
    WrongPrefix(String),
    #[error("bech32 encoding failed")]
    Encode,
}

/// Decodes a secret key given as `nsec1…` or 64 hex characters.
pub fn decode_secret_key(value: &str) -> Result<[u8; 32], KeyError> {
    let trimmed = value.trim();
    if let Ok(bytes) = hex::decode(trimmed) {
        if let Ok(key) = <[u8; 32]>::try_from(bytes.as_slice()) {
            return Ok(key);
        }
    }
    let (decoded_hrp, data) = bech32::decode(trimmed).map_err(|_| KeyError::InvalidSecret)?;
    if decoded_hrp.as_str() != "nsec" {
        return Err(KeyError::WrongPrefix(decoded_hrp.as_str().to_string()));
    }
    <[u8; 32]>::try_from(data.as_slice()).map_err(|_| KeyError::InvalidSecret)
}

pub fn encode_nsec(secret: [u8; 32]) -> Result<String, KeyError> {
    encode_bech32("nsec", &secret)
}

pub fn encode_npub(pubkey: [u8; 32]) -> Result<String, KeyError> {
    encode_bech32("npub", &pubkey)
}

/// Generates a random secret that is a valid secp256k1 scalar.
pub fn generate_secret_key() -> [u8; 32] {
    loop {
        let mut candidate = [0_u8; 32];
        rand::thread_rng().fill_bytes(&mut candidate);
        if NostrSigner::from_secret(candidate).is_ok() {
            return candidate;
        }
    }
}

fn encode_bech32(prefix: &str, data: &[u8; 32]) -> Result<String, KeyError> {
    let hrp = Hrp::parse(prefix).map_err(|_| KeyError::Encode)?;
    bech32::encode::<Bech32>(hrp, data).map_err(|_| KeyError::Encode)
}
