//! NIP-01 event canonicalisation, id derivation and signing.

use relaycast_core::{SignedEvent, UnsignedEvent};
use serde_json::json;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::signing::{NostrVerifier, Signer, SigningError, Verifier};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventVerifyError {
    #[error("event field {0} is not valid hex of the expected length")]
    MalformedHex(&'static str),
    #[error("event id does not match its content")]
    IdMismatch,
    #[error("event signature does not verify")]
    BadSignature,
    #[error("signing error: {0}")]
    Signing(#[from] SigningError),
}

/// Serialises the canonical id preimage `[0, pubkey, created_at, kind, tags, content]`.
pub fn canonical_serialization(pubkey_hex: &str, event: &UnsignedEvent) -> String {
    json!([
        0,
        pubkey_hex,
        event.created_at,
        event.kind,
        event.tags,
        event.content
    ])
    .to_string()
}

/// Computes the 32-byte event id for `event` authored by `pubkey_hex`.
pub fn compute_event_id(pubkey_hex: &str, event: &UnsignedEvent) -> [u8; 32] {
    let preimage = canonical_serialization(pubkey_hex, event);
    Sha256::digest(preimage.as_bytes()).into()
}

/// Derives the id and signature for `event`, producing the wire-ready record.
pub fn sign_event(signer: &impl Signer, event: UnsignedEvent) -> Result<SignedEvent, SigningError> {
    let pubkey = hex::encode(signer.public_key());
    let id = compute_event_id(&pubkey, &event);
    let sig = signer.sign(&id)?;
    Ok(SignedEvent {
        id: hex::encode(id),
        pubkey,
        created_at: event.created_at,
        kind: event.kind,
        tags: event.tags,
        content: event.content,
        sig: hex::encode(sig),
    })
}

/// Recomputes the id of `event` and checks its signature.
pub fn verify_event(event: &SignedEvent) -> Result<(), EventVerifyError> {
    let pubkey: [u8; 32] = decode_fixed(&event.pubkey, "pubkey")?;
    let id: [u8; 32] = decode_fixed(&event.id, "id")?;
    let sig: [u8; 64] = decode_fixed(&event.sig, "sig")?;

    if compute_event_id(&event.pubkey, &event.unsigned()) != id {
        return Err(EventVerifyError::IdMismatch);
    }
    if !NostrVerifier.verify(pubkey, &id, sig)? {
        return Err(EventVerifyError::BadSignature);
    }
    Ok(())
}

fn decode_fixed<const N: usize>(
    value: &str,
    field: &'static str,
) -> Result<[u8; N], EventVerifyError> {
    let bytes = hex::decode(value).map_err(|_| EventVerifyError::MalformedHex(field))?;
    <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| EventVerifyError::MalformedHex(field))
}
