//! Cryptographic helpers used by relaycast.
//!
//! Includes BIP-340 Schnorr signing/verification, NIP-01 event ids and
//! secret key encodings.

pub mod event;
pub mod keys;
pub mod signing;
