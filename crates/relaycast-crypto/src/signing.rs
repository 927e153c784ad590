use std::fmt;

use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::schnorr::{Signature as SchnorrSignature, SigningKey, VerifyingKey};
use rand::RngCore;
use thiserror::Error;

/// Errors returned by signing/verification helpers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SigningError {
    /// Secret bytes are zero or not below the secp256k1 group order.
    #[error("invalid secret key bytes")]
    InvalidSecretKey,
    /// Pubkey bytes are not a valid x-only secp256k1 point.
    #[error("invalid public key bytes")]
    InvalidPublicKey,
    /// Signature bytes are malformed.
    #[error("invalid signature bytes")]
    InvalidSignature,
    #[error("signing failed")]
    SigningFailed,
}

/// Trait for 32-byte digest signing backends.
pub trait Signer {
    /// Signs `digest` and returns a 64-byte signature.
    fn sign(&self, digest: &[u8; 32]) -> Result<[u8; 64], SigningError>;
    /// Returns the signer's x-only 32-byte public key.
    fn public_key(&self) -> [u8; 32];
}

/// Trait for signature verification backends.
pub trait Verifier {
    /// Verifies a signature against `(pubkey, digest)`.
    fn verify(
        &self,
        pubkey: [u8; 32],
        digest: &[u8; 32],
        sig: [u8; 64],
    ) -> Result<bool, SigningError>;
}

/// BIP-340 Schnorr signer over secp256k1, as used by nostr.
#[derive(Clone)]
pub struct NostrSigner {
    signing_key: SigningKey,
}

// Only the public half is printed.
impl fmt::Debug for NostrSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NostrSigner")
            .field("public_key", &self.public_key_hex())
            .finish()
    }
}

impl NostrSigner {
    /// Creates a signer from a 32-byte secret key.
    pub fn from_secret(secret: [u8; 32]) -> Result<Self, SigningError> {
        let signing_key =
            SigningKey::from_bytes(&secret).map_err(|_| SigningError::InvalidSecretKey)?;
        Ok(Self { signing_key })
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key())
    }
}

impl Signer for NostrSigner {
    fn sign(&self, digest: &[u8; 32]) -> Result<[u8; 64], SigningError> {
        let mut aux_rand = [0_u8; 32];
        rand::thread_rng().fill_bytes(&mut aux_rand);
        let signature = self
            .signing_key
            .sign_prehash_with_aux_rand(digest, &aux_rand)
            .map_err(|_| SigningError::SigningFailed)?;
        Ok(signature.to_bytes())
    }

    fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes().into()
    }
}

/// Stateless BIP-340 verifier.
#[derive(Debug, Default, Clone, Copy)]
pub struct NostrVerifier;

impl Verifier for NostrVerifier {
    fn verify(
        &self,
        pubkey: [u8; 32],
        digest: &[u8; 32],
        sig: [u8; 64],
    ) -> Result<bool, SigningError> {
        let verifying_key =
            VerifyingKey::from_bytes(&pubkey).map_err(|_| SigningError::InvalidPublicKey)?;
        let signature = SchnorrSignature::try_from(sig.as_slice())
            .map_err(|_| SigningError::InvalidSignature)?;
        Ok(verifying_key.verify_prehash(digest, &signature).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::{NostrSigner, NostrVerifier, Signer, SigningError, Verifier};

    fn bip340_secret_three() -> [u8; 32] {
        let mut secret = [0_u8; 32];
        secret[31] = 3;
        secret
    }

    #[test]
    fn public_key_matches_bip340_vector() {
        let signer = NostrSigner::from_secret(bip340_secret_three()).expect("valid secret");
        assert_eq!(
            signer.public_key_hex(),
            "f9308a019258c31049344f85f89d5229b531c845836f99b08601f113bce036f9"
        );
    }

    #[test]
    fn verifies_bip340_vector_zero() {
        let pubkey: [u8; 32] =
            hex::decode("f9308a019258c31049344f85f89d5229b531c845836f99b08601f113bce036f9")
                .expect("hex")
                .try_into()
                .expect("32 bytes");
        let sig: [u8; 64] = hex::decode(
            "e907831f80848d1069a5371b402410364bdf1c5f8307b0084c55f1ce2dca8215\
             25f66a4a85ea8b71e482a74f382d2ce5ebeee8fdb2172f477df4900d310536c0",
        )
        .expect("hex")
        .try_into()
        .expect("64 bytes");
        let ok = NostrVerifier
            .verify(pubkey, &[0_u8; 32], sig)
            .expect("verify should run");
        assert!(ok);
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let signer = NostrSigner::from_secret([0x42_u8; 32]).expect("valid secret");
        let digest = [0x17_u8; 32];

        let signature = signer.sign(&digest).expect("sign should succeed");
        let ok = NostrVerifier
            .verify(signer.public_key(), &digest, signature)
            .expect("verify should succeed");
        assert!(ok);
    }

    #[test]
    fn verify_fails_when_digest_changes() {
        let signer = NostrSigner::from_secret([0x10_u8; 32]).expect("valid secret");
        let signature = signer.sign(&[0x01; 32]).expect("sign should succeed");
        let ok = NostrVerifier
            .verify(signer.public_key(), &[0x02; 32], signature)
            .expect("verify should run");
        assert!(!ok);
    }

    #[test]
    fn debug_output_omits_secret() {
        let signer = NostrSigner::from_secret(bip340_secret_three()).expect("valid secret");
        let rendered = format!("{signer:?}");
        assert_eq!(
            rendered,
            "NostrSigner { public_key: \"f9308a019258c31049344f85f89d5229b531c845836f99b08601f113bce036f9\" }"
        );
        assert!(!rendered.contains(&"0".repeat(63)));
    }

    #[test]
    fn zero_secret_is_rejected() {
        let err = NostrSigner::from_secret([0_u8; 32]).unwrap_err();
        assert_eq!(err, SigningError::InvalidSecretKey);
    }
}
