//! RSASSA-PSS signing with SHA-256 and MGF1-SHA-256 over fragmented messages.
//!
//! The fragments of a request are fed, in order, into one SHA-256 digest, so
//! the signature covers their concatenation. Empty fragments contribute
//! nothing. Salt length is fixed at the digest length ([`PSS_SALT_LEN`]);
//! verifiers must use the same length or auto-detect it.

use std::fmt;

use rand::rngs::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::{Pss, RsaPrivateKey};
use sha2::{Digest, Sha256};

use crate::error::Error;

/// PSS salt length in bytes (SHA-256 output length).
pub const PSS_SALT_LEN: usize = 32;

const DIGEST_LEN: usize = 32;

/// Stage of the signing pipeline, reported in [`Error::Crypto`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignStep {
    /// Binding SHA-256 and the private key into a signing context.
    Context,
    /// PSS padding with MGF1-SHA-256.
    Padding,
    /// Querying the signature length.
    SizeQuery,
    /// Producing the signature.
    Final,
}

impl fmt::Display for SignStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignStep::Context => "signing context setup",
            SignStep::Padding => "PSS padding configuration",
            SignStep::SizeQuery => "signature size query",
            SignStep::Final => "final signature",
        };
        write!(f, "{}", s)
    }
}

/// Stateless RSASSA-PSS-SHA256 signer borrowing a private key.
///
/// All scratch state (digest, padding scheme, salt) lives inside a single
/// [`PssSigner::sign`] call, so concurrent calls never share it.
pub struct PssSigner<'k> {
    key: &'k RsaPrivateKey,
}

impl<'k> PssSigner<'k> {
    pub fn new(key: &'k RsaPrivateKey) -> Self {
        Self { key }
    }

    /// Signature length in bytes, equal to the RSA modulus size.
    pub fn signature_len(&self) -> usize {
        self.key.size()
    }

    /// Sign the concatenation of `fragments`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Crypto`] naming the failing [`SignStep`]. Nothing is
    /// returned on failure, so callers never see a partial signature.
    pub fn sign(&self, fragments: &[&[u8]]) -> Result<Vec<u8>, Error> {
        let mut digest = self.context()?;
        let padding = self.padding()?;

        for fragment in fragments.iter().filter(|f| !f.is_empty()) {
            digest.update(fragment);
        }

        // First pass: the output length is fixed by the modulus.
        let len = self.signature_len();
        if len == 0 {
            return Err(Error::crypto(SignStep::SizeQuery, "RSA modulus is empty"));
        }

        // Second pass: produce exactly `len` bytes.
        let hashed = digest.finalize();
        let signature = self
            .key
            .sign_with_rng(&mut OsRng, padding, &hashed)
            .map_err(|e| Error::crypto(SignStep::Final, e.to_string()))?;

        if signature.len() != len {
            return Err(Error::crypto(
                SignStep::Final,
                format!("expected {} signature bytes, got {}", len, signature.len()),
            ));
        }

        Ok(signature)
    }

    fn context(&self) -> Result<Sha256, Error> {
        self.key
            .validate()
            .map_err(|e| Error::crypto(SignStep::Context, e.to_string()))?;
        Ok(Sha256::new())
    }

    /// The scheme's single SHA-256 instance drives both the message hash
    /// and MGF1, so the mask digest is SHA-256 by construction.
    fn padding(&self) -> Result<Pss, Error> {
        let em_bits = self.key.n().bits().saturating_sub(1);
        let em_len = (em_bits + 7) / 8;
        let required = DIGEST_LEN + PSS_SALT_LEN + 2;
        if em_len < required {
            return Err(Error::crypto(
                SignStep::Padding,
                format!(
                    "{}-bit modulus too small for PSS-SHA256 with a {}-byte salt",
                    self.key.n().bits(),
                    PSS_SALT_LEN
                ),
            ));
        }
        Ok(Pss::new_blinded_with_salt::<Sha256>(PSS_SALT_LEN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{small_key, test_key, verify_pss};

    #[test]
    fn test_signature_len_is_modulus_size() {
        let key = test_key();
        let signer = PssSigner::new(key);
        assert_eq!(signer.signature_len(), key.size());

        let sig = signer.sign(&[b"data"]).unwrap();
        assert_eq!(sig.len(), signer.signature_len());
    }

    #[test]
    fn test_single_fragment_verifies() {
        let key = test_key();
        let sig = PssSigner::new(key).sign(&[b"verify me"]).unwrap();
        assert!(verify_pss(key, b"verify me", &sig));
        assert!(!verify_pss(key, b"verify you", &sig));
    }

    #[test]
    fn test_fragmentation_does_not_change_message() {
        let key = test_key();
        let message = b"handshake challenge bytes 0123456789";
        let signer = PssSigner::new(key);

        for split in [0, 1, 7, message.len() - 1, message.len()] {
            let (a, b) = message.split_at(split);
            let sig = signer.sign(&[a, b]).unwrap();
            assert!(verify_pss(key, message, &sig), "split at {}", split);
        }

        let bytes: Vec<&[u8]> = message.chunks(1).collect();
        let sig = signer.sign(&bytes).unwrap();
        assert!(verify_pss(key, message, &sig));
    }

    #[test]
    fn test_empty_fragments_are_skipped() {
        let key = test_key();
        let fragments: [&[u8]; 5] = [b"", b"alpha", b"", b"", b"beta"];
        let sig = PssSigner::new(key).sign(&fragments).unwrap();
        assert!(verify_pss(key, b"alphabeta", &sig));
    }

    #[test]
    fn test_fragment_order_matters() {
        let key = test_key();
        let fragments: [&[u8]; 2] = [b"beta", b"alpha"];
        let sig = PssSigner::new(key).sign(&fragments).unwrap();
        assert!(!verify_pss(key, b"alphabeta", &sig));
        assert!(verify_pss(key, b"betaalpha", &sig));
    }

    #[test]
    fn test_no_fragments_signs_empty_message() {
        let key = test_key();
        let sig = PssSigner::new(key).sign(&[]).unwrap();
        assert!(verify_pss(key, b"", &sig));
    }

    #[test]
    fn test_salt_randomizes_signature() {
        let key = test_key();
        let signer = PssSigner::new(key);
        let a = signer.sign(&[b"same"]).unwrap();
        let b = signer.sign(&[b"same"]).unwrap();
        assert_ne!(a, b);
        assert!(verify_pss(key, b"same", &a));
        assert!(verify_pss(key, b"same", &b));
    }

    #[test]
    fn test_modulus_too_small_for_padding() {
        let err = PssSigner::new(small_key()).sign(&[b"x"]).unwrap_err();
        match err {
            Error::Crypto { step, .. } => assert_eq!(step, SignStep::Padding),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
