//! # pss-signer
//!
//! Shared RSA private-key handle producing RSASSA-PSS signatures.
//!
//! A security layer that has to prove possession of a private key (signing a
//! challenge or a handshake message) loads the key once through a
//! [`key::PrivateKey`], shares the handle freely, and signs messages that may
//! arrive split across several buffers.
//!
//! ## Features
//!
//! - **Load-once key handle**: PEM keys from `file:` URIs, optionally
//!   password-protected (PKCS#8 PBES2)
//! - **Shared ownership**: clones share one reference-counted key, freed with
//!   the last handle
//! - **Multi-fragment signing**: RSASSA-PSS with SHA-256 and MGF1-SHA-256 over
//!   the concatenation of the fragments
//! - **Injected diagnostics**: every failure is reported once to a
//!   [`diagnostics::DiagnosticSink`] (default: `tracing`)
//!
//! ## Quick Start
//!
//! ```no_run
//! use pss_signer::key::PrivateKey;
//!
//! let key = PrivateKey::from_uri("file:/etc/identity/key.pem", "");
//! if !key.is_loaded() {
//!     // Diagnostics already reported why; abort authentication.
//!     return;
//! }
//!
//! let mut signature = Vec::new();
//! let header: &[u8] = b"handshake-header";
//! let body: &[u8] = b"challenge";
//! key.sign(&[header, body], &mut signature).unwrap();
//! assert_eq!(Some(signature.len()), key.signature_len());
//! ```
//!
//! ## Security
//!
//! - Salt length is fixed at 32 bytes (the SHA-256 output length)
//! - RSA private operations are blinded
//! - Key material and configured passwords are zeroized on drop
//!
//! ## Error Handling
//!
//! Loading and signing return `Result<_, Error>`; see [`error::Error`] and
//! [`error::ErrorKind`]. Callers that only branch on success can use
//! [`error::Error::status`].

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod key;
pub mod resolver;
pub mod signing;

#[cfg(test)]
mod test_support;

pub use error::{Error, ErrorKind};
pub use key::PrivateKey;
