//! Shared RSA private-key handle.
//!
//! A [`PrivateKey`] is loaded at most once from a URI and then shares its
//! immutable [`KeyMaterial`] with every clone. The material is released when
//! the last handle referring to it is dropped or cleared.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;

use crate::config::KeyConfig;
use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
use crate::error::Error;
use crate::resolver::{StandardUriResolver, UriResolver, UriScheme};
use crate::signing::PssSigner;

const LOAD: &str = "PrivateKey::load";
const SIGN: &str = "PrivateKey::sign";

const PEM_BEGIN: &str = "-----BEGIN ";
const PEM_END: &str = "-----END ";
const PEM_DASHES: &str = "-----";
const KEY_LABELS: [&str; 3] = ["PRIVATE KEY", "ENCRYPTED PRIVATE KEY", "RSA PRIVATE KEY"];
const LEGACY_ENCRYPTION_HEADER: &str = "Proc-Type: 4,ENCRYPTED";

/// Where loaded material came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOrigin {
    /// Read from a `file:` URI.
    File(PathBuf),
    /// Parsed from PEM text handed over in memory.
    Pem,
}

/// Immutable private key plus its origin. Key bytes are zeroized on drop.
pub struct KeyMaterial {
    key: RsaPrivateKey,
    origin: KeyOrigin,
}

impl KeyMaterial {
    /// Read and parse a PEM file.
    pub fn from_file(path: &Path, password: &str) -> Result<Self, Error> {
        let bytes = std::fs::read(path).map_err(|e| {
            Error::Io(format!("failed to read file '{}': {}", path.display(), e))
        })?;
        let pem = std::str::from_utf8(&bytes).map_err(|e| {
            Error::Format(format!("'{}' is not PEM text: {}", path.display(), e))
        })?;
        Ok(Self {
            key: decode_rsa_pem(pem, password)?,
            origin: KeyOrigin::File(path.to_path_buf()),
        })
    }

    /// Parse PEM text. An empty `password` means the key is not encrypted.
    pub fn from_pem(pem: &str, password: &str) -> Result<Self, Error> {
        Ok(Self {
            key: decode_rsa_pem(pem, password)?,
            origin: KeyOrigin::Pem,
        })
    }

    pub fn rsa(&self) -> &RsaPrivateKey {
        &self.key
    }

    pub fn origin(&self) -> &KeyOrigin {
        &self.origin
    }

    pub fn modulus_bits(&self) -> usize {
        self.key.n().bits()
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("origin", &self.origin)
            .field("modulus_bits", &self.modulus_bits())
            .finish_non_exhaustive()
    }
}

/// First private-key PEM block in `pem`, as `(label, block)` where `block`
/// runs from its BEGIN line through its END line. Other blocks (certificates,
/// parameters) before or after it are skipped.
fn find_key_block(pem: &str) -> Result<(&str, &str), Error> {
    let mut skipped = Vec::new();
    let mut rest = pem;

    while let Some(begin) = rest.find(PEM_BEGIN) {
        let block = &rest[begin..];
        let label = block[PEM_BEGIN.len()..]
            .split_once(PEM_DASHES)
            .map(|(label, _)| label)
            .ok_or_else(|| Error::Format("malformed PEM header".to_string()))?;

        let footer = format!("{}{}{}", PEM_END, label, PEM_DASHES);
        let mut end = block
            .find(&footer)
            .map(|at| at + footer.len())
            .ok_or_else(|| Error::Format(format!("PEM block '{}' has no END line", label)))?;
        if block[end..].starts_with("\r\n") {
            end += 2;
        } else if block[end..].starts_with('\n') {
            end += 1;
        }

        if KEY_LABELS.iter().any(|key_label| *key_label == label) {
            return Ok((label, &block[..end]));
        }
        skipped.push(label);
        rest = &block[end..];
    }

    if skipped.is_empty() {
        Err(Error::Format("no PEM block found".to_string()))
    } else {
        Err(Error::Format(format!(
            "no private key PEM block found (saw {})",
            skipped.join(", ")
        )))
    }
}

/// Accepts PKCS#8 (`PRIVATE KEY`), encrypted PKCS#8 (`ENCRYPTED PRIVATE
/// KEY`) and unencrypted PKCS#1 (`RSA PRIVATE KEY`). A password given for an
/// unencrypted key is ignored.
fn decode_rsa_pem(pem: &str, password: &str) -> Result<RsaPrivateKey, Error> {
    let (label, pem) = find_key_block(pem)?;

    match label {
        "PRIVATE KEY" => Ok(RsaPrivateKey::from_pkcs8_pem(pem)?),
        "ENCRYPTED PRIVATE KEY" => {
            if password.is_empty() {
                return Err(Error::Format(
                    "key is encrypted but no password was supplied".to_string(),
                ));
            }
            Ok(RsaPrivateKey::from_pkcs8_encrypted_pem(
                pem,
                password.as_bytes(),
            )?)
        }
        _ => {
            if pem.contains(LEGACY_ENCRYPTION_HEADER) {
                return Err(Error::Format(
                    "legacy encrypted PKCS#1 keys are not supported, use encrypted PKCS#8"
                        .to_string(),
                ));
            }
            Ok(RsaPrivateKey::from_pkcs1_pem(pem)?)
        }
    }
}

/// Load-once, reference-counted handle to RSA private-key material.
///
/// Cloning shares the material; it is never copied. Handles are `Send +
/// Sync`, and concurrent [`PrivateKey::sign`] calls on clones do not share
/// any scratch state.
#[derive(Clone)]
pub struct PrivateKey {
    material: Option<Arc<KeyMaterial>>,
    resolver: Arc<dyn UriResolver>,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl Default for PrivateKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("material", &self.material)
            .finish_non_exhaustive()
    }
}

impl PrivateKey {
    /// Empty handle reporting to `tracing`.
    pub fn new() -> Self {
        Self {
            material: None,
            resolver: Arc::new(StandardUriResolver),
            diagnostics: Arc::new(TracingSink),
        }
    }

    /// Construct and immediately [`load`](Self::load). Failure leaves the
    /// handle empty; check [`is_loaded`](Self::is_loaded).
    pub fn from_uri(uri: &str, password: &str) -> Self {
        let mut key = Self::new();
        let _ = key.load(uri, password);
        key
    }

    pub fn from_config(config: &KeyConfig) -> Self {
        Self::from_uri(&config.private_key, config.password())
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn UriResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Load material from `uri`. An empty `password` means none.
    ///
    /// A no-op returning `Ok(())` when material is already present. Every
    /// failure emits one diagnostic and leaves the handle empty.
    pub fn load(&mut self, uri: &str, password: &str) -> Result<(), Error> {
        if self.material.is_some() {
            return Ok(());
        }
        let result = self.read_uri(uri, password);
        self.store(result)
    }

    /// Like [`load`](Self::load) for PEM text already in memory.
    pub fn load_pem(&mut self, pem: &str, password: &str) -> Result<(), Error> {
        if self.material.is_some() {
            return Ok(());
        }
        let result = KeyMaterial::from_pem(pem, password);
        self.store(result)
    }

    fn read_uri(&self, uri: &str, password: &str) -> Result<KeyMaterial, Error> {
        let resolved = self.resolver.resolve(uri);
        match resolved.scheme {
            UriScheme::File => KeyMaterial::from_file(Path::new(&resolved.path), password),
            scheme => Err(Error::Configuration(format!(
                "unsupported URI scheme '{}' in key path '{}'",
                scheme, uri
            ))),
        }
    }

    fn store(&mut self, result: Result<KeyMaterial, Error>) -> Result<(), Error> {
        match result {
            Ok(material) => {
                tracing::debug!(
                    origin = ?material.origin(),
                    modulus_bits = material.modulus_bits(),
                    "loaded private key"
                );
                self.material = Some(Arc::new(material));
                Ok(())
            }
            Err(err) => {
                self.report(LOAD, &err);
                Err(err)
            }
        }
    }

    /// Share `other`'s material, dropping whatever this handle held. If
    /// `other` is empty this handle becomes empty.
    pub fn assign(&mut self, other: &PrivateKey) {
        self.material = other.material.clone();
    }

    /// Release this handle's share. Idempotent.
    pub fn clear(&mut self) {
        self.material = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.material.is_some()
    }

    pub fn material(&self) -> Option<&KeyMaterial> {
        self.material.as_deref()
    }

    pub fn origin(&self) -> Option<&KeyOrigin> {
        self.material().map(KeyMaterial::origin)
    }

    /// Length of every signature this key produces, if loaded.
    pub fn signature_len(&self) -> Option<usize> {
        self.material().map(|m| m.rsa().size())
    }

    /// RSASSA-PSS-SHA256 signature over the concatenation of `fragments`.
    ///
    /// On success `out` holds exactly the signature bytes. On failure `out`
    /// is left untouched and one diagnostic names the failing step.
    pub fn sign(&self, fragments: &[&[u8]], out: &mut Vec<u8>) -> Result<(), Error> {
        let result = match self.material() {
            Some(material) => PssSigner::new(material.rsa()).sign(fragments),
            None => Err(Error::MissingKey),
        };
        match result {
            Ok(signature) => {
                *out = signature;
                Ok(())
            }
            Err(err) => {
                self.report(SIGN, &err);
                Err(err)
            }
        }
    }

    fn report(&self, operation: &'static str, err: &Error) {
        self.diagnostics.emit(&Diagnostic::from_error(operation, err));
    }
}
