//! Shared fixtures for unit tests.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use pkcs5::pbes2;
use rand::rngs::OsRng;
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::pkcs8::{EncodePrivateKey, LineEnding, PrivateKeyInfo};
use rsa::pss::{Signature, VerifyingKey};
use rsa::signature::Verifier;
use rsa::RsaPrivateKey;
use sha2::Sha256;

/// 1024 bits keeps debug-build key generation fast.
const TEST_KEY_BITS: usize = 1024;

pub(crate) fn test_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| RsaPrivateKey::new(&mut OsRng, TEST_KEY_BITS).unwrap())
}

pub(crate) fn other_test_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| RsaPrivateKey::new(&mut OsRng, TEST_KEY_BITS).unwrap())
}

/// Too small to hold a PSS-SHA256 encoding with a 32-byte salt.
pub(crate) fn small_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| RsaPrivateKey::new(&mut OsRng, 512).unwrap())
}

pub(crate) fn pkcs8_pem(key: &RsaPrivateKey) -> String {
    key.to_pkcs8_pem(LineEnding::LF).unwrap().to_string()
}

pub(crate) fn pkcs1_pem(key: &RsaPrivateKey) -> String {
    key.to_pkcs1_pem(LineEnding::LF).unwrap().to_string()
}

/// PBES2 (PBKDF2-SHA256 + AES-256-CBC) with a low iteration count.
pub(crate) fn encrypted_pkcs8_pem(key: &RsaPrivateKey, password: &str) -> String {
    let der = key.to_pkcs8_der().unwrap();
    let info = PrivateKeyInfo::try_from(der.as_bytes()).unwrap();
    let salt = [0x5a_u8; 16];
    let iv = [0x07_u8; 16];
    let params = pbes2::Parameters::pbkdf2_sha256_aes256cbc(1_000, &salt, &iv).unwrap();
    info.encrypt_with_params(params, password)
        .unwrap()
        .to_pem("ENCRYPTED PRIVATE KEY", LineEnding::LF)
        .unwrap()
        .to_string()
}

/// Write `contents` to `name` under `dir` and return the `file:` URI.
pub(crate) fn write_key_file(dir: &Path, name: &str, contents: &str) -> (PathBuf, String) {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    let uri = format!("file:{}", path.display());
    (path, uri)
}

pub(crate) fn verify_pss(key: &RsaPrivateKey, message: &[u8], signature: &[u8]) -> bool {
    let verifying_key = VerifyingKey::<Sha256>::new(key.to_public_key());
    let Ok(signature) = Signature::try_from(signature) else {
        return false;
    };
    verifying_key.verify(message, &signature).is_ok()
}
