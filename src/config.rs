//! Key configuration as it appears in a JSON settings document.

use std::fmt;

use serde::Deserialize;
use zeroize::Zeroizing;

use crate::error::Error;

/// Location of a private key and the passphrase protecting it.
///
/// ```json
/// { "private_key": "file:certs/identity_key.pem", "password": "s3cret" }
/// ```
///
/// The password is wiped from memory when the config is dropped.
#[derive(Clone, Deserialize)]
pub struct KeyConfig {
    /// Key URI, e.g. `file:/etc/identity/key.pem`.
    pub private_key: String,
    #[serde(default)]
    pub password: Option<Zeroizing<String>>,
}

impl KeyConfig {
    pub fn new(private_key: impl Into<String>) -> Self {
        Self {
            private_key: private_key.into(),
            password: None,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(Zeroizing::new(password.into()));
        self
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        let config: KeyConfig = serde_json::from_str(json)?;
        if config.private_key.is_empty() {
            return Err(Error::Configuration(
                "private_key must not be empty".to_string(),
            ));
        }
        Ok(config)
    }

    /// The password, or `""` when none is configured.
    pub fn password(&self) -> &str {
        self.password.as_ref().map_or("", |p| p.as_str())
    }
}

impl fmt::Debug for KeyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyConfig")
            .field("private_key", &self.private_key)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
