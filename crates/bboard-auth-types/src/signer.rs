//! Tamper-evident signing of short values such as activation-link usernames.
//!
//! A signed value has the form `<value>:<mac>`, where `mac` is the unpadded
//! URL-safe base64 of HMAC-SHA256 over the salt and the value. Tokens carry no
//! timestamp and never expire.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const SEPARATOR: char = ':';

/// Salt used for account-activation tokens.
pub const ACTIVATION_SALT: &str = "bboard.activation";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("bad signature")]
    BadSignature,
    #[error("signing key rejected")]
    InvalidKey,
}

/// Signs and verifies values with a shared secret.
#[derive(Clone)]
pub struct Signer {
    /// Keyed with the secret and already fed the salt.
    salted: HmacSha256,
}

impl Signer {
    pub fn new(secret: &str, salt: &str) -> Result<Self, SignatureError> {
        let mut salted = <HmacSha256 as KeyInit>::new_from_slice(secret.as_bytes())
            .map_err(|_| SignatureError::InvalidKey)?;
        salted.update(salt.as_bytes());
        salted.update(&[0]);
        Ok(Self { salted })
    }

    /// Signer for activation links.
    pub fn activation(secret: &str) -> Result<Self, SignatureError> {
        Self::new(secret, ACTIVATION_SALT)
    }

    fn mac(&self, value: &str) -> HmacSha256 {
        let mut mac = self.salted.clone();
        mac.update(value.as_bytes());
        mac
    }

    /// Deterministically sign `value`.
    pub fn sign(&self, value: &str) -> String {
        let tag = self.mac(value).finalize().into_bytes();
        format!("{value}{SEPARATOR}{}", URL_SAFE_NO_PAD.encode(tag))
    }

    /// Recover the value from a token produced by [`Signer::sign`].
    pub fn unsign(&self, token: &str) -> Result<String, SignatureError> {
        let (value, encoded) = token
            .rsplit_once(SEPARATOR)
            .ok_or(SignatureError::BadSignature)?;
        let tag = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| SignatureError::BadSignature)?;
        self.mac(value)
            .verify_slice(&tag)
            .map_err(|_| SignatureError::BadSignature)?;
        Ok(value.to_owned())
    }
}
