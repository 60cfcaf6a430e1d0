//! Credential declarations and their normalized form.
//!
//! Users can be declared as a bulk map, a single `(user, secret, plain_text)`
//! triple or a per-user [`UserCredentials`] builder. All of them end up as a
//! [`CredentialEntry`] whose [`Secret`] is either plaintext to be digested or
//! digest bytes to be stored as-is, never both.

use std::fmt;

use thiserror::Error;
use zeroize::Zeroizing;

use crate::crypto::digest::DigestError;
use crate::crypto::hex::parse_digest;

/// Suffix appended to a username to form its realm property key.
pub const HASH_PROPERTY_SUFFIX: &str = ".hash";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("invalid credential declaration for user `{username}`: {reason}")]
    InvalidCredentialDeclaration { username: String, reason: &'static str },
    #[error(transparent)]
    Digest(#[from] DigestError),
}

impl CredentialError {
    fn invalid(username: &str, reason: &'static str) -> Self {
        Self::InvalidCredentialDeclaration {
            username: username.to_string(),
            reason,
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub enum Secret {
    Plaintext(Zeroizing<String>),
    PrecomputedDigest(Vec<u8>),
}

impl Secret {
    pub fn plaintext(secret: impl Into<String>) -> Self {
        Self::Plaintext(Zeroizing::new(secret.into()))
    }

    /// Interprets a declared string: plaintext when `plain_text` is set,
    /// otherwise hex text of an already-computed digest.
    pub fn declared(value: &str, plain_text: bool) -> Result<Self, DigestError> {
        if plain_text {
            Ok(Self::plaintext(value))
        } else {
            parse_digest(value).map(Self::PrecomputedDigest)
        }
    }

    pub fn is_plaintext(&self) -> bool {
        matches!(self, Self::Plaintext(_))
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plaintext(_) => f.write_str("Plaintext(<redacted>)"),
            Self::PrecomputedDigest(bytes) => write!(f, "PrecomputedDigest({} bytes)", bytes.len()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialEntry {
    username: String,
    realm: String,
    secret: Secret,
}

impl CredentialEntry {
    pub fn new(username: impl Into<String>, realm: impl Into<String>, secret: Secret) -> Result<Self, CredentialError> {
        let username = username.into();
        let realm = realm.into();
        validate_username(&username)?;
        if realm.is_empty() {
            return Err(CredentialError::invalid(&username, "realm must not be empty"));
        }
        Ok(Self {
            username,
            realm,
            secret,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    pub fn secret(&self) -> &Secret {
        &self.secret
    }

    pub fn property_key(&self) -> String {
        property_key(&self.username)
    }
}

pub fn property_key(username: &str) -> String {
    format!("{username}{HASH_PROPERTY_SUFFIX}")
}

pub(crate) fn validate_username(username: &str) -> Result<(), CredentialError> {
    if username.is_empty() {
        return Err(CredentialError::invalid(username, "username must not be empty"));
    }
    Ok(())
}

/// Per-user declaration filled in by the caller. `password` takes precedence
/// over `hash`; declaring neither is rejected by [`UserCredentials::resolve`].
#[derive(Default, Clone)]
pub struct UserCredentials {
    password: Option<Zeroizing<String>>,
    hash: Option<String>,
}

impl UserCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn password(&mut self, password: impl Into<String>) -> &mut Self {
        self.password = Some(Zeroizing::new(password.into()));
        self
    }

    /// Hex text of a digest computed elsewhere.
    pub fn hash(&mut self, hash: impl Into<String>) -> &mut Self {
        self.hash = Some(hash.into());
        self
    }

    pub fn resolve(self, username: &str) -> Result<Secret, CredentialError> {
        match (self.password, self.hash) {
            (Some(password), _) => Ok(Secret::Plaintext(password)),
            (None, Some(hash)) => Ok(parse_digest(&hash).map(Secret::PrecomputedDigest)?),
            (None, None) => Err(CredentialError::invalid(username, "neither password nor hash is set")),
        }
    }
}

impl fmt::Debug for UserCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserCredentials")
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("hash", &self.hash)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_wins_over_hash() {
        let mut config = UserCredentials::new();
        config.password("secret").hash("00ff");
        let secret = config.resolve("bob").expect("valid declaration");
        assert_eq!(secret, Secret::plaintext("secret"));
    }

    #[test]
    fn hash_only_is_precomputed() {
        let mut config = UserCredentials::new();
        config.hash("00FF");
        let secret = config.resolve("bob").expect("valid declaration");
        assert_eq!(secret, Secret::PrecomputedDigest(vec![0x00, 0xff]));
    }

    #[test]
    fn neither_field_is_invalid() {
        let err = UserCredentials::new().resolve("bob").unwrap_err();
        assert_eq!(
            err,
            CredentialError::InvalidCredentialDeclaration {
                username: "bob".to_string(),
                reason: "neither password nor hash is set",
            }
        );
    }

    #[test]
    fn malformed_hash_is_a_digest_error() {
        let mut config = UserCredentials::new();
        config.hash("zz");
        let err = config.resolve("bob").unwrap_err();
        assert!(matches!(err, CredentialError::Digest(DigestError::MalformedDigest(_))));
    }

    #[test]
    fn declared_secret_follows_plain_text_flag() {
        assert!(Secret::declared("secret", true).unwrap().is_plaintext());
        assert_eq!(
            Secret::declared("0a0B", false).unwrap(),
            Secret::PrecomputedDigest(vec![0x0a, 0x0b])
        );
        assert!(Secret::declared("secret", false).is_err());
    }

    #[test]
    fn entry_requires_username_and_realm() {
        assert!(CredentialEntry::new("", "ApplicationRealm", Secret::plaintext("x")).is_err());
        assert!(CredentialEntry::new("bob", "", Secret::plaintext("x")).is_err());
        let entry = CredentialEntry::new("bob", "ApplicationRealm", Secret::plaintext("x")).unwrap();
        assert_eq!(entry.property_key(), "bob.hash");
    }

    #[test]
    fn debug_output_redacts_plaintext() {
        let secret = Secret::plaintext("hunter2");
        assert_eq!(format!("{secret:?}"), "Plaintext(<redacted>)");
        let mut config = UserCredentials::new();
        config.password("hunter2");
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
