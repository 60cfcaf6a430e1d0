//! Realm-scoped credential digests.
//!
//! A realm verifies a user by hashing `username:realm:password` and comparing
//! against the stored value. The hash input is always UTF-8 and the algorithm
//! must be the one the consuming realm expects: a mismatch does not fail here,
//! it fails later as a login that can never succeed. The legacy realm format
//! uses MD5, which stays the default.

use std::fmt;
use std::str::FromStr;

use md5::Md5;
use sha2::{Digest, Sha256};
use thiserror::Error;
use zeroize::Zeroize;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DigestError {
    #[error("unsupported digest algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("malformed digest: {0}")]
    MalformedDigest(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DigestAlgorithm {
    /// 128-bit digest verified by the legacy properties realm.
    #[default]
    Md5,
    Sha256,
}

impl DigestAlgorithm {
    /// Resolves an algorithm by the name a realm declares, ignoring case.
    pub fn from_name(name: &str) -> Result<Self, DigestError> {
        match name.trim().to_ascii_uppercase().as_str() {
            "MD5" => Ok(Self::Md5),
            "SHA-256" | "SHA256" => Ok(Self::Sha256),
            _ => Err(DigestError::UnsupportedAlgorithm(name.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::Sha256 => "SHA-256",
        }
    }

    /// Digest length in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Sha256 => 32,
        }
    }

    pub fn compute(&self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Md5 => Md5::digest(data).to_vec(),
            Self::Sha256 => Sha256::digest(data).to_vec(),
        }
    }
}

impl FromStr for DigestAlgorithm {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Hashes `username:realm:secret` with `algorithm`. The joined plaintext is
/// wiped before returning.
pub fn realm_digest(algorithm: DigestAlgorithm, username: &str, realm: &str, secret: &str) -> Vec<u8> {
    let mut material = format!("{username}:{realm}:{secret}");
    let digest = algorithm.compute(material.as_bytes());
    material.zeroize();
    digest
}

/// Same as [`realm_digest`] with the algorithm given by name.
pub fn digest(algorithm: &str, username: &str, realm: &str, secret: &str) -> Result<Vec<u8>, DigestError> {
    let algorithm = DigestAlgorithm::from_name(algorithm)?;
    Ok(realm_digest(algorithm, username, realm, secret))
}
