//! Seeds an authentication realm with `<user>.hash` properties.
//!
//! [`RealmProvisioner`] takes declarations in any of the supported shapes,
//! digests plaintext secrets, canonicalizes the bytes and writes one record per
//! user into an injected [`RealmPropertySink`]. Batch calls isolate failures
//! per entry: an unusable algorithm or a malformed digest for one user is
//! logged and reported, and the rest of the batch still lands in the sink.
//! Structural problems (empty usernames, a user declaring neither password nor
//! hash) abort the call before anything is written.

use std::collections::{BTreeMap, HashMap};
use std::io::{self, Write};

use tracing::{debug, error, warn};

use crate::credentials::{validate_username, CredentialEntry, CredentialError, Secret, UserCredentials};
use crate::crypto::digest::{realm_digest, DigestAlgorithm, DigestError};
use crate::crypto::hex::canonicalize;
use crate::offsets;

const MESSAGE_BASE: u32 = match offsets::reserve("management") {
    Some(base) => base,
    None => panic!("management module has no reserved diagnostic range"),
};

/// Diagnostic codes logged by the provisioner.
pub mod codes {
    use super::MESSAGE_BASE;

    pub const UNKNOWN_ALGORITHM: u32 = MESSAGE_BASE + 1;
    pub const MALFORMED_DIGEST: u32 = MESSAGE_BASE + 2;
    pub const PROVISIONED: u32 = MESSAGE_BASE + 3;
}

/// Destination for finished credential records. Writes to the same key replace
/// the previous value. Implementations do no validation of their own.
pub trait RealmPropertySink {
    fn set(&mut self, key: &str, value: &str);
}

impl RealmPropertySink for BTreeMap<String, String> {
    fn set(&mut self, key: &str, value: &str) {
        self.insert(key.to_string(), value.to_string());
    }
}

impl RealmPropertySink for HashMap<String, String> {
    fn set(&mut self, key: &str, value: &str) {
        self.insert(key.to_string(), value.to_string());
    }
}

/// Renders records as `key=value` lines in properties-file syntax. The first
/// I/O error is kept and returned by [`PropertiesWriter::finish`].
pub struct PropertiesWriter<W: Write> {
    out: W,
    error: Option<io::Error>,
}

impl<W: Write> PropertiesWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, error: None }
    }

    pub fn finish(mut self) -> io::Result<W> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        self.out.flush()?;
        Ok(self.out)
    }
}

impl<W: Write> RealmPropertySink for PropertiesWriter<W> {
    fn set(&mut self, key: &str, value: &str) {
        if self.error.is_some() {
            return;
        }
        if let Err(err) = writeln!(self.out, "{}={}", escape_key(key), value) {
            self.error = Some(err);
        }
    }
}

fn escape_key(key: &str) -> String {
    let mut escaped = String::with_capacity(key.len());
    for (i, c) in key.chars().enumerate() {
        match c {
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            '\x0c' => escaped.push_str("\\f"),
            '\\' | '=' | ':' | ' ' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '#' | '!' if i == 0 => {
                escaped.push('\\');
                escaped.push(c);
            }
            _ => escaped.push(c),
        }
    }
    escaped
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestRecord {
    pub property_key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFailure {
    pub username: String,
    pub error: CredentialError,
}

/// Outcome of a batch: what reached the sink and what did not.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProvisioningReport {
    pub records: Vec<DigestRecord>,
    pub failures: Vec<EntryFailure>,
}

impl ProvisioningReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn push(&mut self, username: &str, outcome: Result<DigestRecord, CredentialError>) {
        match outcome {
            Ok(record) => self.records.push(record),
            Err(error) => self.failures.push(EntryFailure {
                username: username.to_string(),
                error,
            }),
        }
    }

    pub fn merge(&mut self, other: ProvisioningReport) {
        self.records.extend(other.records);
        self.failures.extend(other.failures);
    }
}

/// Writes credentials for one realm into a borrowed sink. The mutable borrow
/// makes the provisioner the sink's only writer for its lifetime.
pub struct RealmProvisioner<'s> {
    realm: String,
    algorithm: String,
    sink: &'s mut dyn RealmPropertySink,
}

impl<'s> RealmProvisioner<'s> {
    pub fn new(realm: impl Into<String>, sink: &'s mut dyn RealmPropertySink) -> Result<Self, CredentialError> {
        let realm = realm.into();
        if realm.is_empty() {
            return Err(CredentialError::InvalidCredentialDeclaration {
                username: String::new(),
                reason: "realm must not be empty",
            });
        }
        Ok(Self {
            realm,
            algorithm: DigestAlgorithm::default().name().to_string(),
            sink,
        })
    }

    /// Selects the digest algorithm by name. The name is resolved per entry, so
    /// an unknown name only fails entries that need hashing.
    pub fn with_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = algorithm.into();
        self
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Bulk map of username to precomputed hex digest.
    pub fn add_properties<I, K, V>(&mut self, entries: I) -> Result<ProvisioningReport, CredentialError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.add_properties_with(entries, false)
    }

    /// Bulk map of username to secret, `plain_text` applying to every entry.
    pub fn add_properties_with<I, K, V>(&mut self, entries: I, plain_text: bool) -> Result<ProvisioningReport, CredentialError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let entries: Vec<(K, V)> = entries.into_iter().collect();
        for (username, _) in &entries {
            validate_username(username.as_ref())?;
        }

        let mut report = ProvisioningReport::default();
        for (username, value) in &entries {
            let username = username.as_ref();
            let outcome = self.add_with(username, value.as_ref(), plain_text);
            report.push(username, outcome);
        }
        Ok(report)
    }

    /// Single user with a precomputed hex digest.
    pub fn add(&mut self, username: &str, hash: &str) -> Result<DigestRecord, CredentialError> {
        self.add_with(username, hash, false)
    }

    pub fn add_with(&mut self, username: &str, secret: &str, plain_text: bool) -> Result<DigestRecord, CredentialError> {
        validate_username(username)?;
        let secret = match Secret::declared(secret, plain_text) {
            Ok(secret) => secret,
            Err(err) => return Err(self.reject(username, err)),
        };
        let entry = CredentialEntry::new(username, self.realm.as_str(), secret)?;
        self.provision(entry)
    }

    /// Single user whose raw digest bytes are already at hand.
    pub fn add_digest(&mut self, username: &str, digest: &[u8]) -> Result<DigestRecord, CredentialError> {
        let entry = CredentialEntry::new(username, self.realm.as_str(), Secret::PrecomputedDigest(digest.to_vec()))?;
        self.provision(entry)
    }

    /// Per-user declaration. `configure` fills in a password or a hash; the
    /// password wins when both are set.
    pub fn user<F>(&mut self, username: &str, configure: F) -> Result<&mut Self, CredentialError>
    where
        F: FnOnce(&mut UserCredentials),
    {
        let mut declaration = UserCredentials::new();
        configure(&mut declaration);
        self.declare(username, declaration)?;
        Ok(self)
    }

    /// Resolves an already-filled [`UserCredentials`] and provisions it.
    pub fn declare(&mut self, username: &str, declaration: UserCredentials) -> Result<DigestRecord, CredentialError> {
        validate_username(username)?;
        let secret = match declaration.resolve(username) {
            Ok(secret) => secret,
            Err(CredentialError::Digest(err)) => return Err(self.reject(username, err)),
            Err(err) => return Err(err),
        };
        let entry = CredentialEntry::new(username, self.realm.as_str(), secret)?;
        self.provision(entry)
    }

    /// Provisions normalized entries one by one, collecting per-entry failures.
    pub fn provision_all<I>(&mut self, entries: I) -> ProvisioningReport
    where
        I: IntoIterator<Item = CredentialEntry>,
    {
        let mut report = ProvisioningReport::default();
        for entry in entries {
            let username = entry.username().to_string();
            let outcome = self.provision(entry);
            report.push(&username, outcome);
        }
        report
    }

    /// Turns one entry into its record and hands it to the sink.
    pub fn provision(&mut self, entry: CredentialEntry) -> Result<DigestRecord, CredentialError> {
        let bytes = match self.resolve_bytes(&entry) {
            Ok(bytes) => bytes,
            Err(err) => return Err(self.reject(entry.username(), err)),
        };

        let record = DigestRecord {
            property_key: entry.property_key(),
            value: canonicalize(&bytes),
        };
        self.sink.set(&record.property_key, &record.value);
        debug!(
            code = codes::PROVISIONED,
            realm = %self.realm,
            key = %record.property_key,
            "provisioned realm credential"
        );
        Ok(record)
    }

    fn resolve_bytes(&self, entry: &CredentialEntry) -> Result<Vec<u8>, DigestError> {
        match entry.secret() {
            Secret::Plaintext(secret) => {
                let algorithm = DigestAlgorithm::from_name(&self.algorithm)?;
                Ok(realm_digest(algorithm, entry.username(), entry.realm(), secret))
            }
            Secret::PrecomputedDigest(bytes) => {
                if bytes.is_empty() {
                    return Err(DigestError::MalformedDigest("empty digest".to_string()));
                }
                // Length is only checked against an algorithm the realm can actually use.
                if let Ok(algorithm) = DigestAlgorithm::from_name(&self.algorithm) {
                    if bytes.len() != algorithm.output_len() {
                        return Err(DigestError::MalformedDigest(format!(
                            "{} bytes given, {} produces {}",
                            bytes.len(),
                            algorithm,
                            algorithm.output_len()
                        )));
                    }
                }
                Ok(bytes.clone())
            }
        }
    }

    fn reject(&self, username: &str, err: DigestError) -> CredentialError {
        match &err {
            DigestError::UnsupportedAlgorithm(name) => error!(
                code = codes::UNKNOWN_ALGORITHM,
                realm = %self.realm,
                user = %username,
                algorithm = %name,
                "digest algorithm unavailable; user left without credentials"
            ),
            DigestError::MalformedDigest(reason) => warn!(
                code = codes::MALFORMED_DIGEST,
                realm = %self.realm,
                user = %username,
                %reason,
                "rejected precomputed digest"
            ),
        }
        CredentialError::Digest(err)
    }
}
