//! Provisioning document loader. A deployment describes its realm users in a
//! JSON file; the loader checks the structure up front so that a malformed
//! declaration stops the run before any credential is written.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::credentials::{CredentialError, UserCredentials};
use crate::crypto::digest::DigestAlgorithm;
use crate::realm::{ProvisioningReport, RealmPropertySink, RealmProvisioner};

/// Environment variable consulted when no path is given on the command line.
pub const CONFIG_ENV: &str = "REALM_SEED_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "realm-seed.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file unreadable: {0}")]
    Io(String),
    #[error("config parse failed: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

fn default_algorithm() -> String {
    DigestAlgorithm::default().name().to_string()
}

/// Users sharing one `plainText` flag.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkUsers {
    #[serde(default)]
    pub plain_text: bool,
    #[serde(default)]
    pub entries: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct UserDeclaration {
    pub name: String,
    pub password: Option<String>,
    pub hash: Option<String>,
}

impl UserDeclaration {
    pub fn credentials(&self) -> UserCredentials {
        let mut credentials = UserCredentials::new();
        if let Some(password) = &self.password {
            credentials.password(password.as_str());
        }
        if let Some(hash) = &self.hash {
            credentials.hash(hash.as_str());
        }
        credentials
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisioningConfig {
    pub realm: String,
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    pub debug_level: Option<String>,
    #[serde(default)]
    pub users: Option<BulkUsers>,
    #[serde(default, rename = "user")]
    pub user: Vec<UserDeclaration>,
}

impl ProvisioningConfig {
    pub fn from_json(raw_json: &str) -> Result<Self, ConfigError> {
        let config: ProvisioningConfig =
            serde_json::from_str(raw_json).map_err(|e| ConfigError::Parse(format!("{e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects structural mistakes. The algorithm name is not checked here; an
    /// unknown algorithm fails per entry at provisioning time.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.realm.trim().is_empty() {
            return Err(ConfigError::Invalid("realm must not be empty".to_string()));
        }
        if let Some(bulk) = &self.users {
            if bulk.entries.keys().any(|name| name.is_empty()) {
                return Err(ConfigError::Invalid("users.entries contains an empty username".to_string()));
            }
        }
        for declaration in &self.user {
            if declaration.name.is_empty() {
                return Err(ConfigError::Invalid("user entry without a name".to_string()));
            }
            if declaration.password.is_none() && declaration.hash.is_none() {
                return Err(ConfigError::Invalid(format!(
                    "user `{}` declares neither password nor hash",
                    declaration.name
                )));
            }
        }
        Ok(())
    }

    /// Writes every declared user into `sink`: the bulk map first, then the
    /// per-user declarations, so a per-user entry overrides a bulk one.
    pub fn provision(&self, sink: &mut dyn RealmPropertySink) -> Result<ProvisioningReport, CredentialError> {
        let mut provisioner = RealmProvisioner::new(self.realm.as_str(), sink)?.with_algorithm(self.algorithm.as_str());

        let mut report = match &self.users {
            Some(bulk) => provisioner.add_properties_with(&bulk.entries, bulk.plain_text)?,
            None => ProvisioningReport::default(),
        };

        let mut declared = ProvisioningReport::default();
        for declaration in &self.user {
            let outcome = provisioner.declare(&declaration.name, declaration.credentials());
            declared.push(&declaration.name, outcome);
        }
        report.merge(declared);
        Ok(report)
    }
}

/// Loads and validates the provisioning document at `path`.
pub fn load_config(path: impl AsRef<Path>) -> Result<ProvisioningConfig, ConfigError> {
    let raw_json = fs::read_to_string(&path).map_err(|e| ConfigError::Io(format!("{e}")))?;
    ProvisioningConfig::from_json(&raw_json)
}

/// Picks the config path: explicit argument, then `REALM_SEED_CONFIG`, then
/// `realm-seed.json` in the working directory.
pub fn config_path(arg: Option<&str>) -> PathBuf {
    match arg {
        Some(path) => PathBuf::from(path),
        None => env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH)),
    }
}
