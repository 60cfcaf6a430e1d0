//! Build-time plumbing shared by server fractions: the table of reserved
//! diagnostic code ranges, and the pipeline that turns declared realm users
//! into `<user>.hash` properties.

pub mod config;
pub mod credentials;
pub mod crypto;
pub mod offsets;
pub mod realm;

pub use credentials::{CredentialEntry, CredentialError, Secret, UserCredentials};
pub use crypto::digest::{DigestAlgorithm, DigestError};
pub use crypto::hex::canonicalize;
pub use offsets::{ModuleOffset, NamespaceCollision};
pub use realm::{DigestRecord, ProvisioningReport, RealmPropertySink, RealmProvisioner};
