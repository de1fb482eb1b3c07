//! Trust store access.
//!
//! A store is opened by name, used, and closed within one operation. Handles
//! are never cached; see [`manager`] for the operations built on top.

pub mod filesystem;
pub mod listing;
pub mod manager;

pub use filesystem::FileCertificateStore;
pub use listing::StoreColumn;
pub use manager::{install, lookup, uninstall, InstallReport};

use crate::cert::issued::{LoadedCertificate, PrivateKey};
use crate::cert::{CertificateMetadata, CertificateParser, Thumbprint};
use crate::utils::errors::Result;

/// Issuer name fragments of the authorities whose certificates this tool manages
pub const KNOWN_AUTHORITY_NAMES: &[&str] = &[
    "Let's Encrypt",
    "Fake LE",
    "(STAGING)",
    "LE Intermediate",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    ReadOnly,
    ReadWrite,
}

/// A certificate as held by a store
#[derive(Debug, Clone)]
pub struct StoreEntry {
    pub der: Vec<u8>,
    pub metadata: CertificateMetadata,
    pub friendly_name: String,
    pub private_key: Option<PrivateKey>,
}

impl StoreEntry {
    /// Entry for a certificate without key material or label
    pub fn from_der(der: Vec<u8>) -> Result<Self> {
        let metadata = CertificateParser::parse_der(&der)?;
        Ok(Self {
            der,
            metadata,
            friendly_name: String::new(),
            private_key: None,
        })
    }

    pub fn thumbprint(&self) -> &Thumbprint {
        &self.metadata.thumbprint
    }

    pub fn has_private_key(&self) -> bool {
        self.private_key.is_some()
    }

    /// The label is `host` alone or `host` followed by a space, as written by
    /// [`friendly_name`](crate::cert::issued::friendly_name)
    pub fn is_labelled_for(&self, host: &str) -> bool {
        self.friendly_name
            .strip_prefix(host)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(' '))
    }

    /// Subject CN or one of the SANs is `host`, ignoring case
    pub fn covers(&self, host: &str) -> bool {
        self.metadata.cn.eq_ignore_ascii_case(host)
            || self
                .metadata
                .sans
                .iter()
                .any(|name| name.eq_ignore_ascii_case(host))
    }

    /// Issued by one of [`KNOWN_AUTHORITY_NAMES`]
    pub fn is_from_known_authority(&self) -> bool {
        KNOWN_AUTHORITY_NAMES
            .iter()
            .any(|name| self.metadata.issuer.contains(name))
    }
}

impl From<&LoadedCertificate> for StoreEntry {
    fn from(certificate: &LoadedCertificate) -> Self {
        Self {
            der: certificate.der.clone(),
            metadata: certificate.metadata.clone(),
            friendly_name: certificate.friendly_name.clone(),
            private_key: certificate.private_key.clone(),
        }
    }
}

/// Opens named stores
pub trait CertificateStore {
    fn open(&self, name: &str, mode: OpenMode) -> Result<Box<dyn StoreHandle>>;
}

/// An open store. Dropping a handle releases it as well, but [`close`]
/// reports release failures.
///
/// [`close`]: StoreHandle::close
pub trait StoreHandle {
    fn name(&self) -> &str;

    fn entries(&self) -> Result<Vec<StoreEntry>>;

    fn add(&mut self, entry: &StoreEntry) -> Result<()>;

    fn remove(&mut self, entry: &StoreEntry) -> Result<()>;

    fn close(self: Box<Self>) -> Result<()>;
}
