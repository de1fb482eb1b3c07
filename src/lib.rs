pub mod acme;
pub mod cert;
pub mod cli;
pub mod config;
pub mod store;
pub mod utils;

#[cfg(test)]
mod test_support;

// Re-export specific items to avoid conflicts
pub use acme::{AcmeClient, CertificateAuthority, HttpAcmeClient};
pub use cert::{
    CertificateMetadata, CertificateParser, CertificateService, IdentifierSet, Thumbprint,
};
pub use cli::{args, commands};
pub use config::Settings;
pub use store::{CertificateStore, FileCertificateStore};
pub use utils::{errors, paths};
