pub mod artifacts;
pub mod identifiers;
pub mod issued;
pub mod keygen;
pub mod metadata;
pub mod parser;
pub mod service;
pub mod thumbprint;

pub use artifacts::{ArtifactWriter, PersistedArtifacts};
pub use identifiers::IdentifierSet;
pub use issued::{IssuedChain, LoadedCertificate, PrivateKey};
pub use keygen::{generate_request, CertificateRequest, KeyMaterial};
pub use metadata::CertificateMetadata;
pub use parser::CertificateParser;
pub use service::{CertificateService, RenewOutcome};
pub use thumbprint::{Thumbprint, ThumbprintParseError};
