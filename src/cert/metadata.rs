use crate::cert::Thumbprint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateMetadata {
    pub thumbprint: Thumbprint,
    pub cn: String,
    /// Issuer distinguished name in RFC 4514 form
    pub issuer: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub sans: Vec<String>,
    pub is_ca: bool,
    /// Raw DER of the subject and issuer names, used to link chain elements
    #[serde(skip)]
    pub subject_raw: Vec<u8>,
    #[serde(skip)]
    pub issuer_raw: Vec<u8>,
}

impl CertificateMetadata {
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.not_after
    }

    pub fn is_self_signed(&self) -> bool {
        self.subject_raw == self.issuer_raw
    }

    /// True when `issuer` names this certificate's issuer
    pub fn is_issued_by(&self, issuer: &CertificateMetadata) -> bool {
        self.issuer_raw == issuer.subject_raw
    }
}

impl fmt::Display for CertificateMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CN: {}, Thumbprint: {}, Expires: {}",
            self.cn,
            self.thumbprint,
            self.not_after.format("%Y-%m-%d %H:%M")
        )
    }
}
