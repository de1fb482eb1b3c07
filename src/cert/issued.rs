use crate::cert::metadata::CertificateMetadata;
use crate::cert::CertificateParser;
use crate::utils::errors::{AcmeCertError, Result};
use chrono::{DateTime, Utc};
use p12::PFX;

/// What the authority handed back for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedChain {
    pub certificate_der: Vec<u8>,
    /// Absent when the authority response carried no parent link
    pub issuer_der: Option<Vec<u8>>,
}

/// Private key material travelling with a leaf certificate
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey {
    pub pkcs8_der: Vec<u8>,
    pub exportable: bool,
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey")
            .field("exportable", &self.exportable)
            .finish_non_exhaustive()
    }
}

/// A certificate ready for installation into a trust store
#[derive(Debug, Clone)]
pub struct LoadedCertificate {
    pub der: Vec<u8>,
    pub metadata: CertificateMetadata,
    /// Display label; not part of the signed certificate
    pub friendly_name: String,
    pub private_key: Option<PrivateKey>,
    /// Further certificates shipped with the leaf, nearest issuer first
    pub chain: Vec<Vec<u8>>,
}

impl LoadedCertificate {
    pub fn new(
        der: Vec<u8>,
        friendly_name: String,
        private_key: Option<PrivateKey>,
        chain: Vec<Vec<u8>>,
    ) -> Result<Self> {
        let metadata = CertificateParser::parse_der(&der)?;
        Ok(Self {
            der,
            metadata,
            friendly_name,
            private_key,
            chain,
        })
    }

    /// Load a PKCS#12 archive. The leaf is the certificate that issued none of
    /// the others; every other certificate becomes chain.
    pub fn from_archive(
        archive: &[u8],
        password: &str,
        friendly_name: String,
        exportable: bool,
    ) -> Result<Self> {
        let pfx = PFX::parse(archive)
            .map_err(|e| AcmeCertError::Archive(format!("Cannot parse archive: {e:?}")))?;

        if !pfx.verify_mac(password) {
            return Err(AcmeCertError::Archive(
                "Archive password is incorrect".to_string(),
            ));
        }

        let certificates = pfx
            .cert_x509_bags(password)
            .map_err(|e| AcmeCertError::Archive(format!("Cannot read certificates: {e:?}")))?;
        let key = pfx
            .key_bags(password)
            .map_err(|e| AcmeCertError::Archive(format!("Cannot read private key: {e:?}")))?
            .into_iter()
            .next()
            .ok_or_else(|| AcmeCertError::Archive("Archive holds no private key".to_string()))?;

        let parsed = certificates
            .into_iter()
            .map(|der| CertificateParser::parse_der(&der).map(|metadata| (der, metadata)))
            .collect::<Result<Vec<_>>>()?;

        let leaf_index = parsed
            .iter()
            .position(|(_, candidate)| {
                !parsed.iter().any(|(_, other)| {
                    other.thumbprint != candidate.thumbprint && other.is_issued_by(candidate)
                })
            })
            .ok_or_else(|| AcmeCertError::Archive("Archive holds no certificate".to_string()))?;

        let mut chain = Vec::new();
        let mut leaf = None;
        for (index, entry) in parsed.into_iter().enumerate() {
            if index == leaf_index {
                leaf = Some(entry);
            } else {
                chain.push(entry.0);
            }
        }
        let (der, metadata) =
            leaf.ok_or_else(|| AcmeCertError::Archive("Archive holds no certificate".to_string()))?;

        tracing::debug!(
            "Loaded {} with {} chain certificate(s) from archive",
            metadata.cn,
            chain.len()
        );

        Ok(Self {
            der,
            metadata,
            friendly_name,
            private_key: Some(PrivateKey {
                pkcs8_der: key,
                exportable,
            }),
            chain,
        })
    }
}

/// Display label for an issued certificate: primary name plus issuance time
pub fn friendly_name(primary: &str, issued_at: DateTime<Utc>, date_format: &str) -> String {
    format!("{primary} {}", issued_at.format(date_format))
}
