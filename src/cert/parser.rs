use crate::cert::metadata::CertificateMetadata;
use crate::cert::Thumbprint;
use crate::utils::errors::{AcmeCertError, Result};
use crate::utils::pem::{pem_to_der, CERTIFICATE_TAG};
use chrono::{DateTime, Utc};
use x509_parser::prelude::*;

pub struct CertificateParser;

impl CertificateParser {
    /// Parse certificate PEM data into metadata
    pub fn parse_pem(pem_data: &str) -> Result<CertificateMetadata> {
        let der_bytes = pem_to_der(pem_data, CERTIFICATE_TAG)?;
        Self::parse_der(&der_bytes)
    }

    /// Parse a DER certificate into metadata
    pub fn parse_der(der_bytes: &[u8]) -> Result<CertificateMetadata> {
        let (_, cert) = X509Certificate::from_der(der_bytes)
            .map_err(|e| AcmeCertError::CertParsing(format!("DER parsing error: {e}")))?;

        Ok(Self::extract_metadata(&cert, der_bytes))
    }

    /// Extract metadata from X509 certificate
    fn extract_metadata(cert: &X509Certificate, der_bytes: &[u8]) -> CertificateMetadata {
        let cn = cert
            .subject()
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
            .unwrap_or("Unknown")
            .to_string();

        let not_before = DateTime::from_timestamp(cert.validity().not_before.timestamp(), 0)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let not_after = DateTime::from_timestamp(cert.validity().not_after.timestamp(), 0)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let mut sans = Vec::new();
        if let Ok(Some(san)) = cert.subject_alternative_name() {
            for name in &san.value.general_names {
                if let GeneralName::DNSName(dns) = name {
                    sans.push(dns.to_string());
                }
            }
        }

        let is_ca = cert
            .basic_constraints()
            .ok()
            .flatten()
            .map(|bc| bc.value.ca)
            .unwrap_or(false);

        CertificateMetadata {
            thumbprint: Thumbprint::of_der(der_bytes),
            cn,
            issuer: cert.issuer().to_string(),
            not_before,
            not_after,
            sans,
            is_ca,
            subject_raw: cert.subject().as_raw().to_vec(),
            issuer_raw: cert.issuer().as_raw().to_vec(),
        }
    }
}
