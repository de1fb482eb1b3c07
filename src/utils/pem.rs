use crate::utils::errors::{AcmeCertError, Result};
use pem::{EncodeConfig, LineEnding, Pem};

pub const CERTIFICATE_TAG: &str = "CERTIFICATE";
pub const CSR_TAG: &str = "CERTIFICATE REQUEST";
pub const PRIVATE_KEY_TAG: &str = "PRIVATE KEY";

/// Represents a PEM-encoded certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PemCertificate {
    pem_data: String,
}

/// Represents a chain of PEM certificates, leaf first
#[derive(Debug, Clone, Default)]
pub struct PemCertificateChain {
    certificates: Vec<PemCertificate>,
}

impl PemCertificate {
    /// Encode DER certificate bytes as PEM
    pub fn from_der(der: &[u8]) -> Self {
        Self {
            pem_data: der_to_pem(CERTIFICATE_TAG, der),
        }
    }

    /// Wrap existing PEM text
    pub fn new(pem_data: String) -> Self {
        Self {
            pem_data: normalize_pem(&pem_data),
        }
    }

    /// Get the raw PEM data
    pub fn pem_data(&self) -> &str {
        &self.pem_data
    }

    /// Decode back to DER
    pub fn to_der(&self) -> Result<Vec<u8>> {
        pem_to_der(&self.pem_data, CERTIFICATE_TAG)
    }
}

impl PemCertificateChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a certificate to the chain
    pub fn add_certificate(&mut self, cert: PemCertificate) {
        self.certificates.push(cert);
    }

    /// Get all certificates in the chain
    pub fn certificates(&self) -> &[PemCertificate] {
        &self.certificates
    }

    /// Get raw PEM data for all certificates concatenated, without re-encoding
    pub fn pem_data(&self) -> String {
        self.certificates
            .iter()
            .map(|cert| cert.pem_data())
            .collect::<Vec<_>>()
            .join("")
    }
}

/// Encode DER bytes under the given PEM tag with LF line endings
pub fn der_to_pem(tag: &str, der: &[u8]) -> String {
    let config = EncodeConfig::new().set_line_ending(LineEnding::LF);
    pem::encode_config(&Pem::new(tag, der.to_vec()), config)
}

/// Decode the first PEM block, which must carry the expected tag
pub fn pem_to_der(pem_data: &str, expected_tag: &str) -> Result<Vec<u8>> {
    let block = pem::parse(pem_data)
        .map_err(|e| AcmeCertError::CertParsing(format!("Invalid PEM data: {e}")))?;

    if block.tag() != expected_tag {
        return Err(AcmeCertError::CertParsing(format!(
            "Expected PEM block '{expected_tag}', found '{}'",
            block.tag()
        )));
    }

    Ok(block.into_contents())
}

/// Normalize PEM data to ensure consistent formatting
fn normalize_pem(pem_data: &str) -> String {
    let trimmed = pem_data.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    // Ensure PEM data ends with exactly one newline
    format!("{trimmed}\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_der_pem_round_trip_is_byte_identical() {
        let der: Vec<u8> = (0u8..=255).cycle().take(1500).collect();
        let pem = PemCertificate::from_der(&der);

        assert!(pem.pem_data().starts_with("-----BEGIN CERTIFICATE-----\n"));
        assert!(pem.pem_data().ends_with("-----END CERTIFICATE-----\n"));
        assert!(!pem.pem_data().contains('\r'));
        assert_eq!(pem.to_der().unwrap(), der);
    }

    #[test]
    fn test_wrong_tag_is_rejected() {
        let pem = der_to_pem(PRIVATE_KEY_TAG, b"secret");
        assert!(matches!(
            pem_to_der(&pem, CERTIFICATE_TAG),
            Err(AcmeCertError::CertParsing(_))
        ));
    }

    #[test]
    fn test_chain_is_raw_concatenation() {
        let leaf = PemCertificate::from_der(b"leaf-bytes");
        let issuer = PemCertificate::from_der(b"issuer-bytes");

        let mut chain = PemCertificateChain::new();
        chain.add_certificate(leaf.clone());
        chain.add_certificate(issuer.clone());

        assert_eq!(
            chain.pem_data(),
            format!("{}{}", leaf.pem_data(), issuer.pem_data())
        );
        let blocks: Vec<Vec<u8>> = pem::parse_many(chain.pem_data())
            .unwrap()
            .into_iter()
            .map(|block| block.into_contents())
            .collect();
        assert_eq!(blocks, vec![b"leaf-bytes".to_vec(), b"issuer-bytes".to_vec()]);
    }

    #[test]
    fn test_normalize_pem() {
        let cert = PemCertificate::new("\n  -----BEGIN CERTIFICATE-----\nAA==\n-----END CERTIFICATE-----\n\n".to_string());
        assert_eq!(
            cert.pem_data(),
            "-----BEGIN CERTIFICATE-----\nAA==\n-----END CERTIFICATE-----\n"
        );
    }
}
