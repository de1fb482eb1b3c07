//! RSA key pair and certificate signing request generation.
//!
//! Keys come from the `rsa` crate; the request itself is assembled by `rcgen`,
//! which signs through [`RsaRequestSigner`] with PKCS#1 v1.5 over SHA-256.

use crate::cert::IdentifierSet;
use crate::utils::errors::{AcmeCertError, Result};
use crate::utils::pem::{der_to_pem, CSR_TAG};
use base64::{engine::general_purpose, Engine as _};
use rand::rngs::OsRng;
use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair, RemoteKeyPair};
use rsa::pkcs1::EncodeRsaPublicKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding};
use rsa::signature::{SignatureEncoding, Signer};
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

/// Modulus size used when no valid size is configured
pub const DEFAULT_KEY_BITS: usize = 2048;
pub const MIN_KEY_BITS: usize = 1024;

const KEY_ALGORITHM: &str = "RSA";
const CSR_SIGNATURE_ALGORITHM: &str = "SHA256withRSA";

/// An RSA key pair produced for one issuance attempt
#[derive(Clone)]
pub struct KeyMaterial {
    private_key: RsaPrivateKey,
}

/// On-disk form of [`KeyMaterial`] for re-import by this generator
#[derive(Debug, Serialize, Deserialize)]
struct NativeKey {
    algorithm: String,
    bits: usize,
    pkcs8: String,
}

impl KeyMaterial {
    /// Generate a new key, falling back to [`DEFAULT_KEY_BITS`] when the
    /// requested size is missing or too small
    pub fn generate(requested_bits: Option<u32>) -> Result<Self> {
        let bits = select_key_bits(requested_bits);
        tracing::debug!("Generating {bits}-bit RSA key");

        let private_key = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| AcmeCertError::KeyGeneration(format!("RSA key generation failed: {e}")))?;

        Ok(Self { private_key })
    }

    pub fn bits(&self) -> usize {
        self.private_key.size() * 8
    }

    /// PKCS#8 DER encoding of the private key
    pub fn pkcs8_der(&self) -> Result<Vec<u8>> {
        let document = self
            .private_key
            .to_pkcs8_der()
            .map_err(|e| AcmeCertError::KeyGeneration(format!("PKCS#8 encoding failed: {e}")))?;
        Ok(document.as_bytes().to_vec())
    }

    /// PKCS#8 PEM encoding of the private key
    pub fn pkcs8_pem(&self) -> Result<String> {
        let pem = self
            .private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| AcmeCertError::KeyGeneration(format!("PKCS#8 encoding failed: {e}")))?;
        Ok(pem.to_string())
    }

    /// Serialize to the generator's native JSON form
    pub fn to_native_json(&self) -> Result<String> {
        let native = NativeKey {
            algorithm: KEY_ALGORITHM.to_string(),
            bits: self.bits(),
            pkcs8: general_purpose::STANDARD.encode(self.pkcs8_der()?),
        };
        Ok(serde_json::to_string_pretty(&native)?)
    }

    /// Re-import a key written by [`KeyMaterial::to_native_json`]
    pub fn from_native_json(json: &str) -> Result<Self> {
        let native: NativeKey = serde_json::from_str(json)?;
        if native.algorithm != KEY_ALGORITHM {
            return Err(AcmeCertError::InvalidInput(format!(
                "Unsupported key algorithm: {}",
                native.algorithm
            )));
        }

        let der = general_purpose::STANDARD
            .decode(&native.pkcs8)
            .map_err(|e| AcmeCertError::InvalidInput(format!("Base64 decode error: {e}")))?;
        let private_key = RsaPrivateKey::from_pkcs8_der(&der)
            .map_err(|e| AcmeCertError::InvalidInput(format!("Invalid PKCS#8 key: {e}")))?;

        Ok(Self { private_key })
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("algorithm", &KEY_ALGORITHM)
            .field("bits", &self.bits())
            .finish_non_exhaustive()
    }
}

/// A signed certificate signing request; immutable once generated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRequest {
    identifiers: Vec<String>,
    der: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
struct NativeRequest {
    identifiers: Vec<String>,
    signature_algorithm: String,
    der: String,
}

impl CertificateRequest {
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn pem(&self) -> String {
        der_to_pem(CSR_TAG, &self.der)
    }

    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    /// DER, then base64url without padding, as the ACME protocol expects
    pub fn to_base64url(&self) -> String {
        general_purpose::URL_SAFE_NO_PAD.encode(&self.der)
    }

    pub fn to_native_json(&self) -> Result<String> {
        let native = NativeRequest {
            identifiers: self.identifiers.clone(),
            signature_algorithm: CSR_SIGNATURE_ALGORITHM.to_string(),
            der: general_purpose::STANDARD.encode(&self.der),
        };
        Ok(serde_json::to_string_pretty(&native)?)
    }

    pub fn from_native_json(json: &str) -> Result<Self> {
        let native: NativeRequest = serde_json::from_str(json)?;
        let der = general_purpose::STANDARD
            .decode(&native.der)
            .map_err(|e| AcmeCertError::InvalidInput(format!("Base64 decode error: {e}")))?;

        Ok(Self {
            identifiers: native.identifiers,
            der,
        })
    }
}

/// Pick the modulus size. Never fails: anything unusable becomes the default.
pub fn select_key_bits(requested_bits: Option<u32>) -> usize {
    match requested_bits.map(|bits| bits as usize) {
        Some(bits) if bits >= MIN_KEY_BITS => bits,
        Some(bits) => {
            tracing::warn!(
                "RSA key size {bits} is below {MIN_KEY_BITS} bits, using default of {DEFAULT_KEY_BITS}"
            );
            DEFAULT_KEY_BITS
        }
        None => {
            tracing::warn!("No RSA key size configured, using default of {DEFAULT_KEY_BITS}");
            DEFAULT_KEY_BITS
        }
    }
}

/// Generate a key pair and a CSR for the identifiers: common name is the
/// primary identifier, alternative names are the whole set.
pub fn generate_request(
    identifiers: &IdentifierSet,
    requested_bits: Option<u32>,
) -> Result<(KeyMaterial, CertificateRequest)> {
    let key = KeyMaterial::generate(requested_bits)?;
    let request = build_request(identifiers, &key)?;
    Ok((key, request))
}

/// Build and sign a CSR for the identifiers with an existing key
pub fn build_request(identifiers: &IdentifierSet, key: &KeyMaterial) -> Result<CertificateRequest> {
    let mut params = CertificateParams::new(identifiers.names().to_vec())
        .map_err(|e| AcmeCertError::CsrGeneration(format!("Invalid identifiers: {e}")))?;

    let mut subject = DistinguishedName::new();
    subject.push(DnType::CommonName, identifiers.primary());
    params.distinguished_name = subject;

    let signer = RsaRequestSigner::new(key)?;
    let key_pair = KeyPair::from_remote(Box::new(signer))
        .map_err(|e| AcmeCertError::CsrGeneration(format!("Cannot use RSA key: {e}")))?;

    let csr = params
        .serialize_request(&key_pair)
        .map_err(|e| AcmeCertError::CsrGeneration(format!("CSR signing failed: {e}")))?;

    tracing::debug!("Generated CSR for {identifiers}");

    Ok(CertificateRequest {
        identifiers: identifiers.names().to_vec(),
        der: csr.der().to_vec(),
    })
}

/// Bridges an RSA private key into rcgen's signing interface
struct RsaRequestSigner {
    signing_key: SigningKey<Sha256>,
    public_key: Vec<u8>,
}

impl RsaRequestSigner {
    fn new(key: &KeyMaterial) -> Result<Self> {
        let public_key = key
            .private_key
            .to_public_key()
            .to_pkcs1_der()
            .map_err(|e| AcmeCertError::CsrGeneration(format!("Public key encoding failed: {e}")))?
            .as_bytes()
            .to_vec();

        Ok(Self {
            signing_key: SigningKey::<Sha256>::new(key.private_key.clone()),
            public_key,
        })
    }
}

impl RemoteKeyPair for RsaRequestSigner {
    fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    fn sign(&self, msg: &[u8]) -> std::result::Result<Vec<u8>, rcgen::Error> {
        let signature = self
            .signing_key
            .try_sign(msg)
            .map_err(|_| rcgen::Error::RemoteKeyError)?;
        Ok(signature.to_vec())
    }

    fn algorithm(&self) -> &'static rcgen::SignatureAlgorithm {
        &rcgen::PKCS_RSA_SHA256
    }
}
