//! On-disk artifacts of one issuance.
//!
//! Everything lands in a single [`ArtifactDirectory`] under names derived from
//! the primary identifier. Files are overwritten on re-issuance.

use crate::cert::issued::{friendly_name, IssuedChain, LoadedCertificate, PrivateKey};
use crate::cert::keygen::{CertificateRequest, KeyMaterial};
use crate::cert::CertificateParser;
use crate::config::Settings;
use crate::utils::cert_utils::{build_p12_archive, write_secret_file};
use crate::utils::errors::Result;
use crate::utils::paths::ArtifactDirectory;
use crate::utils::pem::{PemCertificate, PemCertificateChain};
use chrono::Utc;
use std::fs;
use std::path::PathBuf;

/// Outcome of [`ArtifactWriter::persist`]
#[derive(Debug)]
pub struct PersistedArtifacts {
    /// Every file written, in write order
    pub files: Vec<PathBuf>,
    /// `None` when the archive could not be produced
    pub archive: Option<PathBuf>,
    pub certificate: LoadedCertificate,
}

pub struct ArtifactWriter {
    dir: ArtifactDirectory,
    password: String,
    exportable: bool,
    date_format: String,
}

impl ArtifactWriter {
    pub fn new(dir: ArtifactDirectory, settings: &Settings) -> Self {
        Self {
            dir,
            password: settings.pfx_password.clone(),
            exportable: settings.private_key_exportable,
            date_format: settings.friendly_name_date_format.clone(),
        }
    }

    /// Write key, CSR, leaf, issuer, chain and archive for `stem`.
    ///
    /// Any failure before the archive aborts. A failed archive export is
    /// logged and leaves `archive` empty.
    pub fn persist(
        &self,
        stem: &str,
        key: &KeyMaterial,
        request: &CertificateRequest,
        issued: &IssuedChain,
    ) -> Result<PersistedArtifacts> {
        let dir = &self.dir;
        let mut files = Vec::new();

        let key_der = key.pkcs8_der()?;
        write_secret_file(&dir.native_key(stem), key.to_native_json()?.as_bytes())?;
        files.push(dir.native_key(stem));
        write_secret_file(&dir.key_pem(stem), key.pkcs8_pem()?.as_bytes())?;
        files.push(dir.key_pem(stem));

        fs::write(dir.native_csr(stem), request.to_native_json()?)?;
        files.push(dir.native_csr(stem));
        fs::write(dir.csr_pem(stem), request.pem())?;
        files.push(dir.csr_pem(stem));

        let leaf_pem = write_certificate(
            &issued.certificate_der,
            dir.certificate_der(stem),
            dir.certificate_pem(stem),
            &mut files,
        )?;

        let mut chain = PemCertificateChain::new();
        chain.add_certificate(leaf_pem);

        let issuer_der = match &issued.issuer_der {
            Some(issuer) => {
                let issuer_pem = write_certificate(
                    issuer,
                    dir.issuer_der(stem),
                    dir.issuer_pem(stem),
                    &mut files,
                )?;
                chain.add_certificate(issuer_pem);
                Some(issuer.as_slice())
            }
            None => {
                tracing::warn!("No issuer certificate for {stem}, writing leaf-only chain");
                None
            }
        };

        fs::write(dir.chain_pem(stem), chain.pem_data())?;
        files.push(dir.chain_pem(stem));

        let label = friendly_name(stem, Utc::now(), &self.date_format);

        let archive_path = dir.archive(stem);
        let archive = match build_p12_archive(
            &issued.certificate_der,
            &key_der,
            issuer_der,
            &self.password,
            &label,
        )
        .and_then(|archive| write_secret_file(&archive_path, &archive))
        {
            Ok(()) => {
                files.push(archive_path.clone());
                Some(archive_path)
            }
            Err(e) => {
                tracing::error!(
                    "Cannot export archive {}: {e}. Continuing without it.",
                    archive_path.display()
                );
                None
            }
        };

        tracing::info!("Wrote {} artifact(s) for {stem} to {}", files.len(), dir.path().display());

        let certificate = LoadedCertificate::new(
            issued.certificate_der.clone(),
            label,
            Some(PrivateKey {
                pkcs8_der: key_der,
                exportable: self.exportable,
            }),
            issued.issuer_der.iter().cloned().collect(),
        )?;

        Ok(PersistedArtifacts {
            files,
            archive,
            certificate,
        })
    }
}

/// Write `der`, read it back, and derive the PEM file from what is on disk
fn write_certificate(
    der: &[u8],
    der_path: PathBuf,
    pem_path: PathBuf,
    files: &mut Vec<PathBuf>,
) -> Result<PemCertificate> {
    fs::write(&der_path, der)?;
    files.push(der_path.clone());

    let written = fs::read(&der_path)?;
    CertificateParser::parse_der(&written)?;
    let pem = PemCertificate::from_der(&written);

    fs::write(&pem_path, pem.pem_data())?;
    files.push(pem_path);

    Ok(pem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::identifiers::IdentifierSet;
    use crate::cert::keygen::generate_request;
    use crate::test_support::hierarchy;
    use crate::utils::errors::AcmeCertError;
    use crate::utils::pem::{pem_to_der, CERTIFICATE_TAG};
    use p12::PFX;
    use std::path::Path;

    fn writer(dir: &Path, password: &str) -> ArtifactWriter {
        let settings = Settings {
            pfx_password: password.to_string(),
            private_key_exportable: true,
            ..Settings::default()
        };
        ArtifactWriter::new(ArtifactDirectory::resolve(Some(dir), dir), &settings)
    }

    fn names(files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_full_artifact_set() {
        let tmp = tempfile::tempdir().unwrap();
        let identifiers = IdentifierSet::new(["example.com", "www.example.com"]).unwrap();
        let (key, request) = generate_request(&identifiers, Some(1024)).unwrap();
        let (_, intermediate, leaf) = hierarchy(&["example.com", "www.example.com"]);
        let issued = IssuedChain {
            certificate_der: leaf.der(),
            issuer_der: Some(intermediate.der()),
        };

        let persisted = writer(tmp.path(), "pw")
            .persist("example.com", &key, &request, &issued)
            .unwrap();

        assert_eq!(
            names(&persisted.files),
            vec![
                "example.com-gen-key.json",
                "example.com-key.pem",
                "example.com-gen-csr.json",
                "example.com-csr.pem",
                "example.com-crt.der",
                "example.com-crt.pem",
                "ca-example.com-crt.der",
                "ca-example.com-crt.pem",
                "example.com-chain.pem",
                "example.com-all.pfx",
            ]
        );
        for file in &persisted.files {
            assert!(file.is_file(), "{} missing", file.display());
        }

        let archive_path = persisted.archive.unwrap();
        let pfx = PFX::parse(&fs::read(&archive_path).unwrap()).unwrap();
        assert!(pfx.verify_mac("pw"));
        assert_eq!(pfx.cert_x509_bags("pw").unwrap().len(), 2);
        assert_eq!(pfx.key_bags("pw").unwrap(), vec![key.pkcs8_der().unwrap()]);

        let chain = fs::read_to_string(tmp.path().join("example.com-chain.pem")).unwrap();
        let leaf_pem = fs::read_to_string(tmp.path().join("example.com-crt.pem")).unwrap();
        let issuer_pem = fs::read_to_string(tmp.path().join("ca-example.com-crt.pem")).unwrap();
        assert_eq!(chain, format!("{leaf_pem}{issuer_pem}"));
        assert_eq!(pem_to_der(&leaf_pem, CERTIFICATE_TAG).unwrap(), leaf.der());
        assert_eq!(
            pem_to_der(&issuer_pem, CERTIFICATE_TAG).unwrap(),
            intermediate.der()
        );

        let loaded = persisted.certificate;
        assert_eq!(loaded.der, leaf.der());
        assert_eq!(loaded.chain, vec![intermediate.der()]);
        assert!(loaded.friendly_name.starts_with("example.com "));
        assert!(loaded.private_key.unwrap().exportable);

        let reloaded = KeyMaterial::from_native_json(
            &fs::read_to_string(tmp.path().join("example.com-gen-key.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(reloaded.pkcs8_der().unwrap(), key.pkcs8_der().unwrap());
        let reloaded = CertificateRequest::from_native_json(
            &fs::read_to_string(tmp.path().join("example.com-gen-csr.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(reloaded, request);
    }

    #[test]
    fn test_leaf_pem_decodes_to_identical_der() {
        let tmp = tempfile::tempdir().unwrap();
        let identifiers = IdentifierSet::new(["example.com"]).unwrap();
        let (key, request) = generate_request(&identifiers, Some(1024)).unwrap();
        let (_, intermediate, leaf) = hierarchy(&["example.com"]);
        let issued = IssuedChain {
            certificate_der: leaf.der(),
            issuer_der: Some(intermediate.der()),
        };

        writer(tmp.path(), "")
            .persist("example.com", &key, &request, &issued)
            .unwrap();

        let der = fs::read(tmp.path().join("example.com-crt.der")).unwrap();
        let pem = fs::read_to_string(tmp.path().join("example.com-crt.pem")).unwrap();
        assert_eq!(der, leaf.der());
        assert_eq!(pem_to_der(&pem, CERTIFICATE_TAG).unwrap(), der);
    }

    #[test]
    fn test_missing_issuer_writes_leaf_only_chain() {
        let tmp = tempfile::tempdir().unwrap();
        let identifiers = IdentifierSet::new(["example.com"]).unwrap();
        let (key, request) = generate_request(&identifiers, Some(1024)).unwrap();
        let (_, _, leaf) = hierarchy(&["example.com"]);
        let issued = IssuedChain {
            certificate_der: leaf.der(),
            issuer_der: None,
        };

        let persisted = writer(tmp.path(), "pw")
            .persist("example.com", &key, &request, &issued)
            .unwrap();

        assert!(!tmp.path().join("ca-example.com-crt.der").exists());
        assert!(!tmp.path().join("ca-example.com-crt.pem").exists());
        let chain = fs::read_to_string(tmp.path().join("example.com-chain.pem")).unwrap();
        let leaf_pem = fs::read_to_string(tmp.path().join("example.com-crt.pem")).unwrap();
        assert_eq!(chain, leaf_pem);

        let pfx = PFX::parse(&fs::read(persisted.archive.unwrap()).unwrap()).unwrap();
        assert_eq!(pfx.cert_x509_bags("pw").unwrap(), vec![leaf.der()]);
        assert!(persisted.certificate.chain.is_empty());
    }

    #[test]
    fn test_archive_failure_is_swallowed() {
        let tmp = tempfile::tempdir().unwrap();
        // A directory in the archive's place makes the write fail
        fs::create_dir(tmp.path().join("example.com-all.pfx")).unwrap();
        let identifiers = IdentifierSet::new(["example.com"]).unwrap();
        let (key, request) = generate_request(&identifiers, Some(1024)).unwrap();
        let (_, intermediate, leaf) = hierarchy(&["example.com"]);
        let issued = IssuedChain {
            certificate_der: leaf.der(),
            issuer_der: Some(intermediate.der()),
        };

        let persisted = writer(tmp.path(), "pw")
            .persist("example.com", &key, &request, &issued)
            .unwrap();

        assert!(persisted.archive.is_none());
        assert_eq!(persisted.files.len(), 9);
        assert!(tmp.path().join("example.com-chain.pem").is_file());
    }

    #[test]
    fn test_invalid_leaf_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let identifiers = IdentifierSet::new(["example.com"]).unwrap();
        let (key, request) = generate_request(&identifiers, Some(1024)).unwrap();
        let issued = IssuedChain {
            certificate_der: b"not a certificate".to_vec(),
            issuer_der: None,
        };

        assert!(matches!(
            writer(tmp.path(), "pw").persist("example.com", &key, &request, &issued),
            Err(AcmeCertError::CertParsing(_))
        ));
        assert!(!tmp.path().join("example.com-crt.pem").exists());
    }
}
