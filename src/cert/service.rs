use crate::acme::{AcmeClient, CertificateAuthority};
use crate::cert::artifacts::{ArtifactWriter, PersistedArtifacts};
use crate::cert::keygen::generate_request;
use crate::cert::{IdentifierSet, Thumbprint};
use crate::config::Settings;
use crate::store::{self, CertificateStore, InstallReport};
use crate::utils::errors::Result;

/// Result of a renewal cycle
#[derive(Debug)]
pub struct RenewOutcome {
    pub artifacts: PersistedArtifacts,
    pub install: InstallReport,
    /// Thumbprint of the certificate the new one replaced
    pub replaced: Option<Thumbprint>,
}

/// Runs request cycles: key and CSR, authority exchange, artifacts
pub struct CertificateService<C> {
    authority: CertificateAuthority<C>,
    writer: ArtifactWriter,
    key_bits: Option<u32>,
}

impl<C: AcmeClient> CertificateService<C> {
    pub fn new(client: C, writer: ArtifactWriter, settings: &Settings) -> Self {
        Self {
            authority: CertificateAuthority::new(client),
            writer,
            key_bits: settings.rsa_key_bits,
        }
    }

    /// Request a certificate for `identifiers` and write its artifacts.
    /// Nothing is written unless the authority issued a certificate.
    pub async fn request_certificate(
        &self,
        identifiers: &IdentifierSet,
    ) -> Result<PersistedArtifacts> {
        tracing::info!("Requesting certificate for {identifiers}");

        let (key, request) = generate_request(identifiers, self.key_bits)?;
        let issued = self.authority.request_certificate(&request).await?;

        self.writer
            .persist(identifiers.primary(), &key, &request, &issued)
    }

    /// Replace the installed certificate for the primary identifier.
    ///
    /// The previous certificate is removed only once the new one landed in
    /// the personal store.
    pub async fn renew(
        &self,
        identifiers: &IdentifierSet,
        store: &dyn CertificateStore,
        personal_store: &str,
        intermediate_store: &str,
    ) -> Result<RenewOutcome> {
        let previous = store::lookup(store, identifiers.primary(), personal_store)?
            .filter(|entry| {
                let covered = entry.covers(identifiers.primary());
                if !covered {
                    tracing::warn!(
                        "Installed certificate {} is labelled for {} but does not cover it, leaving it in place",
                        entry.thumbprint(),
                        identifiers.primary()
                    );
                }
                covered
            });
        match &previous {
            Some(entry) => tracing::info!(
                "Renewing {} (currently {}, expires {})",
                identifiers.primary(),
                entry.thumbprint(),
                entry.metadata.not_after.format("%Y-%m-%d %H:%M")
            ),
            None => tracing::info!(
                "No installed certificate for {}, issuing a new one",
                identifiers.primary()
            ),
        }

        let artifacts = self.request_certificate(identifiers).await?;
        let install = store::install(
            store,
            &artifacts.certificate,
            personal_store,
            intermediate_store,
        )?;

        let new_thumbprint = &artifacts.certificate.metadata.thumbprint;
        let mut replaced = None;
        if let Some(previous) = previous {
            if !install.personal.contains(new_thumbprint) {
                tracing::warn!(
                    "New certificate {new_thumbprint} was not installed, keeping {}",
                    previous.thumbprint()
                );
            } else if previous.thumbprint() != new_thumbprint {
                store::uninstall(store, previous.thumbprint(), personal_store)?;
                replaced = Some(previous.thumbprint().clone());
            }
        }

        Ok(RenewOutcome {
            artifacts,
            install,
            replaced,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acme::authority::tests::FakeAcmeClient;
    use crate::cert::issued::{LoadedCertificate, PrivateKey};
    use crate::store::FileCertificateStore;
    use crate::test_support::{hierarchy, leaf_issued_on, TestLeaf};
    use crate::utils::errors::AcmeCertError;
    use crate::utils::paths::ArtifactDirectory;
    use reqwest::StatusCode;
    use std::fs;
    use std::path::Path;

    fn service(client: FakeAcmeClient, dir: &Path) -> CertificateService<FakeAcmeClient> {
        let settings = Settings {
            rsa_key_bits: Some(2048),
            pfx_password: "pw".to_string(),
            ..Settings::default()
        };
        let writer = ArtifactWriter::new(ArtifactDirectory::resolve(Some(dir), dir), &settings);
        CertificateService::new(client, writer, &settings)
    }

    #[tokio::test]
    async fn test_rejected_request_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let client = FakeAcmeClient::new(StatusCode::BAD_REQUEST, b"bad csr".to_vec());
        let identifiers = IdentifierSet::new(["example.com"]).unwrap();

        let result = service(client, tmp.path())
            .request_certificate(&identifiers)
            .await;

        assert!(matches!(
            result,
            Err(AcmeCertError::AuthorityStatus { status: 400, .. })
        ));
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_end_to_end_issue_and_install() {
        let tmp = tempfile::tempdir().unwrap();
        let artifacts_dir = tmp.path().join("certs");
        let (_, intermediate, leaf) = hierarchy(&["example.com", "www.example.com"]);
        let client = FakeAcmeClient::new(StatusCode::CREATED, leaf.der())
            .with_link("/acme/issuer-cert", "up")
            .with_document("https://ca.example/acme/issuer-cert", intermediate.der());
        let identifiers = IdentifierSet::new(["example.com", "www.example.com"]).unwrap();

        let service = service(client, &artifacts_dir);
        let persisted = service.request_certificate(&identifiers).await.unwrap();

        for name in [
            "example.com-key.pem",
            "example.com-csr.pem",
            "example.com-crt.der",
            "example.com-crt.pem",
            "ca-example.com-crt.der",
            "ca-example.com-crt.pem",
            "example.com-chain.pem",
            "example.com-all.pfx",
        ] {
            assert!(artifacts_dir.join(name).is_file(), "{name} missing");
        }
        assert_eq!(
            fs::read(artifacts_dir.join("example.com-crt.der")).unwrap(),
            leaf.der()
        );
        assert_eq!(
            fs::read(artifacts_dir.join("ca-example.com-crt.der")).unwrap(),
            intermediate.der()
        );
        assert_eq!(
            persisted.archive.as_deref(),
            Some(artifacts_dir.join("example.com-all.pfx").as_path())
        );
        assert!(persisted
            .certificate
            .friendly_name
            .starts_with("example.com "));

        let store = FileCertificateStore::new(tmp.path().join("stores"));
        let report = store::install(&store, &persisted.certificate, "My", "CA").unwrap();
        assert_eq!(report.personal.len(), 1);
        assert_eq!(report.intermediate.len(), 1);

        let found = store::lookup(&store, "example.com", "My").unwrap().unwrap();
        assert_eq!(found.der, leaf.der());
    }

    #[tokio::test]
    async fn test_renew_replaces_previous_certificate() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileCertificateStore::new(tmp.path().join("stores"));
        let (_, intermediate, _) = hierarchy(&["example.com"]);

        let old = leaf_issued_on(&["example.com"], &intermediate, 2025, 1, 1);
        let old_loaded = LoadedCertificate::new(
            old.der(),
            "example.com 2025/01/01 00:00:00".to_string(),
            Some(PrivateKey {
                pkcs8_der: old.pkcs8_der(),
                exportable: false,
            }),
            vec![intermediate.der()],
        )
        .unwrap();
        store::install(&store, &old_loaded, "My", "CA").unwrap();

        let new = leaf_issued_on(&["example.com"], &intermediate, 2026, 1, 1);
        let client = FakeAcmeClient::new(StatusCode::CREATED, new.der())
            .with_link("/acme/issuer-cert", "up")
            .with_document("https://ca.example/acme/issuer-cert", intermediate.der());
        let identifiers = IdentifierSet::new(["example.com"]).unwrap();

        let outcome = service(client, &tmp.path().join("certs"))
            .renew(&identifiers, &store, "My", "CA")
            .await
            .unwrap();

        assert_eq!(outcome.replaced, Some(old_loaded.metadata.thumbprint.clone()));
        let found = store::lookup(&store, "example.com", "My").unwrap().unwrap();
        assert_eq!(found.der, new.der());
        assert_eq!(
            store::uninstall(&store, &old_loaded.metadata.thumbprint, "My").unwrap(),
            0
        );
    }

    fn installed(
        store: &FileCertificateStore,
        leaf: &TestLeaf,
        chain: &[Vec<u8>],
        label: &str,
    ) -> LoadedCertificate {
        let loaded = LoadedCertificate::new(
            leaf.der(),
            label.to_string(),
            Some(PrivateKey {
                pkcs8_der: leaf.pkcs8_der(),
                exportable: false,
            }),
            chain.to_vec(),
        )
        .unwrap();
        store::install(store, &loaded, "My", "CA").unwrap();
        loaded
    }

    #[tokio::test]
    async fn test_renew_leaves_neighbouring_host_installed() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileCertificateStore::new(tmp.path().join("stores"));
        let (_, intermediate, _) = hierarchy(&["example.com"]);

        let neighbour = leaf_issued_on(&["example.com.au"], &intermediate, 2025, 1, 1);
        let neighbour = installed(
            &store,
            &neighbour,
            &[intermediate.der()],
            "example.com.au 2025/01/01 00:00:00",
        );

        let new = leaf_issued_on(&["example.com"], &intermediate, 2026, 1, 1);
        let client = FakeAcmeClient::new(StatusCode::CREATED, new.der())
            .with_link("/acme/issuer-cert", "up")
            .with_document("https://ca.example/acme/issuer-cert", intermediate.der());
        let identifiers = IdentifierSet::new(["example.com"]).unwrap();

        let outcome = service(client, &tmp.path().join("certs"))
            .renew(&identifiers, &store, "My", "CA")
            .await
            .unwrap();

        assert_eq!(outcome.replaced, None);
        let still_there = store::lookup(&store, "example.com.au", "My").unwrap().unwrap();
        assert_eq!(still_there.der, neighbour.der);
        let found = store::lookup(&store, "example.com", "My").unwrap().unwrap();
        assert_eq!(found.der, new.der());
    }

    #[tokio::test]
    async fn test_renew_keeps_mislabelled_certificate() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileCertificateStore::new(tmp.path().join("stores"));
        let (_, intermediate, _) = hierarchy(&["example.com"]);

        // Labelled for example.com but issued for another host
        let other = leaf_issued_on(&["other.org"], &intermediate, 2025, 1, 1);
        let other = installed(&store, &other, &[intermediate.der()], "example.com imported");

        let new = leaf_issued_on(&["example.com"], &intermediate, 2026, 1, 1);
        let client = FakeAcmeClient::new(StatusCode::CREATED, new.der())
            .with_link("/acme/issuer-cert", "up")
            .with_document("https://ca.example/acme/issuer-cert", intermediate.der());
        let identifiers = IdentifierSet::new(["example.com"]).unwrap();

        let outcome = service(client, &tmp.path().join("certs"))
            .renew(&identifiers, &store, "My", "CA")
            .await
            .unwrap();

        assert_eq!(outcome.replaced, None);
        assert_eq!(
            store::uninstall(&store, &other.metadata.thumbprint, "My").unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_failed_renewal_keeps_previous_certificate() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileCertificateStore::new(tmp.path().join("stores"));
        let (_, intermediate, old) = hierarchy(&["example.com"]);
        let old_loaded = LoadedCertificate::new(
            old.der(),
            "example.com 2025/01/01 00:00:00".to_string(),
            Some(PrivateKey {
                pkcs8_der: old.pkcs8_der(),
                exportable: false,
            }),
            vec![intermediate.der()],
        )
        .unwrap();
        store::install(&store, &old_loaded, "My", "CA").unwrap();

        let client = FakeAcmeClient::new(StatusCode::TOO_MANY_REQUESTS, Vec::new());
        let identifiers = IdentifierSet::new(["example.com"]).unwrap();

        assert!(matches!(
            service(client, &tmp.path().join("certs"))
                .renew(&identifiers, &store, "My", "CA")
                .await,
            Err(AcmeCertError::AuthorityStatus { status: 429, .. })
        ));
        let found = store::lookup(&store, "example.com", "My").unwrap().unwrap();
        assert_eq!(found.der, old.der());
    }
}
