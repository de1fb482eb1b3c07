use crate::acme::client::AcmeClient;
use crate::acme::ISSUER_RELATIONS;
use crate::cert::issued::IssuedChain;
use crate::cert::keygen::CertificateRequest;
use crate::utils::errors::{AcmeCertError, Result};
use reqwest::StatusCode;

/// Upper bound on how much of a rejection body ends up in the error
const MAX_DETAIL_LEN: usize = 512;

/// Turns a signing request into an issued certificate and its issuer
pub struct CertificateAuthority<C> {
    client: C,
}

impl<C: AcmeClient> CertificateAuthority<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Submit `request` and resolve the issuer certificate when the
    /// authority links one. Anything but `201 Created` fails the request.
    pub async fn request_certificate(&self, request: &CertificateRequest) -> Result<IssuedChain> {
        let names = request.identifiers().join(", ");
        let response = self
            .client
            .submit_certificate_request(&request.to_base64url())
            .await?;

        if response.status != StatusCode::CREATED {
            let detail = rejection_detail(&response.body);
            tracing::error!(
                "Certificate authority rejected request for {names}: {} {detail}",
                response.status
            );
            return Err(AcmeCertError::AuthorityStatus {
                status: response.status.as_u16(),
                detail,
            });
        }

        if response.body.is_empty() {
            return Err(AcmeCertError::Submission(
                "Authority returned an empty certificate".to_string(),
            ));
        }

        let issuer_der = match response.link(&ISSUER_RELATIONS) {
            Some(link) => {
                let uri = self.client.base_uri().join(&link.uri).map_err(|e| {
                    AcmeCertError::ChainFetch {
                        uri: link.uri.clone(),
                        reason: e.to_string(),
                    }
                })?;
                tracing::debug!("Resolving issuer certificate via {} link {uri}", link.rel);

                let der = self.client.fetch_by_link(&uri).await.map_err(|e| {
                    AcmeCertError::ChainFetch {
                        uri: uri.to_string(),
                        reason: e.to_string(),
                    }
                })?;
                Some(der)
            }
            None => {
                tracing::warn!(
                    "Authority response for {names} carries no issuer link, chain will be leaf only"
                );
                None
            }
        };

        tracing::info!("Certificate issued for {names}");

        Ok(IssuedChain {
            certificate_der: response.body,
            issuer_der,
        })
    }
}

fn rejection_detail(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    match text.char_indices().nth(MAX_DETAIL_LEN) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
