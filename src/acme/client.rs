use crate::utils::errors::{AcmeCertError, Result};
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, LINK};
use reqwest::{Client, StatusCode, Url};
use serde_json::{json, Value};

const NEW_CERT_PATH: &str = "acme/new-cert";

/// One `Link` header entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRelation {
    pub uri: String,
    pub rel: String,
}

/// Authority reply to a certificate request
#[derive(Debug, Clone)]
pub struct CertificateResponse {
    pub status: StatusCode,
    /// DER certificate on success, problem document otherwise
    pub body: Vec<u8>,
    pub links: Vec<LinkRelation>,
}

impl CertificateResponse {
    /// First link carrying any of `relations`
    pub fn link(&self, relations: &[&str]) -> Option<&LinkRelation> {
        self.links
            .iter()
            .find(|link| relations.iter().any(|rel| link.rel.eq_ignore_ascii_case(rel)))
    }
}

/// Protocol client capable of submitting a CSR and following links
#[async_trait]
pub trait AcmeClient: Send + Sync {
    /// URI relative links are resolved against
    fn base_uri(&self) -> &Url;

    async fn submit_certificate_request(&self, csr_b64url: &str) -> Result<CertificateResponse>;

    async fn fetch_by_link(&self, uri: &Url) -> Result<Vec<u8>>;
}

/// Wraps a request payload in whatever envelope the authority expects
pub trait PayloadSigner: Send + Sync {
    fn sign(&self, url: &Url, payload: &Value) -> Result<Vec<u8>>;

    fn content_type(&self) -> &'static str;
}

/// Sends the payload as plain JSON
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughSigner;

impl PayloadSigner for PassthroughSigner {
    fn sign(&self, _url: &Url, payload: &Value) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(payload)?)
    }

    fn content_type(&self) -> &'static str {
        "application/json"
    }
}

pub struct HttpAcmeClient {
    client: Client,
    base_uri: Url,
    signer: Box<dyn PayloadSigner>,
}

impl HttpAcmeClient {
    pub fn new(base_uri: Url) -> Result<Self> {
        Self::with_signer(base_uri, Box::new(PassthroughSigner))
    }

    pub fn with_signer(base_uri: Url, signer: Box<dyn PayloadSigner>) -> Result<Self> {
        let client = super::create_http_client()?;
        Ok(Self {
            client,
            base_uri,
            signer,
        })
    }
}

#[async_trait]
impl AcmeClient for HttpAcmeClient {
    fn base_uri(&self) -> &Url {
        &self.base_uri
    }

    async fn submit_certificate_request(&self, csr_b64url: &str) -> Result<CertificateResponse> {
        let url = self
            .base_uri
            .join(NEW_CERT_PATH)
            .map_err(|e| AcmeCertError::Submission(format!("Invalid request URL: {e}")))?;
        let payload = json!({
            "resource": "new-cert",
            "csr": csr_b64url,
        });
        let body = self.signer.sign(&url, &payload)?;

        tracing::debug!("Submitting certificate request to {url}");
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, self.signer.content_type())
            .body(body)
            .send()
            .await
            .map_err(|e| AcmeCertError::Submission(e.to_string()))?;

        let status = response.status();
        tracing::debug!("Response status: {status}");

        let links = response
            .headers()
            .get_all(LINK)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(super::parse_link_header)
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| AcmeCertError::Submission(format!("Cannot read response body: {e}")))?
            .to_vec();

        Ok(CertificateResponse {
            status,
            body,
            links,
        })
    }

    async fn fetch_by_link(&self, uri: &Url) -> Result<Vec<u8>> {
        tracing::debug!("Fetching {uri}");
        let response = self
            .client
            .get(uri.clone())
            .send()
            .await?
            .error_for_status()?;

        Ok(response.bytes().await?.to_vec())
    }
}
