pub mod authority;
pub mod client;

pub use authority::CertificateAuthority;
pub use client::{
    AcmeClient, CertificateResponse, HttpAcmeClient, LinkRelation, PassthroughSigner,
    PayloadSigner,
};

use reqwest::Client;

/// Relations that point from an issued certificate to its issuer
pub const ISSUER_RELATIONS: [&str; 2] = ["up", "parent"];

/// Create the HTTP client used against the authority
pub fn create_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .use_rustls_tls()
        .build()
}

/// Parse an RFC 8288 `Link` header value into its relations.
///
/// Entries without a `rel` parameter are dropped. A parameter such as
/// `rel="up next"` yields one relation per listed name.
pub fn parse_link_header(value: &str) -> Vec<LinkRelation> {
    let mut relations = Vec::new();
    let mut rest = value;

    while let Some(start) = rest.find('<') {
        let Some(end) = rest[start..].find('>') else {
            break;
        };
        let uri = rest[start + 1..start + end].trim();
        let after = &rest[start + end + 1..];
        let params_end = after.find('<').unwrap_or(after.len());
        let params = &after[..params_end];

        for param in params.split(';') {
            let Some((key, val)) = param.split_once('=') else {
                continue;
            };
            if !key.trim().eq_ignore_ascii_case("rel") {
                continue;
            }
            let val = val.trim().trim_end_matches(',').trim().trim_matches('"');
            for rel in val.split_whitespace() {
                relations.push(LinkRelation {
                    uri: uri.to_string(),
                    rel: rel.to_ascii_lowercase(),
                });
            }
        }

        rest = &after[params_end..];
    }

    relations
}
