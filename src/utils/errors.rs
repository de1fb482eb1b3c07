use thiserror::Error;

#[derive(Error, Debug)]
pub enum AcmeCertError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Certificate request submission failed: {0}")]
    Submission(String),

    #[error("Certificate authority rejected the request with status {status}: {detail}")]
    AuthorityStatus { status: u16, detail: String },

    #[error("Failed to fetch issuer certificate from {uri}: {reason}")]
    ChainFetch { uri: String, reason: String },

    #[error("Failed to open certificate store '{store}': {reason}")]
    StoreOpen { store: String, reason: String },

    #[error("Failed to enumerate certificate store '{store}': {reason}")]
    StoreEnumerate { store: String, reason: String },

    #[error("Failed to add certificate {thumbprint} to store '{store}': {reason}")]
    StoreAdd {
        store: String,
        thumbprint: String,
        reason: String,
    },

    #[error("Failed to remove certificate {thumbprint} from store '{store}': {reason}")]
    StoreRemove {
        store: String,
        thumbprint: String,
        reason: String,
    },

    #[error("Key generation error: {0}")]
    KeyGeneration(String),

    #[error("CSR generation error: {0}")]
    CsrGeneration(String),

    #[error("Certificate parsing error: {0}")]
    CertParsing(String),

    #[error("PKCS#12 archive error: {0}")]
    Archive(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Certificate not found: {0}")]
    CertNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, AcmeCertError>;
