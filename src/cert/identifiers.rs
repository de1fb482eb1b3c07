use crate::utils::errors::{AcmeCertError, Result};
use std::fmt;

const MAX_NAME_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// Ordered, non-empty host names of one binding. The first entry is the primary
/// (common) name; duplicates are kept as given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierSet {
    names: Vec<String>,
}

impl IdentifierSet {
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names
            .into_iter()
            .map(|name| name.into().trim().to_string())
            .collect();

        if names.is_empty() {
            return Err(AcmeCertError::InvalidInput(
                "At least one host name is required".to_string(),
            ));
        }

        if let Some(invalid) = names.iter().find(|name| !is_valid_dns_name(name)) {
            return Err(AcmeCertError::InvalidInput(format!(
                "Invalid DNS name: '{invalid}'"
            )));
        }

        Ok(Self { names })
    }

    /// The common name, also used as the artifact file stem
    pub fn primary(&self) -> &str {
        &self.names[0]
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl fmt::Display for IdentifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.names.join(","))
    }
}

/// Syntactic DNS name check; a leading `*.` wildcard label is accepted
pub fn is_valid_dns_name(name: &str) -> bool {
    let name = name.strip_suffix('.').unwrap_or(name);
    let name = name.strip_prefix("*.").unwrap_or(name);

    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return false;
    }

    name.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= MAX_LABEL_LEN
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}
