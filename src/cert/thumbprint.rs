use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha1::{Digest, Sha1};
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;
use thiserror::Error;

const THUMBPRINT_HEX_LEN: usize = 40;

/// Content-derived certificate fingerprint: SHA-1 over the DER encoding.
///
/// Stored normalized (lowercase, no separators) so comparison is
/// case-insensitive; displayed uppercase.
#[derive(Debug, Clone, Eq)]
pub struct Thumbprint {
    hex: String,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ThumbprintParseError {
    #[error("Invalid hex character: {0}")]
    InvalidHexCharacter(char),

    #[error("Empty string provided")]
    EmptyString,

    #[error("Invalid length: expected {THUMBPRINT_HEX_LEN} hex characters, got {0}")]
    InvalidLength(usize),
}

impl Thumbprint {
    /// Compute the thumbprint of a DER-encoded certificate
    pub fn of_der(der: &[u8]) -> Self {
        Self {
            hex: hex::encode(Sha1::digest(der)),
        }
    }

    /// Parse a user-supplied thumbprint (colons and spaces allowed, any case)
    pub fn parse(identifier: &str) -> Result<Self, ThumbprintParseError> {
        let cleaned: String = identifier
            .chars()
            .filter(|c| *c != ':' && !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();

        if cleaned.is_empty() {
            return Err(ThumbprintParseError::EmptyString);
        }

        if let Some(ch) = cleaned.chars().find(|ch| !ch.is_ascii_hexdigit()) {
            return Err(ThumbprintParseError::InvalidHexCharacter(ch));
        }

        if cleaned.len() != THUMBPRINT_HEX_LEN {
            return Err(ThumbprintParseError::InvalidLength(cleaned.len()));
        }

        Ok(Self { hex: cleaned })
    }

    pub fn as_hex(&self) -> &str {
        &self.hex
    }
}

impl fmt::Display for Thumbprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hex.to_uppercase())
    }
}

impl FromStr for Thumbprint {
    type Err = ThumbprintParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Hash for Thumbprint {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.hex.hash(state);
    }
}

impl PartialEq for Thumbprint {
    fn eq(&self, other: &Self) -> bool {
        self.hex == other.hex
    }
}

impl Serialize for Thumbprint {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Thumbprint {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Thumbprint::parse(&s).map_err(serde::de::Error::custom)
    }
}
