//! Typed settings, read once at startup.
//!
//! Every value has a validated default. Problems with the settings file or with
//! individual values are logged and replaced by the default so that the rest of
//! the crate can read plain fields.

use crate::utils::paths::AppPaths;
use chrono::format::{Item, StrftimeItems};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_STORE_NAME: &str = "My";
pub const DEFAULT_INTERMEDIATE_STORE_NAME: &str = "CA";
pub const DEFAULT_FRIENDLY_NAME_DATE_FORMAT: &str = "%Y/%m/%d %H:%M:%S";
pub const DEFAULT_BASE_URI: &str = "https://acme-v01.api.letsencrypt.org/";

/// Settings as they appear in the YAML file; every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSettings {
    pub store_name: Option<String>,
    pub intermediate_store_name: Option<String>,
    pub store_root: Option<PathBuf>,
    pub certificate_path: Option<PathBuf>,
    pub rsa_key_bits: Option<u32>,
    pub pfx_password: Option<String>,
    pub private_key_exportable: Option<bool>,
    pub friendly_name_date_format: Option<String>,
    pub base_uri: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub store_name: String,
    pub intermediate_store_name: String,
    pub store_root: PathBuf,
    pub certificate_path: Option<PathBuf>,
    /// Requested modulus size as configured; the key generator enforces its
    /// floor and falls back to its own default
    pub rsa_key_bits: Option<u32>,
    pub pfx_password: String,
    pub private_key_exportable: bool,
    pub friendly_name_date_format: String,
    pub base_uri: Url,
}

impl Settings {
    /// Load settings from a YAML file, falling back to defaults on any problem
    pub fn load(path: &Path) -> Self {
        let raw = match fs::read_to_string(path) {
            Ok(content) => match serde_yaml::from_str::<RawSettings>(&content) {
                Ok(raw) => {
                    tracing::debug!("Loaded settings from {}", path.display());
                    raw
                }
                Err(e) => {
                    tracing::warn!(
                        "Cannot parse settings file {}: {e}. Using defaults.",
                        path.display()
                    );
                    RawSettings::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No settings file at {}, using defaults", path.display());
                RawSettings::default()
            }
            Err(e) => {
                tracing::warn!(
                    "Cannot read settings file {}: {e}. Using defaults.",
                    path.display()
                );
                RawSettings::default()
            }
        };

        Self::validated(raw)
    }

    /// Turn raw values into settings, substituting defaults for invalid ones
    pub fn validated(raw: RawSettings) -> Self {
        let store_name = non_blank(raw.store_name, "store_name", DEFAULT_STORE_NAME);
        let intermediate_store_name = non_blank(
            raw.intermediate_store_name,
            "intermediate_store_name",
            DEFAULT_INTERMEDIATE_STORE_NAME,
        );

        let store_root = raw
            .store_root
            .filter(|path| !path.as_os_str().is_empty())
            .or_else(|| AppPaths::store_root().ok())
            .unwrap_or_else(|| PathBuf::from("stores"));

        let friendly_name_date_format = match raw.friendly_name_date_format {
            Some(format) if is_valid_date_format(&format) => format,
            Some(format) => {
                tracing::warn!(
                    "Invalid friendly_name_date_format '{format}', using '{DEFAULT_FRIENDLY_NAME_DATE_FORMAT}'"
                );
                DEFAULT_FRIENDLY_NAME_DATE_FORMAT.to_string()
            }
            None => DEFAULT_FRIENDLY_NAME_DATE_FORMAT.to_string(),
        };

        let base_uri = raw
            .base_uri
            .as_deref()
            .and_then(|uri| match parse_base_uri(uri) {
                Ok(url) => Some(url),
                Err(e) => {
                    tracing::warn!("Invalid base_uri '{uri}': {e}. Using {DEFAULT_BASE_URI}");
                    None
                }
            })
            .unwrap_or_else(default_base_uri);

        Self {
            store_name,
            intermediate_store_name,
            store_root,
            certificate_path: raw.certificate_path,
            rsa_key_bits: raw.rsa_key_bits,
            pfx_password: raw.pfx_password.unwrap_or_default(),
            private_key_exportable: raw.private_key_exportable.unwrap_or(false),
            friendly_name_date_format,
            base_uri,
        }
    }

    /// Replace the authority base URI, keeping the current one if invalid
    pub fn with_base_uri(mut self, uri: &str) -> Self {
        match parse_base_uri(uri) {
            Ok(url) => self.base_uri = url,
            Err(e) => tracing::warn!("Ignoring invalid base URI '{uri}': {e}"),
        }
        self
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::validated(RawSettings::default())
    }
}

fn non_blank(value: Option<String>, field: &str, default: &str) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        Some(_) => {
            tracing::warn!("Setting '{field}' is blank, using '{default}'");
            default.to_string()
        }
        None => default.to_string(),
    }
}

fn is_valid_date_format(format: &str) -> bool {
    !format.is_empty() && StrftimeItems::new(format).all(|item| !matches!(item, Item::Error))
}

/// Parse a base URI; a trailing slash is added so relative joins keep the path
fn parse_base_uri(uri: &str) -> std::result::Result<Url, String> {
    let with_slash = if uri.ends_with('/') {
        uri.to_string()
    } else {
        format!("{uri}/")
    };
    Url::parse(&with_slash).map_err(|e| e.to_string())
}

fn default_base_uri() -> Url {
    Url::parse(DEFAULT_BASE_URI).expect("DEFAULT_BASE_URI is a valid absolute URL")
}
