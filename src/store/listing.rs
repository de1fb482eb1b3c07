use crate::store::StoreEntry;
use crate::utils::errors::{AcmeCertError, Result};
use crate::utils::output::{build_table_data, GetColumnValue, OutputFormat};
use std::str::FromStr;

const DEFAULT_COLUMNS: &[&str] = &["thumbprint", "cn", "not_after", "friendly_name"];

/// Canonical column names, as accepted by [`parse_columns`]
pub const COLUMN_NAMES: &[&str] = &[
    "thumbprint",
    "cn",
    "issuer",
    "not_before",
    "not_after",
    "sans",
    "friendly_name",
    "private_key",
    "expired",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreColumn {
    Thumbprint,
    Cn,
    Issuer,
    NotBefore,
    NotAfter,
    Sans,
    FriendlyName,
    PrivateKey,
    Expired,
}

impl FromStr for StoreColumn {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "thumbprint" | "tp" => Ok(Self::Thumbprint),
            "cn" => Ok(Self::Cn),
            "issuer" => Ok(Self::Issuer),
            "not_before" => Ok(Self::NotBefore),
            "not_after" => Ok(Self::NotAfter),
            "sans" => Ok(Self::Sans),
            "friendly_name" | "name" => Ok(Self::FriendlyName),
            "private_key" | "key" | "k" => Ok(Self::PrivateKey),
            "expired" | "e" => Ok(Self::Expired),
            _ => Err(format!("Invalid column: {s}")),
        }
    }
}

impl StoreColumn {
    pub fn header(&self) -> &'static str {
        match self {
            Self::Thumbprint => "Thumbprint",
            Self::Cn => "CN",
            Self::Issuer => "Issuer",
            Self::NotBefore => "Not Before",
            Self::NotAfter => "Not After",
            Self::Sans => "SANs",
            Self::FriendlyName => "Friendly Name",
            Self::PrivateKey => "K",
            Self::Expired => "E",
        }
    }
}

impl GetColumnValue for StoreEntry {
    fn get_column_value(&self, column: &StoreColumn) -> String {
        let flag = |set: bool| (if set { "✓" } else { " " }).to_string();

        match column {
            StoreColumn::Thumbprint => self.metadata.thumbprint.to_string(),
            StoreColumn::Cn => self.metadata.cn.clone(),
            StoreColumn::Issuer => self.metadata.issuer.clone(),
            StoreColumn::NotBefore => self.metadata.not_before.format("%Y-%m-%d %H:%M").to_string(),
            StoreColumn::NotAfter => self.metadata.not_after.format("%Y-%m-%d %H:%M").to_string(),
            StoreColumn::Sans => self.metadata.sans.join(","),
            StoreColumn::FriendlyName => self.friendly_name.clone(),
            StoreColumn::PrivateKey => flag(self.has_private_key()),
            StoreColumn::Expired => flag(self.metadata.is_expired()),
        }
    }
}

/// Parse a column list. A leading `+` appends to the default columns.
pub fn parse_columns(columns: Option<&str>) -> Result<Vec<StoreColumn>> {
    let names: Vec<&str> = match columns {
        Some(list) => {
            let (mut names, list) = match list.strip_prefix('+') {
                Some(extra) => (DEFAULT_COLUMNS.to_vec(), extra),
                None => (Vec::new(), list),
            };
            names.extend(list.split(',').map(str::trim).filter(|s| !s.is_empty()));
            names
        }
        None => DEFAULT_COLUMNS.to_vec(),
    };

    names
        .into_iter()
        .map(|name| StoreColumn::from_str(name).map_err(AcmeCertError::InvalidInput))
        .collect()
}

/// Print store entries, one row each, with an optional header row
pub fn print_entries(
    entries: &[StoreEntry],
    columns: &[StoreColumn],
    format: &OutputFormat,
    header: bool,
) {
    let mut rows = Vec::with_capacity(entries.len() + 1);
    if header && !format.raw {
        rows.push(columns.iter().map(|c| c.header().to_string()).collect());
    }
    rows.extend(build_table_data(entries, columns));
    format.print_table(&rows);
}
