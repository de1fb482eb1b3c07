//! Directory-backed trust store.
//!
//! Layout under the root: one directory per store name, one JSON document per
//! certificate named after its thumbprint, and a `.lock` file while a writer
//! holds the store.

use crate::cert::issued::PrivateKey;
use crate::cert::CertificateParser;
use crate::store::{CertificateStore, OpenMode, StoreEntry, StoreHandle};
use crate::utils::cert_utils::write_secret_file;
use crate::utils::errors::{AcmeCertError, Result};
use crate::utils::paths::AppPaths;
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = ".lock";
const ENTRY_EXTENSION: &str = "json";

#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    certificate: String,
    friendly_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    private_key: Option<StoredKey>,
    added: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredKey {
    pkcs8: String,
    exportable: bool,
}

#[derive(Debug, Clone)]
pub struct FileCertificateStore {
    root: PathBuf,
}

impl FileCertificateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Names of the stores that exist under the root
    pub fn store_names(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}

impl CertificateStore for FileCertificateStore {
    fn open(&self, name: &str, mode: OpenMode) -> Result<Box<dyn StoreHandle>> {
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(AcmeCertError::StoreOpen {
                store: name.to_string(),
                reason: "invalid store name".to_string(),
            });
        }

        let dir = self.root.join(name);
        let lock = match mode {
            OpenMode::ReadOnly => None,
            OpenMode::ReadWrite => {
                AppPaths::ensure_dir_exists(&dir).map_err(|e| AcmeCertError::StoreOpen {
                    store: name.to_string(),
                    reason: e.to_string(),
                })?;
                Some(StoreLock::acquire(&dir, name)?)
            }
        };

        tracing::debug!("Opened store '{name}' ({mode:?}) at {}", dir.display());

        Ok(Box::new(FileStoreHandle {
            name: name.to_string(),
            dir,
            mode,
            lock,
        }))
    }
}

/// Exclusive writer lock, released on close or drop
struct StoreLock {
    path: Option<PathBuf>,
}

impl StoreLock {
    fn acquire(dir: &Path, store: &str) -> Result<Self> {
        let path = dir.join(LOCK_FILE);
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| AcmeCertError::StoreOpen {
                store: store.to_string(),
                reason: if e.kind() == ErrorKind::AlreadyExists {
                    format!("store is locked ({} exists)", path.display())
                } else {
                    e.to_string()
                },
            })?;

        // Holder pid, for whoever finds a stale lock
        if let Err(e) = writeln!(file, "{}", std::process::id()) {
            tracing::debug!("Cannot record pid in {}: {e}", path.display());
        }

        Ok(Self { path: Some(path) })
    }

    fn release(&mut self) -> std::io::Result<()> {
        match self.path.take() {
            Some(path) => fs::remove_file(path),
            None => Ok(()),
        }
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Some(path) = self.path.clone() {
            if let Err(e) = self.release() {
                tracing::warn!("Cannot remove store lock {}: {e}", path.display());
            }
        }
    }
}

struct FileStoreHandle {
    name: String,
    dir: PathBuf,
    mode: OpenMode,
    lock: Option<StoreLock>,
}

impl FileStoreHandle {
    fn entry_path(&self, entry: &StoreEntry) -> PathBuf {
        self.dir
            .join(format!("{}.{ENTRY_EXTENSION}", entry.thumbprint().as_hex()))
    }

    fn require_writable(&self) -> std::result::Result<(), String> {
        match self.mode {
            OpenMode::ReadWrite => Ok(()),
            OpenMode::ReadOnly => Err("store is opened read-only".to_string()),
        }
    }

    fn read_entry(&self, path: &Path) -> Result<StoreEntry> {
        let stored: StoredEntry = serde_json::from_str(&fs::read_to_string(path)?)?;

        let der = general_purpose::STANDARD
            .decode(&stored.certificate)
            .map_err(|e| AcmeCertError::CertParsing(format!("Base64 decode error: {e}")))?;
        let metadata = CertificateParser::parse_der(&der)?;

        let private_key = stored
            .private_key
            .map(|key| {
                general_purpose::STANDARD
                    .decode(&key.pkcs8)
                    .map(|pkcs8_der| PrivateKey {
                        pkcs8_der,
                        exportable: key.exportable,
                    })
                    .map_err(|e| AcmeCertError::CertParsing(format!("Base64 decode error: {e}")))
            })
            .transpose()?;

        Ok(StoreEntry {
            der,
            metadata,
            friendly_name: stored.friendly_name,
            private_key,
        })
    }
}

impl StoreHandle for FileStoreHandle {
    fn name(&self) -> &str {
        &self.name
    }

    fn entries(&self) -> Result<Vec<StoreEntry>> {
        let enumerate_error = |reason: String| AcmeCertError::StoreEnumerate {
            store: self.name.clone(),
            reason,
        };

        let listing = match fs::read_dir(&self.dir) {
            Ok(listing) => listing,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(enumerate_error(e.to_string())),
        };

        let mut paths = Vec::new();
        for item in listing {
            let path = item.map_err(|e| enumerate_error(e.to_string()))?.path();
            if path.extension().is_some_and(|ext| ext == ENTRY_EXTENSION) {
                paths.push(path);
            }
        }
        // Stable scan order
        paths.sort();

        paths
            .iter()
            .map(|path| {
                self.read_entry(path)
                    .map_err(|e| enumerate_error(format!("{}: {e}", path.display())))
            })
            .collect()
    }

    fn add(&mut self, entry: &StoreEntry) -> Result<()> {
        let add_error = |reason: String| AcmeCertError::StoreAdd {
            store: self.name.clone(),
            thumbprint: entry.thumbprint().to_string(),
            reason,
        };
        self.require_writable().map_err(add_error)?;

        let stored = StoredEntry {
            certificate: general_purpose::STANDARD.encode(&entry.der),
            friendly_name: entry.friendly_name.clone(),
            private_key: entry.private_key.as_ref().map(|key| StoredKey {
                pkcs8: general_purpose::STANDARD.encode(&key.pkcs8_der),
                exportable: key.exportable,
            }),
            added: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&stored).map_err(|e| add_error(e.to_string()))?;

        write_secret_file(&self.entry_path(entry), json.as_bytes())
            .map_err(|e| add_error(e.to_string()))?;

        tracing::debug!("Added {} to store '{}'", entry.thumbprint(), self.name);
        Ok(())
    }

    fn remove(&mut self, entry: &StoreEntry) -> Result<()> {
        let remove_error = |reason: String| AcmeCertError::StoreRemove {
            store: self.name.clone(),
            thumbprint: entry.thumbprint().to_string(),
            reason,
        };
        self.require_writable().map_err(remove_error)?;

        fs::remove_file(self.entry_path(entry)).map_err(|e| remove_error(e.to_string()))?;

        tracing::debug!("Removed {} from store '{}'", entry.thumbprint(), self.name);
        Ok(())
    }

    fn close(mut self: Box<Self>) -> Result<()> {
        if let Some(mut lock) = self.lock.take() {
            lock.release().map_err(|e| AcmeCertError::StoreOpen {
                store: self.name.clone(),
                reason: format!("cannot release lock: {e}"),
            })?;
        }
        tracing::debug!("Closed store '{}'", self.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::hierarchy;

    fn leaf_entry() -> StoreEntry {
        let (_, _, leaf) = hierarchy(&["example.com"]);
        let mut entry = StoreEntry::from_der(leaf.der()).unwrap();
        entry.friendly_name = "example.com 2025/01/01 00:00:00".to_string();
        entry.private_key = Some(PrivateKey {
            pkcs8_der: leaf.pkcs8_der(),
            exportable: false,
        });
        entry
    }

    #[test]
    fn test_add_and_enumerate() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileCertificateStore::new(tmp.path());
        let entry = leaf_entry();
        assert_eq!(store.root(), tmp.path());

        let mut handle = store.open("My", OpenMode::ReadWrite).unwrap();
        handle.add(&entry).unwrap();
        handle.close().unwrap();

        let handle = store.open("My", OpenMode::ReadOnly).unwrap();
        let entries = handle.entries().unwrap();
        handle.close().unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].der, entry.der);
        assert_eq!(entries[0].friendly_name, entry.friendly_name);
        assert_eq!(entries[0].private_key, entry.private_key);
        assert_eq!(store.store_names().unwrap(), vec!["My"]);
    }

    #[test]
    fn test_missing_store_reads_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileCertificateStore::new(tmp.path().join("nothing-here"));

        let handle = store.open("My", OpenMode::ReadOnly).unwrap();
        assert!(handle.entries().unwrap().is_empty());
        handle.close().unwrap();
        assert!(store.store_names().unwrap().is_empty());
    }

    #[test]
    fn test_second_writer_is_refused_until_close() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileCertificateStore::new(tmp.path());

        let first = store.open("My", OpenMode::ReadWrite).unwrap();
        assert!(matches!(
            store.open("My", OpenMode::ReadWrite),
            Err(AcmeCertError::StoreOpen { .. })
        ));
        // Readers are not blocked
        store.open("My", OpenMode::ReadOnly).unwrap().close().unwrap();

        first.close().unwrap();
        store.open("My", OpenMode::ReadWrite).unwrap().close().unwrap();
        assert!(!tmp.path().join("My").join(LOCK_FILE).exists());
    }

    #[test]
    fn test_lock_records_owner_pid() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileCertificateStore::new(tmp.path());

        let handle = store.open("My", OpenMode::ReadWrite).unwrap();
        let owner = std::fs::read_to_string(tmp.path().join("My").join(LOCK_FILE)).unwrap();
        assert_eq!(owner.trim(), std::process::id().to_string());
        handle.close().unwrap();
    }

    #[test]
    fn test_drop_releases_lock() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileCertificateStore::new(tmp.path());

        drop(store.open("CA", OpenMode::ReadWrite).unwrap());
        assert!(!tmp.path().join("CA").join(LOCK_FILE).exists());
    }

    #[test]
    fn test_read_only_handle_rejects_mutation() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileCertificateStore::new(tmp.path());
        let entry = leaf_entry();

        let mut handle = store.open("My", OpenMode::ReadOnly).unwrap();
        assert!(matches!(
            handle.add(&entry),
            Err(AcmeCertError::StoreAdd { .. })
        ));
        assert!(matches!(
            handle.remove(&entry),
            Err(AcmeCertError::StoreRemove { .. })
        ));
    }

    #[test]
    fn test_remove_missing_entry_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileCertificateStore::new(tmp.path());

        let mut handle = store.open("My", OpenMode::ReadWrite).unwrap();
        assert!(matches!(
            handle.remove(&leaf_entry()),
            Err(AcmeCertError::StoreRemove { .. })
        ));
    }

    #[test]
    fn test_corrupt_entry_fails_enumeration() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileCertificateStore::new(tmp.path());
        fs::create_dir_all(tmp.path().join("My")).unwrap();
        fs::write(tmp.path().join("My").join("broken.json"), "{").unwrap();

        let handle = store.open("My", OpenMode::ReadOnly).unwrap();
        assert!(matches!(
            handle.entries(),
            Err(AcmeCertError::StoreEnumerate { .. })
        ));
    }

    #[test]
    fn test_invalid_store_name() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileCertificateStore::new(tmp.path());

        for name in ["", "..", "a/b"] {
            assert!(matches!(
                store.open(name, OpenMode::ReadOnly),
                Err(AcmeCertError::StoreOpen { .. })
            ));
        }
    }
}
