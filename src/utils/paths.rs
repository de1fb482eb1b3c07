use crate::utils::errors::{AcmeCertError, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub struct AppPaths;
pub const PROGRAM_NAME: &str = "acme-cert-rs";

impl AppPaths {
    /// Get the base data directory: ~/.local/share/acme-cert-rs/
    pub fn data_dir() -> Result<PathBuf> {
        dirs::data_local_dir()
            .map(|dir| dir.join(PROGRAM_NAME))
            .ok_or_else(|| {
                AcmeCertError::Config("Cannot determine local data directory".to_string())
            })
    }

    /// Get the config directory: ~/.config/acme-cert-rs/
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(PROGRAM_NAME))
            .ok_or_else(|| AcmeCertError::Config("Cannot determine config directory".to_string()))
    }

    /// Get the default settings file: ~/.config/acme-cert-rs/config.yaml
    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.yaml"))
    }

    /// Get the root of the file-backed trust store: ~/.local/share/acme-cert-rs/stores/
    pub fn store_root() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("stores"))
    }

    /// Ensure a directory exists with proper permissions
    pub fn ensure_dir_exists(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)?;

            // Artifact and store directories hold private keys (700)
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let mut perms = fs::metadata(path)?.permissions();
                perms.set_mode(0o700);
                fs::set_permissions(path, perms)?;
            }
        }
        Ok(())
    }
}

/// The single directory every artifact of this process is written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDirectory {
    dir: PathBuf,
}

impl ArtifactDirectory {
    /// Resolve the artifact directory from the configured path.
    ///
    /// A blank or missing configured path selects `fallback`. A configured path
    /// that cannot be created is logged and also replaced by `fallback`; this
    /// never fails.
    pub fn resolve(configured: Option<&Path>, fallback: &Path) -> Self {
        let configured = configured.filter(|path| !path.as_os_str().is_empty());

        if let Some(path) = configured {
            match AppPaths::ensure_dir_exists(path) {
                Ok(()) => {
                    tracing::debug!("Using certificate path: {}", path.display());
                    return Self {
                        dir: path.to_path_buf(),
                    };
                }
                Err(e) => {
                    tracing::warn!(
                        "Cannot create certificate path {}: {e}. Falling back to {}",
                        path.display(),
                        fallback.display()
                    );
                }
            }
        }

        if let Err(e) = AppPaths::ensure_dir_exists(fallback) {
            tracing::warn!(
                "Cannot create fallback certificate path {}: {e}",
                fallback.display()
            );
        }

        Self {
            dir: fallback.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn native_key(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{stem}-gen-key.json"))
    }

    pub fn key_pem(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{stem}-key.pem"))
    }

    pub fn native_csr(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{stem}-gen-csr.json"))
    }

    pub fn csr_pem(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{stem}-csr.pem"))
    }

    pub fn certificate_der(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{stem}-crt.der"))
    }

    pub fn certificate_pem(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{stem}-crt.pem"))
    }

    pub fn issuer_der(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("ca-{stem}-crt.der"))
    }

    pub fn issuer_pem(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("ca-{stem}-crt.pem"))
    }

    pub fn chain_pem(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{stem}-chain.pem"))
    }

    pub fn archive(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{stem}-all.pfx"))
    }
}
