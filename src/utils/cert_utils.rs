use crate::utils::errors::{AcmeCertError, Result};
use p12::PFX;
use std::fs;
use std::path::Path;

/// Build a password-protected PKCS#12 archive from DER parts
pub fn build_p12_archive(
    certificate_der: &[u8],
    private_key_pkcs8: &[u8],
    ca_der: Option<&[u8]>,
    password: &str,
    friendly_name: &str,
) -> Result<Vec<u8>> {
    let pfx = PFX::new(
        certificate_der,
        private_key_pkcs8,
        ca_der,
        password,
        friendly_name,
    )
    .ok_or_else(|| AcmeCertError::Archive("Cannot assemble PKCS#12 archive".to_string()))?;

    Ok(pfx.to_der())
}

/// Write a file readable by its owner only
pub fn write_secret_file(path: &Path, contents: &[u8]) -> Result<()> {
    fs::write(path, contents)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}
