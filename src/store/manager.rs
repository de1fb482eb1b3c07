//! Install, uninstall and lookup over a [`CertificateStore`].
//!
//! Every operation opens the stores it needs and closes them before
//! returning, on error paths too.

use crate::cert::issued::LoadedCertificate;
use crate::cert::Thumbprint;
use crate::store::{CertificateStore, OpenMode, StoreEntry, StoreHandle};
use crate::utils::errors::{AcmeCertError, Result};
use std::collections::HashSet;

/// Where [`install`] put each chain element
#[derive(Debug, Default, Clone)]
pub struct InstallReport {
    pub personal: Vec<Thumbprint>,
    pub intermediate: Vec<Thumbprint>,
    /// Elements that could not be added, with the reason
    pub failed: Vec<(Thumbprint, String)>,
}

/// Open `name`, run `work`, and close the store whatever `work` returned
fn with_store<T>(
    store: &dyn CertificateStore,
    name: &str,
    mode: OpenMode,
    work: impl FnOnce(&mut dyn StoreHandle) -> Result<T>,
) -> Result<T> {
    let mut handle = store.open(name, mode)?;
    let outcome = work(handle.as_mut());
    let closed = handle.close();

    match (outcome, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close_error)) => {
            tracing::warn!("Closing store '{name}' after failure also failed: {close_error}");
            Err(e)
        }
    }
}

/// Install a certificate and its chain.
///
/// Chain elements holding a private key go to `personal_store`, all others
/// to `intermediate_store`. A failed add is logged and skipped.
pub fn install(
    store: &dyn CertificateStore,
    certificate: &LoadedCertificate,
    personal_store: &str,
    intermediate_store: &str,
) -> Result<InstallReport> {
    if personal_store == intermediate_store {
        return Err(AcmeCertError::InvalidInput(format!(
            "Personal and intermediate store must differ (both '{personal_store}')"
        )));
    }

    with_store(store, personal_store, OpenMode::ReadWrite, |personal| {
        with_store(
            store,
            intermediate_store,
            OpenMode::ReadWrite,
            |intermediate| {
                let mut candidates = certificate
                    .chain
                    .iter()
                    .map(|der| StoreEntry::from_der(der.clone()))
                    .collect::<Result<Vec<_>>>()?;
                candidates.extend(intermediate.entries()?);

                let chain = build_chain(StoreEntry::from(certificate), &candidates);
                tracing::debug!(
                    "Built chain of {} element(s) for {}",
                    chain.len(),
                    certificate.metadata.cn
                );

                let (keyed, authorities) = partition_by_private_key(chain);
                let mut report = InstallReport::default();
                add_all(personal, keyed, &mut report.personal, &mut report.failed);
                add_all(
                    intermediate,
                    authorities,
                    &mut report.intermediate,
                    &mut report.failed,
                );

                tracing::info!(
                    "Installed {} into '{personal_store}' ({} element(s)) and '{intermediate_store}' ({} element(s))",
                    certificate.metadata.thumbprint,
                    report.personal.len(),
                    report.intermediate.len()
                );
                Ok(report)
            },
        )
    })
}

fn add_all(
    handle: &mut dyn StoreHandle,
    entries: Vec<StoreEntry>,
    added: &mut Vec<Thumbprint>,
    failed: &mut Vec<(Thumbprint, String)>,
) {
    for entry in entries {
        match handle.add(&entry) {
            Ok(()) => added.push(entry.thumbprint().clone()),
            Err(e) => {
                tracing::error!("Skipping {} for '{}': {e}", entry.thumbprint(), handle.name());
                failed.push((entry.thumbprint().clone(), e.to_string()));
            }
        }
    }
}

/// Remove every entry of `store_name` whose thumbprint matches. Returns the
/// number of entries removed.
pub fn uninstall(
    store: &dyn CertificateStore,
    thumbprint: &Thumbprint,
    store_name: &str,
) -> Result<usize> {
    with_store(store, store_name, OpenMode::ReadWrite, |handle| {
        let mut removed = 0;
        for entry in handle.entries()? {
            if entry.thumbprint() == thumbprint {
                handle.remove(&entry)?;
                removed += 1;
            }
        }

        if removed == 0 {
            tracing::info!("No certificate {thumbprint} in store '{store_name}'");
        } else {
            tracing::info!("Removed {removed} certificate(s) {thumbprint} from '{store_name}'");
        }
        Ok(removed)
    })
}

/// Find the installed certificate for `host`: issued by a known authority,
/// labelled for `host`, latest issuance wins.
pub fn lookup(
    store: &dyn CertificateStore,
    host: &str,
    store_name: &str,
) -> Result<Option<StoreEntry>> {
    with_store(store, store_name, OpenMode::ReadOnly, |handle| {
        let found = select_latest(
            handle
                .entries()?
                .into_iter()
                .filter(|entry| entry.is_from_known_authority())
                .filter(|entry| entry.is_labelled_for(host)),
        );

        match &found {
            Some(entry) => tracing::debug!("Found {} for {host}", entry.thumbprint()),
            None => tracing::debug!("No installed certificate for {host} in '{store_name}'"),
        }
        Ok(found)
    })
}

/// Latest `not_before` wins; on a tie the later entry wins
pub fn select_latest(entries: impl IntoIterator<Item = StoreEntry>) -> Option<StoreEntry> {
    entries.into_iter().fold(None, |best, entry| match best {
        Some(best) if best.metadata.not_before > entry.metadata.not_before => Some(best),
        _ => Some(entry),
    })
}

/// Walk issuer links from `leaf` through `candidates` up to a self-signed
/// certificate or until no issuer is found. Each certificate appears once.
pub fn build_chain(leaf: StoreEntry, candidates: &[StoreEntry]) -> Vec<StoreEntry> {
    let mut seen = HashSet::new();
    seen.insert(leaf.thumbprint().as_hex().to_string());
    let mut chain = vec![leaf];

    loop {
        let Some(current) = chain.last() else {
            break;
        };
        if current.metadata.is_self_signed() {
            break;
        }

        let issuer = candidates.iter().find(|candidate| {
            current.metadata.is_issued_by(&candidate.metadata)
                && !seen.contains(candidate.thumbprint().as_hex())
        });

        match issuer {
            Some(issuer) => {
                seen.insert(issuer.thumbprint().as_hex().to_string());
                chain.push(issuer.clone());
            }
            None => break,
        }
    }

    chain
}

/// Split chain elements into (with private key, without)
pub fn partition_by_private_key(chain: Vec<StoreEntry>) -> (Vec<StoreEntry>, Vec<StoreEntry>) {
    chain.into_iter().partition(StoreEntry::has_private_key)
}
