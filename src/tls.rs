//! Self-signed TLS certificate bootstrap.
//!
//! The HTTPS listener serves the private network with a locally generated
//! certificate. Existing cert/key files are reused; otherwise a fresh
//! self-signed pair (CN "sigorest", SANs for localhost and the loopback
//! addresses, one year validity) is written under `./certs`.

use std::net::IpAddr;
use std::path::Path;
use std::time::{Duration, SystemTime};

use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair, SanType};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("certificate generation failed: {0}")]
    Generation(#[from] rcgen::Error),

    #[error("could not write certificate material: {0}")]
    Io(#[from] std::io::Error),
}

/// Make sure a cert/key pair exists at the given paths, generating a
/// self-signed one if either file is missing.
pub fn ensure_self_signed(cert_path: &Path, key_path: &Path) -> Result<(), TlsError> {
    if cert_path.exists() && key_path.exists() {
        info!(cert = %cert_path.display(), "TLS certificate present");
        return Ok(());
    }

    info!("generating self-signed TLS certificate");

    if let Some(parent) = cert_path.parent() {
        std::fs::create_dir_all(parent)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700))?;
        }
    }

    let mut params = CertificateParams::new(vec!["localhost".to_string()])?;

    let mut distinguished_name = DistinguishedName::new();
    distinguished_name.push(DnType::OrganizationName, "sigorest");
    distinguished_name.push(DnType::CommonName, "sigorest");
    params.distinguished_name = distinguished_name;

    let now = SystemTime::now();
    params.not_before = now.into();
    params.not_after = (now + Duration::from_secs(365 * 24 * 3600)).into();

    params
        .subject_alt_names
        .push(SanType::IpAddress(IpAddr::from([127, 0, 0, 1])));
    params
        .subject_alt_names
        .push(SanType::IpAddress("::1".parse().unwrap()));

    let key_pair = KeyPair::generate()?;
    let cert = params.self_signed(&key_pair)?;

    std::fs::write(cert_path, cert.pem())?;
    std::fs::write(key_path, key_pair.serialize_pem())?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(key_path, std::fs::Permissions::from_mode(0o600))?;
    }

    info!(
        cert = %cert_path.display(),
        key = %key_path.display(),
        "TLS certificate created"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generates_pem_files() {
        let dir = tempfile::tempdir().unwrap();
        let cert = dir.path().join("server.crt");
        let key = dir.path().join("server.key");

        ensure_self_signed(&cert, &key).unwrap();

        let cert_pem = std::fs::read_to_string(&cert).unwrap();
        let key_pem = std::fs::read_to_string(&key).unwrap();
        assert!(cert_pem.contains("BEGIN CERTIFICATE"));
        assert!(key_pem.contains("PRIVATE KEY"));
    }

    #[test]
    fn test_existing_files_are_reused() {
        let dir = tempfile::tempdir().unwrap();
        let cert = dir.path().join("server.crt");
        let key = dir.path().join("server.key");

        std::fs::write(&cert, "existing cert").unwrap();
        std::fs::write(&key, "existing key").unwrap();

        ensure_self_signed(&cert, &key).unwrap();

        assert_eq!(std::fs::read_to_string(&cert).unwrap(), "existing cert");
        assert_eq!(std::fs::read_to_string(&key).unwrap(), "existing key");
    }
}
