use miette::{Context, IntoDiagnostic};
use rcgen::{BasicConstraints, CertificateParams, ExtendedKeyUsagePurpose, IsCa, KeyPair};
use std::path::{Path, PathBuf};
use tracing::info;

const CA_FILE: &str = "ca.pem";
const CERT_FILE: &str = "webhook.pem";
const KEY_FILE: &str = "webhook-key.pem";

/// How the webhook server terminates TLS.
///
/// The API server only calls webhooks over HTTPS, so `Disabled` is meant for
/// local testing behind a TLS-terminating proxy.
#[derive(Debug, Clone)]
pub enum TlsMode {
    /// Plain HTTP.
    Disabled,
    /// Self-signed CA and serving certificate, persisted under `data_dir`
    /// and reused on restart.
    AutoGenerate {
        data_dir: PathBuf,
        san_entries: Vec<String>,
    },
    /// PEM certificate and key, typically mounted from a Secret.
    Provided {
        cert_path: PathBuf,
        key_path: PathBuf,
    },
}

/// Resolved TLS key material ready for use by the server.
#[derive(Debug, Clone)]
pub struct TlsMaterial {
    pub cert_pem: Vec<u8>,
    pub key_pem: Vec<u8>,
    /// CA to place in the webhook configuration's `caBundle`; only known for
    /// generated material
    pub ca_pem: Option<Vec<u8>>,
}

/// Resolve TLS material for `mode`, generating it if needed.
pub fn resolve_tls(mode: &TlsMode) -> miette::Result<Option<TlsMaterial>> {
    match mode {
        TlsMode::Disabled => Ok(None),
        TlsMode::AutoGenerate {
            data_dir,
            san_entries,
        } => {
            let files = [CA_FILE, CERT_FILE, KEY_FILE].map(|f| data_dir.join(f));

            if files.iter().all(|p| p.exists()) {
                info!("Reusing webhook certificates in {}", data_dir.display());
                let [ca, cert, key] = files;
                return Ok(Some(TlsMaterial {
                    cert_pem: read_pem(&cert, "serving certificate")?,
                    key_pem: read_pem(&key, "serving key")?,
                    ca_pem: Some(read_pem(&ca, "CA certificate")?),
                }));
            }

            info!(
                "Generating self-signed webhook certificates in {}",
                data_dir.display()
            );
            generate_self_signed(data_dir, san_entries).map(Some)
        }
        TlsMode::Provided {
            cert_path,
            key_path,
        } => Ok(Some(TlsMaterial {
            cert_pem: read_pem(cert_path, "TLS certificate")?,
            key_pem: read_pem(key_path, "TLS key")?,
            ca_pem: None,
        })),
    }
}

fn read_pem(path: &Path, what: &str) -> miette::Result<Vec<u8>> {
    std::fs::read(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read {} at {}", what, path.display()))
}

fn write_pem(path: &Path, pem: &str, what: &str) -> miette::Result<()> {
    std::fs::write(path, pem)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to write {} to {}", what, path.display()))
}

/// Generate a CA and a serving certificate for `san_entries`, signed by it.
fn generate_self_signed(data_dir: &Path, san_entries: &[String]) -> miette::Result<TlsMaterial> {
    std::fs::create_dir_all(data_dir)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to create TLS directory {}", data_dir.display()))?;

    let ca_key = KeyPair::generate()
        .into_diagnostic()
        .wrap_err("failed to generate CA key pair")?;
    let mut ca_params = CertificateParams::new(vec!["Zonepin CA".to_string()])
        .into_diagnostic()
        .wrap_err("failed to create CA certificate params")?;
    ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    let ca_cert = ca_params
        .self_signed(&ca_key)
        .into_diagnostic()
        .wrap_err("failed to self-sign CA certificate")?;

    let server_key = KeyPair::generate()
        .into_diagnostic()
        .wrap_err("failed to generate serving key pair")?;
    let mut server_params = CertificateParams::new(san_entries.to_vec())
        .into_diagnostic()
        .wrap_err("failed to create serving certificate params")?;
    server_params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];
    let server_cert = server_params
        .signed_by(&server_key, &ca_cert, &ca_key)
        .into_diagnostic()
        .wrap_err("failed to sign serving certificate")?;

    let ca_pem = ca_cert.pem();
    let cert_pem = server_cert.pem();
    let key_pem = server_key.serialize_pem();

    write_pem(&data_dir.join(CA_FILE), &ca_pem, "CA certificate")?;
    write_pem(&data_dir.join(CERT_FILE), &cert_pem, "serving certificate")?;
    write_pem(&data_dir.join(KEY_FILE), &key_pem, "serving key")?;

    info!(
        "Webhook certificates written to {}; use {} as the caBundle",
        data_dir.display(),
        CA_FILE
    );

    Ok(TlsMaterial {
        cert_pem: cert_pem.into_bytes(),
        key_pem: key_pem.into_bytes(),
        ca_pem: Some(ca_pem.into_bytes()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn auto(dir: &Path) -> TlsMode {
        TlsMode::AutoGenerate {
            data_dir: dir.to_path_buf(),
            san_entries: vec![
                "zonepin.kube-system.svc".to_string(),
                "localhost".to_string(),
            ],
        }
    }

    #[test]
    fn test_auto_generate_writes_files() {
        let dir = tempdir().unwrap();
        let tls_dir = dir.path().join("tls");

        let material = resolve_tls(&auto(&tls_dir)).unwrap().unwrap();

        assert!(String::from_utf8_lossy(&material.cert_pem).contains("BEGIN CERTIFICATE"));
        assert!(String::from_utf8_lossy(&material.key_pem).contains("PRIVATE KEY"));
        assert!(material.ca_pem.is_some());
        for file in [CA_FILE, CERT_FILE, KEY_FILE] {
            assert!(tls_dir.join(file).exists(), "{} missing", file);
        }
    }

    #[test]
    fn test_auto_generate_is_stable_across_restarts() {
        let dir = tempdir().unwrap();

        let first = resolve_tls(&auto(dir.path())).unwrap().unwrap();
        let second = resolve_tls(&auto(dir.path())).unwrap().unwrap();

        assert_eq!(first.cert_pem, second.cert_pem);
        assert_eq!(first.key_pem, second.key_pem);
        assert_eq!(first.ca_pem, second.ca_pem);
    }

    #[test]
    fn test_provided_reads_files_without_ca() {
        let dir = tempdir().unwrap();
        resolve_tls(&auto(dir.path())).unwrap();

        let mode = TlsMode::Provided {
            cert_path: dir.path().join(CERT_FILE),
            key_path: dir.path().join(KEY_FILE),
        };
        let material = resolve_tls(&mode).unwrap().unwrap();

        assert!(!material.cert_pem.is_empty());
        assert!(material.ca_pem.is_none());
    }

    #[test]
    fn test_provided_missing_file_errors() {
        let mode = TlsMode::Provided {
            cert_path: PathBuf::from("/nonexistent/tls.crt"),
            key_path: PathBuf::from("/nonexistent/tls.key"),
        };

        let err = resolve_tls(&mode).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/tls.crt"));
    }

    #[test]
    fn test_disabled_returns_none() {
        assert!(resolve_tls(&TlsMode::Disabled).unwrap().is_none());
    }
}
