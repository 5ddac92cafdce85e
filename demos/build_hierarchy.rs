use cert_chain::{CertificateAuthority, ServerCert, StartTime, verify};
use chrono::{Duration, Utc};
use tracing_subscriber::EnvFilter;

/// Builds root -> intermediate 1 -> intermediate 2 and issues two server
/// certificates: a plain one signed by the root and an already expired one
/// with alternative names signed by intermediate 1.
/// Prints the chain of intermediate 2 and the expired certificate with its key.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let ca = CertificateAuthority::root(1024, "CN=Test Root")?;
    let ica1 = CertificateAuthority::intermediate(&ca, 1024, "CN=Test Intermediate 1")?;
    let ica2 = CertificateAuthority::intermediate(&ica1, 1024, "CN=Test Intermediate 2")?;

    let crt1 = ServerCert::issue(&ca, None, StartTime::Now, None)?;
    let crt2 = ServerCert::issue(
        &ica1,
        Some(&["DNS:host1", "DNS:host2", "IP:1.2.3.4"][..]),
        StartTime::At(Utc::now() - Duration::days(14)),
        Some(5 * 24 * 60 * 60),
    )?;

    eprintln!(
        "crt1: {}",
        verify(crt1.certificate(), &ca)?.error_string()
    );
    eprintln!(
        "crt2: {}",
        verify(crt2.certificate(), &ica1)?.error_string()
    );

    print!("{}", ica2.cert_chain_pem()?);
    print!("{}", crt2.pem()?);
    Ok(())
}
