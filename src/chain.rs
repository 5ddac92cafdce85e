use openssl::stack::Stack;
use openssl::x509::store::{X509Store, X509StoreBuilder};
use openssl::x509::{X509, X509StoreContext, X509VerifyResult};
use tracing::debug;

use crate::authority::CertificateAuthority;
use crate::certificate::Certificate;
use crate::error::Result;
use crate::pem;

/// Certificates from the root down to `ca`, `ca` itself last.
///
/// For a root the result is just the root certificate.
pub fn chain(ca: &CertificateAuthority) -> Vec<Certificate> {
    let mut certs = match ca.parent() {
        Some(parent) => chain(parent),
        None => Vec::new(),
    };
    certs.push(ca.certificate().clone());
    certs
}

/// PEM blocks of [`chain`] concatenated in the same root first order
pub fn chain_pem(ca: &CertificateAuthority) -> Result<String> {
    let certs = chain(ca);
    debug!(depth = certs.len(), "assembling chain PEM");
    certs.iter().try_fold(String::new(), |mut out, cert| {
        out.push_str(&pem::cert_to_pem(cert)?);
        Ok(out)
    })
}

/// Store holding every certificate of the chain of `ca`, for verifying
/// certificates issued anywhere along that chain
pub fn chain_store(ca: &CertificateAuthority) -> Result<X509Store> {
    let mut store_builder = X509StoreBuilder::new()?;
    for cert in chain(ca) {
        store_builder.add_cert(cert.x509().to_owned())?;
    }
    Ok(store_builder.build())
}

/// Runs OpenSSL path validation of `cert` against the chain of `ca`.
///
/// Returns the verification outcome instead of a bool so an expired
/// certificate can be told apart from one with a broken signature path.
pub fn verify(cert: &Certificate, ca: &CertificateAuthority) -> Result<X509VerifyResult> {
    let store = chain_store(ca)?;
    let untrusted: Stack<X509> = Stack::new()?;
    let mut ctx = X509StoreContext::new()?;
    let result = ctx.init(&store, cert.x509(), &untrusted, |c| {
        c.verify_cert()?;
        Ok(c.error())
    })?;
    debug!(result = %result.error_string(), "verified certificate against chain");
    Ok(result)
}

/// True if `cert` validates against the chain of `ca`
pub fn verify_cert(cert: &Certificate, ca: &CertificateAuthority) -> Result<bool> {
    Ok(verify(cert, ca)? == X509VerifyResult::OK)
}
