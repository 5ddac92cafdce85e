//! PEM export of certificates and keys.
//!
//! Keys are written as PKCS#8. With a passphrase the key is encrypted with
//! AES-256-CBC; the passphrase itself is not checked for strength.

use openssl::symm::Cipher;

use crate::certificate::Certificate;
use crate::error::Result;
use crate::key::KeyPair;

pub fn cert_to_pem(cert: &Certificate) -> Result<String> {
    Ok(pem_text(cert.x509().to_pem()?))
}

/// Private key as PEM, encrypted when `passphrase` is given
pub fn key_to_pem(key: &KeyPair, passphrase: Option<&str>) -> Result<String> {
    let pem = match passphrase {
        Some(passphrase) => key
            .private_key()
            .private_key_to_pem_pkcs8_passphrase(Cipher::aes_256_cbc(), passphrase.as_bytes())?,
        None => key.private_key().private_key_to_pem_pkcs8()?,
    };
    Ok(pem_text(pem))
}

/// Certificate PEM directly followed by the key PEM
pub fn combined_pem(cert: &Certificate, key: &KeyPair, passphrase: Option<&str>) -> Result<String> {
    let mut pem = cert_to_pem(cert)?;
    pem.push_str(&key_to_pem(key, passphrase)?);
    Ok(pem)
}

// PEM output is base64 plus ASCII armor
fn pem_text(bytes: Vec<u8>) -> String {
    String::from_utf8_lossy(&bytes).into_owned()
}
