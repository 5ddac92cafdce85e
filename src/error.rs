use openssl::error::ErrorStack;
use thiserror::Error;

/// Errors raised while generating keys, building or exporting certificates.
#[derive(Debug, Error)]
pub enum PkiError {
    /// A subject or issuer distinguished name could not be parsed
    #[error("invalid subject name: {0}")]
    InvalidSubject(String),

    /// The requested key size is unsupported or the provider failed
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// The signer cannot sign, its key does not match its certificate,
    /// or the provider rejected the signature
    #[error("signing failed: {0}")]
    Signing(String),

    /// Start time explicitly unset, or the resulting window is empty
    #[error("invalid validity window: {0}")]
    InvalidValidityWindow(String),

    /// A subject alternative name is neither `DNS:<name>` nor `IP:<addr>`
    #[error("invalid alternative name: {0}")]
    InvalidAltName(String),

    /// The hierarchy's serial counter has no higher value left
    #[error("serial numbers exhausted after {0}")]
    SerialExhausted(u64),

    /// Re-reading a certificate failed
    #[error("certificate parsing error: {0}")]
    Parse(String),

    #[error("openssl error: {0}")]
    Crypto(#[from] ErrorStack),
}

/// Result type for certificate operations
pub type Result<T> = std::result::Result<T, PkiError>;
