//! # Cert-Chain
//!
//! ## Description
//!
//! A small toolkit on top of the OpenSSL crate for building a chain of trust:
//! a self-signed root certificate authority, any number of intermediate CAs
//! signed by their parent, and server certificates signed by any of them.
//! Everything can be exported as PEM text, private keys optionally encrypted
//! with a passphrase.
//!
//! The package is a generator for test and lab setups. It does not store what
//! it issues, and it has no revocation support.
//!
//! ### Hierarchy rules
//! - Every CA owns its own RSA key; an intermediate is signed with its
//!   parent's key, never shares it.
//! - The root creates a serial counter that every intermediate and every
//!   server certificate below it draws from, so serials never repeat inside
//!   one hierarchy and always increase in issuance order.
//! - CAs carry `basicConstraints=CA:TRUE` and `keyUsage=keyCertSign,cRLSign`
//!   (both critical), a subject key identifier and an authority key identifier.
//! - Server certificates carry `keyUsage=digitalSignature` (critical), a
//!   subject key identifier and, when alternative names are given, a
//!   `subjectAltName` extension.
//! - Everything is signed with SHA-256.
//!
//! ## Basic example building a hierarchy
//! ```rust
//! use cert_chain::{CertificateAuthority, ServerCert, StartTime, verify_cert};
//!
//! let root = CertificateAuthority::root(1024, "CN=Test Root")?;
//! let intermediate = CertificateAuthority::intermediate(&root, 1024, "CN=Test Intermediate 1")?;
//!
//! let leaf = ServerCert::issue(
//!     &intermediate,
//!     Some(&["DNS:host1", "IP:1.2.3.4"][..]),
//!     StartTime::Now,
//!     None,
//! )?;
//! assert!(verify_cert(leaf.certificate(), &intermediate)?);
//!
//! // root first, the intermediate last
//! let chain_pem = intermediate.cert_chain_pem()?;
//! assert_eq!(chain_pem.matches("BEGIN CERTIFICATE").count(), 2);
//! # Ok::<(), cert_chain::PkiError>(())
//! ```
//!
//! ## Example using the builders
//! ```rust
//! use cert_chain::{CaBuilder, ServerCertBuilder};
//! use chrono::{Duration, Utc};
//!
//! let root = CaBuilder::new()
//!     .subject("C=SE, O=my org, CN=My Test Ca")
//!     .key_bits(1024)
//!     .serial_start(1000)
//!     .passphrase("secret")
//!     .build_root()?;
//!
//! // already expired: started two weeks ago, valid for five days
//! let expired = ServerCertBuilder::new()
//!     .subject("/DC=org/DC=example/CN=old.example.org")
//!     .key_bits(1024)
//!     .alt_names(&["DNS:old.example.org"])
//!     .start_time(Utc::now() - Duration::days(14))
//!     .lifetime_secs(5 * 24 * 60 * 60)
//!     .issue(&root)?;
//! assert!(expired.certificate().not_after()? < Utc::now());
//!
//! // cert followed by the key encrypted with the hierarchy passphrase
//! let pem = expired.pem_encrypted(None)?;
//! assert!(pem.contains("BEGIN ENCRYPTED PRIVATE KEY"));
//! # Ok::<(), cert_chain::PkiError>(())
//! ```
//!
//! ## Config
//!
//! | builder | setting | default |
//! | ------- | ------- | ------- |
//! | `CaBuilder` | subject | `DEFAULT_ROOT_SUBJECT`, or `default_intermediate_subject(level)` |
//! | `CaBuilder` | key_bits | 4096 |
//! | `CaBuilder` | lifetime_secs | two years |
//! | `CaBuilder` | serial_start (root only) | 492113, first serial is one higher |
//! | `CaBuilder` | passphrase (root only) | `DEFAULT_PASSPHRASE`, inherited by the hierarchy |
//! | `ServerCertBuilder` | subject | `DEFAULT_SERVER_SUBJECT` |
//! | `ServerCertBuilder` | key_bits | 2048 |
//! | `ServerCertBuilder` | alt_names | none, `DNS:<name>` or `IP:<addr>` |
//! | `ServerCertBuilder` | start_time | now; `None` is rejected |
//! | `ServerCertBuilder` | lifetime_secs | one year; zero or less becomes one second |
//!
//! Subjects are written `C=US, O=Example, CN=Root` or `/DC=org/DC=example/CN=host`.

pub mod authority;
pub mod certificate;
pub mod chain;
pub mod error;
pub mod key;
pub mod name;
pub mod pem;
pub mod serial;
pub mod server;

pub use authority::{
    CaBuilder, CaKind, CertificateAuthority, DEFAULT_PASSPHRASE, DEFAULT_ROOT_SUBJECT,
    default_intermediate_subject,
};
pub use certificate::Certificate;
pub use chain::{chain, chain_pem, chain_store, verify, verify_cert};
pub use error::{PkiError, Result};
pub use key::KeyPair;
pub use name::{AltName, parse_name};
pub use serial::SerialAllocator;
pub use server::{DEFAULT_SERVER_SUBJECT, ServerCert, ServerCertBuilder, StartTime};
