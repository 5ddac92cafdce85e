use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use openssl::x509::store::X509Store;
use tracing::info;

use crate::certificate::{CertTemplate, Certificate, Profile};
use crate::chain;
use crate::error::{PkiError, Result};
use crate::key::{CA_KEY_BITS, KeyPair};
use crate::name::{describe_name, parse_name};
use crate::pem;
use crate::serial::{DEFAULT_SERIAL_START, SerialAllocator};

/// Subject used for a root CA when none is given
pub const DEFAULT_ROOT_SUBJECT: &str = "C=US, ST=IL, O=Example, OU=Example Certificate Authority, CN=Example Root CA, emailAddress=ca@example.com";
/// Two years
pub const DEFAULT_CA_LIFETIME_SECS: i64 = 2 * 365 * 24 * 60 * 60;
/// Passphrase protecting exported keys of a hierarchy unless another one is set
pub const DEFAULT_PASSPHRASE: &str = "changeit";

/// Default subject for the intermediate CA at `level` below the root (the
/// first intermediate is level 1).
pub fn default_intermediate_subject(level: u32) -> String {
    format!(
        "C=US, ST=IL, O=Example, OU=Example Certificate Authority, CN=Example Intermediate CA level {level}, emailAddress=ca@example.com"
    )
}

/// Whether an authority signed itself or was signed by a parent
#[derive(Debug)]
pub enum CaKind {
    Root,
    Intermediate { parent: Arc<CertificateAuthority> },
}

/// A certificate authority: its own key, its own certificate, and the serial
/// counter of the hierarchy it belongs to.
///
/// Authorities are handed out as `Arc` so intermediates and server
/// certificates can point back at their issuer.
#[derive(Debug)]
pub struct CertificateAuthority {
    kind: CaKind,
    key: KeyPair,
    certificate: Certificate,
    serials: SerialAllocator,
    passphrase: String,
}

impl CertificateAuthority {
    /// Self-signed root with a fresh serial counter and default settings
    pub fn root(bits: u32, subject: &str) -> Result<Arc<Self>> {
        CaBuilder::new().key_bits(bits).subject(subject).build_root()
    }

    /// Intermediate signed by `parent`, drawing serials from the parent's counter
    pub fn intermediate(parent: &Arc<Self>, bits: u32, subject: &str) -> Result<Arc<Self>> {
        CaBuilder::new()
            .key_bits(bits)
            .subject(subject)
            .build_intermediate(parent)
    }

    pub fn kind(&self) -> &CaKind {
        &self.kind
    }

    pub fn is_root(&self) -> bool {
        matches!(self.kind, CaKind::Root)
    }

    /// The authority that signed this one, `None` for a root
    pub fn parent(&self) -> Option<&Arc<CertificateAuthority>> {
        match &self.kind {
            CaKind::Root => None,
            CaKind::Intermediate { parent } => Some(parent),
        }
    }

    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    pub fn key(&self) -> &KeyPair {
        &self.key
    }

    pub fn serials(&self) -> &SerialAllocator {
        &self.serials
    }

    /// Passphrase shared by the whole hierarchy
    pub fn passphrase(&self) -> &str {
        &self.passphrase
    }

    /// Next serial of the hierarchy, for certificates issued by this CA
    pub fn assign_serial(&self) -> Result<u64> {
        self.serials.next_serial()
    }

    pub fn cert_pem(&self) -> Result<String> {
        pem::cert_to_pem(&self.certificate)
    }

    /// CA key encrypted with the hierarchy passphrase
    pub fn key_pem(&self) -> Result<String> {
        pem::key_to_pem(&self.key, Some(&self.passphrase))
    }

    /// Certificates from the root down to this CA
    pub fn cert_chain(&self) -> Vec<Certificate> {
        chain::chain(self)
    }

    pub fn cert_chain_pem(&self) -> Result<String> {
        chain::chain_pem(self)
    }

    pub fn cert_store(&self) -> Result<X509Store> {
        chain::chain_store(self)
    }
}

/// Builder for root and intermediate authorities.
///
/// `serial_start` and `passphrase` only apply to roots: an intermediate
/// always inherits both from its parent.
pub struct CaBuilder {
    subject: Option<String>,
    key_bits: u32,
    lifetime_secs: i64,
    serial_start: u64,
    passphrase: String,
}

impl Default for CaBuilder {
    fn default() -> Self {
        Self {
            subject: None,
            key_bits: CA_KEY_BITS,
            lifetime_secs: DEFAULT_CA_LIFETIME_SECS,
            serial_start: DEFAULT_SERIAL_START,
            passphrase: DEFAULT_PASSPHRASE.to_string(),
        }
    }
}

impl CaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Distinguished name, `C=US, O=Example, CN=Root` or `/O=Example/CN=Root`
    pub fn subject(mut self, subject: &str) -> Self {
        self.subject = Some(subject.to_string());
        self
    }

    /// RSA modulus size, 4096 by default
    pub fn key_bits(mut self, key_bits: u32) -> Self {
        self.key_bits = key_bits;
        self
    }

    /// Validity counted from now, two years by default
    pub fn lifetime_secs(mut self, lifetime_secs: i64) -> Self {
        self.lifetime_secs = lifetime_secs;
        self
    }

    pub fn serial_start(mut self, serial_start: u64) -> Self {
        self.serial_start = serial_start;
        self
    }

    pub fn passphrase(mut self, passphrase: &str) -> Self {
        self.passphrase = passphrase.to_string();
        self
    }

    /// Creates a self-signed root CA with its own serial counter
    pub fn build_root(&self) -> Result<Arc<CertificateAuthority>> {
        let subject = self
            .subject
            .clone()
            .unwrap_or_else(|| DEFAULT_ROOT_SUBJECT.to_string());
        let template = self.template(&subject)?;
        let key = KeyPair::generate(self.key_bits)?;
        let serials = SerialAllocator::new(self.serial_start);
        let serial = serials.next_serial()?;
        let certificate = CertTemplate { serial, ..template }.sign(&key, None, &key)?;
        info!(
            serial,
            subject = %describe_name(certificate.subject_name()),
            "created root CA"
        );
        Ok(Arc::new(CertificateAuthority {
            kind: CaKind::Root,
            key,
            certificate,
            serials,
            passphrase: self.passphrase.clone(),
        }))
    }

    /// Creates an intermediate CA signed with the key of `parent`
    pub fn build_intermediate(
        &self,
        parent: &Arc<CertificateAuthority>,
    ) -> Result<Arc<CertificateAuthority>> {
        let subject = match &self.subject {
            Some(subject) => subject.clone(),
            None => default_intermediate_subject(depth(parent) + 1),
        };
        let template = self.template(&subject)?;
        let key = KeyPair::generate(self.key_bits)?;
        let serial = parent.assign_serial()?;
        let certificate = CertTemplate { serial, ..template }.sign(
            &key,
            Some(&parent.certificate),
            &parent.key,
        )?;
        info!(
            serial,
            subject = %describe_name(certificate.subject_name()),
            issuer = %describe_name(certificate.issuer_name()),
            "created intermediate CA"
        );
        Ok(Arc::new(CertificateAuthority {
            kind: CaKind::Intermediate {
                parent: Arc::clone(parent),
            },
            key,
            certificate,
            serials: parent.serials.clone(),
            passphrase: parent.passphrase.clone(),
        }))
    }

    /// Template with a placeholder serial, filled in once the key exists
    fn template(&self, subject: &str) -> Result<CertTemplate> {
        let subject = parse_name(subject)?;
        let lifetime = TimeDelta::try_seconds(self.lifetime_secs).ok_or_else(|| {
            PkiError::InvalidValidityWindow(format!("lifetime {}s out of range", self.lifetime_secs))
        })?;
        let not_before = Utc::now();
        let not_after = not_before.checked_add_signed(lifetime).ok_or_else(|| {
            PkiError::InvalidValidityWindow(format!("lifetime {}s overflows", self.lifetime_secs))
        })?;
        if not_after <= not_before {
            return Err(PkiError::InvalidValidityWindow(format!(
                "CA lifetime must be positive, got {}s",
                self.lifetime_secs
            )));
        }
        Ok(CertTemplate {
            subject,
            serial: 0,
            not_before,
            not_after,
            profile: Profile::Authority,
        })
    }
}

/// Number of authorities above `ca`
fn depth(ca: &CertificateAuthority) -> u32 {
    ca.parent().map_or(0, |parent| depth(parent) + 1)
}
