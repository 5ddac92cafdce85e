use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info};

use crate::authority::CertificateAuthority;
use crate::certificate::{CertTemplate, Certificate, Profile};
use crate::error::{PkiError, Result};
use crate::key::{KeyPair, LEAF_KEY_BITS};
use crate::name::{AltName, describe_name, parse_alt_names, parse_name};
use crate::pem;

/// Subject of a server certificate when none is given
pub const DEFAULT_SERVER_SUBJECT: &str = "/DC=org/DC=example/CN=Server certificate";
/// One year
pub const DEFAULT_LEAF_LIFETIME_SECS: i64 = 365 * 24 * 60 * 60;
/// Lifetimes at or below zero are raised to this
pub const MIN_LIFETIME_SECS: i64 = 1;

/// When the validity of a server certificate starts.
///
/// | value | not before |
/// |---|---|
/// | `Now` (default) | time of issuance |
/// | `At(t)` | `t` |
/// | `Unset` | issuance fails with [`PkiError::InvalidValidityWindow`] |
///
/// `From<Option<DateTime<Utc>>>` maps `None` to `Unset`: a start time that
/// was passed but empty is an error, it never falls back to now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StartTime {
    #[default]
    Now,
    At(DateTime<Utc>),
    Unset,
}

impl From<DateTime<Utc>> for StartTime {
    fn from(time: DateTime<Utc>) -> Self {
        StartTime::At(time)
    }
}

impl From<Option<DateTime<Utc>>> for StartTime {
    fn from(time: Option<DateTime<Utc>>) -> Self {
        time.map_or(StartTime::Unset, StartTime::At)
    }
}

/// Resolves start time and lifetime into `(not_before, not_after)`.
///
/// A missing lifetime means one year, a lifetime of zero or less is raised
/// to one second.
pub(crate) fn validity_window(
    start: StartTime,
    lifetime_secs: Option<i64>,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let not_before = match start {
        StartTime::Now => now,
        StartTime::At(time) => time,
        StartTime::Unset => {
            return Err(PkiError::InvalidValidityWindow(
                "start time is required".to_string(),
            ));
        }
    };
    let lifetime_secs = lifetime_secs
        .unwrap_or(DEFAULT_LEAF_LIFETIME_SECS)
        .max(MIN_LIFETIME_SECS);
    let not_after = TimeDelta::try_seconds(lifetime_secs)
        .and_then(|lifetime| not_before.checked_add_signed(lifetime))
        .ok_or_else(|| {
            PkiError::InvalidValidityWindow(format!("lifetime {lifetime_secs}s overflows"))
        })?;
    Ok((not_before, not_after))
}

/// End-entity certificate issued by a [`CertificateAuthority`].
///
/// Keeps a handle on its issuer so it can be signed again and so its key
/// can be exported with the hierarchy passphrase.
pub struct ServerCert {
    certificate: Certificate,
    key: KeyPair,
    issuer: Arc<CertificateAuthority>,
    template: CertTemplate,
}

impl ServerCert {
    /// Issues a server certificate with default subject and key size.
    ///
    /// `alt_names` are `DNS:<name>` / `IP:<addr>` strings; `None` or an empty
    /// slice leaves out the subjectAltName extension.
    pub fn issue(
        ca: &Arc<CertificateAuthority>,
        alt_names: Option<&[&str]>,
        start_time: StartTime,
        lifetime_secs: Option<i64>,
    ) -> Result<Self> {
        let mut builder = ServerCertBuilder::new().start_time(start_time);
        if let Some(alt_names) = alt_names {
            builder = builder.alt_names(alt_names);
        }
        if let Some(lifetime_secs) = lifetime_secs {
            builder = builder.lifetime_secs(lifetime_secs);
        }
        builder.issue(ca)
    }

    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    pub fn key(&self) -> &KeyPair {
        &self.key
    }

    pub fn issuer(&self) -> &Arc<CertificateAuthority> {
        &self.issuer
    }

    /// SAN entries the certificate was issued with, in request order
    pub fn alt_names(&self) -> &[AltName] {
        match &self.template.profile {
            Profile::Server { alt_names } => alt_names.as_slice(),
            Profile::Authority => &[],
        }
    }

    /// Signs the same certificate again with the issuer's key.
    ///
    /// Subject, issuer, serial, validity and extensions stay as they are,
    /// only the signature is replaced.
    pub fn re_sign(&mut self) -> Result<()> {
        self.certificate = self.template.sign(
            &self.key,
            Some(self.issuer.certificate()),
            self.issuer.key(),
        )?;
        debug!(serial = self.template.serial, "re-signed server certificate");
        Ok(())
    }

    pub fn cert_pem(&self) -> Result<String> {
        pem::cert_to_pem(&self.certificate)
    }

    /// Unencrypted private key
    pub fn key_pem(&self) -> Result<String> {
        pem::key_to_pem(&self.key, None)
    }

    /// Private key encrypted with `passphrase`, or with the issuing
    /// hierarchy's passphrase when `None`
    pub fn key_pem_encrypted(&self, passphrase: Option<&str>) -> Result<String> {
        let passphrase = passphrase.unwrap_or(self.issuer.passphrase());
        pem::key_to_pem(&self.key, Some(passphrase))
    }

    /// Certificate followed by the unencrypted key
    pub fn pem(&self) -> Result<String> {
        pem::combined_pem(&self.certificate, &self.key, None)
    }

    /// Certificate followed by the encrypted key, see [`ServerCert::key_pem_encrypted`]
    pub fn pem_encrypted(&self, passphrase: Option<&str>) -> Result<String> {
        let passphrase = passphrase.unwrap_or(self.issuer.passphrase());
        pem::combined_pem(&self.certificate, &self.key, Some(passphrase))
    }
}

impl std::fmt::Debug for ServerCert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerCert")
            .field("certificate", &self.certificate)
            .field("serial", &self.template.serial)
            .field("alt_names", &self.alt_names())
            .finish()
    }
}

/// Builder for server certificates
pub struct ServerCertBuilder {
    subject: String,
    key_bits: u32,
    alt_names: Vec<String>,
    start_time: StartTime,
    lifetime_secs: Option<i64>,
}

impl Default for ServerCertBuilder {
    /// Default subject, 2048 bit key, no alternative names, valid from now
    /// for one year.
    fn default() -> Self {
        Self {
            subject: DEFAULT_SERVER_SUBJECT.to_string(),
            key_bits: LEAF_KEY_BITS,
            alt_names: Vec::new(),
            start_time: StartTime::Now,
            lifetime_secs: None,
        }
    }
}

impl ServerCertBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subject(mut self, subject: &str) -> Self {
        self.subject = subject.to_string();
        self
    }

    pub fn key_bits(mut self, key_bits: u32) -> Self {
        self.key_bits = key_bits;
        self
    }

    /// Adds `DNS:<name>` / `IP:<addr>` entries, order is kept
    pub fn alt_names<S: AsRef<str>>(mut self, alt_names: &[S]) -> Self {
        self.alt_names
            .extend(alt_names.iter().map(|s| s.as_ref().to_string()));
        self
    }

    /// See [`StartTime`]; `Some(t)` and `t` start at `t`, `None` is an error
    pub fn start_time(mut self, start_time: impl Into<StartTime>) -> Self {
        self.start_time = start_time.into();
        self
    }

    pub fn lifetime_secs(mut self, lifetime_secs: i64) -> Self {
        self.lifetime_secs = Some(lifetime_secs);
        self
    }

    /// Generates the key, takes the next serial of `ca`'s hierarchy and signs
    /// with `ca`'s key.
    pub fn issue(&self, ca: &Arc<CertificateAuthority>) -> Result<ServerCert> {
        let subject = parse_name(&self.subject)?;
        let alt_names = parse_alt_names(&self.alt_names)?;
        let (not_before, not_after) =
            validity_window(self.start_time, self.lifetime_secs, Utc::now())?;
        let key = KeyPair::generate(self.key_bits)?;
        let template = CertTemplate {
            subject,
            serial: ca.assign_serial()?,
            not_before,
            not_after,
            profile: Profile::Server { alt_names },
        };
        let certificate = template.sign(&key, Some(ca.certificate()), ca.key())?;
        info!(
            serial = template.serial,
            subject = %describe_name(certificate.subject_name()),
            issuer = %describe_name(certificate.issuer_name()),
            not_after = %not_after,
            "issued server certificate"
        );
        Ok(ServerCert {
            certificate,
            key,
            issuer: Arc::clone(ca),
            template,
        })
    }
}
