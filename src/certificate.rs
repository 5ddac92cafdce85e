use chrono::{DateTime, Utc};
use num_bigint::BigUint;
use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{HasPublic, PKeyRef};
use openssl::x509::extension::{
    AuthorityKeyIdentifier, BasicConstraints, KeyUsage, SubjectAlternativeName,
    SubjectKeyIdentifier,
};
use openssl::x509::{X509, X509Builder, X509Name, X509NameRef, X509Ref};
use std::net::IpAddr;
use tracing::debug;
use x509_parser::certificate::X509Certificate;
use x509_parser::extensions::{GeneralName, ParsedExtension};
use x509_parser::parse_x509_certificate;

use crate::error::{PkiError, Result};
use crate::key::KeyPair;
use crate::name::{AltName, describe_name};

const X509_VERSION_3: i32 = 2; // X509 version 3 is represented by 2

/// A signed X.509v3 certificate.
///
/// Immutable once built; re-signing produces a new `Certificate` with the same
/// identity fields.
#[derive(Clone)]
pub struct Certificate {
    x509: X509,
}

impl Certificate {
    pub(crate) fn from_x509(x509: X509) -> Self {
        Self { x509 }
    }

    /// Reads back a PEM encoded certificate
    pub fn from_pem(pem: &str) -> Result<Self> {
        let x509 = X509::from_pem(pem.as_bytes()).map_err(|e| PkiError::Parse(e.to_string()))?;
        Ok(Self { x509 })
    }

    /// The underlying OpenSSL certificate
    pub fn x509(&self) -> &X509Ref {
        &self.x509
    }

    pub fn subject_name(&self) -> &X509NameRef {
        self.x509.subject_name()
    }

    pub fn issuer_name(&self) -> &X509NameRef {
        self.x509.issuer_name()
    }

    /// DER encoding of the subject, suitable for equality checks
    pub fn subject_der(&self) -> Result<Vec<u8>> {
        Ok(self.x509.subject_name().to_der()?)
    }

    /// DER encoding of the issuer, suitable for equality checks
    pub fn issuer_der(&self) -> Result<Vec<u8>> {
        Ok(self.x509.issuer_name().to_der()?)
    }

    /// First CN entry of the subject
    pub fn common_name(&self) -> Option<String> {
        let entry = self
            .x509
            .subject_name()
            .entries_by_nid(Nid::COMMONNAME)
            .next()?;
        std::str::from_utf8(entry.data().as_slice())
            .ok()
            .map(str::to_string)
    }

    pub fn serial(&self) -> Result<BigUint> {
        let bytes = self.x509.serial_number().to_bn()?.to_vec();
        Ok(BigUint::from_bytes_be(&bytes))
    }

    pub fn not_before(&self) -> Result<DateTime<Utc>> {
        let ts = self.parsed(|cert| cert.validity().not_before.timestamp())?;
        timestamp_to_utc(ts)
    }

    pub fn not_after(&self) -> Result<DateTime<Utc>> {
        let ts = self.parsed(|cert| cert.validity().not_after.timestamp())?;
        timestamp_to_utc(ts)
    }

    /// Signature bytes, the only thing re-signing is allowed to change
    pub fn signature(&self) -> Vec<u8> {
        self.x509.signature().as_slice().to_vec()
    }

    /// True if the signature verifies against `key`
    pub fn signed_by<T: HasPublic>(&self, key: &PKeyRef<T>) -> Result<bool> {
        Ok(self.x509.verify(key)?)
    }

    /// Subject equals issuer and the signature verifies against the embedded key
    pub fn is_self_signed(&self) -> Result<bool> {
        if self.subject_der()? != self.issuer_der()? {
            return Ok(false);
        }
        let own_key = self.x509.public_key()?;
        self.signed_by(&own_key)
    }

    /// basicConstraints CA:TRUE together with the keyCertSign key usage
    pub fn is_ca(&self) -> Result<bool> {
        self.parsed(|cert| {
            let mut is_ca = false;
            let mut can_sign = false;
            for ext in cert.tbs_certificate.extensions() {
                match ext.parsed_extension() {
                    ParsedExtension::BasicConstraints(bc) => is_ca = bc.ca,
                    ParsedExtension::KeyUsage(ku) => can_sign = ku.key_cert_sign(),
                    _ => {}
                }
            }
            is_ca && can_sign
        })
    }

    /// Entries of the subjectAltName extension in certificate order, empty if
    /// the extension is missing
    pub fn alt_names(&self) -> Result<Vec<AltName>> {
        self.parsed(|cert| {
            let mut names = Vec::new();
            for ext in cert.tbs_certificate.extensions() {
                if let ParsedExtension::SubjectAlternativeName(san) = ext.parsed_extension() {
                    for name in &san.general_names {
                        match name {
                            GeneralName::DNSName(dns) => names.push(AltName::Dns(dns.to_string())),
                            GeneralName::IPAddress(bytes) => {
                                if let Some(ip) = ip_from_bytes(bytes) {
                                    names.push(AltName::Ip(ip));
                                }
                            }
                            _ => {}
                        }
                    }
                }
            }
            names
        })
    }

    /// True if the certificate carries a subjectAltName extension at all
    pub fn has_alt_name_extension(&self) -> Result<bool> {
        self.parsed(|cert| {
            cert.tbs_certificate
                .extensions()
                .iter()
                .any(|ext| matches!(ext.parsed_extension(), ParsedExtension::SubjectAlternativeName(_)))
        })
    }

    fn parsed<T>(&self, f: impl FnOnce(&X509Certificate<'_>) -> T) -> Result<T> {
        let der = self.x509.to_der()?;
        let (_, cert) = parse_x509_certificate(&der).map_err(|e| PkiError::Parse(e.to_string()))?;
        Ok(f(&cert))
    }
}

impl std::fmt::Debug for Certificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Certificate")
            .field("subject", &describe_name(self.x509.subject_name()))
            .field("issuer", &describe_name(self.x509.issuer_name()))
            .finish()
    }
}

fn timestamp_to_utc(ts: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0).ok_or_else(|| PkiError::Parse(format!("timestamp {ts} out of range")))
}

fn ip_from_bytes(bytes: &[u8]) -> Option<IpAddr> {
    match bytes.len() {
        4 => <[u8; 4]>::try_from(bytes).ok().map(IpAddr::from),
        16 => <[u8; 16]>::try_from(bytes).ok().map(IpAddr::from),
        _ => None,
    }
}

/// UTCTime up to 2049, GeneralizedTime from 2050 on
pub(crate) fn asn1_time(time: &DateTime<Utc>) -> Result<Asn1Time> {
    Asn1Time::from_unix(time.timestamp())
        .map_err(|e| PkiError::InvalidValidityWindow(format!("{time}: {e}")))
}

/// Which extension set a certificate gets
#[derive(Debug, Clone)]
pub(crate) enum Profile {
    /// basicConstraints CA, keyCertSign + cRLSign, subject and authority key ids
    Authority,
    /// digitalSignature, subject key id, optional subjectAltName
    Server { alt_names: Vec<AltName> },
}

/// Everything that identifies a certificate except its signature.
///
/// Kept around after signing so a certificate can be signed again without
/// touching its identity.
pub(crate) struct CertTemplate {
    pub subject: X509Name,
    pub serial: u64,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub profile: Profile,
}

impl CertTemplate {
    /// Builds the certificate for `subject_key` and signs it.
    ///
    /// With `issuer == None` the certificate is self-signed and `signer` must
    /// be `subject_key`. Otherwise the issuer name is taken from the issuer
    /// certificate and `signer` must be the key of that certificate.
    pub fn sign(
        &self,
        subject_key: &KeyPair,
        issuer: Option<&Certificate>,
        signer: &KeyPair,
    ) -> Result<Certificate> {
        if let Some(issuer) = issuer {
            check_signer(issuer, signer)?;
        }
        let mut builder = self.prepare_x509_builder(subject_key, issuer)?;
        builder
            .sign(signer.private_key(), MessageDigest::sha256())
            .map_err(|e| PkiError::Signing(e.to_string()))?;
        let x509 = builder.build();
        debug!(
            serial = self.serial,
            subject = %describe_name(x509.subject_name()),
            "signed certificate"
        );
        Ok(Certificate::from_x509(x509))
    }

    fn prepare_x509_builder(
        &self,
        subject_key: &KeyPair,
        issuer: Option<&Certificate>,
    ) -> Result<X509Builder> {
        if self.not_after <= self.not_before {
            return Err(PkiError::InvalidValidityWindow(format!(
                "not after {} is not later than not before {}",
                self.not_after, self.not_before
            )));
        }
        let mut builder = X509::builder()?;
        builder.set_version(X509_VERSION_3)?;

        let serial_number = BigNum::from_slice(&self.serial.to_be_bytes())?.to_asn1_integer()?;
        builder.set_serial_number(&serial_number)?;
        builder.set_subject_name(&self.subject)?;
        match issuer {
            Some(issuer) => builder.set_issuer_name(issuer.subject_name())?,
            None => builder.set_issuer_name(&self.subject)?,
        }
        builder.set_pubkey(subject_key.private_key())?;
        let not_before = asn1_time(&self.not_before)?;
        builder.set_not_before(&not_before)?;
        let not_after = asn1_time(&self.not_after)?;
        builder.set_not_after(&not_after)?;

        let issuer_x509 = issuer.map(Certificate::x509);
        match &self.profile {
            Profile::Authority => {
                builder.append_extension(BasicConstraints::new().critical().ca().build()?)?;
                builder.append_extension(
                    KeyUsage::new().critical().key_cert_sign().crl_sign().build()?,
                )?;
                let ski = SubjectKeyIdentifier::new()
                    .build(&builder.x509v3_context(issuer_x509, None))?;
                builder.append_extension(ski)?;
                let aki = AuthorityKeyIdentifier::new()
                    .keyid(true)
                    .build(&builder.x509v3_context(issuer_x509, None))?;
                builder.append_extension(aki)?;
            }
            Profile::Server { alt_names } => {
                builder.append_extension(KeyUsage::new().critical().digital_signature().build()?)?;
                let ski = SubjectKeyIdentifier::new()
                    .build(&builder.x509v3_context(issuer_x509, None))?;
                builder.append_extension(ski)?;
                if !alt_names.is_empty() {
                    let mut san = SubjectAlternativeName::new();
                    for name in alt_names {
                        match name {
                            AltName::Dns(dns) => san.dns(dns),
                            AltName::Ip(ip) => san.ip(&ip.to_string()),
                        };
                    }
                    let san = san.build(&builder.x509v3_context(issuer_x509, None))?;
                    builder.append_extension(san)?;
                }
            }
        }
        Ok(builder)
    }
}

/// The signer must be a CA whose certificate carries the public half of `signer`
fn check_signer(issuer: &Certificate, signer: &KeyPair) -> Result<()> {
    if !issuer.is_ca()? {
        return Err(PkiError::Signing(format!(
            "{} is not a CA or lacks keyCertSign",
            describe_name(issuer.subject_name())
        )));
    }
    let issuer_key = issuer.x509().public_key()?;
    if !issuer_key.public_eq(signer.private_key()) {
        return Err(PkiError::Signing(format!(
            "signing key does not match certificate of {}",
            describe_name(issuer.subject_name())
        )));
    }
    Ok(())
}
