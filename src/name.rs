use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use openssl::x509::{X509Name, X509NameBuilder, X509NameRef};

use crate::error::{PkiError, Result};

/// Parses a distinguished name.
///
/// Two notations are accepted:
/// - slash separated, when the string starts with `/`: `/DC=org/DC=example/CN=host`
/// - comma separated otherwise: `C=US, O=Example, CN=Example Root CA`,
///   where `\,` is a literal comma inside a value
///
/// Keys are OpenSSL attribute names (`C`, `ST`, `L`, `O`, `OU`, `CN`, `DC`,
/// `emailAddress`, ...). Attribute order is kept as written.
pub fn parse_name(subject: &str) -> Result<X509Name> {
    let trimmed = subject.trim();
    let components = if trimmed.starts_with('/') {
        trimmed
            .split('/')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from)
            .collect()
    } else {
        split_escaped(trimmed)
    };
    if components.is_empty() {
        return Err(PkiError::InvalidSubject(format!(
            "no attributes in {subject:?}"
        )));
    }

    let mut builder = X509NameBuilder::new()?;
    for component in &components {
        let (key, value) = component.split_once('=').ok_or_else(|| {
            PkiError::InvalidSubject(format!("missing '=' in {component:?} of {subject:?}"))
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(PkiError::InvalidSubject(format!(
                "empty attribute type in {component:?}"
            )));
        }
        builder
            .append_entry_by_text(key, value.trim())
            .map_err(|e| PkiError::InvalidSubject(format!("{key}: {e}")))?;
    }
    Ok(builder.build())
}

fn split_escaped(subject: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = subject.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            ',' => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    parts.push(current.trim().to_string());
    parts.retain(|p| !p.is_empty());
    parts
}

/// One-line rendering of a name, `CN=Test Root, O=Example`, used for logs
pub fn describe_name(name: &X509NameRef) -> String {
    name.entries()
        .map(|entry| {
            let key = entry.object().nid().short_name().unwrap_or("?");
            let value = String::from_utf8_lossy(entry.data().as_slice());
            format!("{key}={value}")
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// A subject alternative name entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AltName {
    Dns(String),
    Ip(IpAddr),
}

impl FromStr for AltName {
    type Err = PkiError;

    /// Parses `DNS:<name>` or `IP:<address>`, prefix case is ignored
    fn from_str(s: &str) -> Result<Self> {
        let (kind, value) = s
            .split_once(':')
            .ok_or_else(|| PkiError::InvalidAltName(format!("missing type prefix in {s:?}")))?;
        let value = value.trim();
        match kind.trim().to_ascii_uppercase().as_str() {
            "DNS" if !value.is_empty() => Ok(AltName::Dns(value.to_string())),
            "DNS" => Err(PkiError::InvalidAltName(format!("empty DNS name in {s:?}"))),
            "IP" => value
                .parse::<IpAddr>()
                .map(AltName::Ip)
                .map_err(|e| PkiError::InvalidAltName(format!("{s:?}: {e}"))),
            other => Err(PkiError::InvalidAltName(format!(
                "unsupported type {other:?} in {s:?}"
            ))),
        }
    }
}

impl fmt::Display for AltName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AltName::Dns(name) => write!(f, "DNS:{name}"),
            AltName::Ip(addr) => write!(f, "IP:{addr}"),
        }
    }
}

/// Parses a list of `DNS:`/`IP:` strings keeping their order
pub fn parse_alt_names<S: AsRef<str>>(names: &[S]) -> Result<Vec<AltName>> {
    names.iter().map(|n| n.as_ref().parse()).collect()
}
