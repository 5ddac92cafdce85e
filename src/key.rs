use openssl::pkey::{PKey, PKeyRef, Private, Public};
use openssl::rsa::Rsa;
use tracing::debug;

use crate::error::{PkiError, Result};

/// Smallest RSA modulus accepted, only sensible for tests
pub const MIN_RSA_BITS: u32 = 512;
/// Largest RSA modulus accepted
pub const MAX_RSA_BITS: u32 = 16384;
/// Default modulus size for certificate authorities
pub const CA_KEY_BITS: u32 = 4096;
/// Default modulus size for server certificates
pub const LEAF_KEY_BITS: u32 = 2048;

/// An RSA private key together with the modulus size it was generated with.
///
/// Each authority and each server certificate owns its own `KeyPair`, keys are
/// never shared between them.
pub struct KeyPair {
    pkey: PKey<Private>,
    bits: u32,
}

impl KeyPair {
    /// Generates a new RSA key with a modulus of `bits` bits.
    pub fn generate(bits: u32) -> Result<Self> {
        if !(MIN_RSA_BITS..=MAX_RSA_BITS).contains(&bits) {
            return Err(PkiError::KeyGeneration(format!(
                "unsupported RSA modulus size {bits}, expected {MIN_RSA_BITS}..={MAX_RSA_BITS}"
            )));
        }
        debug!(bits, "generating RSA key");
        let rsa = Rsa::generate(bits).map_err(|e| PkiError::KeyGeneration(e.to_string()))?;
        let pkey = PKey::from_rsa(rsa).map_err(|e| PkiError::KeyGeneration(e.to_string()))?;
        Ok(Self { pkey, bits })
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    pub fn private_key(&self) -> &PKeyRef<Private> {
        &self.pkey
    }

    /// The public half, as it gets embedded into a certificate
    pub fn public_key(&self) -> Result<PKey<Public>> {
        let der = self.pkey.public_key_to_der()?;
        Ok(PKey::public_key_from_der(&der)?)
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("algorithm", &"RSA")
            .field("bits", &self.bits)
            .finish()
    }
}
