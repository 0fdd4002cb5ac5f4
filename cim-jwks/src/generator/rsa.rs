use std::ops::RangeInclusive;

use rand::rngs::OsRng;
use rsa::RsaPrivateKey;
use tracing::{error, info};

use cim_slo::{errors, Result};

use super::KeyPairGenerator;
use crate::{KeyAlgorithm, KeyPair, PrivateKeyHandle};

/// Modulus sizes accepted for signing keys. The upper bound is the largest
/// key the decoder will load back.
pub const RSA_BITS_RANGE: RangeInclusive<usize> = 2048..=4096;

/// RSA keys with public exponent 65537, signing as RS256.
#[derive(Debug, Clone, Copy)]
pub struct RsaKeyPairGenerator {
    bits: usize,
}

impl RsaKeyPairGenerator {
    pub fn new(bits: usize) -> Result<Self> {
        if !RSA_BITS_RANGE.contains(&bits) {
            return Err(errors::config(&format!(
                "rsa modulus of {} bits not in range {}-{}",
                bits,
                RSA_BITS_RANGE.start(),
                RSA_BITS_RANGE.end()
            )));
        }
        Ok(Self { bits })
    }

    pub fn bits(&self) -> usize {
        self.bits
    }
}

impl KeyPairGenerator for RsaKeyPairGenerator {
    fn generate(&self) -> Result<KeyPair> {
        info!(bits = self.bits, "Generating rsa JWK key pair");
        let private = RsaPrivateKey::new(&mut OsRng, self.bits).map_err(|err| {
            error!(
                algorithm = %self.algorithm(),
                bits = self.bits,
                "Could not generate a JWK key pair: {}",
                err
            );
            errors::key_generation_unavailable(&self.algorithm(), &err)
        })?;
        Ok(PrivateKeyHandle::Rsa(private).into())
    }

    fn algorithm(&self) -> KeyAlgorithm {
        KeyAlgorithm::Rsa
    }
}
