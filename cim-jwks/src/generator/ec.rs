use rand::rngs::OsRng;
use tracing::info;

use cim_slo::Result;

use super::KeyPairGenerator;
use crate::{KeyAlgorithm, KeyPair, PrivateKeyHandle};

/// ECDSA keys on NIST P-256 (secp256r1), signing as ES256.
#[derive(Debug, Clone, Copy, Default)]
pub struct EcKeyPairGenerator;

impl EcKeyPairGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl KeyPairGenerator for EcKeyPairGenerator {
    fn generate(&self) -> Result<KeyPair> {
        info!("Generating elliptic curve JWK key pair");
        let secret = p256::SecretKey::random(&mut OsRng);
        Ok(PrivateKeyHandle::Ec(secret).into())
    }

    fn algorithm(&self) -> KeyAlgorithm {
        KeyAlgorithm::Ec
    }
}

#[cfg(test)]
mod tests {
    use p256::ecdsa::{
        signature::{Signer, Verifier},
        Signature, SigningKey, VerifyingKey,
    };

    use super::*;
    use crate::PublicKeyHandle;

    #[test]
    fn generate_signs_and_verifies() {
        let generator = EcKeyPairGenerator::new();
        let pair = generator.generate().unwrap();
        assert_eq!(generator.algorithm(), KeyAlgorithm::Ec);
        assert_eq!(pair.algorithm(), generator.algorithm());

        let (PrivateKeyHandle::Ec(secret), PublicKeyHandle::Ec(public)) =
            (pair.private_key(), pair.public_key())
        else {
            panic!("expected an EC key pair");
        };
        let message = b"header.payload";
        let signature: Signature = SigningKey::from(secret).sign(message);
        assert!(VerifyingKey::from(public).verify(message, &signature).is_ok());
    }

    #[test]
    fn no_reused_randomness() {
        let generator = EcKeyPairGenerator::new();
        let a = generator.generate().unwrap();
        let b = generator.generate().unwrap();
        assert_ne!(a.public_key(), b.public_key());
    }
}
