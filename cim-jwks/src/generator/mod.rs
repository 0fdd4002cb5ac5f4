mod ec;
mod rsa;

pub use self::ec::EcKeyPairGenerator;
pub use self::rsa::{RsaKeyPairGenerator, RSA_BITS_RANGE};

use std::fmt;

use cim_slo::Result;

use crate::{KeyAlgorithm, KeyPair};

/// Produces fresh signing key pairs for a single algorithm.
pub trait KeyPairGenerator: fmt::Debug + Send + Sync {
    /// Draws a new key pair from the operating system's secure RNG.
    fn generate(&self) -> Result<KeyPair>;

    fn algorithm(&self) -> KeyAlgorithm;
}
