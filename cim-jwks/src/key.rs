use std::fmt;

use rsa::{RsaPrivateKey, RsaPublicKey};

use cim_slo::{errors, Result};

use crate::KeyAlgorithm;

#[derive(Clone, Debug, PartialEq)]
pub enum PublicKeyHandle {
    Ec(p256::PublicKey),
    Rsa(RsaPublicKey),
}

impl PublicKeyHandle {
    pub fn algorithm(&self) -> KeyAlgorithm {
        match self {
            Self::Ec(_) => KeyAlgorithm::Ec,
            Self::Rsa(_) => KeyAlgorithm::Rsa,
        }
    }
}

#[derive(Clone)]
pub enum PrivateKeyHandle {
    Ec(p256::SecretKey),
    Rsa(RsaPrivateKey),
}

impl PrivateKeyHandle {
    pub fn algorithm(&self) -> KeyAlgorithm {
        match self {
            Self::Ec(_) => KeyAlgorithm::Ec,
            Self::Rsa(_) => KeyAlgorithm::Rsa,
        }
    }

    pub fn public_key(&self) -> PublicKeyHandle {
        match self {
            Self::Ec(secret) => PublicKeyHandle::Ec(secret.public_key()),
            Self::Rsa(private) => PublicKeyHandle::Rsa(private.to_public_key()),
        }
    }
}

impl fmt::Debug for PrivateKeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PrivateKeyHandle")
            .field(&self.algorithm())
            .finish()
    }
}

impl PartialEq for PrivateKeyHandle {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Ec(a), Self::Ec(b)) => a.to_bytes() == b.to_bytes(),
            (Self::Rsa(a), Self::Rsa(b)) => a == b,
            _ => false,
        }
    }
}

/// A public and private key of one algorithm that belong together.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyPair {
    public: PublicKeyHandle,
    private: PrivateKeyHandle,
}

impl KeyPair {
    /// Pairs two decoded halves, checking they are the same key.
    pub fn new(
        public: PublicKeyHandle,
        private: PrivateKeyHandle,
    ) -> Result<Self> {
        let algorithm = public.algorithm();
        if private.algorithm() != algorithm {
            return Err(errors::key_type_mismatch(
                &algorithm,
                &private.algorithm(),
            ));
        }
        if private.public_key() != public {
            return Err(errors::invalid_key_encoding(
                &algorithm,
                "public and private key are not a pair",
            ));
        }
        Ok(Self { public, private })
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        self.public.algorithm()
    }

    pub fn public_key(&self) -> &PublicKeyHandle {
        &self.public
    }

    pub fn private_key(&self) -> &PrivateKeyHandle {
        &self.private
    }
}

impl From<PrivateKeyHandle> for KeyPair {
    fn from(private: PrivateKeyHandle) -> Self {
        Self {
            public: private.public_key(),
            private,
        }
    }
}
