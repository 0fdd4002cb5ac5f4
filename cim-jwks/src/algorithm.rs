use std::{fmt, str::FromStr};

use jsonwebkey as jwk;
use p256::pkcs8::ObjectIdentifier;
use serde::{Deserialize, Serialize};

use cim_slo::errors::{self, WithBacktrace};

/// id-ecPublicKey, RFC 5480
const EC_PUBLIC_KEY_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
/// rsaEncryption, RFC 8017
const RSA_ENCRYPTION_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum KeyAlgorithm {
    #[serde(rename = "EC")]
    Ec,
    #[serde(rename = "RSA")]
    Rsa,
}

impl KeyAlgorithm {
    pub const ALL: [KeyAlgorithm; 2] = [KeyAlgorithm::Ec, KeyAlgorithm::Rsa];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ec => "EC",
            Self::Rsa => "RSA",
        }
    }

    /// The JWS algorithm a key of this type signs with.
    pub fn jwk_algorithm(&self) -> jwk::Algorithm {
        match self {
            Self::Ec => jwk::Algorithm::ES256,
            Self::Rsa => jwk::Algorithm::RS256,
        }
    }

    pub(crate) fn from_oid(oid: ObjectIdentifier) -> Option<Self> {
        if oid == EC_PUBLIC_KEY_OID {
            Some(Self::Ec)
        } else if oid == RSA_ENCRYPTION_OID {
            Some(Self::Rsa)
        } else {
            None
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyAlgorithm {
    type Err = WithBacktrace;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "EC" => Ok(Self::Ec),
            "RSA" => Ok(Self::Rsa),
            _ => Err(errors::unsupported_algorithm(s)),
        }
    }
}
