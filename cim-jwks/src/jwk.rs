use jsonwebkey as jwk;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rsa::{
    traits::{PrivateKeyParts, PublicKeyParts},
    RsaPrivateKey, RsaPublicKey,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use cim_slo::{errors, Result};

use crate::{
    KeyAlgorithm, KeyMaterialCodec, KeyPair, PrivateKeyHandle, PublicKeyHandle,
};

/// The only RSA public exponent a JWK built here can carry.
const RSA_PUBLIC_EXPONENT: [u8; 3] = [0x01, 0x00, 0x01];

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct JsonWebKeySet {
    pub keys: Vec<jwk::JsonWebKey>,
}

/// Builds JSON Web Keys from key handles or their persisted strings.
///
/// Whenever a private key is passed in, its components end up in the JWK.
/// Anything that is published must be built with [`JwkBuilder::build_public`]
/// or without a serialized private key.
#[derive(Debug, Clone, Copy, Default)]
pub struct JwkBuilder {
    codec: KeyMaterialCodec,
}

impl JwkBuilder {
    pub fn new(codec: KeyMaterialCodec) -> Self {
        Self { codec }
    }

    /// Signing-capable JWK holding both halves of the pair.
    pub fn build(
        &self,
        key_id: &str,
        key_pair: &KeyPair,
    ) -> Result<jwk::JsonWebKey> {
        self.build_key(
            key_id,
            key_pair.algorithm(),
            key_pair.public_key(),
            Some(key_pair.private_key()),
        )
    }

    /// Verification-only JWK.
    pub fn build_public(
        &self,
        key_id: &str,
        public: &PublicKeyHandle,
    ) -> Result<jwk::JsonWebKey> {
        self.build_key(key_id, public.algorithm(), public, None)
    }

    #[tracing::instrument(skip_all, fields(kid = %key_id, algorithm = %algorithm))]
    pub fn build_serialized(
        &self,
        key_id: &str,
        serialized_public: &str,
        serialized_private: Option<&str>,
        algorithm: KeyAlgorithm,
    ) -> Result<jwk::JsonWebKey> {
        let detected = self
            .codec
            .detect_public_algorithm(serialized_public, algorithm)?;
        Self::expect_algorithm(algorithm, detected)?;
        let public = self.codec.decode_public_key(serialized_public, algorithm)?;

        let Some(serialized_private) = serialized_private else {
            return self.build_key(key_id, algorithm, &public, None);
        };
        let detected = self
            .codec
            .detect_private_algorithm(serialized_private, algorithm)?;
        Self::expect_algorithm(algorithm, detected)?;
        let private =
            self.codec.decode_private_key(serialized_private, algorithm)?;
        let key_pair = KeyPair::new(public, private)?;
        self.build(key_id, &key_pair)
    }

    /// Builds a JWK after checking every handle really is a key of
    /// `algorithm`.
    #[tracing::instrument(skip_all, fields(kid = %key_id, algorithm = %algorithm))]
    pub fn build_key(
        &self,
        key_id: &str,
        algorithm: KeyAlgorithm,
        public: &PublicKeyHandle,
        private: Option<&PrivateKeyHandle>,
    ) -> Result<jwk::JsonWebKey> {
        Self::expect_algorithm(algorithm, Some(public.algorithm()))?;
        if let Some(private) = private {
            Self::expect_algorithm(algorithm, Some(private.algorithm()))?;
        }

        let key = match (public, private) {
            (PublicKeyHandle::Ec(public), None) => ec_key(public, None)?,
            (PublicKeyHandle::Ec(public), Some(PrivateKeyHandle::Ec(secret))) => {
                ec_key(public, Some(secret))?
            }
            (PublicKeyHandle::Rsa(public), None) => rsa_key(public, None)?,
            (
                PublicKeyHandle::Rsa(public),
                Some(PrivateKeyHandle::Rsa(private)),
            ) => rsa_key(public, Some(private))?,
            (public, Some(private)) => {
                return Err(errors::key_type_mismatch(
                    &public.algorithm(),
                    &private.algorithm(),
                ))
            }
        };

        let mut json_web_key = jwk::JsonWebKey::new(key);
        json_web_key
            .set_algorithm(algorithm.jwk_algorithm())
            .map_err(errors::any)?;
        json_web_key.key_use = Some(jwk::KeyUse::Signing);
        json_web_key.key_id = Some(key_id.to_owned());
        Ok(json_web_key)
    }

    fn expect_algorithm(
        expected: KeyAlgorithm,
        actual: Option<KeyAlgorithm>,
    ) -> Result<()> {
        match actual {
            Some(actual) if actual == expected => Ok(()),
            Some(actual) => {
                warn!(%expected, %actual, "key type does not match algorithm");
                Err(errors::key_type_mismatch(&expected, &actual))
            }
            None => {
                warn!(%expected, "key carries an unknown algorithm");
                Err(errors::key_type_mismatch(&expected, "unknown"))
            }
        }
    }
}

fn ec_key(
    public: &p256::PublicKey,
    secret: Option<&p256::SecretKey>,
) -> Result<jwk::Key> {
    let coordinate = |bytes: &[u8]| {
        jwk::ByteArray::try_from_slice(bytes).map_err(|err| {
            errors::invalid_key_encoding(&KeyAlgorithm::Ec, &err)
        })
    };
    let point = public.to_encoded_point(false);
    let (Some(x), Some(y)) = (point.x(), point.y()) else {
        return Err(errors::invalid_key_encoding(
            &KeyAlgorithm::Ec,
            "public key is the identity point",
        ));
    };
    let d = match secret {
        Some(secret) => Some(coordinate(secret.to_bytes().as_slice())?),
        None => None,
    };
    Ok(jwk::Key::EC {
        curve: jwk::Curve::P256 {
            d,
            x: coordinate(x.as_slice())?,
            y: coordinate(y.as_slice())?,
        },
    })
}

fn rsa_key(
    public: &RsaPublicKey,
    private: Option<&RsaPrivateKey>,
) -> Result<jwk::Key> {
    if public.e().to_bytes_be() != RSA_PUBLIC_EXPONENT {
        return Err(errors::invalid_key_encoding(
            &KeyAlgorithm::Rsa,
            "public exponent must be 65537",
        ));
    }
    let private = private.map(|private_key| {
        let mut p = None;
        let mut q = None;
        let primes = private_key.primes();
        match primes.len() {
            1 => {
                p = Some(primes[0].to_bytes_be().into());
            }
            2 => {
                p = Some(primes[0].to_bytes_be().into());
                q = Some(primes[1].to_bytes_be().into());
            }
            _ => {}
        }
        jwk::RsaPrivate {
            d: private_key.d().to_bytes_be().into(),
            p,
            q,
            dp: private_key.dp().map(|v| v.to_bytes_be().into()),
            dq: private_key.dq().map(|v| v.to_bytes_be().into()),
            qi: private_key.qinv().map(|v| unsigned(v.to_signed_bytes_be()).into()),
        }
    });
    Ok(jwk::Key::RSA {
        public: jwk::RsaPublic {
            e: jwk::PublicExponent,
            n: public.n().to_bytes_be().into(),
        },
        private,
    })
}

// qinv is positive, so the only extra byte of the two's complement form is a
// leading zero sign byte.
fn unsigned(mut bytes: Vec<u8>) -> Vec<u8> {
    if bytes.len() > 1 && bytes[0] == 0 {
        bytes.remove(0);
    }
    bytes
}
