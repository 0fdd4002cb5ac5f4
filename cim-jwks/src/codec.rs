//! Conversion between persisted key strings and in-memory key handles.
//!
//! Public keys persist as SubjectPublicKeyInfo DER and private keys as
//! PKCS#8 DER, both standard base64 without line breaks. PEM armour of the
//! same structures is accepted on decode.

use base64::engine::{general_purpose, Engine};
use p256::pkcs8::{
    der::Document, DecodePrivateKey as _, DecodePublicKey as _,
    EncodePrivateKey as _, EncodePublicKey as _, PrivateKeyInfo,
    SubjectPublicKeyInfoRef,
};
use rsa::{
    pkcs8::{
        DecodePrivateKey as _, DecodePublicKey as _, EncodePrivateKey as _,
        EncodePublicKey as _,
    },
    RsaPrivateKey, RsaPublicKey,
};
use tracing::debug;

use cim_slo::{errors, Result};

use crate::{KeyAlgorithm, KeyPair, PrivateKeyHandle, PublicKeyHandle};

const PEM_PREFIX: &str = "-----BEGIN";

#[derive(Debug, Clone, Copy, Default)]
pub struct KeyMaterialCodec;

impl KeyMaterialCodec {
    pub fn new() -> Self {
        Self
    }

    #[tracing::instrument(skip_all, fields(algorithm = %algorithm))]
    pub fn decode_public_key(
        &self,
        serialized: &str,
        algorithm: KeyAlgorithm,
    ) -> Result<PublicKeyHandle> {
        let der = Self::to_der(serialized, algorithm)?;
        let handle = match algorithm {
            KeyAlgorithm::Ec => p256::PublicKey::from_public_key_der(&der)
                .map(PublicKeyHandle::Ec)
                .map_err(|err| errors::invalid_key_encoding(&algorithm, &err)),
            KeyAlgorithm::Rsa => RsaPublicKey::from_public_key_der(&der)
                .map(PublicKeyHandle::Rsa)
                .map_err(|err| errors::invalid_key_encoding(&algorithm, &err)),
        };
        if let Err(err) = &handle {
            debug!("{}", err);
        }
        handle
    }

    #[tracing::instrument(skip_all, fields(algorithm = %algorithm))]
    pub fn decode_private_key(
        &self,
        serialized: &str,
        algorithm: KeyAlgorithm,
    ) -> Result<PrivateKeyHandle> {
        let der = Self::to_der(serialized, algorithm)?;
        let handle = match algorithm {
            KeyAlgorithm::Ec => p256::SecretKey::from_pkcs8_der(&der)
                .map(PrivateKeyHandle::Ec)
                .map_err(|err| errors::invalid_key_encoding(&algorithm, &err)),
            KeyAlgorithm::Rsa => RsaPrivateKey::from_pkcs8_der(&der)
                .map(PrivateKeyHandle::Rsa)
                .map_err(|err| errors::invalid_key_encoding(&algorithm, &err)),
        };
        if let Err(err) = &handle {
            debug!("{}", err);
        }
        handle
    }

    /// Decodes both halves of a stored key and checks that they pair up.
    pub fn decode_key_pair(
        &self,
        serialized_public: &str,
        serialized_private: &str,
        algorithm: KeyAlgorithm,
    ) -> Result<KeyPair> {
        let public = self.decode_public_key(serialized_public, algorithm)?;
        let private = self.decode_private_key(serialized_private, algorithm)?;
        KeyPair::new(public, private)
    }

    /// Reads the algorithm named by a SubjectPublicKeyInfo envelope.
    ///
    /// Returns `None` when the envelope parses but names an algorithm this
    /// crate has no codec for.
    pub fn detect_public_algorithm(
        &self,
        serialized: &str,
        declared: KeyAlgorithm,
    ) -> Result<Option<KeyAlgorithm>> {
        let der = Self::to_der(serialized, declared)?;
        let spki = SubjectPublicKeyInfoRef::try_from(der.as_slice())
            .map_err(|err| errors::invalid_key_encoding(&declared, &err))?;
        Ok(KeyAlgorithm::from_oid(spki.algorithm.oid))
    }

    /// Reads the algorithm named by a PKCS#8 envelope.
    pub fn detect_private_algorithm(
        &self,
        serialized: &str,
        declared: KeyAlgorithm,
    ) -> Result<Option<KeyAlgorithm>> {
        let der = Self::to_der(serialized, declared)?;
        let info = PrivateKeyInfo::try_from(der.as_slice())
            .map_err(|err| errors::invalid_key_encoding(&declared, &err))?;
        Ok(KeyAlgorithm::from_oid(info.algorithm.oid))
    }

    pub fn encode_public_key(&self, key: &PublicKeyHandle) -> Result<String> {
        let der = match key {
            PublicKeyHandle::Ec(key) => key.to_public_key_der(),
            PublicKeyHandle::Rsa(key) => key.to_public_key_der(),
        }
        .map_err(errors::any)?;
        Ok(general_purpose::STANDARD.encode(der.as_bytes()))
    }

    pub fn encode_private_key(&self, key: &PrivateKeyHandle) -> Result<String> {
        let der = match key {
            PrivateKeyHandle::Ec(key) => key.to_pkcs8_der(),
            PrivateKeyHandle::Rsa(key) => key.to_pkcs8_der(),
        }
        .map_err(errors::any)?;
        Ok(general_purpose::STANDARD.encode(der.as_bytes()))
    }

    fn to_der(serialized: &str, algorithm: KeyAlgorithm) -> Result<Vec<u8>> {
        let serialized = serialized.trim();
        if serialized.is_empty() {
            return Err(errors::invalid_key_encoding(&algorithm, "empty key"));
        }
        if serialized.starts_with(PEM_PREFIX) {
            let (_, doc) = Document::from_pem(serialized)
                .map_err(|err| errors::invalid_key_encoding(&algorithm, &err))?;
            return Ok(doc.as_bytes().to_vec());
        }
        general_purpose::STANDARD
            .decode(serialized)
            .map_err(|err| errors::invalid_key_encoding(&algorithm, &err))
    }
}
