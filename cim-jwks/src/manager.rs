use chrono::Utc;
use jsonwebkey as jwk;
use rand::Rng;
use tracing::{error, info};

use cim_slo::Result;

use crate::{
    GeneratedKeyRecord, JsonWebKeySet, JwkBuilder, KeyAlgorithm,
    KeyMaterialCodec, KeyPairGeneratorRegistry, KeyStatus,
};

const KEY_ID_LEN: usize = 40;

/// Turns generated key pairs into records and records back into JWKs.
#[derive(Debug)]
pub struct KeyManager {
    registry: KeyPairGeneratorRegistry,
    codec: KeyMaterialCodec,
    builder: JwkBuilder,
}

impl KeyManager {
    pub fn new(registry: KeyPairGeneratorRegistry) -> Self {
        let codec = KeyMaterialCodec::new();
        Self {
            registry,
            codec,
            builder: JwkBuilder::new(codec),
        }
    }

    pub fn registry(&self) -> &KeyPairGeneratorRegistry {
        &self.registry
    }

    /// New active key using the registry's default algorithm.
    pub fn generate(&self) -> Result<GeneratedKeyRecord> {
        self.generate_for(self.registry.default_algorithm())
    }

    #[tracing::instrument(skip(self))]
    pub fn generate_for(
        &self,
        algorithm: KeyAlgorithm,
    ) -> Result<GeneratedKeyRecord> {
        let generator = self.registry.resolve(algorithm)?;
        let key_pair = generator.generate()?;
        let key_id = Self::key_id();
        let record = GeneratedKeyRecord {
            serialized_public_key: self
                .codec
                .encode_public_key(key_pair.public_key())?,
            serialized_private_key: self
                .codec
                .encode_private_key(key_pair.private_key())?,
            key_id,
            algorithm,
            created_at: Utc::now(),
            status: KeyStatus::Active,
        };
        info!(kid = %record.key_id, "generated signing key");
        Ok(record)
    }

    /// Signing-capable JWK. Never publish it.
    pub fn signing_jwk(
        &self,
        record: &GeneratedKeyRecord,
    ) -> Result<jwk::JsonWebKey> {
        self.builder
            .build_serialized(
                &record.key_id,
                &record.serialized_public_key,
                Some(&record.serialized_private_key),
                record.algorithm,
            )
            .map_err(|err| {
                error!(kid = %record.key_id, algorithm = %record.algorithm, "{}", err);
                err
            })
    }

    /// Verification-only JWK; the private key string is not read.
    pub fn public_jwk(
        &self,
        record: &GeneratedKeyRecord,
    ) -> Result<jwk::JsonWebKey> {
        self.builder
            .build_serialized(
                &record.key_id,
                &record.serialized_public_key,
                None,
                record.algorithm,
            )
            .map_err(|err| {
                error!(kid = %record.key_id, algorithm = %record.algorithm, "{}", err);
                err
            })
    }

    /// Public-only key set, one entry per record in the order given.
    pub fn key_set(
        &self,
        records: &[GeneratedKeyRecord],
    ) -> Result<JsonWebKeySet> {
        let keys = records
            .iter()
            .map(|record| self.public_jwk(record))
            .collect::<Result<Vec<_>>>()?;
        Ok(JsonWebKeySet { keys })
    }

    fn key_id() -> String {
        rand::thread_rng()
            .sample_iter(&rand::distributions::Alphanumeric)
            .take(KEY_ID_LEN)
            .map(char::from)
            .collect::<String>()
    }
}
