use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::{error, info};

use cim_slo::{errors, errors::WithBacktrace, Result};

use crate::{AppConfig, GeneratedKeyRecord, JsonWebKeySet, KeyManager};

/// 100 years, in seconds.
pub const MAX_ROTATION_FREQUENCY: i64 = 100 * 365 * 24 * 60 * 60;

/// Persistence of key records, owned by the storage layer.
///
/// `put` inserts or replaces the record with the same key id. Records are
/// stored verbatim.
#[async_trait]
pub trait KeyStore: Sync {
    async fn list(&self) -> Result<Vec<GeneratedKeyRecord>>;
    async fn put(&self, record: &GeneratedKeyRecord) -> Result<()>;
}

#[derive(Debug, Clone, Copy)]
pub struct RotationStrategy {
    rotation_frequency: Duration,
}

impl RotationStrategy {
    /// `rotation_frequency` is in seconds and must lie in
    /// `1..=MAX_ROTATION_FREQUENCY`.
    pub fn new(rotation_frequency: i64) -> Result<Self> {
        if !(1..=MAX_ROTATION_FREQUENCY).contains(&rotation_frequency) {
            return Err(errors::config(&format!(
                "rotation frequency of {} seconds not in range 1-{}",
                rotation_frequency, MAX_ROTATION_FREQUENCY
            )));
        }
        let rotation_frequency = Duration::try_seconds(rotation_frequency)
            .ok_or_else(|| {
                errors::config(&format!(
                    "rotation frequency of {} seconds out of bounds",
                    rotation_frequency
                ))
            })?;
        Ok(Self { rotation_frequency })
    }

    pub fn rotation_frequency(&self) -> Duration {
        self.rotation_frequency
    }

    /// When `record` stops being fresh enough to sign with.
    pub fn next_rotation(
        &self,
        record: &GeneratedKeyRecord,
    ) -> Result<DateTime<Utc>> {
        record
            .created_at
            .checked_add_signed(self.rotation_frequency)
            .ok_or_else(|| {
                errors::config(&format!(
                    "next rotation of key {} is out of range",
                    record.key_id
                ))
            })
    }
}

impl TryFrom<&AppConfig> for RotationStrategy {
    type Error = WithBacktrace;

    fn try_from(config: &AppConfig) -> Result<Self> {
        Self::new(config.rotation_frequency)
    }
}

#[derive(Debug)]
pub struct KeyRotator<S> {
    store: S,
    manager: KeyManager,
    strategy: RotationStrategy,
}

impl<S> KeyRotator<S> {
    pub fn new(store: S, manager: KeyManager, strategy: RotationStrategy) -> Self {
        Self {
            store,
            manager,
            strategy,
        }
    }

    pub fn manager(&self) -> &KeyManager {
        &self.manager
    }
}

impl<S> KeyRotator<S>
where
    S: KeyStore,
{
    /// Makes sure a fresh active key exists.
    ///
    /// Returns the newly generated record, or `None` when the active key is
    /// still within its rotation period. Retired records are never removed.
    pub async fn rotate(&self) -> Result<Option<GeneratedKeyRecord>> {
        let records = self.store.list().await?;
        let mut active = records.iter().filter(|record| record.is_active());
        let current = active.next();
        if active.next().is_some() {
            return Err(errors::anyhow(anyhow::anyhow!(
                "more than one active signing key"
            )));
        }

        if let Some(current) = current {
            let next_rotation =
                self.strategy.next_rotation(current).map_err(|err| {
                    error!(kid = %current.key_id, "{}", err);
                    err
                })?;
            if next_rotation > Utc::now() {
                info!(kid = %current.key_id, "Skipping key rotation");
                return Ok(None);
            }
        }

        let record = self.manager.generate().map_err(|err| {
            error!(
                algorithm = %self.manager.registry().default_algorithm(),
                "could not generate a signing key: {}",
                err
            );
            err
        })?;
        if let Some(current) = current {
            self.store.put(&current.retired()).await?;
            info!(kid = %current.key_id, "retired signing key");
        }
        self.store.put(&record).await?;
        info!(kid = %record.key_id, algorithm = %record.algorithm, "rotated signing key");
        Ok(Some(record))
    }

    /// Public key set over every record the store still holds.
    pub async fn key_set(&self) -> Result<JsonWebKeySet> {
        let records = self.store.list().await?;
        self.manager.key_set(&records)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use cim_slo::errors::Code;
    use mockall::{mock, predicate};

    use super::*;
    use crate::{
        generator::EcKeyPairGenerator, KeyAlgorithm, KeyPair,
        KeyPairGenerator, KeyPairGeneratorRegistry, KeyStatus,
    };

    mock! {
        Store {
            fn list(&self) -> Result<Vec<GeneratedKeyRecord>>;
            fn put(&self, record: &GeneratedKeyRecord) -> Result<()>;
        }
    }

    #[async_trait]
    impl KeyStore for MockStore {
        async fn list(&self) -> Result<Vec<GeneratedKeyRecord>> {
            self.list()
        }
        async fn put(&self, record: &GeneratedKeyRecord) -> Result<()> {
            self.put(record)
        }
    }

    fn manager() -> KeyManager {
        KeyManager::new(
            KeyPairGeneratorRegistry::builder()
                .register_default(EcKeyPairGenerator::new())
                .build()
                .unwrap(),
        )
    }

    fn strategy() -> RotationStrategy {
        RotationStrategy::new(6 * 60 * 60).unwrap()
    }

    #[derive(Debug, Clone, Copy)]
    struct UnavailableGenerator;

    impl KeyPairGenerator for UnavailableGenerator {
        fn generate(&self) -> Result<KeyPair> {
            Err(errors::key_generation_unavailable(
                &KeyAlgorithm::Ec,
                "no entropy source",
            ))
        }

        fn algorithm(&self) -> KeyAlgorithm {
            KeyAlgorithm::Ec
        }
    }

    #[tokio::test]
    async fn bootstrap_when_empty() {
        let mut store = MockStore::new();
        store.expect_list().times(1).returning(|| Ok(vec![]));
        store
            .expect_put()
            .withf(|record| record.is_active())
            .times(1)
            .returning(|_| Ok(()));

        let rotator = KeyRotator::new(store, manager(), strategy());
        let record = rotator.rotate().await.unwrap().unwrap();
        assert_eq!(record.status, KeyStatus::Active);
    }

    #[tokio::test]
    async fn skip_fresh_key() {
        let current = manager().generate().unwrap();
        let mut store = MockStore::new();
        store
            .expect_list()
            .times(1)
            .return_once(move || Ok(vec![current]));
        store.expect_put().never();

        let rotator = KeyRotator::new(store, manager(), strategy());
        assert!(rotator.rotate().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rotate_expired_key() {
        let mut current = manager().generate().unwrap();
        current.created_at = Utc::now() - Duration::hours(7);
        let old_kid = current.key_id.clone();
        let older = {
            let mut record = manager().generate().unwrap().retired();
            record.created_at = Utc::now() - Duration::hours(13);
            record
        };

        let written = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&written);
        let mut store = MockStore::new();
        store
            .expect_list()
            .times(1)
            .return_once(move || Ok(vec![older, current]));
        store.expect_put().times(2).returning(move |record| {
            sink.lock().unwrap().push(record.clone());
            Ok(())
        });

        let rotator = KeyRotator::new(store, manager(), strategy());
        let record = rotator.rotate().await.unwrap().unwrap();

        let written = written.lock().unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(written[0].key_id, old_kid);
        assert_eq!(written[0].status, KeyStatus::Retired);
        assert_eq!(written[1], record);
        assert!(written[1].is_active());
    }

    #[tokio::test]
    async fn refuse_multiple_active() {
        let a = manager().generate().unwrap();
        let b = manager().generate().unwrap();
        let mut store = MockStore::new();
        store.expect_list().return_once(move || Ok(vec![a, b]));
        store.expect_put().never();

        let rotator = KeyRotator::new(store, manager(), strategy());
        let err = rotator.rotate().await.unwrap_err();
        assert!(matches!(err.kind(), Code::Any(_)));
    }

    #[tokio::test]
    async fn store_failure_propagates() {
        let mut store = MockStore::new();
        store.expect_list().returning(|| Ok(vec![]));
        store
            .expect_put()
            .with(predicate::always())
            .returning(|_| Err(errors::anyhow(anyhow::anyhow!("db down"))));

        let rotator = KeyRotator::new(store, manager(), strategy());
        assert!(rotator.rotate().await.is_err());
    }

    #[tokio::test]
    async fn publish_stored_records() {
        let active = manager().generate().unwrap();
        let retired = manager().generate().unwrap().retired();
        let kids = vec![Some(active.key_id.clone()), Some(retired.key_id.clone())];
        let mut store = MockStore::new();
        store
            .expect_list()
            .return_once(move || Ok(vec![active, retired]));

        let rotator = KeyRotator::new(store, manager(), strategy());
        let set = rotator.key_set().await.unwrap();
        let got: Vec<_> = set.keys.iter().map(|key| key.key_id.clone()).collect();
        assert_eq!(got, kids);
        assert!(set.keys.iter().all(|key| !key.key.is_private()));
    }

    #[test]
    fn strategy_bounds() {
        for seconds in [0, -1, MAX_ROTATION_FREQUENCY + 1, i64::MAX, i64::MIN] {
            let err = RotationStrategy::new(seconds).unwrap_err();
            assert!(matches!(err.kind(), Code::Config(_)), "{seconds}");
        }
        assert_eq!(
            RotationStrategy::new(MAX_ROTATION_FREQUENCY)
                .unwrap()
                .rotation_frequency(),
            Duration::seconds(MAX_ROTATION_FREQUENCY)
        );
    }

    #[test]
    fn strategy_from_config() {
        let config = AppConfig {
            rotation_frequency: 60,
            ..AppConfig::default()
        };
        let strategy = RotationStrategy::try_from(&config).unwrap();
        assert_eq!(strategy.rotation_frequency(), Duration::seconds(60));

        let config = AppConfig {
            rotation_frequency: i64::MAX,
            ..AppConfig::default()
        };
        let err = RotationStrategy::try_from(&config).unwrap_err();
        assert!(matches!(err.kind(), Code::Config(_)));
    }

    #[tokio::test]
    async fn out_of_range_rotation_time() {
        let mut current = manager().generate().unwrap();
        current.created_at = DateTime::<Utc>::MAX_UTC;
        let mut store = MockStore::new();
        store
            .expect_list()
            .return_once(move || Ok(vec![current]));
        store.expect_put().never();

        let rotator = KeyRotator::new(
            store,
            manager(),
            RotationStrategy::new(MAX_ROTATION_FREQUENCY).unwrap(),
        );
        let err = rotator.rotate().await.unwrap_err();
        assert!(matches!(err.kind(), Code::Config(_)));
    }

    #[tokio::test]
    async fn generation_failure_keeps_active_key() {
        let mut current = manager().generate().unwrap();
        current.created_at = Utc::now() - Duration::hours(7);
        let mut store = MockStore::new();
        store.expect_list().return_once(move || Ok(vec![current]));
        store.expect_put().never();

        let manager = KeyManager::new(
            KeyPairGeneratorRegistry::builder()
                .register_default(UnavailableGenerator)
                .build()
                .unwrap(),
        );
        let rotator = KeyRotator::new(store, manager, strategy());
        let err = rotator.rotate().await.unwrap_err();
        assert!(matches!(err.kind(), Code::KeyGenerationUnavailable { .. }));
    }
}
